//! Content root watcher.
//!
//! Watches the content root for added or removed video files and reruns the
//! scanner once the directory has been quiet for the debounce window. The
//! scanner marks aggregate counts stale whenever the record set changes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use super::scanner::{ContentScanner, ScanReport};

/// Errors that can occur with the watcher
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Watch directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

/// Configuration for the watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Debounce window before a burst of changes triggers a scan (seconds)
    pub stability_delay_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            stability_delay_secs: 5,
        }
    }
}

/// Watches the content root and rescans on change
pub struct ContentWatcher {
    scanner: Arc<ContentScanner>,
    config: WatcherConfig,
}

impl ContentWatcher {
    pub fn new(scanner: Arc<ContentScanner>, config: WatcherConfig) -> Self {
        Self { scanner, config }
    }

    /// Start watching; scan reports are sent on the returned channel
    pub fn watch(&self) -> Result<(mpsc::Receiver<ScanReport>, WatchHandle), WatcherError> {
        let root = self.scanner.content_root().to_path_buf();
        if !root.is_dir() {
            return Err(WatcherError::DirectoryNotFound(root));
        }

        let (report_tx, report_rx) = mpsc::channel::<ScanReport>(16);
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

        // Bridge notify's callback thread into the async loop
        let (change_tx, mut change_rx) = mpsc::unbounded_channel::<()>();
        let scanner = self.scanner.clone();
        let mut debouncer = new_debouncer(
            Duration::from_secs(self.config.stability_delay_secs),
            move |result: notify_debouncer_mini::DebounceEventResult| match result {
                Ok(events) => {
                    if events.iter().any(|event| scanner.is_video_file(&event.path)) {
                        let _ = change_tx.send(());
                    }
                }
                Err(e) => tracing::warn!("Watcher error: {:?}", e),
            },
        )?;
        debouncer.watcher().watch(&root, RecursiveMode::NonRecursive)?;

        tracing::info!("Watching {} for video files", root.display());

        let scanner = self.scanner.clone();
        let task = tokio::spawn(async move {
            // The debouncer stops watching when dropped
            let _debouncer = debouncer;

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => {
                        tracing::info!("Watcher stopping...");
                        break;
                    }
                    change = change_rx.recv() => {
                        if change.is_none() {
                            tracing::error!("Watcher channel disconnected");
                            break;
                        }
                        match scanner.scan().await {
                            Ok(report) => {
                                let _ = report_tx.send(report).await;
                            }
                            Err(e) => tracing::warn!("Rescan after change failed: {}", e),
                        }
                    }
                }
            }
        });

        Ok((report_rx, WatchHandle { stop_tx, task }))
    }
}

/// Handle to control the watcher
pub struct WatchHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Stop the watcher
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(()).await;
        self.task.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{AvailabilityRecords, DiskAvailability};
    use crate::core::AggregateCache;
    use tempfile::TempDir;

    fn scanner_for(root: &std::path::Path) -> Arc<ContentScanner> {
        let records = Arc::new(AvailabilityRecords::in_memory(Vec::<String>::new()));
        let oracle = Arc::new(DiskAvailability::new(root, vec!["mp4".to_string()], records.clone()));
        let cache = Arc::new(AggregateCache::new(oracle));
        Arc::new(ContentScanner::new(root, vec!["mp4".to_string()], records, cache))
    }

    #[test]
    fn test_default_config() {
        assert_eq!(WatcherConfig::default().stability_delay_secs, 5);
    }

    #[tokio::test]
    async fn test_watch_missing_directory() {
        let temp = TempDir::new().unwrap();
        let watcher = ContentWatcher::new(scanner_for(&temp.path().join("gone")), WatcherConfig::default());

        assert!(matches!(watcher.watch(), Err(WatcherError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_watch_and_stop() {
        let temp = TempDir::new().unwrap();
        let watcher = ContentWatcher::new(
            scanner_for(temp.path()),
            WatcherConfig {
                stability_delay_secs: 1,
            },
        );

        let (_reports, handle) = watcher.watch().unwrap();
        handle.stop().await.unwrap();
    }
}
