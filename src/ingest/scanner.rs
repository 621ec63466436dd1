//! Content root scanner (the `videoscan` job).
//!
//! Lists video files under the content root, rewrites the persisted
//! availability records from what it finds, and invalidates the aggregate
//! counts when the record set changed.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::{has_video_extension, AvailabilityRecords};
use crate::core::{AggregateCache, VIDEOSCAN_JOB};

use super::queue::JobQueue;

/// Errors that can occur while scanning
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Content root does not exist: {0}")]
    ContentRootNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record error: {0}")]
    Records(String),
}

/// Outcome of one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Video files found on disk
    pub found: usize,

    /// Ids newly recorded as available
    pub added: usize,

    /// Ids no longer on disk
    pub removed: usize,
}

impl ScanReport {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Rebuilds availability records from the content root
pub struct ContentScanner {
    content_root: PathBuf,
    extensions: Vec<String>,
    records: Arc<AvailabilityRecords>,
    cache: Arc<AggregateCache>,
}

impl ContentScanner {
    pub fn new(
        content_root: impl Into<PathBuf>,
        extensions: Vec<String>,
        records: Arc<AvailabilityRecords>,
        cache: Arc<AggregateCache>,
    ) -> Self {
        Self {
            content_root: content_root.into(),
            extensions,
            records,
            cache,
        }
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// Whether `path` has one of the scanned extensions
    pub fn is_video_file(&self, path: &Path) -> bool {
        has_video_extension(path, &self.extensions)
    }

    /// Scan the content root once
    pub async fn scan(&self) -> Result<ScanReport, ScanError> {
        if !self.content_root.is_dir() {
            return Err(ScanError::ContentRootNotFound(self.content_root.clone()));
        }

        let mut ids = BTreeSet::new();
        let mut entries = tokio::fs::read_dir(&self.content_root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !self.is_video_file(&path) {
                continue;
            }

            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => {}
                _ => continue,
            }

            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.insert(stem.to_string());
            }
        }

        let found = ids.len();
        let change = self
            .records
            .replace(ids)
            .map_err(|e| ScanError::Records(e.to_string()))?;

        let report = ScanReport {
            found,
            added: change.added,
            removed: change.removed,
        };

        if report.changed() {
            self.cache.mark_counts_stale();
        }

        info!(
            root = %self.content_root.display(),
            found, added = report.added, removed = report.removed,
            "Scanned content root"
        );

        Ok(report)
    }
}

/// Result of draining the job queue
#[derive(Debug, Clone, Default)]
pub struct JobRunSummary {
    pub completed: usize,
    pub failed: usize,

    /// Stalled jobs reset before running
    pub retried: usize,
}

/// Run every pending job the scanner knows how to handle
///
/// Stalled jobs are reset and run again. Jobs with unknown names are marked
/// failed.
pub async fn run_pending_jobs(
    queue: &JobQueue,
    scanner: &ContentScanner,
) -> anyhow::Result<JobRunSummary> {
    let mut summary = JobRunSummary {
        retried: queue.reset_stalled().await?,
        ..JobRunSummary::default()
    };

    for job in queue.get_pending().await? {
        queue.mark_processing(job.id).await?;

        let outcome = match job.name.as_str() {
            VIDEOSCAN_JOB => scanner.scan().await.map(|_| ()).map_err(|e| e.to_string()),
            other => Err(format!("Unknown job: {}", other)),
        };

        match outcome {
            Ok(()) => {
                queue.mark_done(job.id).await?;
                summary.completed += 1;
            }
            Err(error) => {
                warn!(job = %job.name, id = %job.id, %error, "Job failed");
                queue.mark_failed(job.id, &error).await?;
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DiskAvailability;
    use crate::ingest::JobStatus;
    use tempfile::TempDir;

    fn scanner_for(root: &Path) -> (ContentScanner, Arc<AggregateCache>, Arc<AvailabilityRecords>) {
        let records = Arc::new(AvailabilityRecords::in_memory(Vec::<String>::new()));
        let oracle = Arc::new(DiskAvailability::new(root, vec!["mp4".to_string()], records.clone()));
        let cache = Arc::new(AggregateCache::new(oracle));
        let scanner = ContentScanner::new(root, vec!["mp4".to_string()], records.clone(), cache.clone());
        (scanner, cache, records)
    }

    #[tokio::test]
    async fn test_scan_records_videos_and_marks_stale() {
        let temp = TempDir::new().unwrap();
        tokio::fs::write(temp.path().join("abc.mp4"), b"v").await.unwrap();
        tokio::fs::write(temp.path().join("def.MP4"), b"v").await.unwrap();
        tokio::fs::write(temp.path().join("readme.txt"), b"t").await.unwrap();

        let (scanner, cache, records) = scanner_for(temp.path());
        let report = scanner.scan().await.unwrap();

        assert_eq!(report, ScanReport { found: 2, added: 2, removed: 0 });
        assert!(records.contains("abc"));
        assert!(records.contains("def"));
        assert!(cache.needs_update());

        // Unchanged disk leaves the epoch alone
        let epoch = cache.current_epoch();
        let again = scanner.scan().await.unwrap();
        assert!(!again.changed());
        assert_eq!(cache.current_epoch(), epoch);
    }

    #[tokio::test]
    async fn test_missing_root_is_error() {
        let temp = TempDir::new().unwrap();
        let (scanner, _, _) = scanner_for(&temp.path().join("nope"));

        assert!(matches!(scanner.scan().await, Err(ScanError::ContentRootNotFound(_))));
    }

    #[tokio::test]
    async fn test_run_pending_jobs() {
        let temp = TempDir::new().unwrap();
        let content = temp.path().join("content");
        tokio::fs::create_dir_all(&content).await.unwrap();
        tokio::fs::write(content.join("abc.mp4"), b"v").await.unwrap();

        let (scanner, _, records) = scanner_for(&content);
        let queue = JobQueue::new(temp.path().join("jobs.jsonl"));
        queue.enqueue_job(VIDEOSCAN_JOB).await.unwrap();
        queue.enqueue_job("subtitledownload").await.unwrap();

        let summary = run_pending_jobs(&queue, &scanner).await.unwrap();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert!(records.contains("abc"));

        let status = queue.status().await.unwrap();
        assert_eq!(status.pending, 0);
        assert_eq!(status.done, 1);
        assert_eq!(status.failed, 1);
    }

    #[tokio::test]
    async fn test_run_pending_jobs_resumes_stalled_job() {
        let temp = TempDir::new().unwrap();
        let content = temp.path().join("content");
        tokio::fs::create_dir_all(&content).await.unwrap();
        tokio::fs::write(content.join("abc.mp4"), b"v").await.unwrap();

        let (scanner, _, records) = scanner_for(&content);
        let queue = JobQueue::new(temp.path().join("jobs.jsonl"))
            .with_stall_timeout(chrono::Duration::zero());
        let id = queue.enqueue_job(VIDEOSCAN_JOB).await.unwrap().id();
        queue.mark_processing(id).await.unwrap();

        let summary = run_pending_jobs(&queue, &scanner).await.unwrap();
        assert_eq!(summary.retried, 1);
        assert_eq!(summary.completed, 1);
        assert!(records.contains("abc"));

        let job = queue.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.retry_count, 1);
    }
}
