//! Filesystem-backed availability oracle.
//!
//! Videos live under the content root as `<video_id>.<ext>`. Whether a video
//! is "persisted available" is answered from a small JSON record file that
//! the content scanner rewrites after each scan.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::AvailabilityOracle;

/// Record file schema
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordFile {
    version: u32,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    video_ids: BTreeSet<String>,
}

/// Change produced by replacing the record set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordChange {
    pub added: usize,
    pub removed: usize,
}

impl RecordChange {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Persisted set of video ids known to be downloaded
#[derive(Debug)]
pub struct AvailabilityRecords {
    /// Backing file; `None` keeps records in memory only
    path: Option<PathBuf>,
    ids: RwLock<BTreeSet<String>>,
}

impl AvailabilityRecords {
    /// Open the record file, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let ids = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read availability records: {}", path.display()))?;
            let file: RecordFile = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse availability records: {}", path.display()))?;
            file.video_ids
        } else {
            BTreeSet::new()
        };

        Ok(Self {
            path: Some(path),
            ids: RwLock::new(ids),
        })
    }

    /// Records that are never written to disk
    pub fn in_memory(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            path: None,
            ids: RwLock::new(ids.into_iter().map(Into::into).collect()),
        }
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(video_id)
    }

    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole record set, persisting it first
    pub fn replace(&self, ids: BTreeSet<String>) -> Result<RecordChange> {
        if let Some(path) = &self.path {
            write_records(path, &ids)?;
        }

        let mut current = self.ids.write().unwrap_or_else(PoisonError::into_inner);
        let change = RecordChange {
            added: ids.difference(&current).count(),
            removed: current.difference(&ids).count(),
        };
        *current = ids;

        Ok(change)
    }
}

fn write_records(path: &Path, ids: &BTreeSet<String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let record = RecordFile {
        version: 1,
        updated_at: Utc::now(),
        video_ids: ids.clone(),
    };
    let json = serde_json::to_string_pretty(&record)?;

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open availability records: {}", path.display()))?;

    file.lock_exclusive()
        .context("Failed to acquire file lock on availability records")?;
    file.set_len(0)?;
    file.write_all(json.as_bytes())?;
    file.flush()?;
    file.unlock()?;

    Ok(())
}

/// Availability answered from the content root and the record file
#[derive(Debug)]
pub struct DiskAvailability {
    content_root: PathBuf,
    extensions: Vec<String>,
    records: Arc<AvailabilityRecords>,
}

impl DiskAvailability {
    pub fn new(
        content_root: impl Into<PathBuf>,
        extensions: Vec<String>,
        records: Arc<AvailabilityRecords>,
    ) -> Self {
        Self {
            content_root: content_root.into(),
            extensions,
            records,
        }
    }
}

/// Whether `path` carries one of `extensions`, ignoring ASCII case
pub fn has_video_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

impl AvailabilityOracle for DiskAvailability {
    fn is_physically_present(&self, video_id: &str) -> Result<bool> {
        if video_id.is_empty() || video_id.contains(['/', '\\']) {
            return Ok(false);
        }

        if self
            .extensions
            .iter()
            .any(|ext| self.content_root.join(format!("{}.{}", video_id, ext)).is_file())
        {
            return Ok(true);
        }

        // Same rule as the scanner: extension case does not matter
        let entries = match std::fs::read_dir(&self.content_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to list content root: {}", self.content_root.display())
                })
            }
        };

        for entry in entries {
            let path = entry?.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(video_id)
                && has_video_extension(&path, &self.extensions)
                && path.is_file()
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn is_persisted_available(&self, video_id: &str) -> Result<bool> {
        Ok(self.records.contains(video_id))
    }
}
