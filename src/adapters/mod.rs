//! Adapter interfaces for external systems.
//!
//! The resolver core only talks to the outside world through these traits:
//! an availability oracle (is a video on disk / recorded as downloaded) and a
//! job dispatcher (ask the background job system to run something).

pub mod disk;

use anyhow::Result;
use async_trait::async_trait;

// Re-export the filesystem-backed oracle
pub use disk::{has_video_extension, AvailabilityRecords, DiskAvailability};

/// Answers availability questions about a video id
pub trait AvailabilityOracle: Send + Sync {
    /// Whether the video file is physically present under the content root
    fn is_physically_present(&self, video_id: &str) -> Result<bool>;

    /// Whether the persisted download record marks the video as available
    fn is_persisted_available(&self, video_id: &str) -> Result<bool>;
}

/// Fire-and-forget job submission
#[async_trait]
pub trait JobDispatch: Send + Sync {
    /// Request that the named job runs
    ///
    /// Receivers treat repeated requests for a job that is already pending
    /// as a single request.
    async fn enqueue(&self, job_name: &str) -> Result<()>;
}
