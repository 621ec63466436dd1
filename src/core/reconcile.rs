//! Reconciliation between on-disk videos and their persisted records.
//!
//! When a resolved video has no "available" record but its file is on disk,
//! the video is served as available and a rescan is requested on a side
//! channel. Sending never blocks and delivery failures are dropped; the
//! background job system owns any retrying.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::{AvailabilityOracle, JobDispatch};
use crate::domain::Video;

/// Job that refreshes the persisted availability records
pub const VIDEOSCAN_JOB: &str = "videoscan";

/// Request for the job system, published by [`Reconciler::check`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    /// Job to run
    pub job: String,

    /// Video whose record disagreed with the disk
    pub video_id: String,

    pub requested_at: DateTime<Utc>,
}

/// Decides video availability and publishes rescan requests
#[derive(Clone)]
pub struct Reconciler {
    oracle: Arc<dyn AvailabilityOracle>,
    signal: mpsc::Sender<ReconcileRequest>,
}

impl Reconciler {
    /// Create a reconciler and the receiving end of its request channel
    pub fn channel(
        oracle: Arc<dyn AvailabilityOracle>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ReconcileRequest>) {
        let (signal, requests) = mpsc::channel(capacity.max(1));
        (Self { oracle, signal }, requests)
    }

    /// Whether `video` should be offered as available
    ///
    /// A video that is on disk but not recorded is optimistically reported
    /// available, and a `videoscan` request is published.
    pub fn check(&self, video: &Video) -> bool {
        match self.oracle.is_persisted_available(&video.id) {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => warn!(video = %video.id, error = %e, "Persisted availability check failed"),
        }

        match self.oracle.is_physically_present(&video.id) {
            Ok(true) => {
                self.request_rescan(&video.id);
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(video = %video.id, error = %e, "On-disk presence check failed");
                false
            }
        }
    }

    fn request_rescan(&self, video_id: &str) {
        let request = ReconcileRequest {
            job: VIDEOSCAN_JOB.to_string(),
            video_id: video_id.to_string(),
            requested_at: Utc::now(),
        };

        match self.signal.try_send(request) {
            Ok(()) => debug!(video = video_id, "Requested videoscan for unrecorded video"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(video = video_id, "Reconcile channel full, dropping request")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(video = video_id, "Reconcile channel closed, dropping request")
            }
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("signal_closed", &self.signal.is_closed())
            .finish()
    }
}

/// Forward reconcile requests to the job system until the channel closes
///
/// Returns the number of requests successfully handed to `dispatcher`.
pub async fn dispatch_requests(
    mut requests: mpsc::Receiver<ReconcileRequest>,
    dispatcher: Arc<dyn JobDispatch>,
) -> usize {
    let mut delivered = 0;

    while let Some(request) = requests.recv().await {
        match dispatcher.enqueue(&request.job).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(job = %request.job, video = %request.video_id, error = %e, "Failed to dispatch job"),
        }
    }

    info!(delivered, "Reconcile dispatcher stopped");
    delivered
}

/// Run [`dispatch_requests`] on the tokio runtime
pub fn spawn_dispatcher(
    requests: mpsc::Receiver<ReconcileRequest>,
    dispatcher: Arc<dyn JobDispatch>,
) -> JoinHandle<usize> {
    tokio::spawn(dispatch_requests(requests, dispatcher))
}
