//! Reconciliation Integration Tests
//!
//! Tests for availability checks, rescan requests, and the dispatcher that
//! forwards them to the job queue.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tempfile::TempDir;
use topicpath::adapters::{AvailabilityOracle, JobDispatch};
use topicpath::core::{dispatch_requests, spawn_dispatcher, Reconciler, VIDEOSCAN_JOB};
use topicpath::domain::Video;
use topicpath::ingest::{JobQueue, JobStatus};

/// Oracle with fixed answers per video id
struct FixedOracle {
    on_disk: HashSet<&'static str>,
    recorded: HashSet<&'static str>,
}

impl AvailabilityOracle for FixedOracle {
    fn is_physically_present(&self, video_id: &str) -> Result<bool> {
        if video_id == "broken" {
            bail!("disk unreadable");
        }
        Ok(self.on_disk.contains(video_id))
    }

    fn is_persisted_available(&self, video_id: &str) -> Result<bool> {
        Ok(self.recorded.contains(video_id))
    }
}

fn oracle() -> Arc<FixedOracle> {
    Arc::new(FixedOracle {
        on_disk: ["recorded", "unrecorded"].into_iter().collect(),
        recorded: ["recorded", "recorded-missing"].into_iter().collect(),
    })
}

fn video(id: &str) -> Video {
    Video {
        id: id.to_string(),
        slug: id.to_string(),
        title: id.to_string(),
        duration: None,
        path: format!("/v/{}/", id),
    }
}

#[tokio::test]
async fn test_check_outcomes() {
    let (reconciler, mut requests) = Reconciler::channel(oracle(), 8);

    // Recorded: available, nothing requested
    assert!(reconciler.check(&video("recorded")));
    assert!(requests.try_recv().is_err());

    // The record wins even when the file is gone
    assert!(reconciler.check(&video("recorded-missing")));
    assert!(requests.try_recv().is_err());

    // On disk but unrecorded: available, and a rescan is requested
    assert!(reconciler.check(&video("unrecorded")));
    let request = requests.try_recv().unwrap();
    assert_eq!(request.job, VIDEOSCAN_JOB);
    assert_eq!(request.video_id, "unrecorded");

    // Neither: unavailable, nothing requested
    assert!(!reconciler.check(&video("absent")));
    assert!(requests.try_recv().is_err());

    // Oracle errors count as not present
    assert!(!reconciler.check(&video("broken")));
}

#[tokio::test]
async fn test_full_or_closed_channel_does_not_change_result() {
    let (reconciler, requests) = Reconciler::channel(oracle(), 1);

    assert!(reconciler.check(&video("unrecorded")));
    // Channel is full now
    assert!(reconciler.check(&video("unrecorded")));

    drop(requests);
    assert!(reconciler.check(&video("unrecorded")));
}

/// Dispatcher that fails every other call
#[derive(Default)]
struct FlakyDispatch {
    calls: AtomicUsize,
}

#[async_trait]
impl JobDispatch for FlakyDispatch {
    async fn enqueue(&self, _job_name: &str) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call % 2 == 1 {
            bail!("job system offline");
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_dispatcher_survives_errors() {
    let (reconciler, requests) = Reconciler::channel(oracle(), 8);
    for _ in 0..4 {
        reconciler.check(&video("unrecorded"));
    }
    drop(reconciler);

    let dispatch = Arc::new(FlakyDispatch::default());
    let delivered = dispatch_requests(requests, dispatch.clone()).await;

    assert_eq!(dispatch.calls.load(Ordering::SeqCst), 4);
    assert_eq!(delivered, 2);
}

#[tokio::test]
async fn test_requests_reach_job_queue_once() {
    let temp = TempDir::new().unwrap();
    let queue = Arc::new(JobQueue::new(temp.path().join("jobs.jsonl")));

    let (reconciler, requests) = Reconciler::channel(oracle(), 8);
    let handle = spawn_dispatcher(requests, queue.clone());

    reconciler.check(&video("unrecorded"));
    reconciler.check(&video("unrecorded"));
    drop(reconciler);

    assert_eq!(handle.await.unwrap(), 2);

    // Repeated requests collapse into one pending job
    let pending = queue.get_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name, VIDEOSCAN_JOB);
    assert_eq!(pending[0].status, JobStatus::Pending);
}
