//! JSONL-based job queue.
//!
//! Append-only JSONL with state derived from replay. Each job request is an
//! `enqueued` line; state changes are appended as new lines. Requests for a
//! job name that is already pending or processing collapse into the
//! existing job. A job stuck in `processing` past the stall timeout (its
//! runner died) is reset to `pending` instead.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::adapters::JobDispatch;

/// Errors that can occur with the job queue
#[derive(Debug, Error)]
pub enum JobQueueError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid state transition: {from:?} → {to:?}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    /// Whether the job still has work ahead of it
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

/// An event in the job log (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub timestamp: DateTime<Utc>,

    pub job_id: Uuid,

    pub event_type: JobEventType,

    /// Job name for `enqueued`, error message for `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Types of job events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEventType {
    Enqueued,
    ProcessingStarted,
    Completed,
    Failed,
    ResetForRetry,
}

/// A job with current state (derived from replaying events)
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub status: JobStatus,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub retry_count: u32,
}

impl Job {
    /// Whether the job has been processing for at least `timeout`
    pub fn is_stalled(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        match (self.status, self.started_at) {
            (JobStatus::Processing, Some(started)) => now - started >= timeout,
            _ => false,
        }
    }
}

/// Result of enqueueing a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueResult {
    /// A new job was created
    Queued(Uuid),

    /// A job with the same name is already pending or processing
    AlreadyQueued(Uuid),

    /// A stalled job with the same name was reset to pending
    ResetForRetry(Uuid),
}

impl EnqueueResult {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Queued(id) | Self::AlreadyQueued(id) | Self::ResetForRetry(id) => *id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Queued(_))
    }
}

/// Queue status summary
#[derive(Debug, Clone, Default)]
pub struct QueueStatus {
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub failed: usize,
    pub recent: Vec<Job>,
}

impl QueueStatus {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.done + self.failed
    }
}

/// Processing time after which a job is presumed abandoned (seconds)
pub const DEFAULT_STALL_TIMEOUT_SECS: i64 = 600;

/// JSONL-backed job queue
pub struct JobQueue {
    queue_path: PathBuf,

    stall_timeout: Duration,

    /// Serializes replay-then-append so concurrent enqueues stay idempotent
    write_lock: Mutex<()>,
}

impl JobQueue {
    pub fn new(queue_path: PathBuf) -> Self {
        Self {
            queue_path,
            stall_timeout: Duration::seconds(DEFAULT_STALL_TIMEOUT_SECS),
            write_lock: Mutex::new(()),
        }
    }

    /// Override how long a job may stay `processing` before it is retried
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Default queue location ($TOPICPATH_HOME/jobs.jsonl)
    pub fn default_path() -> Result<PathBuf> {
        crate::config::job_queue_path()
    }

    /// Open the default queue
    pub async fn open_default() -> Result<Self> {
        let path = Self::default_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        Ok(Self::new(path))
    }

    async fn append_event(&self, event: &JobEvent) -> Result<(), JobQueueError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.queue_path)
            .await?;

        let json = serde_json::to_string(event)?;
        file.write_all(format!("{}\n", json).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Replay all events to build current state
    pub async fn replay(&self) -> Result<HashMap<Uuid, Job>, JobQueueError> {
        let mut jobs: HashMap<Uuid, Job> = HashMap::new();

        if !self.queue_path.exists() {
            return Ok(jobs);
        }

        let file = File::open(&self.queue_path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let event: JobEvent = serde_json::from_str(&line)?;
            Self::apply_event(&mut jobs, event);
        }

        Ok(jobs)
    }

    fn apply_event(jobs: &mut HashMap<Uuid, Job>, event: JobEvent) {
        match event.event_type {
            JobEventType::Enqueued => {
                let name = event
                    .data
                    .as_ref()
                    .and_then(|d| d.get("name"))
                    .and_then(|n| n.as_str());
                if let Some(name) = name {
                    jobs.insert(
                        event.job_id,
                        Job {
                            id: event.job_id,
                            name: name.to_string(),
                            status: JobStatus::Pending,
                            enqueued_at: event.timestamp,
                            started_at: None,
                            completed_at: None,
                            error: None,
                            retry_count: 0,
                        },
                    );
                }
            }
            JobEventType::ProcessingStarted => {
                if let Some(job) = jobs.get_mut(&event.job_id) {
                    job.status = JobStatus::Processing;
                    job.started_at = Some(event.timestamp);
                }
            }
            JobEventType::Completed => {
                if let Some(job) = jobs.get_mut(&event.job_id) {
                    job.status = JobStatus::Done;
                    job.completed_at = Some(event.timestamp);
                }
            }
            JobEventType::Failed => {
                if let Some(job) = jobs.get_mut(&event.job_id) {
                    job.status = JobStatus::Failed;
                    job.completed_at = Some(event.timestamp);
                    if let Some(data) = event.data {
                        if let Some(error) = data.get("error").and_then(|e| e.as_str()) {
                            job.error = Some(error.to_string());
                        }
                    }
                }
            }
            JobEventType::ResetForRetry => {
                if let Some(job) = jobs.get_mut(&event.job_id) {
                    job.status = JobStatus::Pending;
                    job.retry_count += 1;
                    job.started_at = None;
                }
            }
        }
    }

    /// Enqueue a job by name (idempotent while a same-named job is active)
    pub async fn enqueue_job(&self, name: &str) -> Result<EnqueueResult, JobQueueError> {
        let _guard = self.write_lock.lock().await;

        let jobs = self.replay().await?;
        if let Some(existing) = jobs
            .values()
            .find(|job| job.name == name && job.status.is_active())
        {
            if existing.is_stalled(Utc::now(), self.stall_timeout) {
                self.append_reset(existing).await?;
                return Ok(EnqueueResult::ResetForRetry(existing.id));
            }
            return Ok(EnqueueResult::AlreadyQueued(existing.id));
        }

        let id = Uuid::new_v4();
        let event = JobEvent {
            timestamp: Utc::now(),
            job_id: id,
            event_type: JobEventType::Enqueued,
            data: Some(serde_json::json!({ "name": name })),
        };
        self.append_event(&event).await?;

        tracing::info!(job = name, %id, "Job queued");
        Ok(EnqueueResult::Queued(id))
    }

    /// Reset every stalled `processing` job to `pending`
    ///
    /// Returns the number of jobs reset.
    pub async fn reset_stalled(&self) -> Result<usize, JobQueueError> {
        let _guard = self.write_lock.lock().await;

        let now = Utc::now();
        let jobs = self.replay().await?;
        let mut reset = 0;
        for job in jobs.values().filter(|job| job.is_stalled(now, self.stall_timeout)) {
            self.append_reset(job).await?;
            reset += 1;
        }

        Ok(reset)
    }

    async fn append_reset(&self, job: &Job) -> Result<(), JobQueueError> {
        tracing::warn!(job = %job.name, id = %job.id, started_at = ?job.started_at, "Resetting stalled job");

        self.append_event(&JobEvent {
            timestamp: Utc::now(),
            job_id: job.id,
            event_type: JobEventType::ResetForRetry,
            data: None,
        })
        .await
    }

    /// Pending jobs, oldest first
    pub async fn get_pending(&self) -> Result<Vec<Job>, JobQueueError> {
        let jobs = self.replay().await?;
        let mut pending: Vec<Job> = jobs
            .into_values()
            .filter(|job| job.status == JobStatus::Pending)
            .collect();

        pending.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at));

        Ok(pending)
    }

    pub async fn mark_processing(&self, id: Uuid) -> Result<(), JobQueueError> {
        let _guard = self.write_lock.lock().await;

        let jobs = self.replay().await?;
        let job = jobs.get(&id).ok_or(JobQueueError::NotFound(id))?;

        if job.status != JobStatus::Pending {
            return Err(JobQueueError::InvalidTransition {
                from: job.status,
                to: JobStatus::Processing,
            });
        }

        self.append_event(&JobEvent {
            timestamp: Utc::now(),
            job_id: id,
            event_type: JobEventType::ProcessingStarted,
            data: None,
        })
        .await
    }

    pub async fn mark_done(&self, id: Uuid) -> Result<(), JobQueueError> {
        let _guard = self.write_lock.lock().await;

        self.append_event(&JobEvent {
            timestamp: Utc::now(),
            job_id: id,
            event_type: JobEventType::Completed,
            data: None,
        })
        .await
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), JobQueueError> {
        let _guard = self.write_lock.lock().await;

        self.append_event(&JobEvent {
            timestamp: Utc::now(),
            job_id: id,
            event_type: JobEventType::Failed,
            data: Some(serde_json::json!({ "error": error })),
        })
        .await
    }

    /// Queue status summary
    pub async fn status(&self) -> Result<QueueStatus, JobQueueError> {
        let jobs = self.replay().await?;

        let mut status = QueueStatus::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => status.pending += 1,
                JobStatus::Processing => status.processing += 1,
                JobStatus::Done => status.done += 1,
                JobStatus::Failed => status.failed += 1,
            }
        }

        // Last 5 jobs
        let mut all_jobs: Vec<&Job> = jobs.values().collect();
        all_jobs.sort_by(|a, b| b.enqueued_at.cmp(&a.enqueued_at));
        status.recent = all_jobs.into_iter().take(5).cloned().collect();

        Ok(status)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Job>, JobQueueError> {
        let jobs = self.replay().await?;
        Ok(jobs.get(&id).cloned())
    }
}

#[async_trait]
impl JobDispatch for JobQueue {
    async fn enqueue(&self, job_name: &str) -> Result<()> {
        self.enqueue_job(job_name).await?;
        Ok(())
    }
}
