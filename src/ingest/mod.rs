//! Content ingestion: background jobs, scanning, and watching.
//!
//! ```text
//! content root → Watcher ─┐
//!                         ├→ Scanner → availability records
//! Reconciler → JobQueue ──┘              ↓
//!                                 counts marked stale
//! ```

pub mod queue;
pub mod scanner;
pub mod watcher;

// Re-export key types
pub use queue::{EnqueueResult, Job, JobQueue, JobQueueError, JobStatus, QueueStatus};
pub use scanner::{run_pending_jobs, ContentScanner, JobRunSummary, ScanError, ScanReport};
pub use watcher::{ContentWatcher, WatchHandle, WatcherConfig, WatcherError};
