//! Core resolution logic.
//!
//! This module contains:
//! - Resolver: Sentinel-driven path walk over the catalog
//! - AggregateCache: Lazily recomputed per-category counts
//! - Reconciler: Availability checks and rescan requests
//! - ContentService: Page views over resolved content

pub mod aggregate;
pub mod reconcile;
pub mod resolver;
pub mod service;

// Re-export commonly used types
pub use aggregate::{AggregateCache, Snapshot};
pub use reconcile::{dispatch_requests, spawn_dispatcher, ReconcileRequest, Reconciler, VIDEOSCAN_JOB};
pub use resolver::{ResolveError, Resolved, Resolver};
pub use service::{ContentService, Page, TopicCounts, TopicSummary};
