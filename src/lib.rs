//! topicpath - Content path resolver for an offline course library
//!
//! Maps slash-delimited URL paths onto a catalog tree of topics, videos and
//! exercises, and keeps per-topic availability counts in step with the
//! video files actually present under the content root.
//!
//! # Architecture
//!
//! - The catalog is loaded once and never mutated
//! - Derived counts live in a side table, recomputed lazily after the
//!   availability data changes
//! - Disagreement between disk and records is repaired by a background
//!   `videoscan` job, requested on a non-blocking channel
//!
//! # Modules
//!
//! - `domain`: Data structures (Node, Category, Video, Exercise, AggregateCounts)
//! - `library`: Catalog loading and the node index
//! - `core`: Resolver, AggregateCache, Reconciler, ContentService
//! - `adapters`: Availability oracle and job dispatch interfaces
//! - `ingest`: Job queue, content scanner, content watcher
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Resolve a path
//! topicpath resolve math/arithmetic/v/add-sub
//!
//! # Show availability counts for a topic
//! topicpath counts math/arithmetic
//!
//! # Run queued rescans
//! topicpath jobs --run
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;
pub mod library;

// Re-export main types at crate root for convenience
pub use core::{AggregateCache, ContentService, Page, Reconciler, ResolveError, Resolved, Resolver};
pub use domain::{AggregateCounts, Category, Exercise, Node, NodeKind, Video};
pub use library::{Catalog, CatalogError, NodeIndex};

// Availability and background jobs
pub use adapters::{AvailabilityOracle, DiskAvailability, JobDispatch};
pub use ingest::{ContentScanner, ContentWatcher, JobQueue, WatcherConfig};
