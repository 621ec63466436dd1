//! Domain types for the content catalog.
//!
//! This module contains the core data structures:
//! - Node: Category / Video / Exercise tree nodes
//! - AggregateCounts: per-category availability totals

pub mod counts;
pub mod node;

// Re-export commonly used types
pub use counts::AggregateCounts;
pub use node::{
    split_path, Category, Exercise, Node, NodeKind, NodeRef, Video, EXERCISE_SENTINEL, VIDEO_SENTINEL,
};
