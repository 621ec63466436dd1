//! Aggregate availability counts for a category subtree.

use std::ops::{Add, AddAssign};

use serde::Serialize;

/// Video counts over a category subtree
///
/// `known >= local` always holds: `local` only counts videos that are also
/// counted in `known`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateCounts {
    /// Videos whose persisted record says they are available
    pub local: u64,

    /// All videos known to the catalog
    pub known: u64,
}

impl AggregateCounts {
    pub fn new(local: u64, known: u64) -> Self {
        debug_assert!(known >= local);
        Self { local, known }
    }

    /// Counts for a single video
    pub fn video(available: bool) -> Self {
        Self {
            local: u64::from(available),
            known: 1,
        }
    }

    /// Whether every known video is available locally
    pub fn is_complete(&self) -> bool {
        self.local == self.known
    }
}

impl Add for AggregateCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            local: self.local + rhs.local,
            known: self.known + rhs.known,
        }
    }
}

impl AddAssign for AggregateCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::fmt::Display for AggregateCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.local, self.known)
    }
}
