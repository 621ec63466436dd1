//! The in-memory content catalog.
//!
//! Loaded once from the JSON descriptor, then shared read-only (usually
//! behind an `Arc`) by every resolver and view.

use std::path::Path;

use thiserror::Error;
use tokio::fs;

use crate::domain::{Category, Exercise, Node, NodeKind, NodeRef, Video};

use super::descriptor::{build_root, NodeEntry};
use super::index::{NodeAddress, NodeIndex};

/// Errors raised while loading a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog root must be a topic, found {0}")]
    RootNotCategory(NodeKind),

    #[error("Duplicate {kind} slug '{slug}' under {parent}")]
    DuplicateSlug {
        parent: String,
        kind: NodeKind,
        slug: String,
    },

    #[error("Invalid slug '{slug}' under {parent}: {reason}")]
    InvalidSlug {
        parent: String,
        slug: String,
        reason: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog descriptor: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Immutable content tree plus its node index
#[derive(Debug)]
pub struct Catalog {
    root: Category,
    index: NodeIndex,
}

impl Catalog {
    /// Build a catalog from a parsed descriptor
    pub fn from_descriptor(entry: NodeEntry) -> Result<Self, CatalogError> {
        let root = build_root(entry)?;
        let index = NodeIndex::build(&root);

        Ok(Self { root, index })
    }

    /// Parse and build a catalog from descriptor JSON
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let entry: NodeEntry = serde_json::from_str(json)?;
        Self::from_descriptor(entry)
    }

    /// Load a catalog descriptor from disk
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).await?;
        let catalog = Self::from_json_str(&content)?;

        tracing::info!(
            path = %path.display(),
            categories = catalog.index.count(NodeKind::Category),
            videos = catalog.index.count(NodeKind::Video),
            exercises = catalog.index.count(NodeKind::Exercise),
            "Loaded catalog"
        );

        Ok(catalog)
    }

    /// The synthetic root category
    pub fn root(&self) -> &Category {
        &self.root
    }

    /// Look up a node by kind and id
    pub fn lookup(&self, kind: NodeKind, id: &str) -> Option<NodeRef<'_>> {
        self.index.get(kind, id).and_then(|addr| self.node_at(addr))
    }

    pub fn node_at(&self, address: &NodeAddress) -> Option<NodeRef<'_>> {
        address.locate(&self.root)
    }

    pub fn video(&self, id: &str) -> Option<&Video> {
        self.lookup(NodeKind::Video, id).and_then(|node| node.as_video())
    }

    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.lookup(NodeKind::Exercise, id).and_then(|node| node.as_exercise())
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.lookup(NodeKind::Category, id).and_then(|node| node.as_category())
    }

    /// Videos related to an exercise, in declared order
    ///
    /// Ids that do not resolve to a video are skipped.
    pub fn related_videos(&self, exercise: &Exercise) -> Vec<&Video> {
        exercise
            .related_video_ids
            .iter()
            .filter_map(|id| {
                let video = self.video(id);
                if video.is_none() {
                    tracing::debug!(exercise = %exercise.id, video = %id, "Skipping unknown related video");
                }
                video
            })
            .collect()
    }

    /// All exercises in the catalog, in tree order
    pub fn exercises(&self) -> Vec<&Exercise> {
        let mut out = Vec::new();
        collect_exercises(self.root(), &mut out);
        out
    }
}

fn collect_exercises<'a>(category: &'a Category, out: &mut Vec<&'a Exercise>) {
    for child in &category.children {
        match child {
            Node::Category(sub) => collect_exercises(sub, out),
            Node::Exercise(exercise) => out.push(exercise),
            Node::Video(_) => {}
        }
    }
}
