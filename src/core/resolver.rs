//! Content path resolution.
//!
//! A path is walked one segment at a time from the catalog root. Slug
//! segments match children of the current kind-mode; the sentinel segments
//! `v` and `e` switch the mode to videos or exercises without consuming a
//! node. Matching is filter-then-scan, so a topic and a video may share a
//! slug under one parent and sibling navigation never crosses kinds.

use thiserror::Error;
use tracing::debug;

use crate::domain::{Category, Exercise, Node, NodeKind, NodeRef, Video};
use crate::library::Catalog;

/// Resolution failure
///
/// Wrong slugs and malformed path shapes both map to `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("No content at path: /{path}")]
    NotFound { path: String },
}

/// Terminal node of a successful walk
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Category(&'a Category),

    Video {
        video: &'a Video,

        /// Previous video under the same parent
        previous: Option<&'a Video>,

        /// Next video under the same parent
        next: Option<&'a Video>,
    },

    Exercise(&'a Exercise),
}

impl<'a> Resolved<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Resolved::Category(_) => NodeKind::Category,
            Resolved::Video { .. } => NodeKind::Video,
            Resolved::Exercise(_) => NodeKind::Exercise,
        }
    }

    pub fn path(&self) -> &'a str {
        match *self {
            Resolved::Category(c) => &c.path,
            Resolved::Video { video, .. } => &video.path,
            Resolved::Exercise(e) => &e.path,
        }
    }
}

/// Same-kind neighbours of the node matched at one level
#[derive(Debug, Clone, Copy, Default)]
struct Siblings<'a> {
    previous: Option<&'a Node>,
    next: Option<&'a Node>,
}

/// Walk state, replaced wholesale at every step
#[derive(Debug, Clone, Copy)]
struct WalkState<'a> {
    mode: NodeKind,
    current: NodeRef<'a>,

    /// Neighbours from the level that produced `current` only
    siblings: Siblings<'a>,
}

impl<'a> WalkState<'a> {
    fn start(root: &'a Category) -> Self {
        Self {
            mode: NodeKind::Category,
            current: NodeRef::Category(root),
            siblings: Siblings::default(),
        }
    }

    fn with_mode(self, mode: NodeKind) -> Self {
        Self { mode, ..self }
    }

    /// Match `slug` among the current node's children of the current mode
    fn descend(self, slug: &str) -> Option<Self> {
        let category = self.current.as_category()?;
        let (matched, siblings) = scan(category.children_of_kind(self.mode), slug)?;

        Some(Self {
            mode: self.mode,
            current: NodeRef::from(matched),
            siblings,
        })
    }
}

/// Find the first candidate with `slug`, noting its neighbours
fn scan<'a>(
    candidates: impl Iterator<Item = &'a Node>,
    slug: &str,
) -> Option<(&'a Node, Siblings<'a>)> {
    let mut previous = None;
    let mut matched = None;

    for candidate in candidates {
        if let Some(found) = matched {
            return Some((
                found,
                Siblings {
                    previous,
                    next: Some(candidate),
                },
            ));
        }
        if candidate.slug() == slug {
            matched = Some(candidate);
        } else {
            previous = Some(candidate);
        }
    }

    matched.map(|found| (found, Siblings { previous, next: None }))
}

/// Resolves slash-delimited content paths against a catalog
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Resolve pre-split path segments
    pub fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Result<Resolved<'a>, ResolveError> {
        let not_found = || ResolveError::NotFound {
            path: segments
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join("/"),
        };

        let mut state = WalkState::start(self.catalog.root());

        for segment in segments {
            let segment = segment.as_ref();
            state = match NodeKind::from_sentinel(segment) {
                Some(mode) => state.with_mode(mode),
                None => match state.descend(segment) {
                    Some(next) => next,
                    None => {
                        debug!(segment, mode = %state.mode, at = state.current.path(), "No matching child");
                        return Err(not_found());
                    }
                },
            };
        }

        // A trailing sentinel leaves the mode ahead of the node reached
        if state.current.kind() != state.mode {
            debug!(mode = %state.mode, at = state.current.path(), "Path ended before reaching requested kind");
            return Err(not_found());
        }

        Ok(match state.current {
            NodeRef::Category(category) => Resolved::Category(category),
            NodeRef::Video(video) => Resolved::Video {
                video,
                previous: state.siblings.previous.and_then(Node::as_video),
                next: state.siblings.next.and_then(Node::as_video),
            },
            NodeRef::Exercise(exercise) => Resolved::Exercise(exercise),
        })
    }

    /// Split a request path on `/` and resolve it
    pub fn resolve_path(&self, path: &str) -> Result<Resolved<'a>, ResolveError> {
        self.resolve(&crate::domain::split_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_json_str(
            r#"{"kind": "Topic", "id": "root", "title": "Root", "children": [
                {"kind": "Topic", "id": "a", "title": "A", "children": [
                    {"kind": "Video", "id": "a1", "title": "A1"},
                    {"kind": "Video", "id": "a2", "title": "A2"}
                ]},
                {"kind": "Topic", "id": "b", "title": "B", "children": [
                    {"kind": "Video", "id": "b1", "title": "B1"}
                ]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_path_is_root() {
        let catalog = catalog();
        let resolved = Resolver::new(&catalog).resolve::<&str>(&[]).unwrap();
        assert!(matches!(resolved, Resolved::Category(c) if c.id == "root"));
    }

    #[test]
    fn test_siblings_only_from_final_level() {
        // "a" has a next sibling ("b") at the topic level; that must not leak
        // into the video's navigation.
        let catalog = catalog();
        let resolved = Resolver::new(&catalog).resolve(&["a", "v", "a2"]).unwrap();

        match resolved {
            Resolved::Video { video, previous, next } => {
                assert_eq!(video.id, "a2");
                assert_eq!(previous.map(|v| v.id.as_str()), Some("a1"));
                assert!(next.is_none());
            }
            other => panic!("expected video, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_sentinel_without_slug_is_not_found() {
        let catalog = catalog();
        let resolver = Resolver::new(&catalog);

        assert!(matches!(resolver.resolve(&["a", "v"]), Err(ResolveError::NotFound { .. })));
        assert!(matches!(resolver.resolve(&["e"]), Err(ResolveError::NotFound { .. })));
    }

    #[test]
    fn test_repeated_sentinel_resets_mode() {
        let catalog = catalog();
        let resolved = Resolver::new(&catalog).resolve(&["a", "e", "v", "a1"]).unwrap();
        assert_eq!(resolved.kind(), NodeKind::Video);
    }

    #[test]
    fn test_not_found_reports_path() {
        let catalog = catalog();
        let err = Resolver::new(&catalog).resolve(&["a", "v", "zzz"]).unwrap_err();
        assert_eq!(err.to_string(), "No content at path: /a/v/zzz");
    }
}
