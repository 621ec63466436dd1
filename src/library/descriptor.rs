//! On-disk catalog descriptor.
//!
//! The descriptor is the `topics.json` document exported by the content
//! pipeline: a tree of records tagged by `kind`. It is only used at load
//! time; [`super::Catalog`] converts it into immutable [`Node`]s.

use std::collections::HashSet;

use serde::Deserialize;

use crate::domain::{Category, Exercise, Node, NodeKind, Video};

use super::catalog::CatalogError;

/// A record in the descriptor tree
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeEntry {
    #[serde(rename = "Topic", alias = "Category")]
    Topic(TopicEntry),

    #[serde(rename = "Video", alias = "Item")]
    Video(VideoEntry),

    #[serde(rename = "Exercise")]
    Exercise(ExerciseEntry),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicEntry {
    pub id: String,

    /// URL slug (defaults to `id`)
    #[serde(default)]
    pub slug: Option<String>,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub hide: bool,

    #[serde(default)]
    pub children: Vec<NodeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoEntry {
    #[serde(alias = "youtube_id")]
    pub id: String,

    #[serde(default, alias = "readable_id")]
    pub slug: Option<String>,

    pub title: String,

    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseEntry {
    #[serde(alias = "name")]
    pub id: String,

    #[serde(default)]
    pub slug: Option<String>,

    pub title: String,

    #[serde(default, alias = "related_video_readable_ids")]
    pub related_video_ids: Vec<String>,
}

impl NodeEntry {
    fn kind(&self) -> NodeKind {
        match self {
            NodeEntry::Topic(_) => NodeKind::Category,
            NodeEntry::Video(_) => NodeKind::Video,
            NodeEntry::Exercise(_) => NodeKind::Exercise,
        }
    }

    fn slug(&self) -> &str {
        match self {
            NodeEntry::Topic(t) => t.slug.as_deref().unwrap_or(&t.id),
            NodeEntry::Video(v) => v.slug.as_deref().unwrap_or(&v.id),
            NodeEntry::Exercise(e) => e.slug.as_deref().unwrap_or(&e.id),
        }
    }
}

/// Convert the descriptor root into the catalog root category
pub(crate) fn build_root(entry: NodeEntry) -> Result<Category, CatalogError> {
    match entry {
        NodeEntry::Topic(topic) => build_topic(topic, "/".to_string()),
        other => Err(CatalogError::RootNotCategory(other.kind())),
    }
}

fn build_topic(topic: TopicEntry, path: String) -> Result<Category, CatalogError> {
    let mut seen: HashSet<(NodeKind, String)> = HashSet::new();
    let mut children = Vec::with_capacity(topic.children.len());

    for child in topic.children {
        let kind = child.kind();
        let slug = child.slug().to_string();
        validate_slug(&path, &slug)?;

        if !seen.insert((kind, slug.clone())) {
            return Err(CatalogError::DuplicateSlug {
                parent: path,
                kind,
                slug,
            });
        }

        let child_path = match kind.sentinel() {
            Some(sentinel) => format!("{}{}/{}/", path, sentinel, slug),
            None => format!("{}{}/", path, slug),
        };

        let node = match child {
            NodeEntry::Topic(t) => Node::Category(build_topic(t, child_path)?),
            NodeEntry::Video(v) => Node::Video(Video {
                id: v.id,
                slug,
                title: v.title,
                duration: v.duration,
                path: child_path,
            }),
            NodeEntry::Exercise(e) => Node::Exercise(Exercise {
                id: e.id,
                slug,
                title: e.title,
                related_video_ids: e.related_video_ids,
                path: child_path,
            }),
        };
        children.push(node);
    }

    Ok(Category {
        slug: topic.slug.unwrap_or_else(|| topic.id.clone()),
        id: topic.id,
        title: topic.title,
        description: topic.description,
        hide: topic.hide,
        path,
        children,
    })
}

fn validate_slug(parent: &str, slug: &str) -> Result<(), CatalogError> {
    let reason = if slug.is_empty() {
        "slug is empty"
    } else if slug.contains('/') {
        "slug contains '/'"
    } else if NodeKind::from_sentinel(slug).is_some() {
        "slug is a reserved path token"
    } else {
        return Ok(());
    };

    Err(CatalogError::InvalidSlug {
        parent: parent.to_string(),
        slug: slug.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_legacy_field_names() {
        let json = r#"{
            "kind": "Topic", "id": "root", "title": "Khan Academy",
            "children": [
                {"kind": "Video", "youtube_id": "abc123", "readable_id": "add-sub", "title": "Adding"},
                {"kind": "Exercise", "name": "addition_1", "title": "Addition 1",
                 "related_video_readable_ids": ["abc123"]}
            ]
        }"#;

        let entry: NodeEntry = serde_json::from_str(json).unwrap();
        let root = build_root(entry).unwrap();

        assert_eq!(root.path, "/");
        let video = root.videos().next().unwrap();
        assert_eq!(video.id, "abc123");
        assert_eq!(video.slug, "add-sub");
        assert_eq!(video.path, "/v/add-sub/");

        let exercise = root.exercises().next().unwrap();
        assert_eq!(exercise.slug, "addition_1");
        assert_eq!(exercise.related_video_ids, vec!["abc123".to_string()]);
    }

    #[test]
    fn test_slug_defaults_to_id() {
        let json = r#"{"kind": "Category", "id": "root", "title": "Root", "children": [
            {"kind": "Category", "id": "math", "title": "Math"}
        ]}"#;

        let root = build_root(serde_json::from_str(json).unwrap()).unwrap();
        let math = root.subcategories().next().unwrap();
        assert_eq!(math.slug, "math");
        assert_eq!(math.path, "/math/");
        assert!(!math.hide);
    }

    #[test]
    fn test_same_slug_different_kind_allowed() {
        let json = r#"{"kind": "Topic", "id": "root", "title": "Root", "children": [
            {"kind": "Topic", "id": "fractions", "title": "Fractions"},
            {"kind": "Video", "id": "vid1", "slug": "fractions", "title": "Fractions video"}
        ]}"#;

        assert!(build_root(serde_json::from_str(json).unwrap()).is_ok());
    }

    #[test]
    fn test_duplicate_slug_same_kind_rejected() {
        let json = r#"{"kind": "Topic", "id": "root", "title": "Root", "children": [
            {"kind": "Video", "id": "vid1", "slug": "intro", "title": "One"},
            {"kind": "Video", "id": "vid2", "slug": "intro", "title": "Two"}
        ]}"#;

        let result = build_root(serde_json::from_str(json).unwrap());
        assert!(matches!(
            result,
            Err(CatalogError::DuplicateSlug { kind: NodeKind::Video, .. })
        ));
    }

    #[test]
    fn test_sentinel_slug_rejected() {
        let json = r#"{"kind": "Topic", "id": "root", "title": "Root", "children": [
            {"kind": "Topic", "id": "v", "title": "Bad"}
        ]}"#;

        let result = build_root(serde_json::from_str(json).unwrap());
        assert!(matches!(result, Err(CatalogError::InvalidSlug { .. })));
    }

    #[test]
    fn test_root_must_be_category() {
        let json = r#"{"kind": "Video", "id": "vid1", "title": "Lonely"}"#;
        let result = build_root(serde_json::from_str(json).unwrap());
        assert!(matches!(result, Err(CatalogError::RootNotCategory(NodeKind::Video))));
    }
}
