//! Catalog node types.
//!
//! The catalog is a strict forest of [`Node`]s rooted at one synthetic
//! [`Category`]. Nodes are built once by the loader and never mutated.

use serde::Serialize;

/// Path segment that switches the resolver to matching videos
pub const VIDEO_SENTINEL: &str = "v";

/// Path segment that switches the resolver to matching exercises
pub const EXERCISE_SENTINEL: &str = "e";

/// Kind of a catalog node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Grouping node (a "topic")
    Category,

    /// Leaf video
    Video,

    /// Leaf practice exercise
    Exercise,
}

impl NodeKind {
    /// Map a path segment to the mode it switches to, if it is a sentinel
    pub fn from_sentinel(segment: &str) -> Option<Self> {
        match segment {
            VIDEO_SENTINEL => Some(NodeKind::Video),
            EXERCISE_SENTINEL => Some(NodeKind::Exercise),
            _ => None,
        }
    }

    /// The sentinel segment that precedes slugs of this kind in a path
    pub fn sentinel(&self) -> Option<&'static str> {
        match self {
            NodeKind::Category => None,
            NodeKind::Video => Some(VIDEO_SENTINEL),
            NodeKind::Exercise => Some(EXERCISE_SENTINEL),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Category => write!(f, "category"),
            NodeKind::Video => write!(f, "video"),
            NodeKind::Exercise => write!(f, "exercise"),
        }
    }
}

/// A node in the content catalog
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Category(Category),
    Video(Video),
    Exercise(Exercise),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Category(_) => NodeKind::Category,
            Node::Video(_) => NodeKind::Video,
            Node::Exercise(_) => NodeKind::Exercise,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Node::Category(c) => &c.id,
            Node::Video(v) => &v.id,
            Node::Exercise(e) => &e.id,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Node::Category(c) => &c.slug,
            Node::Video(v) => &v.slug,
            Node::Exercise(e) => &e.slug,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Node::Category(c) => &c.title,
            Node::Video(v) => &v.title,
            Node::Exercise(e) => &e.title,
        }
    }

    /// Canonical slash-delimited path of this node
    pub fn path(&self) -> &str {
        match self {
            Node::Category(c) => &c.path,
            Node::Video(v) => &v.path,
            Node::Exercise(e) => &e.path,
        }
    }

    pub fn as_category(&self) -> Option<&Category> {
        match self {
            Node::Category(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_video(&self) -> Option<&Video> {
        match self {
            Node::Video(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_exercise(&self) -> Option<&Exercise> {
        match self {
            Node::Exercise(e) => Some(e),
            _ => None,
        }
    }
}

/// Borrowed view of a node, whether it sits in a child list or is the root
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Category(&'a Category),
    Video(&'a Video),
    Exercise(&'a Exercise),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Category(_) => NodeKind::Category,
            NodeRef::Video(_) => NodeKind::Video,
            NodeRef::Exercise(_) => NodeKind::Exercise,
        }
    }

    pub fn id(&self) -> &'a str {
        match *self {
            NodeRef::Category(c) => &c.id,
            NodeRef::Video(v) => &v.id,
            NodeRef::Exercise(e) => &e.id,
        }
    }

    pub fn path(&self) -> &'a str {
        match *self {
            NodeRef::Category(c) => &c.path,
            NodeRef::Video(v) => &v.path,
            NodeRef::Exercise(e) => &e.path,
        }
    }

    pub fn as_category(&self) -> Option<&'a Category> {
        match *self {
            NodeRef::Category(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_video(&self) -> Option<&'a Video> {
        match *self {
            NodeRef::Video(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_exercise(&self) -> Option<&'a Exercise> {
        match *self {
            NodeRef::Exercise(e) => Some(e),
            _ => None,
        }
    }
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::Category(c) => NodeRef::Category(c),
            Node::Video(v) => NodeRef::Video(v),
            Node::Exercise(e) => NodeRef::Exercise(e),
        }
    }
}

/// Non-leaf grouping node
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,

    /// Hidden categories are resolvable but not listed
    pub hide: bool,

    pub path: String,

    /// Children in navigation order
    pub children: Vec<Node>,
}

impl Category {
    /// Child videos, in navigation order
    pub fn videos(&self) -> impl Iterator<Item = &Video> {
        self.children.iter().filter_map(Node::as_video)
    }

    /// Child exercises, in navigation order
    pub fn exercises(&self) -> impl Iterator<Item = &Exercise> {
        self.children.iter().filter_map(Node::as_exercise)
    }

    /// Child categories, in navigation order
    pub fn subcategories(&self) -> impl Iterator<Item = &Category> {
        self.children.iter().filter_map(Node::as_category)
    }

    /// Child categories that are not hidden
    pub fn live_subcategories(&self) -> impl Iterator<Item = &Category> {
        self.subcategories().filter(|c| !c.hide)
    }

    /// Children of the given kind, in navigation order
    pub fn children_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |n| n.kind() == kind)
    }
}

/// Leaf video node
#[derive(Debug, Clone, Serialize)]
pub struct Video {
    /// Stable content id; also names the file under the content root
    pub id: String,
    pub slug: String,
    pub title: String,

    /// Duration in seconds
    pub duration: Option<u64>,

    pub path: String,
}

/// Leaf exercise node
#[derive(Debug, Clone, Serialize)]
pub struct Exercise {
    pub id: String,
    pub slug: String,
    pub title: String,

    /// Ids of videos that teach this exercise
    pub related_video_ids: Vec<String>,

    pub path: String,
}

/// Split a request path into resolver segments, dropping empty segments
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
