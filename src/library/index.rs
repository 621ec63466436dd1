//! Flat node index keyed by kind and id.
//!
//! Built in one pass after the catalog tree is assembled. Entries are child
//! index paths from the root rather than references, so the index can live
//! next to the tree it points into.

use std::collections::HashMap;

use crate::domain::{Category, Node, NodeKind, NodeRef};

/// Location of a node as a sequence of child indices from the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress(Vec<usize>);

impl NodeAddress {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(index);
        Self(steps)
    }

    pub fn steps(&self) -> &[usize] {
        &self.0
    }

    /// Follow this address down from `root`
    ///
    /// Costs one step per level; catalogs are shallow.
    pub fn locate<'a>(&self, root: &'a Category) -> Option<NodeRef<'a>> {
        self.0.iter().try_fold(NodeRef::Category(root), |node, &index| {
            node.as_category()
                .and_then(|c| c.children.get(index))
                .map(NodeRef::from)
        })
    }
}

/// Kind-partitioned map from node id to its address
#[derive(Debug, Default)]
pub struct NodeIndex {
    entries: HashMap<NodeKind, HashMap<String, NodeAddress>>,
}

impl NodeIndex {
    /// Index every node below (and including) `root`
    ///
    /// When the same id appears more than once for a kind (a video listed
    /// under two topics), the first occurrence in tree order wins.
    pub fn build(root: &Category) -> Self {
        let mut index = Self::default();
        index.insert(NodeKind::Category, &root.id, NodeAddress::root());
        index.visit(root, &NodeAddress::root());
        index
    }

    fn visit(&mut self, category: &Category, address: &NodeAddress) {
        for (i, child) in category.children.iter().enumerate() {
            let child_address = address.child(i);
            self.insert(child.kind(), child.id(), child_address.clone());

            if let Node::Category(sub) = child {
                self.visit(sub, &child_address);
            }
        }
    }

    fn insert(&mut self, kind: NodeKind, id: &str, address: NodeAddress) {
        let by_id = self.entries.entry(kind).or_default();
        if by_id.contains_key(id) {
            tracing::debug!(%kind, id, "Duplicate node id, keeping first occurrence");
            return;
        }
        by_id.insert(id.to_string(), address);
    }

    /// Address of the node with this kind and id
    pub fn get(&self, kind: NodeKind, id: &str) -> Option<&NodeAddress> {
        self.entries.get(&kind).and_then(|by_id| by_id.get(id))
    }

    /// Number of indexed nodes of a kind
    pub fn count(&self, kind: NodeKind) -> usize {
        self.entries.get(&kind).map(HashMap::len).unwrap_or(0)
    }

}
