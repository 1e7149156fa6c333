#![forbid(unsafe_code)]

//! Node sets for canonicalization and signature transforms.
//!
//! A `NodeSet` is the set of document nodes a reference currently selects.
//! Transforms narrow it (the enveloped-signature transform subtracts a
//! signature subtree) and the canonicalizer renders only the nodes in it,
//! so the document itself is never mutated while a digest is computed.

use std::collections::HashSet;

use uppsala::{Document, NodeId, NodeKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    /// An empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node of the document, comments included.
    pub fn all(doc: &Document<'_>) -> Self {
        Self::tree_with_comments(doc.root(), doc)
    }

    /// Every node of the document except comments (`URI=""`).
    pub fn all_without_comments(doc: &Document<'_>) -> Self {
        Self::tree_without_comments(doc.root(), doc)
    }

    /// `root_id` and all its descendants.
    pub fn tree_with_comments(root_id: NodeId, doc: &Document<'_>) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(root_id, doc, &mut nodes, true);
        Self { nodes }
    }

    /// `root_id` and all its descendants, minus comment nodes.
    pub fn tree_without_comments(root_id: NodeId, doc: &Document<'_>) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(root_id, doc, &mut nodes, false);
        Self { nodes }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn insert(&mut self, id: NodeId) {
        self.nodes.insert(id);
    }

    pub fn remove(&mut self, id: NodeId) {
        self.nodes.remove(&id);
    }

    /// Remove `root_id` and everything below it.
    pub fn remove_subtree(&mut self, doc: &Document<'_>, root_id: NodeId) {
        self.nodes.remove(&root_id);
        for id in doc.descendants(root_id) {
            self.nodes.remove(&id);
        }
    }

    /// Nodes in `self` but not in `other`.
    pub fn subtract(&self, other: &NodeSet) -> NodeSet {
        Self {
            nodes: self.nodes.difference(&other.nodes).copied().collect(),
        }
    }

    pub fn union(&self, other: &NodeSet) -> NodeSet {
        Self {
            nodes: self.nodes.union(&other.nodes).copied().collect(),
        }
    }

    pub fn intersection(&self, other: &NodeSet) -> NodeSet {
        Self {
            nodes: self.nodes.intersection(&other.nodes).copied().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }
}

fn collect_subtree(root_id: NodeId, doc: &Document<'_>, nodes: &mut HashSet<NodeId>, with_comments: bool) {
    let keep = |id: &NodeId| with_comments || !matches!(doc.node_kind(*id), Some(NodeKind::Comment(_)));
    nodes.extend(
        std::iter::once(root_id)
            .chain(doc.descendants(root_id))
            .filter(keep),
    );
}
