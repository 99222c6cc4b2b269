//! Arena-backed hierarchy handed over by the tree parser.
//!
//! Nodes are stored in pre-order, so a [`NodeId`] doubles as the node's
//! stable draw identifier and every subtree occupies a contiguous index range
//! `id..id + subtree_size`. The tree is immutable per frame apart from the
//! single tree-wide selection.

use std::ops::Range;

/// Pre-order index of a node inside its [`Tree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single node with its precomputed structural metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    label: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: u32,
    subtree_size: u32,
    selected: bool,
}

impl Node {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of nodes in this node's subtree, itself included.
    pub fn subtree_size(&self) -> u32 {
        self.subtree_size
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Owned, nested description of a tree, used to build a [`Tree`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeSpec {
    pub label: String,
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }
}

/// The hierarchy being visualised.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    selected: Option<NodeId>,
    max_depth: u32,
}

impl Tree {
    /// A tree with no nodes. Layout of an empty tree is empty and it is
    /// never dispatched to the worker.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Flatten `root` into pre-order and compute depth and subtree sizes.
    pub fn from_spec(root: NodeSpec) -> Self {
        let mut nodes: Vec<Node> = Vec::new();
        // (spec, parent, depth); children pushed in reverse so they pop in order
        let mut stack = vec![(root, None::<NodeId>, 0u32)];

        while let Some((spec, parent, depth)) = stack.pop() {
            let id = NodeId::from_index(nodes.len());
            if let Some(parent) = parent {
                nodes[parent.index()].children.push(id);
            }
            nodes.push(Node {
                label: spec.label,
                parent,
                children: Vec::with_capacity(spec.children.len()),
                depth,
                subtree_size: 1,
                selected: false,
            });
            for child in spec.children.into_iter().rev() {
                stack.push((child, Some(id), depth + 1));
            }
        }

        // Parents precede children in pre-order, so a reverse sweep sees every
        // subtree complete before it is added to its parent.
        for index in (1..nodes.len()).rev() {
            let size = nodes[index].subtree_size;
            if let Some(parent) = nodes[index].parent {
                nodes[parent.index()].subtree_size += size;
            }
        }

        let max_depth = nodes.iter().map(|n| n.depth).max().unwrap_or(0);

        Self {
            nodes,
            selected: None,
            max_depth,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId::ROOT)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId::from_index(index), node))
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Size of the whole tree (the root's subtree size).
    pub fn subtree_size(&self) -> usize {
        self.nodes.first().map_or(0, |root| root.subtree_size as usize)
    }

    /// Pre-order index range covered by the subtree rooted at `id`.
    pub fn subtree_range(&self, id: NodeId) -> Range<usize> {
        let start = id.index();
        start..start + self.node(id).subtree_size as usize
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// Depth the gradient starts from: the selected node's depth, or 0.
    pub fn selected_depth(&self) -> u32 {
        self.selected.map_or(0, |id| self.node(id).depth)
    }

    /// Select `id`, deselecting the previous node. Returns the previous
    /// selection. Ids outside the tree are ignored.
    pub fn select(&mut self, id: NodeId) -> Option<NodeId> {
        if id.index() >= self.nodes.len() {
            return self.selected;
        }
        let previous = self.clear_selection();
        self.nodes[id.index()].selected = true;
        self.selected = Some(id);
        previous
    }

    pub fn clear_selection(&mut self) -> Option<NodeId> {
        let previous = self.selected.take();
        if let Some(previous) = previous {
            self.nodes[previous.index()].selected = false;
        }
        previous
    }
}

#[cfg(test)]
pub(crate) fn sample_tree() -> Tree {
    Tree::from_spec(
        NodeSpec::new("root")
            .child(
                NodeSpec::new("a")
                    .child(NodeSpec::new("a1"))
                    .child(NodeSpec::new("a2"))
                    .child(NodeSpec::new("a3")),
            )
            .child(NodeSpec::new("b").child(NodeSpec::new("b1").child(NodeSpec::new("b1x"))))
            .child(NodeSpec::new("c")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_order_ids() {
        let tree = sample_tree();
        let labels: Vec<_> = tree.iter().map(|(_, n)| n.label().to_string()).collect();
        assert_eq!(
            labels,
            ["root", "a", "a1", "a2", "a3", "b", "b1", "b1x", "c"]
        );
    }

    #[test]
    fn test_depth_invariant() {
        let tree = sample_tree();
        assert_eq!(tree.node(NodeId::ROOT).depth(), 0);
        for (id, node) in tree.iter() {
            for &child in node.children() {
                assert_eq!(tree.node(child).depth(), node.depth() + 1);
                assert_eq!(tree.node(child).parent(), Some(id));
            }
        }
        assert_eq!(tree.max_depth(), 3);
    }

    #[test]
    fn test_subtree_size_invariant() {
        let tree = sample_tree();
        for (_, node) in tree.iter() {
            let children: u32 = node
                .children()
                .iter()
                .map(|&c| tree.node(c).subtree_size())
                .sum();
            assert_eq!(node.subtree_size(), 1 + children);
        }
        assert_eq!(tree.subtree_size(), 9);
        assert_eq!(tree.subtree_range(NodeId::from_index(5)), 5..8);
    }

    #[test]
    fn test_single_selection() {
        let mut tree = sample_tree();
        assert_eq!(tree.select(NodeId::from_index(1)), None);
        assert_eq!(tree.select(NodeId::from_index(6)), Some(NodeId::from_index(1)));
        assert!(!tree.node(NodeId::from_index(1)).is_selected());
        assert!(tree.node(NodeId::from_index(6)).is_selected());
        assert_eq!(tree.iter().filter(|(_, n)| n.is_selected()).count(), 1);
        assert_eq!(tree.selected_depth(), 2);
    }

    #[test]
    fn test_select_out_of_range_is_ignored() {
        let mut tree = sample_tree();
        tree.select(NodeId::from_index(2));
        assert_eq!(tree.select(NodeId::from_index(99)), Some(NodeId::from_index(2)));
        assert_eq!(tree.selected(), Some(NodeId::from_index(2)));
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree::empty();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert_eq!(tree.subtree_size(), 0);
    }
}
