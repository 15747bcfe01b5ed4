use std::cmp::Ordering;

use crate::tree::{NodeId, Tree};

/// A boundary point: a char offset inside a text node, or a child index
/// inside an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Ordered pair of positions plus the lowest element containing both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
    pub common_ancestor: NodeId,
}

impl Range {
    pub fn new(tree: &Tree, start: Position, end: Position) -> Self {
        let common = common_ancestor(tree, &[start.node, end.node]).unwrap_or(start.node);
        let common_ancestor = if tree.is_text(common) {
            tree.parent(common).unwrap_or(common)
        } else {
            common
        };
        Self {
            start,
            end,
            common_ancestor,
        }
    }

    pub fn collapsed(tree: &Tree, position: Position) -> Self {
        Self::new(tree, position, position)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn with_start(self, tree: &Tree, start: Position) -> Self {
        Self::new(tree, start, self.end)
    }

    pub fn with_end(self, tree: &Tree, end: Position) -> Self {
        Self::new(tree, self.start, end)
    }
}

/// A position expressed relative to a node that survives the edit, so the
/// offset can be re-derived after siblings are inserted or removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Anchor {
    Before(NodeId),
    After(NodeId),
    Start(NodeId),
    End(NodeId),
}

impl Anchor {
    pub(crate) fn left_biased(tree: &Tree, position: Position) -> Self {
        match position.offset.checked_sub(1).and_then(|idx| tree.child(position.node, idx)) {
            Some(child) => Anchor::After(child),
            None => Anchor::Start(position.node),
        }
    }

    pub(crate) fn right_biased(tree: &Tree, position: Position) -> Self {
        match tree.child(position.node, position.offset) {
            Some(child) => Anchor::Before(child),
            None => Anchor::End(position.node),
        }
    }

    pub(crate) fn resolve(self, tree: &Tree) -> Position {
        match self {
            Anchor::Before(node) => left_pos(tree, node),
            Anchor::After(node) => right_pos(tree, node),
            Anchor::Start(node) => start_pos(node),
            Anchor::End(node) => end_pos(tree, node),
        }
    }
}

pub fn child_node_index(tree: &Tree, node: NodeId) -> usize {
    tree.index(node).unwrap_or(0)
}

pub fn node_size(tree: &Tree, node: NodeId) -> usize {
    tree.size(node)
}

// A parentless node yields its own start.
pub fn left_pos(tree: &Tree, node: NodeId) -> Position {
    match tree.parent(node) {
        Some(parent) => Position::new(parent, child_node_index(tree, node)),
        None => start_pos(node),
    }
}

pub fn right_pos(tree: &Tree, node: NodeId) -> Position {
    match tree.parent(node) {
        Some(parent) => Position::new(parent, child_node_index(tree, node) + 1),
        None => end_pos(tree, node),
    }
}

pub fn start_pos(node: NodeId) -> Position {
    Position::new(node, 0)
}

pub fn end_pos(tree: &Tree, node: NodeId) -> Position {
    Position::new(node, tree.size(node))
}

pub fn common_ancestor(tree: &Tree, nodes: &[NodeId]) -> Option<NodeId> {
    let (first, rest) = nodes.split_first()?;
    let mut candidates: Vec<NodeId> = tree.ancestors(*first).collect();
    for node in rest {
        candidates.retain(|candidate| tree.contains(*candidate, *node));
    }
    candidates.first().copied()
}

pub fn common_ancestor_within(tree: &Tree, nodes: &[NodeId], root: NodeId) -> NodeId {
    common_ancestor(tree, nodes)
        .filter(|node| tree.contains(root, *node))
        .unwrap_or(root)
}

pub fn first_leaf(tree: &Tree, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(child) = tree.first_child(current) {
        current = child;
    }
    current
}

pub fn last_leaf(tree: &Tree, node: NodeId) -> NodeId {
    let mut current = node;
    while let Some(child) = tree.last_child(current) {
        current = child;
    }
    current
}

pub fn previous_leaf(tree: &Tree, node: NodeId, limit: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        if current == limit {
            return None;
        }
        if let Some(sibling) = tree.previous_sibling(current) {
            return Some(last_leaf(tree, sibling));
        }
        current = tree.parent(current)?;
    }
}

pub fn next_leaf(tree: &Tree, node: NodeId, limit: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        if current == limit {
            return None;
        }
        if let Some(sibling) = tree.next_sibling(current) {
            return Some(first_leaf(tree, sibling));
        }
        current = tree.parent(current)?;
    }
}

pub fn leaf_before(tree: &Tree, position: Position, limit: NodeId) -> Option<NodeId> {
    if tree.is_element(position.node) && position.offset > 0 {
        if let Some(child) = tree.child(position.node, position.offset - 1) {
            return Some(last_leaf(tree, child));
        }
    }
    previous_leaf(tree, position.node, limit)
}

pub fn leaf_after(tree: &Tree, position: Position, limit: NodeId) -> Option<NodeId> {
    if tree.is_element(position.node) {
        if let Some(child) = tree.child(position.node, position.offset) {
            return Some(first_leaf(tree, child));
        }
    }
    next_leaf(tree, position.node, limit)
}

pub fn compare_positions(tree: &Tree, a: Position, b: Position) -> Ordering {
    if a.node == b.node {
        return a.offset.cmp(&b.offset);
    }
    if tree.contains(a.node, b.node) {
        return match child_toward(tree, a.node, b.node) {
            Some(child) if a.offset <= child_node_index(tree, child) => Ordering::Less,
            _ => Ordering::Greater,
        };
    }
    if tree.contains(b.node, a.node) {
        return compare_positions(tree, b, a).reverse();
    }
    let Some(common) = common_ancestor(tree, &[a.node, b.node]) else {
        return Ordering::Equal;
    };
    let a_branch = child_toward(tree, common, a.node).map(|child| child_node_index(tree, child));
    let b_branch = child_toward(tree, common, b.node).map(|child| child_node_index(tree, child));
    a_branch.cmp(&b_branch)
}

pub fn child_toward(tree: &Tree, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
    tree.ancestors(node)
        .find(|candidate| tree.parent(*candidate) == Some(ancestor))
}
