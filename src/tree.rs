use std::fmt;

/// Handle to a node stored in a [`Tree`].
///
/// Ids stay valid for the whole lifetime of the tree, including after the
/// node has been detached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Text(String),
    Element(Element),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Clone, Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
enum Mutation {
    Inserted {
        parent: NodeId,
        index: usize,
        child: NodeId,
    },
    Removed {
        parent: NodeId,
        index: usize,
        child: NodeId,
    },
    TextChanged {
        node: NodeId,
        previous: String,
    },
    AttributeChanged {
        node: NodeId,
        name: String,
        previous: Option<String>,
    },
}

/// Journal position returned by [`Tree::checkpoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

/// Mutable arena of text and element nodes.
///
/// Every mutation of a connected structure is journaled so it can be rolled
/// back with [`Tree::revert_to`].
#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    journal: Vec<Mutation>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }))
    }

    pub fn create_element_with(&mut self, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let attributes = attributes
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
            .collect();
        self.push_node(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attributes,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Text(text.into()))
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element(_))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(text.as_str()),
            NodeData::Element(_) => None,
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id).data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .map(|classes| classes.split_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.node(id).children.get(index).copied()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.node(id).children.is_empty()
    }

    /// Index of `id` among its parent's children.
    pub fn index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index(id)?;
        self.child(parent, index + 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index(id)?;
        index.checked_sub(1).and_then(|prev| self.child(parent, prev))
    }

    /// Char count for text nodes, child count for elements.
    pub fn size(&self, id: NodeId) -> usize {
        match &self.node(id).data {
            NodeData::Text(text) => text.chars().count(),
            NodeData::Element(_) => self.node(id).children.len(),
        }
    }

    /// Inclusive ancestor test.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|candidate| candidate == ancestor)
    }

    /// `id` followed by its parent chain.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(id),
        }
    }

    /// Pre-order descendants, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        result
    }

    /// Post-order descendants, including `id` as the last entry.
    pub fn descendants_post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_post_order(id, &mut result);
        result
    }

    fn collect_post_order(&self, id: NodeId, result: &mut Vec<NodeId>) {
        for child in self.children(id) {
            self.collect_post_order(*child, result);
        }
        result.push(id);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let mut index = index;
        if let Some((old_parent, old_index)) = self.detach(child) {
            if old_parent == parent && old_index < index {
                index -= 1;
            }
        }
        let index = self.raw_insert(parent, index, child);
        self.journal.push(Mutation::Inserted {
            parent,
            index,
            child,
        });
    }

    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        if let Some(parent) = self.parent(reference) {
            if let Some(index) = self.index(reference) {
                self.insert_child(parent, index, node);
            }
        }
    }

    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        if let Some(parent) = self.parent(reference) {
            if let Some(index) = self.index(reference) {
                self.insert_child(parent, index + 1, node);
            }
        }
    }

    /// Removes `id` from its parent. Returns the former parent and index.
    pub fn detach(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let (parent, index) = self.raw_remove(id)?;
        self.journal.push(Mutation::Removed {
            parent,
            index,
            child: id,
        });
        Some((parent, index))
    }

    /// Moves the children of `id` into its position and detaches `id`.
    pub fn unwrap_node(&mut self, id: NodeId) {
        if self.parent(id).is_none() {
            return;
        }
        for child in self.children(id).to_vec() {
            self.insert_before(id, child);
        }
        self.detach(id);
    }

    /// Splits a text node at a char offset. The tail becomes a new sibling
    /// inserted right after `id`, which keeps the head.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?.to_string();
        self.parent(id)?;
        let byte_idx = char_to_byte_idx(&text, offset);
        let (head, tail) = text.split_at(byte_idx);
        let tail_node = self.create_text(tail);
        self.set_text(id, head);
        self.insert_after(id, tail_node);
        Some(tail_node)
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        let text = text.into();
        if let NodeData::Text(current) = &mut self.node_mut(id).data {
            if *current == text {
                return;
            }
            let previous = std::mem::replace(current, text);
            self.journal.push(Mutation::TextChanged { node: id, previous });
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let previous = self.raw_set_attribute(id, name, Some(value.to_string()));
        if previous.as_deref() != Some(value) {
            self.journal.push(Mutation::AttributeChanged {
                node: id,
                name: name.to_string(),
                previous,
            });
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        let previous = self.raw_set_attribute(id, name, None);
        if previous.is_some() {
            self.journal.push(Mutation::AttributeChanged {
                node: id,
                name: name.to_string(),
                previous,
            });
        }
    }

    /// Number of journaled mutations so far.
    pub fn revision(&self) -> usize {
        self.journal.len()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    /// Undoes every mutation recorded after `checkpoint`.
    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some(mutation) = self.journal.pop() else {
                break;
            };
            match mutation {
                Mutation::Inserted { child, .. } => {
                    self.raw_remove(child);
                }
                Mutation::Removed {
                    parent,
                    index,
                    child,
                } => {
                    self.raw_insert(parent, index, child);
                }
                Mutation::TextChanged { node, previous } => {
                    if let NodeData::Text(current) = &mut self.node_mut(node).data {
                        *current = previous;
                    }
                }
                Mutation::AttributeChanged {
                    node,
                    name,
                    previous,
                } => {
                    self.raw_set_attribute(node, &name, previous);
                }
            }
        }
    }

    fn raw_insert(&mut self, parent: NodeId, index: usize, child: NodeId) -> usize {
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        index
    }

    fn raw_remove(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.index(id)?;
        self.node_mut(parent).children.remove(index);
        self.node_mut(id).parent = None;
        Some((parent, index))
    }

    fn raw_set_attribute(&mut self, id: NodeId, name: &str, value: Option<String>) -> Option<String> {
        let NodeData::Element(element) = &mut self.node_mut(id).data else {
            return None;
        };
        let existing = element.attributes.iter().position(|(key, _)| key == name);
        match (existing, value) {
            (Some(idx), Some(value)) => Some(std::mem::replace(&mut element.attributes[idx].1, value)),
            (Some(idx), None) => Some(element.attributes.remove(idx).1),
            (None, Some(value)) => {
                element.attributes.push((name.to_string(), value));
                None
            }
            (None, None) => None,
        }
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

pub fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    text.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(text.len())
}
