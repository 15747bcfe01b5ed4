use crate::tree::{NodeId, Tree};

use super::position::{next_leaf, previous_leaf};
use super::visibility::has_visible_text;

pub const ZWS: char = '\u{200B}';
pub const NBSP: char = '\u{a0}';

pub const ZWS_EMPTY_INLINE_ATTRIBUTE: &str = "data-oe-zws-empty-inline";

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "dialog", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary",
    "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

const VOID_TAGS: &[&str] = &[
    "area", "br", "col", "embed", "hr", "img", "input", "source", "track", "wbr",
];

const STRUCTURAL_TAGS: &[&str] = &["ol", "ul", "dl", "table", "tbody", "thead", "tfoot", "tr"];

pub fn is_block(tree: &Tree, node: NodeId) -> bool {
    tree.tag(node)
        .map(|tag| BLOCK_TAGS.contains(&tag))
        .unwrap_or(false)
}

pub fn is_inline(tree: &Tree, node: NodeId) -> bool {
    !is_block(tree, node)
}

pub fn is_self_closing(tree: &Tree, node: NodeId) -> bool {
    tree.tag(node)
        .map(|tag| VOID_TAGS.contains(&tag))
        .unwrap_or(false)
}

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

pub fn can_hold_placeholder(tree: &Tree, node: NodeId) -> bool {
    match tree.tag(node) {
        Some(tag) => !STRUCTURAL_TAGS.contains(&tag) && !VOID_TAGS.contains(&tag),
        None => false,
    }
}

pub fn is_line_break(tree: &Tree, node: NodeId) -> bool {
    tree.is_tag(node, "br")
}

pub fn is_not_editable(tree: &Tree, node: NodeId) -> bool {
    tree.attribute(node, "contenteditable") == Some("false")
}

pub fn is_editable(tree: &Tree, node: NodeId) -> bool {
    for ancestor in tree.ancestors(node) {
        match tree.attribute(ancestor, "contenteditable") {
            Some("false") => return false,
            Some(_) => return true,
            None => {}
        }
    }
    true
}

/// Furthest `contenteditable="false"` ancestor of `node` (inclusive) that
/// still sits strictly below `limit`.
pub fn outermost_non_editable(tree: &Tree, node: NodeId, limit: NodeId) -> Option<NodeId> {
    let mut found = None;
    for ancestor in tree.ancestors(node) {
        if ancestor == limit {
            break;
        }
        if is_not_editable(tree, ancestor) {
            found = Some(ancestor);
        }
    }
    found
}

pub fn closest_element(tree: &Tree, node: NodeId) -> NodeId {
    if tree.is_text(node) {
        tree.parent(node).unwrap_or(node)
    } else {
        node
    }
}

pub fn closest_block(tree: &Tree, node: NodeId) -> NodeId {
    let mut top = node;
    for ancestor in tree.ancestors(node) {
        if is_block(tree, ancestor) {
            return ancestor;
        }
        top = ancestor;
    }
    top
}

pub fn is_preformatted(tree: &Tree, node: NodeId) -> bool {
    tree.ancestors(node).any(|ancestor| {
        tree.is_tag(ancestor, "pre")
            || tree
                .attribute(ancestor, "style")
                .map(|style| {
                    style
                        .split(';')
                        .filter_map(|decl| decl.split_once(':'))
                        .any(|(name, value)| {
                            name.trim() == "white-space" && value.trim().starts_with("pre")
                        })
                })
                .unwrap_or(false)
    })
}

pub fn is_empty(tree: &Tree, node: NodeId) -> bool {
    if tree.is_text(node) {
        return !has_visible_text(tree, node);
    }
    if is_self_closing(tree, node) || is_not_editable(tree, node) {
        return false;
    }
    tree.children(node).iter().all(|child| is_empty(tree, *child))
}

pub fn is_zws_marker(tree: &Tree, node: NodeId) -> bool {
    match tree.text(node) {
        Some(text) => text == "\u{200B}",
        None => tree.has_attribute(node, ZWS_EMPTY_INLINE_ATTRIBUTE),
    }
}

/// A `br` is fake when nothing rendered follows it inside its block: it only
/// keeps the line from collapsing.
pub fn is_fake_line_break(tree: &Tree, node: NodeId) -> bool {
    if !is_line_break(tree, node) {
        return false;
    }
    let block = closest_block(tree, node);
    let mut cursor = next_leaf(tree, node, block);
    while let Some(leaf) = cursor {
        if closest_block(tree, leaf) != block {
            break;
        }
        if renders_content(tree, leaf) {
            return false;
        }
        cursor = next_leaf(tree, leaf, block);
    }
    true
}

pub(crate) fn renders_content(tree: &Tree, leaf: NodeId) -> bool {
    if tree.is_text(leaf) {
        return has_visible_text(tree, leaf);
    }
    if is_block(tree, leaf) && !is_self_closing(tree, leaf) {
        return false;
    }
    is_self_closing(tree, leaf) || tree.ancestors(leaf).any(|node| is_not_editable(tree, node))
}

pub(crate) fn trailing_line_break(tree: &Tree, node: NodeId) -> Option<NodeId> {
    tree.last_child(node)
        .filter(|child| is_line_break(tree, *child))
}

pub(crate) fn has_content_before(tree: &Tree, node: NodeId, block: NodeId) -> bool {
    let mut cursor = previous_leaf(tree, node, block);
    while let Some(leaf) = cursor {
        if renders_content(tree, leaf) {
            return true;
        }
        cursor = previous_leaf(tree, leaf, block);
    }
    false
}
