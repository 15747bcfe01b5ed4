use crate::tree::{NodeId, Tree};

use super::classify::{
    closest_block, is_block, is_empty, is_fake_line_break, is_line_break, is_not_editable,
    is_preformatted, is_self_closing, is_zws_marker, outermost_non_editable, ZWS,
};
use super::position::{
    leaf_after, leaf_before, left_pos, next_leaf, previous_leaf, right_pos, Position,
};

/// Whitespace that collapses under normal white-space rules. NBSP is not part
/// of it.
pub fn is_collapsible_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{0C}')
}

/// Whether the char at `offset` of text node `node` is rendered.
pub fn is_visible_char(tree: &Tree, node: NodeId, offset: usize) -> bool {
    let Some(text) = tree.text(node) else {
        return false;
    };
    let chars: Vec<char> = text.chars().collect();
    visible_in(tree, node, &chars, offset)
}

fn visible_in(tree: &Tree, node: NodeId, chars: &[char], offset: usize) -> bool {
    let Some(&ch) = chars.get(offset) else {
        return false;
    };
    if ch == ZWS {
        return false;
    }
    if is_preformatted(tree, node) || !is_collapsible_whitespace(ch) {
        return true;
    }
    preceded_by_content(tree, node, chars, offset) && followed_by_content(tree, node, chars, offset)
}

pub fn has_visible_text(tree: &Tree, node: NodeId) -> bool {
    let Some(text) = tree.text(node) else {
        return false;
    };
    if text
        .chars()
        .any(|ch| ch != ZWS && !is_collapsible_whitespace(ch))
    {
        return true;
    }
    let chars: Vec<char> = text.chars().collect();
    // Only the first whitespace of an all-whitespace run can be rendered.
    chars
        .iter()
        .position(|ch| *ch != ZWS)
        .map(|first| visible_in(tree, node, &chars, first))
        .unwrap_or(false)
}

fn preceded_by_content(tree: &Tree, node: NodeId, chars: &[char], offset: usize) -> bool {
    for ch in chars[..offset].iter().rev() {
        if *ch == ZWS {
            continue;
        }
        return !is_collapsible_whitespace(*ch);
    }
    let block = closest_block(tree, node);
    let mut cursor = previous_leaf(tree, node, block);
    while let Some(leaf) = cursor {
        if closest_block(tree, leaf) != block {
            return false;
        }
        match leaf_edge(tree, leaf, Side::Trailing) {
            Edge::Content => return true,
            Edge::Boundary => return false,
            Edge::Nothing => cursor = previous_leaf(tree, leaf, block),
        }
    }
    false
}

fn followed_by_content(tree: &Tree, node: NodeId, chars: &[char], offset: usize) -> bool {
    if chars[offset + 1..]
        .iter()
        .any(|ch| *ch != ZWS && !is_collapsible_whitespace(*ch))
    {
        return true;
    }
    let block = closest_block(tree, node);
    let mut cursor = next_leaf(tree, node, block);
    while let Some(leaf) = cursor {
        if closest_block(tree, leaf) != block {
            return false;
        }
        match leaf_edge(tree, leaf, Side::Leading) {
            Edge::Content => return true,
            Edge::Boundary => return false,
            Edge::Nothing => cursor = next_leaf(tree, leaf, block),
        }
    }
    false
}

#[derive(Clone, Copy)]
enum Side {
    Leading,
    Trailing,
}

enum Edge {
    Content,
    Boundary,
    Nothing,
}

/// What a neighbouring leaf contributes at the edge facing a whitespace run.
fn leaf_edge(tree: &Tree, leaf: NodeId, side: Side) -> Edge {
    if tree.ancestors(leaf).any(|node| is_not_editable(tree, node)) {
        return Edge::Content;
    }
    if let Some(text) = tree.text(leaf) {
        match side {
            Side::Trailing => {
                for ch in text.chars().rev() {
                    if ch == ZWS {
                        continue;
                    }
                    return if is_collapsible_whitespace(ch) {
                        Edge::Boundary
                    } else {
                        Edge::Content
                    };
                }
                return Edge::Nothing;
            }
            Side::Leading => {
                if text
                    .chars()
                    .any(|ch| ch != ZWS && !is_collapsible_whitespace(ch))
                {
                    return Edge::Content;
                }
                return Edge::Nothing;
            }
        }
    }
    if is_line_break(tree, leaf) {
        return Edge::Boundary;
    }
    if is_self_closing(tree, leaf) {
        return Edge::Content;
    }
    if is_block(tree, leaf) {
        return Edge::Boundary;
    }
    Edge::Nothing
}

/// Leaves the cursor steps over while it stays inside its block.
fn should_skip(tree: &Tree, leaf: NodeId) -> bool {
    is_fake_line_break(tree, leaf)
        || (!is_self_closing(tree, leaf) && is_empty(tree, leaf))
        || is_zws_marker(tree, leaf)
}

/// Closest position on the left that is one visible step away, or `None` at
/// the start of the editable root.
pub fn find_previous_position(tree: &Tree, root: NodeId, position: Position) -> Option<Position> {
    let origin = closest_block(tree, position.node);
    previous_position(tree, root, origin, position, false)
}

pub fn find_next_position(tree: &Tree, root: NodeId, position: Position) -> Option<Position> {
    let origin = closest_block(tree, position.node);
    next_position(tree, root, origin, position, false)
}

fn previous_position(
    tree: &Tree,
    root: NodeId,
    origin: NodeId,
    position: Position,
    block_switch: bool,
) -> Option<Position> {
    if let Some(text) = tree.text(position.node) {
        let chars: Vec<char> = text.chars().collect();
        for idx in (0..position.offset.min(chars.len())).rev() {
            if visible_in(tree, position.node, &chars, idx) {
                let offset = if block_switch { idx + 1 } else { idx };
                return Some(Position::new(position.node, offset));
            }
        }
    }

    let leaf = leaf_before(tree, position, root)?;
    let block_switch = block_switch || closest_block(tree, leaf) != origin;

    if !block_switch && tree.is_element(leaf) && should_skip(tree, leaf) {
        return previous_position(tree, root, origin, left_pos(tree, leaf), false);
    }
    // A block reached across a boundary is taken whole, so the step removes it.
    if let Some(island) = outermost_non_editable(tree, leaf, root) {
        return Some(if block_switch && !is_block(tree, island) {
            right_pos(tree, island)
        } else {
            left_pos(tree, island)
        });
    }
    if tree.is_element(leaf) {
        return Some(if block_switch && !is_block(tree, leaf) {
            right_pos(tree, leaf)
        } else {
            left_pos(tree, leaf)
        });
    }
    previous_position(
        tree,
        root,
        origin,
        Position::new(leaf, tree.size(leaf)),
        block_switch,
    )
}

fn next_position(
    tree: &Tree,
    root: NodeId,
    origin: NodeId,
    position: Position,
    block_switch: bool,
) -> Option<Position> {
    if let Some(text) = tree.text(position.node) {
        let chars: Vec<char> = text.chars().collect();
        for idx in position.offset..chars.len() {
            if visible_in(tree, position.node, &chars, idx) {
                let offset = if block_switch { idx } else { idx + 1 };
                return Some(Position::new(position.node, offset));
            }
        }
    }

    let leaf = leaf_after(tree, position, root)?;
    let block_switch = block_switch || closest_block(tree, leaf) != origin;

    if !block_switch && tree.is_element(leaf) && should_skip(tree, leaf) {
        return next_position(tree, root, origin, right_pos(tree, leaf), false);
    }
    if let Some(island) = outermost_non_editable(tree, leaf, root) {
        return Some(if block_switch && !is_block(tree, island) {
            left_pos(tree, island)
        } else {
            right_pos(tree, island)
        });
    }
    if tree.is_element(leaf) {
        return Some(if block_switch && !is_block(tree, leaf) {
            left_pos(tree, leaf)
        } else {
            right_pos(tree, leaf)
        });
    }
    next_position(tree, root, origin, Position::new(leaf, 0), block_switch)
}
