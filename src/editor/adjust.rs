use std::cmp::Ordering;

use crate::tree::{NodeId, Tree};

use super::classify::{
    closest_block, closest_element, is_block, is_editable, is_empty, outermost_non_editable, ZWS,
};
use super::position::{
    compare_positions, first_leaf, left_pos, previous_leaf, right_pos, Position, Range,
};
use super::visibility::{find_next_position, find_previous_position, has_visible_text};

/// A pure range transform. Receives the editable root.
pub type RangeStep = fn(&Tree, NodeId, Range) -> Range;

pub const DELETE_SELECTION_STEPS: &[RangeStep] = &[
    correct_triple_click,
    expand_non_editables,
    include_end_or_start_block,
];

pub const DELETE_BACKWARD_STEPS: &[RangeStep] = &[
    include_empty_inline_end,
    include_previous_zws,
    include_end_or_start_block,
];

pub const DELETE_FORWARD_STEPS: &[RangeStep] = &[
    include_empty_inline_start,
    include_next_zws,
    include_end_or_start_block,
];

pub fn adjust_range(tree: &Tree, root: NodeId, range: Range, steps: &[RangeStep]) -> Range {
    steps.iter().fold(range, |range, step| step(tree, root, range))
}

/// A selection ending at offset 0 of a block, with nothing rendered before
/// that point inside the block, is pulled back to the end of the previous
/// leaf so the paragraph break survives.
pub fn correct_triple_click(tree: &Tree, root: NodeId, range: Range) -> Range {
    if range.is_collapsed() || range.end.offset != 0 {
        return range;
    }
    let end = range.end;
    let leaf = match tree.child(end.node, 0) {
        Some(child) if tree.is_element(end.node) => first_leaf(tree, child),
        _ => end.node,
    };
    let block = closest_block(tree, end.node);

    let mut previous = previous_leaf(tree, leaf, root);
    while let Some(node) = previous {
        if !tree.contains(block, node) {
            break;
        }
        let invisible_text = tree
            .text(node)
            .map(|text| !text.contains(ZWS) && !has_visible_text(tree, node))
            .unwrap_or(false);
        if !invisible_text {
            return range;
        }
        previous = previous_leaf(tree, node, root);
    }

    let Some(previous) = previous else {
        return range;
    };
    if !is_editable(tree, previous) {
        return range;
    }
    let new_end = if tree.is_text(previous) {
        Position::new(previous, tree.size(previous))
    } else {
        right_pos(tree, previous)
    };
    if compare_positions(tree, range.start, new_end) == Ordering::Greater {
        return range;
    }
    range.with_end(tree, new_end)
}

/// Grows both ends so a `contenteditable="false"` island is deleted whole.
pub fn expand_non_editables(tree: &Tree, _root: NodeId, range: Range) -> Range {
    let common = range.common_ancestor;
    let mut start = range.start;
    let mut end = range.end;

    if let Some(island) = outermost_non_editable(tree, range.start.node, common) {
        start = match previous_leaf(tree, island, common) {
            Some(leaf) => right_pos(tree, leaf),
            None => Position::new(common, 0),
        };
    }
    if let Some(island) = outermost_non_editable(tree, range.end.node, common) {
        end = right_pos(tree, island);
    }
    if start == range.start && end == range.end {
        return range;
    }
    Range::new(tree, start, end)
}

fn empty_inline_container(tree: &Tree, root: NodeId, node: NodeId) -> Option<NodeId> {
    let element = closest_element(tree, node);
    if element == root || is_block(tree, element) || !is_empty(tree, element) {
        return None;
    }
    Some(element)
}

pub fn include_empty_inline_start(tree: &Tree, root: NodeId, range: Range) -> Range {
    let mut start = range.start;
    while let Some(inline) = empty_inline_container(tree, root, start.node) {
        start = left_pos(tree, inline);
    }
    if start == range.start {
        return range;
    }
    range.with_start(tree, start)
}

pub fn include_empty_inline_end(tree: &Tree, root: NodeId, range: Range) -> Range {
    let mut end = range.end;
    while let Some(inline) = empty_inline_container(tree, root, end.node) {
        end = right_pos(tree, inline);
    }
    if end == range.end {
        return range;
    }
    range.with_end(tree, end)
}

pub fn include_previous_zws(tree: &Tree, _root: NodeId, range: Range) -> Range {
    let start = range.start;
    let Some(text) = tree.text(start.node) else {
        return range;
    };
    if start.offset == 0 || text.chars().nth(start.offset - 1) != Some(ZWS) {
        return range;
    }
    range.with_start(tree, Position::new(start.node, start.offset - 1))
}

pub fn include_next_zws(tree: &Tree, _root: NodeId, range: Range) -> Range {
    let end = range.end;
    let Some(text) = tree.text(end.node) else {
        return range;
    };
    if text.chars().nth(end.offset) != Some(ZWS) {
        return range;
    }
    range.with_end(tree, Position::new(end.node, end.offset + 1))
}

/// Moves the end past every enclosing block (below the common ancestor) the
/// end sits at the very end of.
pub fn include_block_end(tree: &Tree, root: NodeId, range: Range) -> Range {
    let common = range.common_ancestor;
    let mut end = range.end;
    loop {
        let block = closest_block(tree, end.node);
        if block == common || !tree.contains(common, block) {
            break;
        }
        let at_end = match find_next_position(tree, root, end) {
            None => true,
            Some(next) => !tree.contains(block, next.node),
        };
        if !at_end {
            break;
        }
        end = right_pos(tree, block);
    }
    if end == range.end {
        return range;
    }
    range.with_end(tree, end)
}

pub fn include_block_start(tree: &Tree, root: NodeId, range: Range) -> Range {
    let common = range.common_ancestor;
    let mut start = range.start;
    loop {
        let block = closest_block(tree, start.node);
        if block == common || !tree.contains(common, block) {
            break;
        }
        let at_start = match find_previous_position(tree, root, start) {
            None => true,
            Some(previous) => !tree.contains(block, previous.node),
        };
        if !at_start {
            break;
        }
        start = left_pos(tree, block);
    }
    if start == range.start {
        return range;
    }
    range.with_start(tree, start)
}

/// Completing the end block wins; the start block is only considered when
/// the end did not move.
pub fn include_end_or_start_block(tree: &Tree, root: NodeId, range: Range) -> Range {
    let extended = include_block_end(tree, root, range);
    if extended.end != range.end {
        return extended;
    }
    include_block_start(tree, root, range)
}
