use crate::tree::{NodeId, Tree};

use super::classify::{closest_block, NBSP};
use super::position::{leaf_after, leaf_before, Position};
use super::visibility::{is_collapsible_whitespace, is_visible_char};

/// Visible collapsible spaces bordering a deletion, recorded before the edit.
#[derive(Debug, Default)]
pub(crate) struct SpacingSnapshot {
    spaces: Vec<(NodeId, usize)>,
}

/// Records the space just left of `start` and just right of `end` when it is
/// currently rendered. Both points must already be element positions.
pub(crate) fn capture(tree: &Tree, start: Position, end: Position) -> SpacingSnapshot {
    let mut snapshot = SpacingSnapshot::default();

    let start_block = closest_block(tree, start.node);
    if let Some(leaf) = leaf_before(tree, start, start_block) {
        let len = tree.size(leaf);
        if len > 0 {
            snapshot.record(tree, leaf, len - 1);
        }
    }

    let end_block = closest_block(tree, end.node);
    if let Some(leaf) = leaf_after(tree, end, end_block) {
        snapshot.record(tree, leaf, 0);
    }
    snapshot
}

impl SpacingSnapshot {
    fn record(&mut self, tree: &Tree, node: NodeId, offset: usize) {
        let Some(ch) = tree.text(node).and_then(|text| text.chars().nth(offset)) else {
            return;
        };
        if is_collapsible_whitespace(ch) && is_visible_char(tree, node, offset) {
            self.spaces.push((node, offset));
        }
    }

    /// Replaces every recorded space the edit made invisible with NBSP.
    pub(crate) fn restore(self, tree: &mut Tree, root: NodeId) {
        for (node, offset) in self.spaces {
            if !tree.contains(root, node) {
                continue;
            }
            let Some(text) = tree.text(node) else {
                continue;
            };
            let mut chars: Vec<char> = text.chars().collect();
            let still_space = chars
                .get(offset)
                .map(|ch| is_collapsible_whitespace(*ch))
                .unwrap_or(false);
            if !still_space || is_visible_char(tree, node, offset) {
                continue;
            }
            chars[offset] = NBSP;
            tracing::trace!(node = %node, offset, "restored invisible space as nbsp");
            tree.set_text(node, chars.into_iter().collect::<String>());
        }
    }
}
