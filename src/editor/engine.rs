use crate::tree::NodeId;

use super::classify::{
    can_hold_placeholder, closest_block, has_content_before, is_block, is_empty,
    is_fake_line_break, is_self_closing, trailing_line_break, ZWS, ZWS_EMPTY_INLINE_ATTRIBUTE,
};
use super::position::{
    child_node_index, common_ancestor_within, left_pos, right_pos, Anchor, Position, Range,
};
use super::spacing;
use super::visibility::is_collapsible_whitespace;
use super::Editor;

struct StrippedBreaks {
    visited: Vec<NodeId>,
    stripped: Vec<NodeId>,
    // Fake breaks left in place that were already trailing before the edit.
    kept: Vec<NodeId>,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Editor {
    /// Removes everything inside `range`, joins what is left on both sides
    /// and returns the resulting range, collapsed unless a barrier stopped
    /// the join.
    pub fn delete_range(&mut self, range: Range) -> Range {
        if range.is_collapsed() {
            return range;
        }

        let (start_anchor, end_anchor) = self.split_boundaries(range.start, range.end);
        let start = start_anchor.resolve(&self.tree);
        let end = end_anchor.resolve(&self.tree);
        let common = common_ancestor_within(&self.tree, &[start.node, end.node], self.root);

        let spacing = self
            .options
            .restore_spacing
            .then(|| spacing::capture(&self.tree, start, end));

        let (start, end, breaks) = self.strip_fake_line_breaks(start, end, common);

        let start_anchor = Anchor::left_biased(&self.tree, start);
        let end_anchor = Anchor::right_biased(&self.tree, end);
        let all_removed = self.remove_between(start, end, common);
        let start = start_anchor.resolve(&self.tree);
        let end = end_anchor.resolve(&self.tree);

        self.fill_empty_inline(start.node);
        self.fill_empty_inline(end.node);

        let result = if all_removed {
            self.join(start, end, common)
        } else {
            tracing::debug!("partial removal, join skipped");
            Range::collapsed(&self.tree, start)
        };

        let mut anchors = [
            Anchor::left_biased(&self.tree, result.start),
            Anchor::right_biased(&self.tree, result.end),
        ];
        let placeholders = self.fill_shrunk_blocks(common, &mut anchors);
        self.restore_fake_line_breaks(&breaks, &placeholders);
        if let Some(snapshot) = spacing {
            snapshot.restore(&mut self.tree, self.root);
        }

        let start = anchors[0].resolve(&self.tree);
        if result.is_collapsed() {
            Range::collapsed(&self.tree, start)
        } else {
            Range::new(&self.tree, start, anchors[1].resolve(&self.tree))
        }
    }

    fn split_boundaries(&mut self, start: Position, end: Position) -> (Anchor, Anchor) {
        let end_anchor = if self.tree.is_text(end.node) {
            let size = self.tree.size(end.node);
            if end.offset == 0 {
                Anchor::Before(end.node)
            } else if end.offset >= size {
                Anchor::right_biased(&self.tree, right_pos(&self.tree, end.node))
            } else {
                match self.tree.split_text(end.node, end.offset) {
                    Some(tail) => Anchor::Before(tail),
                    None => Anchor::right_biased(&self.tree, right_pos(&self.tree, end.node)),
                }
            }
        } else {
            Anchor::right_biased(&self.tree, end)
        };

        let start_anchor = if self.tree.is_text(start.node) {
            let size = self.tree.size(start.node);
            if start.offset == 0 {
                Anchor::left_biased(&self.tree, left_pos(&self.tree, start.node))
            } else {
                if start.offset < size {
                    self.tree.split_text(start.node, start.offset);
                }
                Anchor::After(start.node)
            }
        } else {
            Anchor::left_biased(&self.tree, start)
        };

        (start_anchor, end_anchor)
    }

    fn strip_fake_line_breaks(
        &mut self,
        start: Position,
        end: Position,
        common: NodeId,
    ) -> (Position, Position, StrippedBreaks) {
        let mut breaks = StrippedBreaks {
            visited: Vec::new(),
            stripped: Vec::new(),
            kept: Vec::new(),
        };
        let (mut start, mut end) = (start, end);

        for container in [start.node, end.node] {
            let mut current = Some(container);
            while let Some(node) = current {
                if node == common || !self.tree.contains(common, node) {
                    break;
                }
                current = self.tree.parent(node);
                if breaks.visited.contains(&node) {
                    continue;
                }
                breaks.visited.push(node);

                let Some(br) = trailing_line_break(&self.tree, node) else {
                    continue;
                };
                if !is_fake_line_break(&self.tree, br) {
                    continue;
                }
                let index = child_node_index(&self.tree, br);
                for position in [&mut start, &mut end] {
                    if position.node == node && position.offset > index {
                        position.offset -= 1;
                    }
                }
                tracing::trace!(node = %node, "stripped fake line break");
                self.tree.detach(br);
                breaks.stripped.push(node);
            }
        }

        let block = closest_block(&self.tree, common);
        if !breaks.visited.contains(&block) {
            breaks.visited.push(block);
            if let Some(br) = trailing_line_break(&self.tree, block)
                .filter(|br| is_fake_line_break(&self.tree, *br))
            {
                breaks.kept.push(br);
            }
        }
        (start, end, breaks)
    }

    // Returns whether every node between the two positions went away.
    fn remove_between(&mut self, start: Position, end: Position, common: NodeId) -> bool {
        let mut candidates = Vec::new();

        let mut node = start.node;
        let mut index = start.offset;
        while node != common {
            candidates.extend(self.tree.children(node).iter().skip(index).copied());
            index = child_node_index(&self.tree, node) + 1;
            let Some(parent) = self.tree.parent(node) else {
                break;
            };
            node = parent;
        }
        let start_branch = index;

        let mut end_side = Vec::new();
        let mut node = end.node;
        let mut index = end.offset;
        while node != common {
            end_side.extend(self.tree.children(node).iter().take(index).copied());
            index = child_node_index(&self.tree, node);
            let Some(parent) = self.tree.parent(node) else {
                break;
            };
            node = parent;
        }
        let end_branch = index.min(self.tree.size(common));

        if start_branch < end_branch {
            candidates.extend(self.tree.children(common)[start_branch..end_branch].iter().copied());
        }
        candidates.extend(end_side);

        let mut all_removed = true;
        for candidate in candidates {
            if !self.remove_node(candidate, candidate) {
                all_removed = false;
            }
        }
        all_removed
    }

    fn remove_node(&mut self, node: NodeId, scope: NodeId) -> bool {
        if self.resources.run_before_remove(&self.tree, node) {
            tracing::trace!(node = %node, "removed after before-remove handler");
            self.tree.detach(node);
            return true;
        }
        for child in self.tree.children(node).to_vec() {
            self.remove_node(child, scope);
        }
        if self.is_unremovable(node, scope) {
            tracing::trace!(node = %node, "kept unremovable node");
            return false;
        }
        if self.tree.has_children(node) {
            tracing::trace!(node = %node, "unwrapped node with surviving children");
            self.tree.unwrap_node(node);
            return false;
        }
        tracing::trace!(node = %node, "removed node");
        self.tree.detach(node);
        true
    }

    fn fill_empty_inline(&mut self, node: NodeId) {
        if node == self.root
            || !self.tree.is_element(node)
            || is_block(&self.tree, node)
            || is_self_closing(&self.tree, node)
            || !is_empty(&self.tree, node)
        {
            return;
        }
        let has_zws = self.tree.children(node).iter().any(|child| {
            self.tree
                .text(*child)
                .map(|text| text.contains(ZWS))
                .unwrap_or(false)
        });
        if !has_zws {
            let zws = self.tree.create_text(ZWS.to_string());
            self.tree.append_child(node, zws);
        }
        tracing::trace!(node = %node, "filled empty inline with zero-width space");
        self.tree.set_attribute(node, ZWS_EMPTY_INLINE_ATTRIBUTE, "");
    }

    fn joinable(&self, position: Position, common: NodeId, side: Side) -> Option<NodeId> {
        if position.node == common {
            let sibling = match side {
                Side::Left => position
                    .offset
                    .checked_sub(1)
                    .and_then(|idx| self.tree.child(common, idx)),
                Side::Right => self.tree.child(common, position.offset),
            };
            return sibling.filter(|node| !is_block(&self.tree, *node));
        }
        let mut topmost = position.node;
        for ancestor in self.tree.ancestors(position.node) {
            if ancestor == common {
                break;
            }
            if is_block(&self.tree, ancestor) {
                return Some(ancestor);
            }
            topmost = ancestor;
        }
        Some(topmost)
    }

    fn crosses_barrier(&self, node: NodeId, common: NodeId) -> bool {
        self.tree
            .ancestors(node)
            .take_while(|ancestor| *ancestor != common)
            .any(|ancestor| self.is_unmergeable(ancestor))
    }

    fn join(&mut self, start: Position, end: Position, common: NodeId) -> Range {
        let left = self.joinable(start, common, Side::Left);
        let right = self.joinable(end, common, Side::Right);
        let (Some(left), Some(right)) = (left, right) else {
            tracing::debug!("nothing to join on one side");
            return Range::collapsed(&self.tree, start);
        };
        if left == right {
            return Range::collapsed(&self.tree, start);
        }
        if self.crosses_barrier(left, common) || self.crosses_barrier(right, common) {
            tracing::debug!(left = %left, right = %right, "join aborted at unmergeable boundary");
            return Range::new(&self.tree, start, end);
        }

        match (is_block(&self.tree, left), is_block(&self.tree, right)) {
            (true, true) => {
                tracing::debug!(left = %left, right = %right, "joining block into block");
                for child in self.tree.children(right).to_vec() {
                    self.tree.append_child(left, child);
                }
                self.remove_with_empty_ancestors(right, common);
            }
            (true, false) => {
                tracing::debug!(left = %left, right = %right, "joining inline run into block");
                let mut next = Some(right);
                while let Some(node) = next {
                    if is_block(&self.tree, node) {
                        break;
                    }
                    next = self.tree.next_sibling(node);
                    self.tree.append_child(left, node);
                }
            }
            (false, true) => {
                tracing::debug!(left = %left, right = %right, "joining block after inline");
                let mut reference = left;
                for child in self.tree.children(right).to_vec() {
                    self.tree.insert_after(reference, child);
                    reference = child;
                }
                self.remove_with_empty_ancestors(right, common);
                if let Some(next) = self.tree.next_sibling(reference) {
                    if self.tree.parent(next) == Some(common) && !is_block(&self.tree, next) {
                        let br = self.tree.create_element("br");
                        self.tree.insert_before(next, br);
                    }
                }
            }
            (false, false) => {}
        }
        Range::collapsed(&self.tree, start)
    }

    fn remove_with_empty_ancestors(&mut self, node: NodeId, common: NodeId) {
        let mut current = node;
        loop {
            let parent = self.tree.parent(current);
            self.tree.detach(current);
            match parent {
                Some(parent)
                    if parent != common
                        && !self.tree.has_children(parent)
                        && !self.is_unremovable(parent, parent) =>
                {
                    current = parent;
                }
                _ => break,
            }
        }
    }

    fn fill_shrunk_blocks(&mut self, common: NodeId, anchors: &mut [Anchor]) -> Vec<NodeId> {
        let mut candidates = self.tree.descendants_post_order(common);
        let block = closest_block(&self.tree, common);
        if !candidates.contains(&block) {
            candidates.push(block);
        }

        let mut placeholders = Vec::new();
        for node in candidates {
            if !self.tree.contains(self.root, node)
                || !is_block(&self.tree, node)
                || !(node == self.root || can_hold_placeholder(&self.tree, node))
                || !is_empty(&self.tree, node)
            {
                continue;
            }
            self.drop_collapsed_whitespace(node, anchors);
            let br = self.tree.create_element("br");
            if node == self.root {
                tracing::debug!("editable root emptied, inserting a default block");
                let block = self.tree.create_element(&self.options.default_block_tag);
                self.tree.append_child(block, br);
                self.tree.append_child(node, block);
            } else {
                tracing::trace!(node = %node, "filled shrunk block");
                self.tree.append_child(node, br);
            }
            placeholders.push(br);
        }
        placeholders
    }

    fn drop_collapsed_whitespace(&mut self, block: NodeId, anchors: &mut [Anchor]) {
        let blank: Vec<NodeId> = self
            .tree
            .descendants(block)
            .into_iter()
            .filter(|node| {
                self.tree
                    .text(*node)
                    .map(|text| text.chars().all(is_collapsible_whitespace))
                    .unwrap_or(false)
            })
            .filter(|node| closest_block(&self.tree, *node) == block)
            .collect();
        for text in blank {
            let replacement = Anchor::left_biased(&self.tree, left_pos(&self.tree, text));
            for anchor in anchors.iter_mut() {
                if *anchor == Anchor::Before(text) || *anchor == Anchor::After(text) {
                    *anchor = replacement;
                }
            }
            tracing::trace!(node = %text, "dropped collapsed whitespace");
            self.tree.detach(text);
        }
    }

    fn restore_fake_line_breaks(&mut self, breaks: &StrippedBreaks, placeholders: &[NodeId]) {
        for node in &breaks.visited {
            let node = *node;
            if !self.tree.contains(self.root, node) {
                continue;
            }
            let Some(br) = trailing_line_break(&self.tree, node) else {
                continue;
            };
            if placeholders.contains(&br)
                || breaks.kept.contains(&br)
                || !is_fake_line_break(&self.tree, br)
            {
                continue;
            }
            let block = closest_block(&self.tree, br);
            if !breaks.stripped.contains(&node) && !has_content_before(&self.tree, br, block) {
                continue;
            }
            tracing::trace!(node = %node, "restored fake line break");
            let restored = self.tree.create_element("br");
            self.tree.append_child(node, restored);
        }
    }
}
