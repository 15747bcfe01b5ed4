use std::cmp::Ordering;

use thiserror::Error;

use crate::tree::{NodeId, Tree};

use super::classify::{is_block, is_not_editable, is_self_closing};
use super::position::{compare_positions, end_pos, start_pos, Position, Range};
use super::Editor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
    pub range: Range,
    pub direction: Direction,
}

impl Selection {
    pub fn new(tree: &Tree, anchor: Position, focus: Position) -> Self {
        let (range, direction) = match compare_positions(tree, anchor, focus) {
            Ordering::Greater => (Range::new(tree, focus, anchor), Direction::Backward),
            _ => (Range::new(tree, anchor, focus), Direction::Forward),
        };
        Self {
            anchor,
            focus,
            range,
            direction,
        }
    }

    pub fn collapsed(tree: &Tree, position: Position) -> Self {
        Self::new(tree, position, position)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    #[error("node {0} is detached from the document")]
    Detached(NodeId),
    #[error("node {0} is outside the editable root")]
    OutsideRoot(NodeId),
    #[error("offset {offset} is out of bounds for node {node} (size {size})")]
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        size: usize,
    },
}

impl Editor {
    /// Validates and commits a new selection. A collapsed selection is moved
    /// to the deepest equivalent position.
    pub fn set_selection(
        &mut self,
        anchor: Position,
        focus: Position,
    ) -> Result<Selection, SelectionError> {
        self.validate(anchor)?;
        self.validate(focus)?;
        let selection = if anchor == focus {
            Selection::collapsed(&self.tree, self.deepest_position(anchor))
        } else {
            Selection::new(&self.tree, anchor, focus)
        };
        self.selection = selection;
        Ok(selection)
    }

    pub fn set_cursor(&mut self, position: Position) -> Result<Selection, SelectionError> {
        self.set_selection(position, position)
    }

    /// Current selection re-derived against the tree as it is now.
    pub(crate) fn current_selection(&self) -> Selection {
        Selection::new(&self.tree, self.selection.anchor, self.selection.focus)
    }

    /// Collapses onto `position`, falling back to the start of the root when
    /// the position is no longer valid.
    pub(crate) fn collapse_to(&mut self, position: Position) {
        if let Err(err) = self.set_cursor(position) {
            tracing::debug!(%err, "cursor fell outside the editable root, resetting");
            let start = self.deepest_position(start_pos(self.root));
            self.selection = Selection::collapsed(&self.tree, start);
        }
    }

    /// Keeps the selection when a handler consumed a command, unless the
    /// handler disconnected it.
    pub(crate) fn keep_or_reset_selection(&mut self) {
        let Selection { anchor, focus, .. } = self.selection;
        if self.set_selection(anchor, focus).is_err() {
            self.collapse_to(start_pos(self.root));
        }
    }

    fn validate(&self, position: Position) -> Result<(), SelectionError> {
        let top_of = |node: NodeId| self.tree.ancestors(node).last().unwrap_or(node);
        if top_of(position.node) != top_of(self.root) {
            return Err(SelectionError::Detached(position.node));
        }
        if !self.tree.contains(self.root, position.node) {
            return Err(SelectionError::OutsideRoot(position.node));
        }
        let size = self.tree.size(position.node);
        if position.offset > size {
            return Err(SelectionError::OffsetOutOfBounds {
                node: position.node,
                offset: position.offset,
                size,
            });
        }
        Ok(())
    }

    fn deepest_position(&self, position: Position) -> Position {
        let mut current = position;
        loop {
            if self.tree.is_text(current.node) {
                return current;
            }
            let after = self
                .tree
                .child(current.node, current.offset)
                .filter(|child| self.can_hold_cursor(*child));
            let before = current
                .offset
                .checked_sub(1)
                .and_then(|idx| self.tree.child(current.node, idx))
                .filter(|child| self.can_hold_cursor(*child));
            current = match (after, before) {
                // Inline content on the left wins over a block on the right.
                (Some(after), Some(before))
                    if is_block(&self.tree, after) && !is_block(&self.tree, before) =>
                {
                    end_pos(&self.tree, before)
                }
                (Some(after), _) => start_pos(after),
                (None, Some(before)) => end_pos(&self.tree, before),
                (None, None) if current.node == self.root => {
                    match self.nearest_cursor_child(current.offset) {
                        Some(next) => next,
                        None => return current,
                    }
                }
                (None, None) => return current,
            };
        }
    }

    /// Edge of the closest root child that can take the cursor, looking
    /// forward first.
    fn nearest_cursor_child(&self, offset: usize) -> Option<Position> {
        let children = self.tree.children(self.root);
        let following = children
            .iter()
            .skip(offset)
            .find(|child| self.can_hold_cursor(**child))
            .map(|child| start_pos(*child));
        following.or_else(|| {
            children
                .iter()
                .take(offset)
                .rev()
                .find(|child| self.can_hold_cursor(**child))
                .map(|child| end_pos(&self.tree, *child))
        })
    }

    fn can_hold_cursor(&self, node: NodeId) -> bool {
        self.tree.is_text(node)
            || (!is_self_closing(&self.tree, node) && !is_not_editable(&self.tree, node))
    }
}
