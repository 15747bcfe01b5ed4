use crate::markup::{self, Fixture};
use crate::tree::{NodeId, Tree};

mod adjust;
mod classify;
mod commands;
mod engine;
mod position;
mod resources;
mod selection;
mod spacing;
mod visibility;

pub use adjust::{
    adjust_range, correct_triple_click, expand_non_editables, include_block_end,
    include_block_start, include_empty_inline_end, include_empty_inline_start,
    include_end_or_start_block, include_next_zws, include_previous_zws, RangeStep,
    DELETE_BACKWARD_STEPS, DELETE_FORWARD_STEPS, DELETE_SELECTION_STEPS,
};
pub use classify::{
    can_hold_placeholder, closest_block, closest_element, is_block, is_editable, is_empty,
    is_fake_line_break, is_inline, is_line_break, is_not_editable, is_preformatted,
    is_self_closing, is_void_tag, is_zws_marker, outermost_non_editable, NBSP, ZWS,
    ZWS_EMPTY_INLINE_ATTRIBUTE,
};
pub use commands::{Command, CommandParseError};
pub use position::{
    child_node_index, common_ancestor, common_ancestor_within, compare_positions, end_pos,
    first_leaf, last_leaf, leaf_after, leaf_before, left_pos, next_leaf, node_size,
    previous_leaf, right_pos, start_pos, Position, Range,
};
pub use resources::{
    BeforeRemoveHandler, DeleteHandler, Resources, UnbreakablePredicate, UnremovablePredicate,
};
pub use selection::{Direction, Selection, SelectionError};
pub use visibility::{
    find_next_position, find_previous_position, has_visible_text, is_collapsible_whitespace,
    is_visible_char,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorOptions {
    /// Tag of the block created when the editable root itself empties out.
    pub default_block_tag: String,
    /// Turn spaces that an edit left invisible into non-breaking spaces.
    pub restore_spacing: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            default_block_tag: "p".to_string(),
            restore_spacing: true,
        }
    }
}

impl EditorOptions {
    pub fn with_default_block_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_block_tag = tag.into();
        self
    }

    pub fn with_restore_spacing(mut self, restore: bool) -> Self {
        self.restore_spacing = restore;
        self
    }
}

/// Owns a tree, its editable root and the current selection, and runs the
/// delete commands against them.
pub struct Editor {
    tree: Tree,
    root: NodeId,
    selection: Selection,
    resources: Resources,
    options: EditorOptions,
}

impl Editor {
    pub fn new(tree: Tree, root: NodeId) -> Self {
        Self::with_parts(tree, root, Resources::default(), EditorOptions::default())
    }

    pub fn with_parts(
        tree: Tree,
        root: NodeId,
        resources: Resources,
        options: EditorOptions,
    ) -> Self {
        let start = start_pos(root);
        let mut editor = Self {
            selection: Selection::collapsed(&tree, start),
            tree,
            root,
            resources,
            options,
        };
        editor.collapse_to(start);
        editor
    }

    /// Builds an editor from fixture markup, applying its selection markers.
    pub fn from_fixture(fixture: Fixture) -> Result<Self, SelectionError> {
        let Fixture {
            tree,
            root,
            anchor,
            focus,
        } = fixture;
        let mut editor = Self::new(tree, root);
        if let Some(anchor) = anchor {
            editor.set_selection(anchor, focus.unwrap_or(anchor))?;
        }
        Ok(editor)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut EditorOptions {
        &mut self.options
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    /// Unremovable when it is the editable root or matches a registered
    /// predicate. `scope` is the top-level node of the current removal.
    pub fn is_unremovable(&self, node: NodeId, scope: NodeId) -> bool {
        node == self.root || self.resources.matches_unremovable(&self.tree, node, scope)
    }

    pub fn is_unmergeable(&self, node: NodeId) -> bool {
        self.is_unremovable(node, self.root) || self.resources.matches_unbreakable(&self.tree, node)
    }

    pub fn find_previous_position(&self, position: Position) -> Option<Position> {
        find_previous_position(&self.tree, self.root, position)
    }

    pub fn find_next_position(&self, position: Position) -> Option<Position> {
        find_next_position(&self.tree, self.root, position)
    }

    /// Inner markup of the editable root.
    pub fn html(&self) -> String {
        markup::to_html(&self.tree, self.root)
    }

    /// Inner markup of the editable root with `[`/`]` selection markers.
    pub fn html_with_selection(&self) -> String {
        markup::to_html_with_selection(
            &self.tree,
            self.root,
            Some(self.selection.anchor),
            Some(self.selection.focus),
        )
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;


#[cfg(test)]
#[path = "editor/adjust_tests.rs"]
mod adjust_tests;


#[cfg(test)]
#[path = "editor/classify_tests.rs"]
mod classify_tests;
