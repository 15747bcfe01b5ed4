use std::{fmt, str::FromStr};

use thiserror::Error;

use super::adjust::{
    adjust_range, DELETE_BACKWARD_STEPS, DELETE_FORWARD_STEPS, DELETE_SELECTION_STEPS,
};
use super::position::Range;
use super::resources::DeleteHook;
use super::Editor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    DeleteBackward,
    DeleteForward,
    DeleteSelection,
}

impl Command {
    pub fn identifier(self) -> &'static str {
        match self {
            Command::DeleteBackward => "DELETE_BACKWARD",
            Command::DeleteForward => "DELETE_FORWARD",
            Command::DeleteSelection => "DELETE_SELECTION",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown command identifier `{0}`")]
pub struct CommandParseError(pub String);

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DELETE_BACKWARD" => Ok(Command::DeleteBackward),
            "DELETE_FORWARD" => Ok(Command::DeleteForward),
            "DELETE_SELECTION" => Ok(Command::DeleteSelection),
            other => Err(CommandParseError(other.to_string())),
        }
    }
}

impl Editor {
    /// Runs a command and reports whether the tree changed.
    pub fn execute(&mut self, command: Command) -> bool {
        match command {
            Command::DeleteBackward => self.delete_backward(),
            Command::DeleteForward => self.delete_forward(),
            Command::DeleteSelection => self.delete_selection(),
        }
    }

    pub fn delete_selection(&mut self) -> bool {
        let selection = self.current_selection();
        if selection.is_collapsed() {
            return false;
        }
        let revision = self.tree.revision();
        tracing::debug!(range = ?selection.range, "delete selection");

        let range = adjust_range(&self.tree, self.root, selection.range, DELETE_SELECTION_STEPS);
        if self.resources.handle(DeleteHook::Range, &mut self.tree, &range) {
            tracing::debug!("delete selection handled externally");
            self.keep_or_reset_selection();
            return self.tree.revision() != revision;
        }

        let result = self.delete_range(range);
        self.collapse_to(result.start);
        self.tree.revision() != revision
    }

    pub fn delete_backward(&mut self) -> bool {
        let selection = self.current_selection();
        if !selection.is_collapsed() {
            return self.delete_selection();
        }
        let revision = self.tree.revision();
        let cursor = selection.range.end;
        let start = self.find_previous_position(cursor).unwrap_or(cursor);
        let range = Range::new(&self.tree, start, cursor);
        tracing::debug!(range = ?range, "delete backward");

        if self.resources.handle(DeleteHook::Backward, &mut self.tree, &range) {
            tracing::debug!("delete backward handled externally");
            self.keep_or_reset_selection();
            return self.tree.revision() != revision;
        }

        let range = adjust_range(&self.tree, self.root, range, DELETE_BACKWARD_STEPS);
        let result = self.delete_range(range);
        self.collapse_to(result.end);
        self.tree.revision() != revision
    }

    pub fn delete_forward(&mut self) -> bool {
        let selection = self.current_selection();
        if !selection.is_collapsed() {
            return self.delete_selection();
        }
        let revision = self.tree.revision();
        let cursor = selection.range.start;
        let end = self.find_next_position(cursor).unwrap_or(cursor);
        let range = Range::new(&self.tree, cursor, end);
        tracing::debug!(range = ?range, "delete forward");

        if self.resources.handle(DeleteHook::Forward, &mut self.tree, &range) {
            tracing::debug!("delete forward handled externally");
            self.keep_or_reset_selection();
            return self.tree.revision() != revision;
        }

        let range = adjust_range(&self.tree, self.root, range, DELETE_FORWARD_STEPS);
        let result = self.delete_range(range);
        self.collapse_to(result.start);
        self.tree.revision() != revision
    }
}
