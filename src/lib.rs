pub mod editor;
pub mod import;
pub mod markup;
pub mod render;
pub mod tree;

pub use editor::{Command, Editor, EditorOptions, Position, Range, Selection};
pub use tree::{NodeId, Tree};
