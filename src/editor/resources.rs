use crate::tree::{NodeId, Tree};

use super::position::Range;

/// Decides whether a node must survive deletion. `root` is the top-level
/// node being removed in the current operation.
pub trait UnremovablePredicate {
    fn matches(&self, tree: &Tree, node: NodeId, root: NodeId) -> bool;
}

/// Marks nodes whose boundary may not be crossed by a join.
pub trait UnbreakablePredicate {
    fn matches(&self, tree: &Tree, node: NodeId) -> bool;
}

/// Side effect run right before a node is dropped. Returning `true` removes
/// the node without looking at its children.
pub trait BeforeRemoveHandler {
    fn before_remove(&self, tree: &Tree, node: NodeId) -> bool;
}

/// Interceptor for a delete command. Returning `true` consumes the command.
pub trait DeleteHandler {
    fn handle(&self, tree: &mut Tree, range: &Range) -> bool;
}

impl<F> UnremovablePredicate for F
where
    F: Fn(&Tree, NodeId, NodeId) -> bool,
{
    fn matches(&self, tree: &Tree, node: NodeId, root: NodeId) -> bool {
        self(tree, node, root)
    }
}

impl<F> UnbreakablePredicate for F
where
    F: Fn(&Tree, NodeId) -> bool,
{
    fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        self(tree, node)
    }
}

impl<F> BeforeRemoveHandler for F
where
    F: Fn(&Tree, NodeId) -> bool,
{
    fn before_remove(&self, tree: &Tree, node: NodeId) -> bool {
        self(tree, node)
    }
}

impl<F> DeleteHandler for F
where
    F: Fn(&mut Tree, &Range) -> bool,
{
    fn handle(&self, tree: &mut Tree, range: &Range) -> bool {
        self(tree, range)
    }
}

const TEMPLATE_DIRECTIVES: &[&str] = &["t-set", "t-call", "t-if", "t-foreach"];

fn has_unremovable_class(tree: &Tree, node: NodeId, _root: NodeId) -> bool {
    tree.has_class(node, "oe_unremovable")
}

fn is_template_directive(tree: &Tree, node: NodeId, _root: NodeId) -> bool {
    TEMPLATE_DIRECTIVES
        .iter()
        .any(|directive| tree.has_attribute(node, directive))
}

fn has_unbreakable_class(tree: &Tree, node: NodeId) -> bool {
    tree.has_class(node, "oe_unbreakable")
}

/// Ordered strategy lists consulted by the delete commands.
pub struct Resources {
    unremovable: Vec<Box<dyn UnremovablePredicate>>,
    unbreakable: Vec<Box<dyn UnbreakablePredicate>>,
    before_remove: Vec<Box<dyn BeforeRemoveHandler>>,
    delete_range: Vec<Box<dyn DeleteHandler>>,
    delete_backward: Vec<Box<dyn DeleteHandler>>,
    delete_forward: Vec<Box<dyn DeleteHandler>>,
}

impl Default for Resources {
    fn default() -> Self {
        let mut resources = Self::empty();
        resources.add_unremovable(has_unremovable_class);
        resources.add_unremovable(is_template_directive);
        resources.add_unbreakable(has_unbreakable_class);
        resources
    }
}

impl Resources {
    /// Registries without the built-in predicates.
    pub fn empty() -> Self {
        Self {
            unremovable: Vec::new(),
            unbreakable: Vec::new(),
            before_remove: Vec::new(),
            delete_range: Vec::new(),
            delete_backward: Vec::new(),
            delete_forward: Vec::new(),
        }
    }

    pub fn add_unremovable(&mut self, predicate: impl UnremovablePredicate + 'static) {
        self.unremovable.push(Box::new(predicate));
    }

    pub fn add_unbreakable(&mut self, predicate: impl UnbreakablePredicate + 'static) {
        self.unbreakable.push(Box::new(predicate));
    }

    pub fn add_before_remove(&mut self, handler: impl BeforeRemoveHandler + 'static) {
        self.before_remove.push(Box::new(handler));
    }

    pub fn add_delete_range_handler(&mut self, handler: impl DeleteHandler + 'static) {
        self.delete_range.push(Box::new(handler));
    }

    pub fn add_delete_backward_handler(&mut self, handler: impl DeleteHandler + 'static) {
        self.delete_backward.push(Box::new(handler));
    }

    pub fn add_delete_forward_handler(&mut self, handler: impl DeleteHandler + 'static) {
        self.delete_forward.push(Box::new(handler));
    }

    pub fn matches_unremovable(&self, tree: &Tree, node: NodeId, root: NodeId) -> bool {
        self.unremovable
            .iter()
            .any(|predicate| predicate.matches(tree, node, root))
    }

    pub fn matches_unbreakable(&self, tree: &Tree, node: NodeId) -> bool {
        self.unbreakable
            .iter()
            .any(|predicate| predicate.matches(tree, node))
    }

    pub fn run_before_remove(&self, tree: &Tree, node: NodeId) -> bool {
        self.before_remove
            .iter()
            .any(|handler| handler.before_remove(tree, node))
    }

    pub(crate) fn handle(&self, hook: DeleteHook, tree: &mut Tree, range: &Range) -> bool {
        let handlers = match hook {
            DeleteHook::Range => &self.delete_range,
            DeleteHook::Backward => &self.delete_backward,
            DeleteHook::Forward => &self.delete_forward,
        };
        handlers.iter().any(|handler| handler.handle(tree, range))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeleteHook {
    Range,
    Backward,
    Forward,
}
