//! Tree traversal
//!
//! [`TreeVisitor`] walks a tree depth-first. Every hook receives a node by
//! value and returns the node to keep, a replacement, or `None` to delete it.
//!
//! # Traversal Order
//!
//! For each node: `pre_visit` → `visit_node` → children (through `visit`) →
//! `post_visit`. An absent result at any stage ends the visit of that node.

use crate::tree::Tree;
use std::error::Error;

/// Outcome of visiting one node
///
/// - `Ok(Some(tree))`: keep `tree` (possibly rewritten)
/// - `Ok(None)`: delete the node
/// - `Err(_)`: the visit failed; callers decide whether the failure is fatal
pub type VisitResult<T> = Result<Option<T>, VisitError>;

/// Visitor over the tree kind `T` with context parameter `P`
///
/// All hooks default to passing the node through unchanged, so an empty impl
/// is a no-op visitor.
pub trait TreeVisitor<T: Tree, P: ?Sized> {
    /// Whether this visitor understands `tree` at all
    ///
    /// Checked by [`visit_root`] before descending. Returning `false` makes
    /// the whole visit a no-op.
    #[inline]
    fn is_acceptable(&self, _tree: &T, _p: &P) -> bool {
        true
    }

    /// Hook before the node and its children are visited
    ///
    /// # Errors
    /// Implementations return [`VisitError`] when the node cannot be handled.
    #[inline]
    fn pre_visit(&mut self, tree: T, _p: &P) -> VisitResult<T> {
        Ok(Some(tree))
    }

    /// Hook for the node itself, before its children
    ///
    /// # Errors
    /// Implementations return [`VisitError`] when the node cannot be handled.
    #[inline]
    fn visit_node(&mut self, tree: T, _p: &P) -> VisitResult<T> {
        Ok(Some(tree))
    }

    /// Hook after the node's children were visited
    ///
    /// # Errors
    /// Implementations return [`VisitError`] when the node cannot be handled.
    #[inline]
    fn post_visit(&mut self, tree: T, _p: &P) -> VisitResult<T> {
        Ok(Some(tree))
    }

    /// Visit `tree` and everything below it
    ///
    /// Overriding this replaces the traversal for this visitor.
    ///
    /// # Errors
    /// Returns the first error raised by any hook.
    fn visit(&mut self, tree: T, p: &P) -> VisitResult<T> {
        let Some(tree) = self.pre_visit(tree, p)? else {
            return Ok(None);
        };
        let Some(tree) = self.visit_node(tree, p)? else {
            return Ok(None);
        };
        let tree = tree.try_map_children(|child| self.visit(child, p))?;
        self.post_visit(tree, p)
    }
}

/// Visit a root tree, honouring [`TreeVisitor::is_acceptable`]
///
/// A tree the visitor does not accept is returned unchanged.
///
/// # Errors
/// Returns the first error raised by the visitor.
pub fn visit_root<T, P, V>(visitor: &mut V, tree: T, p: &P) -> VisitResult<T>
where
    T: Tree,
    P: ?Sized,
    V: TreeVisitor<T, P> + ?Sized,
{
    if !visitor.is_acceptable(&tree, p) {
        return Ok(Some(tree));
    }
    visitor.visit(tree, p)
}

/// Errors raised while visiting a tree
#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    /// Generic failure
    #[error("{0}")]
    Failed(String),

    /// The tree is not in a shape the visitor can handle
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Failure from a collaborator
    #[error(transparent)]
    Other(Box<dyn Error + Send + Sync>),
}

impl VisitError {
    /// Create generic failure
    #[inline]
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wrap a collaborator error
    #[inline]
    #[must_use]
    pub fn other(error: impl Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }
}
