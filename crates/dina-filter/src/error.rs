//! Error types for filter tree edits.

use crate::tree::NodeId;
use thiserror::Error;

/// Error raised by a filter tree operation.
///
/// Invariant violations (`EmptyGroup`, `SingletonGroup`, ...) are only ever
/// produced by [`FilterTree::validate`](crate::FilterTree::validate); the
/// mutating operations keep the tree well-formed and only report unknown ids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// No node with this id exists in the tree.
    #[error("no filter node with id {0}")]
    NodeNotFound(NodeId),

    /// The root node is not a group.
    #[error("root node {0} is not a group")]
    RootNotGroup(NodeId),

    /// A group has no children.
    #[error("group {0} has no children")]
    EmptyGroup(NodeId),

    /// A non-root group has a single child and should have been collapsed.
    #[error("group {0} has a single child and should have been collapsed")]
    SingletonGroup(NodeId),

    /// A node is reachable from more than one parent.
    #[error("node {0} is referenced more than once")]
    DuplicateNode(NodeId),

    /// A node is stored in the arena but unreachable from the root.
    #[error("node {0} is not reachable from the root")]
    OrphanNode(NodeId),

    /// A node id was not allocated by this tree's counter.
    #[error("node id {0} was not allocated by this tree")]
    ForeignId(NodeId),
}
