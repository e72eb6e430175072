//! Errors reported by transform tree operations

use super::node::NodeId;

/// Contract violations detected by [`TransformTree`](super::TransformTree).
///
/// Every failing operation leaves the tree exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    /// Attaching `child` under `parent` would make a node its own ancestor
    Cycle {
        /// Requested parent
        parent: NodeId,
        /// Requested child
        child: NodeId,
    },
    /// Child index out of `[0, len)`
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of children
        len: usize,
    },
    /// A matrix inversion or axis normalization hit a zero-scale axis
    Degenerate {
        /// Node whose transform is degenerate
        node: NodeId,
    },
    /// A matrix with shear cannot be expressed as position, rotation, and scale
    Shear {
        /// Node whose world placement could not be preserved
        node: NodeId,
    },
    /// The handle does not refer to a live node
    NoSuchNode(NodeId),
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cycle { parent, child } => {
                write!(f, "cannot attach {child} under {parent}: would create a cycle")
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "child index {index} out of bounds (child count {len})")
            }
            Self::Degenerate { node } => write!(f, "degenerate transform on {node}"),
            Self::Shear { node } => {
                write!(f, "world transform of {node} has shear and cannot be preserved")
            }
            Self::NoSuchNode(node) => write!(f, "no such node: {node}"),
        }
    }
}

impl std::error::Error for TransformError {}

/// Result alias for transform tree operations
pub type Result<T> = std::result::Result<T, TransformError>;
