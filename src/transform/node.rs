//! Node handles and per-node storage
//!
//! Nodes live in the arena owned by [`TransformTree`](super::TransformTree).
//! A node owns its list of children; the parent link is a plain handle used
//! for lookups and invalidation only.

use std::fmt;

use smallvec::SmallVec;

use super::cache::MatrixCache;
use super::transform::Transform2D;

/// Generational handle to a node in a [`TransformTree`](super::TransformTree).
///
/// Handles stay cheap to copy and compare. A handle whose node was destroyed
/// is rejected rather than aliasing whatever reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the arena
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.index
    }

    /// Generation of the slot when this handle was issued
    #[must_use]
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}v{}", self.index, self.generation)
    }
}

/// Children list, inline for the common small fan-out
pub(crate) type Children = SmallVec<[NodeId; 8]>;

/// A live node.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) transform: Transform2D,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Children,
    pub(crate) cache: MatrixCache,
}

impl Node {
    pub(crate) fn new(transform: Transform2D) -> Self {
        Self {
            transform,
            parent: None,
            children: Children::new(),
            cache: MatrixCache::new(),
        }
    }

    /// Remove `child` from the children list, keeping order.
    pub(crate) fn remove_child(&mut self, child: NodeId) -> bool {
        if let Some(pos) = self.children.iter().position(|&c| c == child) {
            self.children.remove(pos);
            true
        } else {
            false
        }
    }
}

/// Description of a node to create.
///
/// # Example
///
/// ```ignore
/// let arm = tree.create(
///     NodeDesc::new(Transform2D::from_position(DVec2::new(10.0, 0.0)))
///         .with_parent(body)
///         .with_child(hand),
/// )?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct NodeDesc {
    /// Initial local parameters
    pub transform: Transform2D,
    /// Parent to attach to
    pub parent: Option<NodeId>,
    /// Existing nodes to attach as children, in order
    pub children: Vec<NodeId>,
}

impl NodeDesc {
    /// Describe a parentless, childless node
    #[must_use]
    pub fn new(transform: Transform2D) -> Self {
        Self {
            transform,
            ..Default::default()
        }
    }

    /// Attach the new node under `parent`
    #[must_use]
    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Attach `child` under the new node
    #[must_use]
    pub fn with_child(mut self, child: NodeId) -> Self {
        self.children.push(child);
        self
    }

    /// Attach every node in `children` under the new node
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = NodeId>) -> Self {
        self.children.extend(children);
        self
    }
}
