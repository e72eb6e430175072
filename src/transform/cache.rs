//! Lazily computed node matrices
//!
//! Each node carries a [`MatrixCache`] holding its four derived matrices.
//! The matrices are computed together and dropped together, so a cache is
//! either fully valid or fully invalid.
//!
//! The cache uses interior mutability (`Cell`) so that read queries can fill
//! it through a shared reference to the tree.

use std::cell::Cell;

use glam::DAffine2;

use crate::math::try_inverse;

use super::transform::Transform2D;

/// The four matrices derived from a node's parameters and ancestry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeMatrices {
    /// Local frame to parent frame
    pub local_to_parent: DAffine2,
    /// Parent frame to local frame
    pub parent_to_local: DAffine2,
    /// Local frame to world frame
    pub local_to_world: DAffine2,
    /// World frame to local frame
    pub world_to_local: DAffine2,
}

impl NodeMatrices {
    /// Compute the matrices for `transform` placed under a parent whose
    /// local-to-world matrix is `parent_world` (`None` for roots).
    ///
    /// Returns `None` if either inversion is undefined.
    pub(crate) fn compute(transform: &Transform2D, parent_world: Option<DAffine2>) -> Option<Self> {
        if !transform.is_invertible() {
            return None;
        }
        let local_to_parent = transform.matrix();
        let parent_to_local = try_inverse(local_to_parent)?;

        let (local_to_world, world_to_local) = match parent_world {
            Some(parent_world) => {
                let local_to_world = parent_world * local_to_parent;
                (local_to_world, try_inverse(local_to_world)?)
            }
            None => (local_to_parent, parent_to_local),
        };

        Some(Self {
            local_to_parent,
            parent_to_local,
            local_to_world,
            world_to_local,
        })
    }
}

/// Memoized matrices with a validity state.
#[derive(Debug, Default)]
pub(crate) struct MatrixCache {
    matrices: Cell<Option<NodeMatrices>>,
}

impl MatrixCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cached matrices, if valid.
    #[inline]
    pub(crate) fn get(&self) -> Option<NodeMatrices> {
        self.matrices.get()
    }

    /// Store freshly computed matrices.
    #[inline]
    pub(crate) fn set(&self, matrices: NodeMatrices) {
        self.matrices.set(Some(matrices));
    }

    /// Drop the matrices. Returns whether the cache was valid.
    #[inline]
    pub(crate) fn invalidate(&self) -> bool {
        self.matrices.take().is_some()
    }

    #[inline]
    pub(crate) fn is_valid(&self) -> bool {
        self.get().is_some()
    }
}

/// Counters for cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of times a node's matrices were computed
    pub recomputations: u64,
    /// Number of valid caches that were invalidated
    pub invalidations: u64,
}
