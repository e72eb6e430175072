//! Hierarchical 2D affine transforms for scene objects
//!
//! This crate provides:
//! - A forest of transform nodes with parent-relative position, scale, and rotation
//! - Lazily cached local/world matrices with downward invalidation
//! - Point and direction conversion between any two node frames

pub mod math;
pub mod transform;

// Re-exports for convenience
pub use glam;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::math::EPSILON;
    pub use crate::transform::{
        CacheStats, NodeDesc, NodeId, NodeMatrices, Transform2D, TransformError, TransformTree,
        TreeConfig,
    };
    pub use glam::{DAffine2, DVec2};
}
