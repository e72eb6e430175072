//! Local transform parameters

use glam::{DAffine2, DVec2};
use serde::{Deserialize, Serialize};

use crate::math::{self, approx_eq, vec_approx_eq};

/// Position, scale, and rotation of a node relative to its parent.
///
/// The local matrix applies scale first, then rotation about the node's
/// origin, then translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    /// Offset relative to the parent (or the world for roots)
    pub position: DVec2,
    /// Non-uniform scale factor
    pub scale: DVec2,
    /// Rotation in radians
    pub rotation: f64,
}

impl Transform2D {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        position: DVec2::ZERO,
        scale: DVec2::ONE,
        rotation: 0.0,
    };

    /// Create a new transform at the origin
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    #[must_use]
    pub fn from_position(position: DVec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create from position, rotation, and scale
    #[must_use]
    pub const fn from_parts(position: DVec2, rotation: f64, scale: DVec2) -> Self {
        Self {
            position,
            scale,
            rotation,
        }
    }

    /// Replace the rotation
    #[must_use]
    pub const fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// Replace the scale
    #[must_use]
    pub const fn with_scale(mut self, scale: DVec2) -> Self {
        self.scale = scale;
        self
    }

    /// Replace the scale with the same factor on both axes
    #[must_use]
    pub const fn with_uniform_scale(mut self, factor: f64) -> Self {
        self.scale = DVec2::new(factor, factor);
        self
    }

    /// The local-to-parent matrix
    #[must_use]
    pub fn matrix(&self) -> DAffine2 {
        math::compose(self.scale, self.rotation, self.position)
    }

    /// Whether both scale components are non-zero and finite.
    #[must_use]
    pub fn is_invertible(&self) -> bool {
        self.scale.x != 0.0 && self.scale.y != 0.0 && self.scale.is_finite()
    }

    /// Compare local parameters within `eps`.
    ///
    /// World placement and hierarchy are not considered.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        vec_approx_eq(self.position, other.position, eps)
            && approx_eq(self.rotation, other.rotation, eps)
            && vec_approx_eq(self.scale, other.scale, eps)
    }

    /// Rebuild parameters from an affine matrix.
    ///
    /// Shear cannot be represented, so matrices produced by non-uniform scale
    /// under rotation only round-trip approximately.
    #[must_use]
    pub fn from_matrix(matrix: DAffine2) -> Self {
        let (scale, rotation, position) = matrix.to_scale_angle_translation();
        Self {
            position,
            scale,
            rotation,
        }
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}
