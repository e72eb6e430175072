//! Numeric primitives
//!
//! Thin helpers over glam's double-precision 2D types.

mod affine;

pub use affine::{EPSILON, approx_eq, compose, try_inverse, try_normalize, vec_approx_eq};
pub use glam::{DAffine2, DVec2};
