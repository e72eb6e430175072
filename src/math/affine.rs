//! Affine helpers with explicit failure for degenerate input.

use glam::{DAffine2, DVec2};

/// Numerical precision used for equality comparisons.
pub const EPSILON: f64 = 1e-7;

/// Compare two scalars within `eps`.
#[must_use]
#[inline]
pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// Compare two vectors component-wise within `eps`.
#[must_use]
#[inline]
pub fn vec_approx_eq(a: DVec2, b: DVec2, eps: f64) -> bool {
    approx_eq(a.x, b.x, eps) && approx_eq(a.y, b.y, eps)
}

/// Build `Translate(translation) · Rotate(rotation) · Scale(scale)`.
#[must_use]
#[inline]
pub fn compose(scale: DVec2, rotation: f64, translation: DVec2) -> DAffine2 {
    DAffine2::from_scale_angle_translation(scale, rotation, translation)
}

/// Invert an affine matrix.
///
/// Returns `None` when the linear part is singular or the result would
/// contain `NaN`/`Inf`.
#[must_use]
pub fn try_inverse(matrix: DAffine2) -> Option<DAffine2> {
    let det = matrix.matrix2.determinant();
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let inverse = matrix.inverse();
    inverse.is_finite().then_some(inverse)
}

/// Normalize a vector, returning `None` for zero-length or non-finite input.
#[must_use]
#[inline]
pub fn try_normalize(v: DVec2) -> Option<DVec2> {
    v.try_normalize()
}
