//! Planar trilateration.

use super::Constraint;
use crate::error::GeometryFault;
use crate::space::Orientation;
use nalgebra::{Rotation2, Vector2};

/// Place `k` at `first.length` from `first.anchor` and `second.length` from `second.anchor`.
///
/// With `i`, `j` the two anchors, the included angle at `i` follows from the law of cosines and
/// `k = i + R(±φ)·(j − i)/|j − i|·d_ik`. Of the two mirror solutions across line `ij`, the one
/// kept is chosen by ordering the pair so that the triangle `(i, j, estimate)` winds the same
/// way as `orientation`; without an estimate the pair is used as given and `k` lands on the
/// `orientation` side of `i → j`.
pub fn trilaterate(
    first: Constraint<Vector2<f64>>,
    second: Constraint<Vector2<f64>>,
    estimate: Option<&Vector2<f64>>,
    orientation: Orientation,
    tolerance: f64,
) -> Result<Vector2<f64>, GeometryFault> {
    let sign = orientation.sign();
    let (i, j) = match estimate {
        Some(k) if winding(&first.anchor, &second.anchor, k) * sign < 0.0 => (second, first),
        _ => (first, second),
    };

    let baseline = j.anchor - i.anchor;
    let d_ij = baseline.norm();
    if d_ij == 0.0 || !d_ij.is_finite() {
        return Err(GeometryFault::CoincidentPoints);
    }
    let (d_ik, d_jk) = (i.length, j.length);

    let slack = tolerance * (d_ij + d_ik + d_jk);
    if (d_ik - d_jk).abs() > d_ij + slack || d_ik + d_jk < d_ij - slack {
        return Err(GeometryFault::TriangleInequality {
            baseline: d_ij,
            first: d_ik,
            second: d_jk,
        });
    }
    if d_ik == 0.0 {
        return Ok(i.anchor);
    }

    let cos_phi = ((d_ij * d_ij + d_ik * d_ik - d_jk * d_jk) / (2.0 * d_ij * d_ik)).clamp(-1.0, 1.0);
    let phi = cos_phi.acos();
    let direction = baseline / d_ij;
    Ok(i.anchor + Rotation2::new(sign * phi) * direction * d_ik)
}

/// z-component of `(b − a) × (c − a)`; positive when `a → b → c` turns counter-clockwise.
#[inline]
pub fn winding(a: &Vector2<f64>, b: &Vector2<f64>, c: &Vector2<f64>) -> f64 {
    let ab = b - a;
    let ac = c - a;
    ab.x * ac.y - ab.y * ac.x
}
