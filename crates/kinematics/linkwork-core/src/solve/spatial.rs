//! Spatial tetrahedron-apex solve.

use super::Constraint;
use crate::config::RadicandPolicy;
use crate::error::GeometryFault;
use nalgebra::Vector3;
use tracing::warn;

/// Orthonormal frame spanned by three reference points: `u` along `p1 → p2`, `v` towards `p3`
/// within the plane, `w = u × v`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalFrame {
    pub u_axis: Vector3<f64>,
    pub v_axis: Vector3<f64>,
    pub w_axis: Vector3<f64>,
    /// `(p2 − p1)·u`
    pub u2: f64,
    /// `(p3 − p1)·u`
    pub u3: f64,
    /// `(p3 − p1)·v`
    pub v3: f64,
}

/// Build the local frame, or `None` when the points are coincident or colinear.
pub fn local_frame(p1: &Vector3<f64>, p2: &Vector3<f64>, p3: &Vector3<f64>) -> Option<LocalFrame> {
    let d2 = p2 - p1;
    let d3 = p3 - p1;
    let u2 = d2.norm();
    if u2 == 0.0 || !u2.is_finite() {
        return None;
    }
    let u_axis = d2 / u2;
    let u3 = d3.dot(&u_axis);
    let perp = d3 - u_axis * u3;
    let v3 = perp.norm();
    if v3 <= f64::EPSILON * d3.norm().max(u2) {
        return None;
    }
    let v_axis = perp / v3;
    Some(LocalFrame {
        u_axis,
        v_axis,
        w_axis: u_axis.cross(&v_axis),
        u2,
        u3,
        v3,
    })
}

/// Fourth vertex of the tetrahedron with base `(p1, p2, p3)` and edge lengths `r1, r2, r3`.
///
/// Only the root with `w >= 0` (on the `u × v` side of the base) is returned. A negative radicand
/// means the spheres do not meet; `policy` decides whether that fails or is patched up.
pub fn tetrahedron_apex(
    first: Constraint<Vector3<f64>>,
    second: Constraint<Vector3<f64>>,
    third: Constraint<Vector3<f64>>,
    policy: RadicandPolicy,
    tolerance: f64,
) -> Result<Vector3<f64>, GeometryFault> {
    let f = local_frame(&first.anchor, &second.anchor, &third.anchor)
        .ok_or(GeometryFault::DegenerateFrame)?;
    let (r1, r2, r3) = (first.length, second.length, third.length);

    let u = (r1 * r1 - r2 * r2 + f.u2 * f.u2) / (2.0 * f.u2);
    let v = (r1 * r1 - r3 * r3 + f.u3 * f.u3 + f.v3 * f.v3 - 2.0 * u * f.u3) / (2.0 * f.v3);
    let radicand = r1 * r1 - u * u - v * v;

    let scale = r1 * r1 + u * u + v * v;
    let radicand = if radicand >= -tolerance * scale {
        radicand.max(0.0)
    } else {
        match policy {
            RadicandPolicy::Strict => return Err(GeometryFault::NegativeRadicand { radicand }),
            RadicandPolicy::ClampToZero => {
                warn!(radicand, "spheres do not meet; clamping radicand to zero");
                0.0
            }
            RadicandPolicy::Absolute => {
                warn!(radicand, "spheres do not meet; using absolute radicand");
                radicand.abs()
            }
        }
    };
    let w = radicand.sqrt();

    Ok(first.anchor + f.u_axis * u + f.v_axis * v + f.w_axis * w)
}
