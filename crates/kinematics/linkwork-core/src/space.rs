//! Dimensionality of a mechanism.
//!
//! Graph, schedule and simulation are written once and parameterised by a [`Dimension`]: the
//! point type, the reference used to pick one of the two mirror-image solutions, and the
//! closed-form solve that places a joint from its dependency pair.

use crate::config::SolverConfig;
use crate::error::GeometryFault;
use crate::solve::{planar, spatial, Constraint};
use nalgebra::{Vector2, Vector3};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Which way round the planar mechanism was authored, i.e. the sign of the out-of-plane axis
/// the dependency triangles are measured against.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Positive z out of the plane.
    #[default]
    CounterClockwise,
    /// Negative z out of the plane.
    Clockwise,
}

impl Orientation {
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Orientation::CounterClockwise => 1.0,
            Orientation::Clockwise => -1.0,
        }
    }
}

/// Fixed apex (e.g. a cone tip) every spatial joint keeps its authored distance to.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApexReference {
    pub apex: Vector3<f64>,
}

impl Default for ApexReference {
    fn default() -> Self {
        Self {
            apex: Vector3::new(0.0, 1.0, 0.0),
        }
    }
}

/// Point type and solver family of a mechanism.
pub trait Dimension: Copy + Clone + Debug + Default + PartialEq + Send + Sync + 'static {
    type Point: Copy + Debug + PartialEq + Serialize + DeserializeOwned;
    /// Mechanism-wide reference resolving the solution branch.
    type Reference: Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned;
    /// Per-joint reference data frozen from the authored pose.
    type JointReference: Copy + Debug + PartialEq;

    const NAME: &'static str;

    fn distance(a: &Self::Point, b: &Self::Point) -> f64;

    /// Lift into 3-space (planar points gain `z = 0`).
    fn embed(p: &Self::Point) -> Vector3<f64>;

    /// Drop back from 3-space.
    fn project(v: &Vector3<f64>) -> Self::Point;

    /// Whether a motor may rotate about `axis` without leaving the point space.
    fn supports_axis(axis: &Vector3<f64>) -> bool;

    fn joint_reference(reference: &Self::Reference, authored: &Self::Point)
        -> Self::JointReference;

    /// Whether the dependency pair must be swapped so the authored pose is the branch the
    /// solver returns. Called once, at schedule time.
    fn swap_pair(
        first: &Self::Point,
        second: &Self::Point,
        authored: &Self::Point,
        reference: &Self::Reference,
    ) -> bool;

    /// Place a joint from its two dependency constraints. `estimate` is the joint's position
    /// from the previous tick.
    fn resolve(
        first: Constraint<Self::Point>,
        second: Constraint<Self::Point>,
        estimate: &Self::Point,
        reference: &Self::Reference,
        joint_reference: &Self::JointReference,
        cfg: &SolverConfig,
    ) -> Result<Self::Point, GeometryFault>;
}

/// Mechanisms moving in the xy-plane.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Planar;

/// Mechanisms moving in 3-space, disambiguated by an apex reference.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Spatial;

impl Dimension for Planar {
    type Point = Vector2<f64>;
    type Reference = Orientation;
    type JointReference = ();

    const NAME: &'static str = "planar";

    #[inline]
    fn distance(a: &Self::Point, b: &Self::Point) -> f64 {
        (b - a).norm()
    }

    #[inline]
    fn embed(p: &Self::Point) -> Vector3<f64> {
        Vector3::new(p.x, p.y, 0.0)
    }

    #[inline]
    fn project(v: &Vector3<f64>) -> Self::Point {
        Vector2::new(v.x, v.y)
    }

    fn supports_axis(axis: &Vector3<f64>) -> bool {
        axis.z != 0.0 && axis.x == 0.0 && axis.y == 0.0
    }

    fn joint_reference(_: &Self::Reference, _: &Self::Point) -> Self::JointReference {}

    // Planar chirality is re-checked every tick against the previous position.
    fn swap_pair(_: &Self::Point, _: &Self::Point, _: &Self::Point, _: &Self::Reference) -> bool {
        false
    }

    fn resolve(
        first: Constraint<Self::Point>,
        second: Constraint<Self::Point>,
        estimate: &Self::Point,
        reference: &Self::Reference,
        _: &Self::JointReference,
        cfg: &SolverConfig,
    ) -> Result<Self::Point, GeometryFault> {
        planar::trilaterate(first, second, Some(estimate), *reference, cfg.tolerance)
    }
}

impl Dimension for Spatial {
    type Point = Vector3<f64>;
    type Reference = ApexReference;
    /// Authored distance to the apex.
    type JointReference = f64;

    const NAME: &'static str = "spatial";

    #[inline]
    fn distance(a: &Self::Point, b: &Self::Point) -> f64 {
        (b - a).norm()
    }

    #[inline]
    fn embed(p: &Self::Point) -> Vector3<f64> {
        *p
    }

    #[inline]
    fn project(v: &Vector3<f64>) -> Self::Point {
        *v
    }

    fn supports_axis(axis: &Vector3<f64>) -> bool {
        axis.norm_squared() > 0.0
    }

    fn joint_reference(reference: &Self::Reference, authored: &Self::Point) -> f64 {
        (authored - reference.apex).norm()
    }

    fn swap_pair(
        first: &Self::Point,
        second: &Self::Point,
        authored: &Self::Point,
        reference: &Self::Reference,
    ) -> bool {
        match spatial::local_frame(first, second, &reference.apex) {
            Some(frame) => frame.w_axis.dot(&(authored - first)) < 0.0,
            None => false,
        }
    }

    fn resolve(
        first: Constraint<Self::Point>,
        second: Constraint<Self::Point>,
        _: &Self::Point,
        reference: &Self::Reference,
        apex_distance: &f64,
        cfg: &SolverConfig,
    ) -> Result<Self::Point, GeometryFault> {
        let apex = Constraint::new(reference.apex, *apex_distance);
        spatial::tetrahedron_apex(first, second, apex, cfg.radicand_policy, cfg.tolerance)
    }
}
