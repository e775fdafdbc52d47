//! Closed-form position solvers.
//!
//! - [`planar`] places a joint from two known points and two bar lengths (trilateration).
//! - [`spatial`] places a joint from three known points and three distances (tetrahedron apex).
//!
//! Both are pure: identical inputs always give identical outputs, and a configuration with no
//! real solution is reported as a [`GeometryFault`](crate::error::GeometryFault) instead of NaN.

pub mod planar;
pub mod spatial;

/// A known point and the bar length from it to the joint being solved.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Constraint<P> {
    pub anchor: P,
    pub length: f64,
}

impl<P> Constraint<P> {
    #[inline]
    pub fn new(anchor: P, length: f64) -> Self {
        Self { anchor, length }
    }
}
