//! Motor actuation: rotate a driven joint about a pivot by a commanded angle.
//!
//! Angles are in degrees, wrapped to `[0, 360)`. The initial angle is measured from the authored
//! pose, so a motor starts aligned with the geometry instead of snapping to zero. Each tick the
//! driven joint is rotated by the change in commanded angle since the previous tick.

use crate::error::LinkageError;
use crate::ids::JointId;
use crate::space::Dimension;
use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

/// Input from the motor driver for the next tick.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorCommand {
    /// Jump to an absolute angle (degrees) on the next tick.
    Absolute(f64),
    /// Turn continuously at this many revolutions per second.
    Speed(f64),
}

/// Static description of a motor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotorConfig {
    pub pivot: JointId,
    pub driven: JointId,
    pub axis: Vector3<f64>,
    /// Direction the zero angle points along, measured in the plane normal to `axis`.
    pub reference_axis: Vector3<f64>,
    /// Revolutions per second.
    pub speed: f64,
}

impl MotorConfig {
    pub fn new(pivot: JointId, driven: JointId) -> Self {
        Self {
            pivot,
            driven,
            axis: Vector3::z(),
            reference_axis: Vector3::x(),
            speed: 0.0,
        }
    }

    /// Set the rotation axis. The reference axis is reset to [`default_reference_axis`] for it;
    /// call [`with_reference_axis`](Self::with_reference_axis) afterwards to override.
    pub fn with_axis(mut self, axis: Vector3<f64>) -> Self {
        self.axis = axis;
        self.reference_axis = default_reference_axis(&axis);
        self
    }

    pub fn with_reference_axis(mut self, reference_axis: Vector3<f64>) -> Self {
        self.reference_axis = reference_axis;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MotorActuator {
    pivot: JointId,
    driven: JointId,
    axis: Unit<Vector3<f64>>,
    reference_axis: Vector3<f64>,
    speed: f64,
    angle: f64,
    previous: f64,
    pending: Option<f64>,
}

impl MotorActuator {
    /// Bind a motor to the current pivot and driven positions.
    pub fn attach(
        cfg: &MotorConfig,
        pivot: &Vector3<f64>,
        driven: &Vector3<f64>,
    ) -> Result<Self, LinkageError> {
        let axis = Unit::try_new(cfg.axis, f64::EPSILON).ok_or_else(|| {
            LinkageError::config(format!("motor on {} has a zero rotation axis", cfg.driven))
        })?;
        let in_plane = cfg.reference_axis - axis.into_inner() * cfg.reference_axis.dot(&axis);
        if in_plane.norm_squared() <= f64::EPSILON {
            return Err(LinkageError::config(format!(
                "motor on {}: reference axis is parallel to the rotation axis",
                cfg.driven
            )));
        }

        let angle = wrap_degrees(signed_angle(&cfg.reference_axis, &(driven - pivot), &axis));
        Ok(Self {
            pivot: cfg.pivot,
            driven: cfg.driven,
            axis,
            reference_axis: cfg.reference_axis,
            speed: cfg.speed,
            angle,
            previous: angle,
            pending: None,
        })
    }

    /// Store a command for the next [`advance`](Self::advance). Non-finite values are rejected
    /// and leave the motor untouched.
    pub fn command(&mut self, command: MotorCommand) -> Result<(), LinkageError> {
        match command {
            MotorCommand::Absolute(degrees) if degrees.is_finite() => self.pending = Some(degrees),
            MotorCommand::Speed(speed) if speed.is_finite() => self.speed = speed,
            other => {
                return Err(LinkageError::invalid(format!(
                    "motor on {} commanded with {other:?}",
                    self.driven
                )))
            }
        }
        Ok(())
    }

    /// Advance the commanded angle by one tick and return the change in degrees.
    pub fn advance(&mut self, dt: f64) -> f64 {
        self.angle = match self.pending.take() {
            Some(target) => wrap_degrees(target),
            None => wrap_degrees(self.angle + self.speed * 360.0 * dt),
        };
        let delta = self.angle - self.previous;
        self.previous = self.angle;
        delta
    }

    /// Advance one tick and rotate the driven joint in `positions` by the change.
    pub fn actuate<D: Dimension>(&mut self, dt: f64, positions: &mut [D::Point]) -> f64 {
        let delta = self.advance(dt);
        if delta != 0.0 {
            let pivot = D::embed(&positions[self.pivot.index()]);
            let driven = D::embed(&positions[self.driven.index()]);
            positions[self.driven.index()] = D::project(&self.rotate(&pivot, &driven, delta));
        }
        delta
    }

    /// `driven` rotated about `pivot` and the motor axis by `degrees`.
    pub fn rotate(&self, pivot: &Vector3<f64>, driven: &Vector3<f64>, degrees: f64) -> Vector3<f64> {
        Rotation3::from_axis_angle(&self.axis, degrees.to_radians()) * (driven - pivot) + pivot
    }

    /// Re-measure the angle from the given pose and drop any pending command.
    pub fn rebase(&mut self, pivot: &Vector3<f64>, driven: &Vector3<f64>) {
        self.angle = wrap_degrees(signed_angle(&self.reference_axis, &(driven - pivot), &self.axis));
        self.previous = self.angle;
        self.pending = None;
    }

    pub fn pivot(&self) -> JointId {
        self.pivot
    }

    pub fn driven(&self) -> JointId {
        self.driven
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

/// Zero-angle direction used when none is authored: world +x projected into the plane normal to
/// `axis`, or +y when `axis` lies close to x. Always +x for the planar axis.
pub fn default_reference_axis(axis: &Vector3<f64>) -> Vector3<f64> {
    let Some(n) = axis.try_normalize(f64::EPSILON) else {
        return Vector3::x();
    };
    let seed = if n.x.abs() > 0.9 { Vector3::y() } else { Vector3::x() };
    (seed - n * seed.dot(&n)).normalize()
}

#[inline]
pub fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed angle in degrees from `from` to `to`, both projected into the plane normal to `axis`,
/// positive counter-clockwise when looking down `axis`. Zero if either projection vanishes.
pub fn signed_angle(from: &Vector3<f64>, to: &Vector3<f64>, axis: &Unit<Vector3<f64>>) -> f64 {
    let n = axis.into_inner();
    let a = from - n * from.dot(&n);
    let b = to - n * to.dot(&n);
    if a.norm_squared() == 0.0 || b.norm_squared() == 0.0 {
        return 0.0;
    }
    let unsigned = a.angle(&b).to_degrees();
    if n.dot(&a.cross(&b)) < 0.0 {
        -unsigned
    } else {
        unsigned
    }
}
