//! Error types for linkage construction and simulation

use crate::graph::JointRole;
use crate::ids::JointId;
use serde::{Deserialize, Serialize};

/// Why a single closed-form solve has no real (or no unique) answer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum GeometryFault {
    /// The two dependency points coincide, so the baseline has no direction.
    #[error("dependency points coincide")]
    CoincidentPoints,

    /// The bar lengths cannot close a triangle over the current baseline.
    #[error("no triangle with baseline {baseline} and bars {first} / {second}")]
    TriangleInequality {
        baseline: f64,
        first: f64,
        second: f64,
    },

    /// The reference points are coincident or colinear and span no frame.
    #[error("reference points do not span a frame")]
    DegenerateFrame,

    /// The three spheres do not intersect.
    #[error("negative radicand {radicand}")]
    NegativeRadicand { radicand: f64 },
}

/// Comprehensive error type for linkage operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum LinkageError {
    /// Malformed authoring input
    #[error("Graph configuration error: {reason}")]
    GraphConfiguration { reason: String },

    /// Some dynamic joints never reached two resolved neighbours
    #[error("Mechanism is underconstrained: {} dynamic joint(s) cannot be scheduled ({unscheduled:?})", .unscheduled.len())]
    Underconstrained { unscheduled: Vec<JointId> },

    /// A solve for the current tick has no real or no unique solution
    #[error("Degenerate geometry at joint {joint}: {fault}")]
    DegenerateGeometry { joint: JointId, fault: GeometryFault },

    /// No edge connects the two joints
    #[error("No edge between {a} and {b}")]
    EdgeNotFound { a: JointId, b: JointId },

    /// Joint id outside the graph
    #[error("Joint not found: {joint}")]
    JointNotFound { joint: JointId },

    /// No motor drives the joint
    #[error("No motor drives joint {joint}")]
    MotorNotFound { joint: JointId },

    /// Operation not allowed for the joint's role
    #[error("Joint {joint} is {actual:?}, expected {expected:?}")]
    RoleMismatch {
        joint: JointId,
        expected: JointRole,
        actual: JointRole,
    },

    /// A caller-supplied number is NaN or infinite
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl LinkageError {
    /// Shorthand for a [`LinkageError::GraphConfiguration`] error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::GraphConfiguration {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`LinkageError::InvalidInput`] error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Only degenerate geometry is recoverable, by adjusting inputs and ticking again.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DegenerateGeometry { .. })
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::GraphConfiguration { .. } | Self::Underconstrained { .. } => "build",
            Self::DegenerateGeometry { .. } => "geometry",
            Self::EdgeNotFound { .. }
            | Self::JointNotFound { .. }
            | Self::MotorNotFound { .. }
            | Self::RoleMismatch { .. }
            | Self::InvalidInput { .. } => "usage",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl From<serde_json::Error> for LinkageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
