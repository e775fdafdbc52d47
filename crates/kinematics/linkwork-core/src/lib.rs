//! Linkwork core (engine-agnostic)
//!
//! Kinematics of rigid bar-joint linkages. A mechanism is authored as joints with initial
//! positions and directed adjacency declarations; [`GraphBuilder::finalize`] freezes it into an
//! undirected [`JointGraph`], [`Schedule::build`] orders the free joints so each one is solved
//! after exactly two known neighbours, and [`Simulation::tick`] advances motors then re-derives
//! every free joint in that order with the closed-form solvers in [`solve`].
//!
//! Planar and spatial mechanisms share every type; the dimensionality is chosen once through the
//! [`Dimension`] parameter ([`Planar`] or [`Spatial`]).

pub mod config;
pub mod error;
pub mod frame;
pub mod graph;
pub mod ids;
pub mod motor;
pub mod schedule;
pub mod sim;
pub mod solve;
pub mod space;
pub mod spec;

// Re-exports for hosts and tools
pub use config::{RadicandPolicy, SolverConfig};
pub use error::{GeometryFault, LinkageError};
pub use frame::{Bar, Frame};
pub use graph::{Edge, GraphBuilder, Joint, JointGraph, JointRole};
pub use ids::{EdgeId, JointId};
pub use motor::{MotorActuator, MotorCommand, MotorConfig};
pub use schedule::{DependencyPair, Schedule};
pub use sim::{Simulation, TickReport};
pub use solve::Constraint;
pub use space::{ApexReference, Dimension, Orientation, Planar, Spatial};
pub use spec::{JointSpec, MechanismSpec, MotorSpec};

/// Convenience alias for results produced by this crate.
pub type Result<T, E = LinkageError> = std::result::Result<T, E>;
