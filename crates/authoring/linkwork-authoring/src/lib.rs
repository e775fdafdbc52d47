//! Linkwork authoring
//!
//! Editing of [`MechanismSpec`](linkwork_core::MechanismSpec)s independent of any running
//! simulation. An [`Editor`] applies joint, role and bar edits to a spec, records each as an
//! invertible [`Edit`] for undo/redo, and builds a fresh
//! [`Simulation`](linkwork_core::Simulation) from a snapshot on request.

pub mod edit;
pub mod editor;
pub mod error;

pub use edit::Edit;
pub use editor::{EdgeChange, Editor, Selection};
pub use error::EditError;
