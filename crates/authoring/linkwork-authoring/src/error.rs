//! Error types for mechanism editing

use linkwork_core::LinkageError;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EditError {
    /// No joint with this name in the mechanism
    #[error("Unknown joint '{name}'")]
    UnknownJoint { name: String },

    /// A joint with this name already exists
    #[error("Joint name '{name}' is already taken")]
    DuplicateJoint { name: String },

    /// A bar from a joint to itself
    #[error("Joint '{name}' cannot have a bar to itself")]
    SelfEdge { name: String },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    /// Building or serializing the edited mechanism failed
    #[error(transparent)]
    Linkage(#[from] LinkageError),
}

impl EditError {
    pub(crate) fn unknown(name: &str) -> Self {
        Self::UnknownJoint {
            name: name.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownJoint { .. } | Self::DuplicateJoint { .. } | Self::SelfEdge { .. } => {
                "edit"
            }
            Self::NothingToUndo | Self::NothingToRedo => "history",
            Self::Linkage(err) => err.category(),
        }
    }
}
