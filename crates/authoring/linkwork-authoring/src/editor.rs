use crate::edit::{delete_joint, Edit};
use crate::error::EditError;
use linkwork_core::{Dimension, JointRole, JointSpec, MechanismSpec, Simulation, SolverConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a toggle did to the bar between two joints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum EdgeChange {
    Added { from: String, to: String },
    Removed { from: String, to: String },
}

/// Outcome of one step of the two-step selection protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Selection {
    /// First joint remembered; the next selection of another joint toggles a bar.
    Pending { name: String },
    /// The remembered joint was selected again and forgotten.
    Cleared,
    Toggled(EdgeChange),
}

/// Undoable editor over one mechanism spec.
#[derive(Clone, Debug)]
pub struct Editor<D: Dimension> {
    spec: MechanismSpec<D>,
    selection: Option<String>,
    undo: Vec<Edit<D::Point>>,
    redo: Vec<Edit<D::Point>>,
}

impl<D: Dimension> Default for Editor<D> {
    fn default() -> Self {
        Self::new(MechanismSpec::default())
    }
}

impl<D: Dimension> Editor<D> {
    pub fn new(spec: MechanismSpec<D>) -> Self {
        Self {
            spec,
            selection: None,
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, EditError> {
        Ok(Self::new(MechanismSpec::from_json(text)?))
    }

    pub fn to_json(&self) -> Result<String, EditError> {
        Ok(self.spec.to_json()?)
    }

    pub fn spec(&self) -> &MechanismSpec<D> {
        &self.spec
    }

    pub fn into_spec(self) -> MechanismSpec<D> {
        self.spec
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Pointer-style selection: the first pick is remembered, picking it again forgets it, and
    /// picking a second joint toggles the bar between the two and clears the selection.
    pub fn select(&mut self, name: &str) -> Result<Selection, EditError> {
        self.index_of(name)?;
        match self.selection.take() {
            None => {
                self.selection = Some(name.to_string());
                Ok(Selection::Pending {
                    name: name.to_string(),
                })
            }
            Some(first) if first == name => Ok(Selection::Cleared),
            Some(first) => self.toggle_edge(&first, name).map(Selection::Toggled),
        }
    }

    /// Remove `a → b` if `a` declares `b`, else `b → a` if `b` declares `a`, else add `a → b`.
    pub fn toggle_edge(&mut self, a: &str, b: &str) -> Result<EdgeChange, EditError> {
        if a == b {
            return Err(EditError::SelfEdge {
                name: a.to_string(),
            });
        }
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;

        let declared = |from: usize, to: &str| self.spec.joints[from].edges.iter().position(|e| e == to);
        let (edit, change) = if let Some(index) = declared(ia, b) {
            retract(a, b, index)
        } else if let Some(index) = declared(ib, a) {
            retract(b, a, index)
        } else {
            let index = self.spec.joints[ia].edges.len();
            (
                Edit::DeclareEdge {
                    from: a.to_string(),
                    to: b.to_string(),
                    index,
                },
                EdgeChange::Added {
                    from: a.to_string(),
                    to: b.to_string(),
                },
            )
        };
        debug!(?change, "edge toggled");
        self.record(edit);
        Ok(change)
    }

    /// Append a joint. Its own declarations must name joints that already exist.
    pub fn add_joint(&mut self, joint: JointSpec<D::Point>) -> Result<(), EditError> {
        if self.spec.joint(&joint.name).is_some() {
            return Err(EditError::DuplicateJoint { name: joint.name });
        }
        for target in &joint.edges {
            if *target == joint.name {
                return Err(EditError::SelfEdge { name: joint.name });
            }
            self.index_of(target)?;
        }
        debug!(name = %joint.name, role = ?joint.role, "joint added");
        let index = self.spec.joints.len();
        self.record(Edit::InsertJoint { index, joint });
        Ok(())
    }

    /// Remove a joint with every declaration and motor that names it.
    pub fn remove_joint(&mut self, name: &str) -> Result<(), EditError> {
        let index = self.index_of(name)?;
        if self.selection.as_deref() == Some(name) {
            self.selection = None;
        }
        let edit = delete_joint(&self.spec, index);
        debug!(name, "joint removed");
        self.record(edit);
        Ok(())
    }

    pub fn set_role(&mut self, name: &str, role: JointRole) -> Result<(), EditError> {
        let index = self.index_of(name)?;
        let before = self.spec.joints[index].role;
        if before == role {
            return Ok(());
        }
        self.record(Edit::SetRole {
            name: name.to_string(),
            before,
            after: role,
        });
        Ok(())
    }

    /// Change a joint's authored position; bar lengths are re-measured on the next build.
    pub fn move_joint(&mut self, name: &str, position: D::Point) -> Result<(), EditError> {
        let index = self.index_of(name)?;
        let before = self.spec.joints[index].position;
        self.record(Edit::MoveJoint {
            name: name.to_string(),
            before,
            after: position,
        });
        Ok(())
    }

    pub fn undo(&mut self) -> Result<(), EditError> {
        let edit = self.undo.pop().ok_or(EditError::NothingToUndo)?;
        edit.revert(&mut self.spec);
        self.redo.push(edit);
        self.drop_stale_selection();
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), EditError> {
        let edit = self.redo.pop().ok_or(EditError::NothingToRedo)?;
        edit.apply(&mut self.spec);
        self.undo.push(edit);
        self.drop_stale_selection();
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Edits that `undo` would revert, oldest first.
    pub fn history(&self) -> &[Edit<D::Point>] {
        &self.undo
    }

    /// Build a fresh simulation from the current spec. The editor keeps its state; a running
    /// simulation never sees later edits.
    pub fn build(&self, config: SolverConfig) -> Result<Simulation<D>, EditError> {
        Ok(Simulation::from_spec(&self.spec, config)?)
    }

    fn record(&mut self, edit: Edit<D::Point>) {
        edit.apply(&mut self.spec);
        self.undo.push(edit);
        self.redo.clear();
    }

    fn drop_stale_selection(&mut self) {
        if let Some(name) = &self.selection {
            if self.spec.joint(name).is_none() {
                debug!(name = %name, "selection cleared; joint no longer exists");
                self.selection = None;
            }
        }
    }

    fn index_of(&self, name: &str) -> Result<usize, EditError> {
        self.spec
            .joints
            .iter()
            .position(|j| j.name == name)
            .ok_or_else(|| EditError::unknown(name))
    }
}

fn retract<P>(from: &str, to: &str, index: usize) -> (Edit<P>, EdgeChange) {
    (
        Edit::RetractEdge {
            from: from.to_string(),
            to: to.to_string(),
            index,
        },
        EdgeChange::Removed {
            from: from.to_string(),
            to: to.to_string(),
        },
    )
}
