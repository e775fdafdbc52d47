//! Invertible edits on a [`MechanismSpec`].
//!
//! Each variant carries enough of the state it replaced to be reverted exactly, including list
//! positions, so undo followed by redo reproduces the mechanism bit for bit.

use linkwork_core::{Dimension, JointRole, JointSpec, MechanismSpec, MotorSpec};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Edit<P> {
    /// `from` gained a declaration of `to` at `index` in its edge list.
    DeclareEdge {
        from: String,
        to: String,
        index: usize,
    },
    /// `from` lost the declaration of `to` that sat at `index`.
    RetractEdge {
        from: String,
        to: String,
        index: usize,
    },
    InsertJoint { index: usize, joint: JointSpec<P> },
    /// The joint at `index` was removed together with every declaration and motor naming it.
    DeleteJoint {
        index: usize,
        joint: JointSpec<P>,
        /// `(declaring joint, position)` in ascending position order per joint.
        references: Vec<(String, usize)>,
        /// `(position, motor)` in ascending order.
        motors: Vec<(usize, MotorSpec)>,
    },
    SetRole {
        name: String,
        before: JointRole,
        after: JointRole,
    },
    MoveJoint { name: String, before: P, after: P },
}

impl<P: Clone> Edit<P> {
    /// Re-apply the edit to the state it was recorded against.
    pub fn apply<D>(&self, spec: &mut MechanismSpec<D>)
    where
        D: Dimension<Point = P>,
    {
        match self {
            Edit::DeclareEdge { from, to, index } => {
                if let Some(joint) = spec.joint_mut(from) {
                    joint.edges.insert(*index, to.clone());
                }
            }
            Edit::RetractEdge { from, index, .. } => {
                if let Some(joint) = spec.joint_mut(from) {
                    joint.edges.remove(*index);
                }
            }
            Edit::InsertJoint { index, joint } => spec.joints.insert(*index, joint.clone()),
            Edit::DeleteJoint {
                index,
                references,
                motors,
                ..
            } => {
                for (name, pos) in references.iter().rev() {
                    if let Some(joint) = spec.joint_mut(name) {
                        joint.edges.remove(*pos);
                    }
                }
                for (pos, _) in motors.iter().rev() {
                    spec.motors.remove(*pos);
                }
                spec.joints.remove(*index);
            }
            Edit::SetRole { name, after, .. } => {
                if let Some(joint) = spec.joint_mut(name) {
                    joint.role = *after;
                }
            }
            Edit::MoveJoint { name, after, .. } => {
                if let Some(joint) = spec.joint_mut(name) {
                    joint.position = after.clone();
                }
            }
        }
    }

    /// Undo the edit on the state it produced.
    pub fn revert<D>(&self, spec: &mut MechanismSpec<D>)
    where
        D: Dimension<Point = P>,
    {
        match self {
            Edit::DeclareEdge { from, index, .. } => {
                if let Some(joint) = spec.joint_mut(from) {
                    joint.edges.remove(*index);
                }
            }
            Edit::RetractEdge { from, to, index } => {
                if let Some(joint) = spec.joint_mut(from) {
                    joint.edges.insert(*index, to.clone());
                }
            }
            Edit::InsertJoint { index, .. } => {
                spec.joints.remove(*index);
            }
            Edit::DeleteJoint {
                index,
                joint,
                references,
                motors,
            } => {
                spec.joints.insert(*index, joint.clone());
                for (pos, motor) in motors {
                    spec.motors.insert(*pos, motor.clone());
                }
                for (name, pos) in references {
                    if let Some(declaring) = spec.joint_mut(name) {
                        declaring.edges.insert(*pos, joint.name.clone());
                    }
                }
            }
            Edit::SetRole { name, before, .. } => {
                if let Some(joint) = spec.joint_mut(name) {
                    joint.role = *before;
                }
            }
            Edit::MoveJoint { name, before, .. } => {
                if let Some(joint) = spec.joint_mut(name) {
                    joint.position = before.clone();
                }
            }
        }
    }
}

/// Record the removal of the joint at `index` without performing it.
pub(crate) fn delete_joint<D: Dimension>(spec: &MechanismSpec<D>, index: usize) -> Edit<D::Point> {
    let joint = spec.joints[index].clone();
    let mut references = Vec::new();
    for declaring in spec.joints.iter().filter(|j| j.name != joint.name) {
        for (pos, target) in declaring.edges.iter().enumerate() {
            if *target == joint.name {
                references.push((declaring.name.clone(), pos));
            }
        }
    }
    let motors = spec
        .motors
        .iter()
        .enumerate()
        .filter(|(_, m)| m.pivot == joint.name || m.driven == joint.name)
        .map(|(pos, m)| (pos, m.clone()))
        .collect();
    Edit::DeleteJoint {
        index,
        joint,
        references,
        motors,
    }
}
