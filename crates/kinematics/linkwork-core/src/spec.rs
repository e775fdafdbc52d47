//! JSON authoring format.
//!
//! A mechanism is authored as named joints, each with an initial position, a role and the names
//! of the joints it declares bars to, plus the motors driving it. Names only exist here;
//! [`MechanismSpec::compile`] turns them into dense ids and a finalized [`JointGraph`].

use crate::error::LinkageError;
use crate::graph::{GraphBuilder, JointGraph, JointRole};
use crate::ids::JointId;
use crate::motor::MotorConfig;
use crate::space::Dimension;
use hashbrown::HashMap;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointSpec<P> {
    pub name: String,
    pub position: P,
    pub role: JointRole,
    /// Directed declarations: this joint has a bar to each named joint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<String>,
}

impl<P> JointSpec<P> {
    pub fn new(name: impl Into<String>, position: P, role: JointRole) -> Self {
        Self {
            name: name.into(),
            position,
            role,
            edges: Vec::new(),
        }
    }

    pub fn with_edges<I, S>(mut self, edges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edges = edges.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotorSpec {
    pub pivot: String,
    pub driven: String,
    #[serde(default = "default_axis")]
    pub axis: Vector3<f64>,
    /// Zero-angle direction; derived from `axis` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_axis: Option<Vector3<f64>>,
    /// Revolutions per second.
    #[serde(default)]
    pub speed: f64,
}

fn default_axis() -> Vector3<f64> {
    Vector3::z()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct MechanismSpec<D: Dimension> {
    #[serde(default)]
    pub reference: D::Reference,
    pub joints: Vec<JointSpec<D::Point>>,
    #[serde(default)]
    pub motors: Vec<MotorSpec>,
}

/// A spec with names resolved: the finalized graph, motor configs and the id → name table.
#[derive(Clone, Debug)]
pub struct CompiledSpec<D: Dimension> {
    pub graph: JointGraph<D>,
    pub motors: Vec<MotorConfig>,
    pub names: Vec<String>,
}

impl<D: Dimension> Default for MechanismSpec<D> {
    fn default() -> Self {
        Self {
            reference: D::Reference::default(),
            joints: Vec::new(),
            motors: Vec::new(),
        }
    }
}

impl<D: Dimension> MechanismSpec<D> {
    pub fn from_json(text: &str) -> Result<Self, LinkageError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, LinkageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn joint(&self, name: &str) -> Option<&JointSpec<D::Point>> {
        self.joints.iter().find(|j| j.name == name)
    }

    pub fn joint_mut(&mut self, name: &str) -> Option<&mut JointSpec<D::Point>> {
        self.joints.iter_mut().find(|j| j.name == name)
    }

    /// Resolve names and finalize the graph. Ids follow the order of `joints`.
    pub fn compile(&self) -> Result<CompiledSpec<D>, LinkageError> {
        let mut ids: HashMap<&str, JointId> = HashMap::with_capacity(self.joints.len());
        let mut builder = GraphBuilder::<D>::new();
        for joint in &self.joints {
            let id = builder.add_joint(joint.role, joint.position);
            if ids.insert(joint.name.as_str(), id).is_some() {
                return Err(LinkageError::config(format!(
                    "joint name '{}' is used more than once",
                    joint.name
                )));
            }
        }

        let lookup = |name: &str, context: &str| {
            ids.get(name).copied().ok_or_else(|| {
                LinkageError::config(format!("{context} references unknown joint '{name}'"))
            })
        };

        for joint in &self.joints {
            let from = lookup(joint.name.as_str(), "joint")?;
            for target in &joint.edges {
                let context = format!("edge from '{}'", joint.name);
                let to = lookup(target.as_str(), context.as_str())?;
                builder.declare_edge(from, to);
            }
        }

        let motors = self
            .motors
            .iter()
            .map(|m| {
                let pivot = lookup(m.pivot.as_str(), "motor pivot")?;
                let driven = lookup(m.driven.as_str(), "motor")?;
                let cfg = MotorConfig::new(pivot, driven)
                    .with_axis(m.axis)
                    .with_speed(m.speed);
                Ok(match m.reference_axis {
                    Some(reference) => cfg.with_reference_axis(reference),
                    None => cfg,
                })
            })
            .collect::<Result<Vec<_>, LinkageError>>()?;

        Ok(CompiledSpec {
            graph: builder.finalize()?,
            motors,
            names: self.joints.iter().map(|j| j.name.clone()).collect(),
        })
    }
}
