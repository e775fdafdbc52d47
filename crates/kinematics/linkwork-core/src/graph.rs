//! Joint graph: joints with roles and authored positions, and undirected edges with frozen
//! lengths.
//!
//! Construction is two-phase. A [`GraphBuilder`] collects joints and directed adjacency
//! declarations; [`GraphBuilder::finalize`] validates them, symmetrises every declaration into
//! one undirected [`Edge`] listed on both joints, measures each length from the authored
//! positions, and discards the declarations. The resulting [`JointGraph`] is immutable.

use crate::error::LinkageError;
use crate::ids::{EdgeId, JointId};
use crate::space::Dimension;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

/// How a joint's position is obtained each tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointRole {
    /// Fixed, or moved only by an external driver between ticks.
    Anchored,
    /// Rotated about a pivot by a motor.
    #[serde(rename = "motor")]
    MotorDriven,
    /// Re-derived every tick from two known neighbours.
    Dynamic,
}

impl JointRole {
    /// Known at the start of the solve pass (not derived by the scheduler).
    #[inline]
    pub fn is_driven(self) -> bool {
        !matches!(self, JointRole::Dynamic)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Joint<D: Dimension> {
    pub id: JointId,
    pub role: JointRole,
    /// Position at graph-build time.
    pub authored: D::Point,
    /// Incident edges in declaration order.
    pub edges: Vec<EdgeId>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub a: JointId,
    pub b: JointId,
    pub length: f64,
}

impl Edge {
    /// The endpoint that is not `joint`, or `None` if `joint` is not on this edge.
    #[inline]
    pub fn other(&self, joint: JointId) -> Option<JointId> {
        if joint == self.a {
            Some(self.b)
        } else if joint == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    #[inline]
    pub fn connects(&self, a: JointId, b: JointId) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }
}

/// Authoring-time collector of joints and directed edge declarations.
#[derive(Clone, Debug)]
pub struct GraphBuilder<D: Dimension> {
    joints: Vec<(JointRole, D::Point)>,
    declarations: Vec<(JointId, JointId)>,
}

impl<D: Dimension> Default for GraphBuilder<D> {
    fn default() -> Self {
        Self {
            joints: Vec::new(),
            declarations: Vec::new(),
        }
    }
}

impl<D: Dimension> GraphBuilder<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_joint(&mut self, role: JointRole, position: D::Point) -> JointId {
        let id = JointId(self.joints.len() as u32);
        self.joints.push((role, position));
        id
    }

    /// Record that `a` declares a bar to `b`. Validation happens in [`finalize`](Self::finalize).
    pub fn declare_edge(&mut self, a: JointId, b: JointId) -> &mut Self {
        self.declarations.push((a, b));
        self
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Freeze the declarations into an undirected graph.
    ///
    /// Fails on self-edges, references to joints that were never added, and repeated
    /// declarations of the same pair in either direction.
    pub fn finalize(self) -> Result<JointGraph<D>, LinkageError> {
        let mut joints: Vec<Joint<D>> = self
            .joints
            .into_iter()
            .enumerate()
            .map(|(idx, (role, authored))| Joint {
                id: JointId(idx as u32),
                role,
                authored,
                edges: Vec::new(),
            })
            .collect();

        let mut seen: HashSet<(JointId, JointId)> = HashSet::new();
        let mut edges = Vec::with_capacity(self.declarations.len());
        for (a, b) in self.declarations {
            if a == b {
                return Err(LinkageError::config(format!("self-edge declared on {a}")));
            }
            for id in [a, b] {
                if id.index() >= joints.len() {
                    return Err(LinkageError::config(format!(
                        "edge {a} -> {b} references missing joint {id}"
                    )));
                }
            }
            if !seen.insert((a.min(b), a.max(b))) {
                return Err(LinkageError::config(format!(
                    "edge between {a} and {b} declared more than once"
                )));
            }

            let id = EdgeId(edges.len() as u32);
            let length = D::distance(&joints[a.index()].authored, &joints[b.index()].authored);
            edges.push(Edge { id, a, b, length });
            joints[a.index()].edges.push(id);
            joints[b.index()].edges.push(id);
        }

        Ok(JointGraph { joints, edges })
    }
}

/// Immutable constraint graph.
#[derive(Clone, Debug, PartialEq)]
pub struct JointGraph<D: Dimension> {
    joints: Vec<Joint<D>>,
    edges: Vec<Edge>,
}

impl<D: Dimension> JointGraph<D> {
    pub fn joints(&self) -> &[Joint<D>] {
        &self.joints
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn joint(&self, id: JointId) -> Result<&Joint<D>, LinkageError> {
        self.joints
            .get(id.index())
            .ok_or(LinkageError::JointNotFound { joint: id })
    }

    /// Panics on a foreign id; ids from this graph's own edges are always valid.
    #[inline]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn role(&self, id: JointId) -> Result<JointRole, LinkageError> {
        self.joint(id).map(|j| j.role)
    }

    pub fn edge_between(&self, a: JointId, b: JointId) -> Result<&Edge, LinkageError> {
        let joint = self.joint(a)?;
        joint
            .edges
            .iter()
            .map(|&e| self.edge(e))
            .find(|edge| edge.connects(a, b))
            .ok_or(LinkageError::EdgeNotFound { a, b })
    }

    /// Incident edges of `id` with the neighbour on the far end, in declaration order.
    pub fn neighbours(&self, id: JointId) -> impl Iterator<Item = (&Edge, JointId)> + '_ {
        let incident = self
            .joints
            .get(id.index())
            .map(|j| j.edges.as_slice())
            .unwrap_or(&[]);
        incident.iter().filter_map(move |&e| {
            let edge = self.edge(e);
            edge.other(id).map(|other| (edge, other))
        })
    }

    /// Authored positions indexed by joint id.
    pub fn authored_positions(&self) -> Vec<D::Point> {
        self.joints.iter().map(|j| j.authored).collect()
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}
