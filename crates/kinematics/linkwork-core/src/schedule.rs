use crate::error::LinkageError;
use crate::graph::{JointGraph, JointRole};
use crate::ids::{EdgeId, JointId};
use crate::space::Dimension;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// The two edges a dynamic joint is solved from every tick, fixed at schedule time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyPair {
    pub first: EdgeId,
    pub first_joint: JointId,
    pub second: EdgeId,
    pub second_joint: JointId,
}

/// Immutable solve order for the dynamic joints of one graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    order: Vec<JointId>,
    pairs: Vec<Option<DependencyPair>>,
    unenforced: Vec<EdgeId>,
}

impl Schedule {
    /// Order every dynamic joint after two already-known neighbours.
    ///
    /// Anchored and motor-driven joints are known from the start. Each one bumps the count of its
    /// dynamic neighbours; a joint whose count reaches two is queued, and once dequeued it bumps
    /// its own unresolved neighbours in turn. The two edges that raised a joint's count become its
    /// [`DependencyPair`]. Joints and incident edges are visited in insertion order, so the result
    /// is deterministic for a given graph.
    pub fn build<D: Dimension>(
        graph: &JointGraph<D>,
        reference: &D::Reference,
    ) -> Result<Self, LinkageError> {
        let n = graph.len();
        let mut discovered: Vec<Vec<(EdgeId, JointId)>> = vec![Vec::new(); n];
        let mut resolved: Vec<bool> = graph.joints().iter().map(|j| j.role.is_driven()).collect();
        let mut ready: VecDeque<JointId> = VecDeque::new();

        for joint in graph.joints().iter().filter(|j| j.role.is_driven()) {
            for (edge, other) in graph.neighbours(joint.id) {
                discover(&mut discovered, &mut resolved, &mut ready, other, edge.id, joint.id);
            }
        }

        let mut order = Vec::new();
        while let Some(current) = ready.pop_front() {
            order.push(current);
            for (edge, other) in graph.neighbours(current) {
                discover(&mut discovered, &mut resolved, &mut ready, other, edge.id, current);
            }
        }

        let dynamic = graph
            .joints()
            .iter()
            .filter(|j| j.role == JointRole::Dynamic)
            .count();
        if order.len() != dynamic {
            let unscheduled: Vec<JointId> = graph
                .joints()
                .iter()
                .filter(|j| !resolved[j.id.index()])
                .map(|j| j.id)
                .collect();
            return Err(LinkageError::Underconstrained { unscheduled });
        }

        let mut pairs: Vec<Option<DependencyPair>> = vec![None; n];
        for &id in &order {
            let [(e0, j0), (e1, j1)] = [discovered[id.index()][0], discovered[id.index()][1]];
            let authored = |j: JointId| &graph.joints()[j.index()].authored;
            let swap = D::swap_pair(authored(j0), authored(j1), authored(id), reference);
            pairs[id.index()] = Some(if swap {
                DependencyPair {
                    first: e1,
                    first_joint: j1,
                    second: e0,
                    second_joint: j0,
                }
            } else {
                DependencyPair {
                    first: e0,
                    first_joint: j0,
                    second: e1,
                    second_joint: j1,
                }
            });
        }

        let mut used = vec![false; graph.edges().len()];
        for pair in pairs.iter().flatten() {
            used[pair.first.index()] = true;
            used[pair.second.index()] = true;
        }
        let unenforced: Vec<EdgeId> = graph
            .edges()
            .iter()
            .filter(|e| !used[e.id.index()])
            .filter(|e| {
                let role = |j: JointId| graph.joints()[j.index()].role;
                role(e.a) == JointRole::Dynamic || role(e.b) == JointRole::Dynamic
            })
            .map(|e| e.id)
            .collect();
        for edge in &unenforced {
            warn!(%edge, "edge is not a dependency of any joint; its length is not enforced");
        }

        debug!(
            dimension = D::NAME,
            scheduled = order.len(),
            unenforced = unenforced.len(),
            "schedule built"
        );
        Ok(Schedule {
            order,
            pairs,
            unenforced,
        })
    }

    /// Dynamic joints in solve order.
    pub fn order(&self) -> &[JointId] {
        &self.order
    }

    /// `None` for anchored and motor-driven joints.
    pub fn pair(&self, joint: JointId) -> Option<&DependencyPair> {
        self.pairs.get(joint.index()).and_then(Option::as_ref)
    }

    /// Edges touching a dynamic joint that no joint is solved from.
    pub fn unenforced_edges(&self) -> &[EdgeId] {
        &self.unenforced
    }
}

fn discover(
    discovered: &mut [Vec<(EdgeId, JointId)>],
    resolved: &mut [bool],
    ready: &mut VecDeque<JointId>,
    joint: JointId,
    edge: EdgeId,
    from: JointId,
) {
    let idx = joint.index();
    if resolved[idx] {
        return;
    }
    discovered[idx].push((edge, from));
    if discovered[idx].len() == 2 {
        resolved[idx] = true;
        ready.push_back(joint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::space::{Orientation, Planar};
    use nalgebra::Vector2;

    fn p(x: f64, y: f64) -> Vector2<f64> {
        Vector2::new(x, y)
    }

    /// a0, a1 anchored; d2 on both; d3 on d2 and a1; d4 on d3 and d2.
    fn chain() -> JointGraph<Planar> {
        let mut b = GraphBuilder::<Planar>::new();
        let a0 = b.add_joint(JointRole::Anchored, p(0.0, 0.0));
        let a1 = b.add_joint(JointRole::Anchored, p(3.0, 0.0));
        let d2 = b.add_joint(JointRole::Dynamic, p(1.0, 1.0));
        let d3 = b.add_joint(JointRole::Dynamic, p(3.0, 2.0));
        let d4 = b.add_joint(JointRole::Dynamic, p(1.5, 3.0));
        b.declare_edge(d4, d3)
            .declare_edge(d2, a0)
            .declare_edge(a1, d2)
            .declare_edge(d3, a1)
            .declare_edge(d2, d3)
            .declare_edge(d4, d2);
        b.finalize().unwrap()
    }

    #[test]
    fn chain_is_ordered_by_dependency() {
        let g = chain();
        let s = Schedule::build(&g, &Orientation::default()).unwrap();
        assert_eq!(s.order(), &[JointId(2), JointId(3), JointId(4)]);

        let p2 = s.pair(JointId(2)).unwrap();
        assert_eq!((p2.first_joint, p2.second_joint), (JointId(0), JointId(1)));
        let p4 = s.pair(JointId(4)).unwrap();
        assert_eq!((p4.first_joint, p4.second_joint), (JointId(2), JointId(3)));
        assert!(s.pair(JointId(0)).is_none());
        assert!(s.unenforced_edges().is_empty());
    }

    #[test]
    fn every_pair_precedes_its_joint() {
        let g = chain();
        let s = Schedule::build(&g, &Orientation::default()).unwrap();
        for (pos, &id) in s.order().iter().enumerate() {
            let pair = s.pair(id).unwrap();
            for (edge, dep) in [(pair.first, pair.first_joint), (pair.second, pair.second_joint)] {
                assert_eq!(g.edge(edge).other(id), Some(dep));
                let known = g.role(dep).unwrap().is_driven()
                    || s.order()[..pos].contains(&dep);
                assert!(known, "{dep} must be known before {id}");
            }
        }
    }

    #[test]
    fn dangling_joint_is_underconstrained() {
        let mut b = GraphBuilder::<Planar>::new();
        let a0 = b.add_joint(JointRole::Anchored, p(0.0, 0.0));
        let a1 = b.add_joint(JointRole::Anchored, p(2.0, 0.0));
        let d2 = b.add_joint(JointRole::Dynamic, p(1.0, 1.0));
        let d3 = b.add_joint(JointRole::Dynamic, p(1.0, 2.0));
        b.declare_edge(a0, d2).declare_edge(a1, d2).declare_edge(d2, d3);
        let g = b.finalize().unwrap();
        let err = Schedule::build(&g, &Orientation::default()).unwrap_err();
        assert_eq!(
            err,
            LinkageError::Underconstrained {
                unscheduled: vec![JointId(3)]
            }
        );
    }

    #[test]
    fn extra_bar_is_reported_unenforced() {
        let mut b = GraphBuilder::<Planar>::new();
        let a0 = b.add_joint(JointRole::Anchored, p(0.0, 0.0));
        let a1 = b.add_joint(JointRole::Anchored, p(2.0, 0.0));
        let a2 = b.add_joint(JointRole::Anchored, p(4.0, 0.0));
        let d3 = b.add_joint(JointRole::Dynamic, p(2.0, 1.0));
        b.declare_edge(a0, d3).declare_edge(a1, d3).declare_edge(a2, d3);
        let g = b.finalize().unwrap();
        let s = Schedule::build(&g, &Orientation::default()).unwrap();
        assert_eq!(s.order(), &[JointId(3)]);
        assert_eq!(s.unenforced_edges(), &[EdgeId(2)]);
    }

    #[test]
    fn schedule_is_deterministic() {
        let g = chain();
        let a = Schedule::build(&g, &Orientation::default()).unwrap();
        let b = Schedule::build(&g, &Orientation::default()).unwrap();
        assert_eq!(a, b);
    }
}
