//! Simulation loop: owns the joint positions and advances them one tick at a time.
//!
//! A tick first advances every motor, rotating its driven joint, then re-derives each dynamic
//! joint in schedule order from its dependency pair. The pass works on a scratch copy of the
//! positions; it is committed only when every joint solved, so a degenerate configuration leaves
//! positions and motor state exactly as they were after the previous tick.

use crate::config::SolverConfig;
use crate::error::LinkageError;
use crate::frame::{Bar, Frame};
use crate::graph::{JointGraph, JointRole};
use crate::ids::{EdgeId, JointId};
use crate::motor::{MotorActuator, MotorCommand, MotorConfig};
use crate::schedule::Schedule;
use crate::solve::Constraint;
use crate::space::Dimension;
use crate::spec::MechanismSpec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub dt: f64,
    /// Dynamic joints re-derived this tick.
    pub solved: usize,
    /// Motors whose angle changed this tick.
    pub motors_moved: usize,
}

#[derive(Clone, Debug)]
pub struct Simulation<D: Dimension> {
    graph: JointGraph<D>,
    schedule: Schedule,
    reference: D::Reference,
    joint_refs: Vec<D::JointReference>,
    motors: Vec<MotorActuator>,
    config: SolverConfig,
    positions: Vec<D::Point>,
    scratch: Vec<D::Point>,
    names: Vec<String>,
    tick: u64,
}

impl<D: Dimension> Simulation<D> {
    /// Validate motors against the graph, compute the schedule and bind motors to the authored
    /// pose.
    pub fn new(
        graph: JointGraph<D>,
        motors: Vec<MotorConfig>,
        reference: D::Reference,
        config: SolverConfig,
    ) -> Result<Self, LinkageError> {
        validate_motors(&graph, &motors)?;
        let schedule = Schedule::build(&graph, &reference)?;

        let positions = graph.authored_positions();
        let joint_refs = positions
            .iter()
            .map(|p| D::joint_reference(&reference, p))
            .collect();
        let motors = motors
            .iter()
            .map(|cfg| {
                MotorActuator::attach(
                    cfg,
                    &D::embed(&positions[cfg.pivot.index()]),
                    &D::embed(&positions[cfg.driven.index()]),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            dimension = D::NAME,
            joints = graph.len(),
            edges = graph.edges().len(),
            motors = motors.len(),
            "simulation ready"
        );
        Ok(Self {
            graph,
            schedule,
            reference,
            joint_refs,
            motors,
            config,
            scratch: Vec::with_capacity(positions.len()),
            positions,
            names: Vec::new(),
            tick: 0,
        })
    }

    pub fn from_spec(spec: &MechanismSpec<D>, config: SolverConfig) -> Result<Self, LinkageError> {
        let compiled = spec.compile()?;
        let mut sim = Self::new(compiled.graph, compiled.motors, spec.reference.clone(), config)?;
        sim.names = compiled.names;
        Ok(sim)
    }

    pub fn from_json(text: &str, config: SolverConfig) -> Result<Self, LinkageError> {
        Self::from_spec(&MechanismSpec::from_json(text)?, config)
    }

    /// Advance motors by `dt` seconds and re-derive every dynamic joint.
    ///
    /// On [`LinkageError::DegenerateGeometry`] nothing is committed: positions and motors keep
    /// their previous-tick state and the caller may adjust inputs and tick again. A NaN or
    /// infinite `dt` is rejected before anything moves.
    pub fn tick(&mut self, dt: f64) -> Result<TickReport, LinkageError> {
        if !dt.is_finite() {
            return Err(LinkageError::invalid(format!("tick dt must be finite, got {dt}")));
        }
        let checkpoint = self.motors.clone();
        let mut next = std::mem::take(&mut self.scratch);
        next.clear();
        next.extend_from_slice(&self.positions);

        let mut motors_moved = 0;
        for motor in &mut self.motors {
            if motor.actuate::<D>(dt, &mut next) != 0.0 {
                motors_moved += 1;
            }
        }

        match self.solve_pass(&mut next) {
            Ok(solved) => {
                std::mem::swap(&mut self.positions, &mut next);
                self.scratch = next;
                self.tick += 1;
                trace!(tick = self.tick, solved, motors_moved, "tick committed");
                Ok(TickReport {
                    tick: self.tick,
                    dt,
                    solved,
                    motors_moved,
                })
            }
            Err(err) => {
                self.motors = checkpoint;
                self.scratch = next;
                warn!(tick = self.tick + 1, error = %err, "tick aborted; keeping previous positions");
                Err(err)
            }
        }
    }

    fn solve_pass(&self, positions: &mut [D::Point]) -> Result<usize, LinkageError> {
        for &id in self.schedule.order() {
            let pair = self
                .schedule
                .pair(id)
                .ok_or_else(|| LinkageError::Underconstrained {
                    unscheduled: vec![id],
                })?;
            let first = Constraint::new(
                positions[pair.first_joint.index()],
                self.graph.edge(pair.first).length,
            );
            let second = Constraint::new(
                positions[pair.second_joint.index()],
                self.graph.edge(pair.second).length,
            );
            let solved = D::resolve(
                first,
                second,
                &positions[id.index()],
                &self.reference,
                &self.joint_refs[id.index()],
                &self.config,
            )
            .map_err(|fault| LinkageError::DegenerateGeometry { joint: id, fault })?;
            trace!(joint = %id, position = ?solved, "joint solved");
            positions[id.index()] = solved;
        }
        Ok(self.schedule.order().len())
    }

    /// Queue a command for the motor driving `driven`; it takes effect on the next tick.
    pub fn command_motor(&mut self, driven: JointId, command: MotorCommand) -> Result<(), LinkageError> {
        let motor = self
            .motors
            .iter_mut()
            .find(|m| m.driven() == driven)
            .ok_or(LinkageError::MotorNotFound { joint: driven })?;
        motor.command(command)
    }

    /// Move an anchored joint between ticks. Joints a motor drives around this anchor move with
    /// it, so their crank length is kept.
    pub fn set_anchor(&mut self, joint: JointId, position: D::Point) -> Result<(), LinkageError> {
        let role = self.graph.role(joint)?;
        if role != JointRole::Anchored {
            return Err(LinkageError::RoleMismatch {
                joint,
                expected: JointRole::Anchored,
                actual: role,
            });
        }
        let target = D::embed(&position);
        if target.iter().any(|c| !c.is_finite()) {
            return Err(LinkageError::invalid(format!(
                "anchor {joint} moved to a non-finite position"
            )));
        }
        let offset = target - D::embed(&self.positions[joint.index()]);
        self.positions[joint.index()] = position;
        for motor in self.motors.iter().filter(|m| m.pivot() == joint) {
            let driven = motor.driven().index();
            self.positions[driven] = D::project(&(D::embed(&self.positions[driven]) + offset));
        }
        Ok(())
    }

    /// Restore the authored pose and re-derive motor angles from it.
    pub fn reset(&mut self) {
        self.positions = self.graph.authored_positions();
        for motor in &mut self.motors {
            motor.rebase(
                &D::embed(&self.positions[motor.pivot().index()]),
                &D::embed(&self.positions[motor.driven().index()]),
            );
        }
        self.tick = 0;
    }

    pub fn position(&self, joint: JointId) -> Result<D::Point, LinkageError> {
        self.positions
            .get(joint.index())
            .copied()
            .ok_or(LinkageError::JointNotFound { joint })
    }

    /// Current positions indexed by joint id.
    pub fn positions(&self) -> &[D::Point] {
        &self.positions
    }

    pub fn graph(&self) -> &JointGraph<D> {
        &self.graph
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn motors(&self) -> &[MotorActuator] {
        &self.motors
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn reference(&self) -> &D::Reference {
        &self.reference
    }

    /// Ticks committed since construction or the last [`reset`](Self::reset).
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Id of a joint by its authored name (only for simulations built from a spec).
    pub fn joint_id(&self, name: &str) -> Option<JointId> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| JointId(idx as u32))
    }

    pub fn name(&self, joint: JointId) -> Option<&str> {
        self.names.get(joint.index()).map(String::as_str)
    }

    /// Snapshot for renderers: every joint position and every bar's endpoints.
    pub fn frame(&self) -> Frame<D::Point> {
        let bars = self
            .graph
            .edges()
            .iter()
            .map(|e| {
                let start = self.positions[e.a.index()];
                let end = self.positions[e.b.index()];
                Bar {
                    edge: e.id,
                    a: e.a,
                    b: e.b,
                    start,
                    end,
                    length: e.length,
                    midpoint: D::project(&((D::embed(&start) + D::embed(&end)) * 0.5)),
                    span: D::distance(&start, &end),
                }
            })
            .collect();
        Frame {
            tick: self.tick,
            positions: self.positions.clone(),
            bars,
        }
    }

    /// Relative deviation `|span − length| / length` of every dependency edge, in schedule order.
    pub fn length_residuals(&self) -> Vec<(EdgeId, f64)> {
        let mut out = Vec::with_capacity(self.schedule.order().len() * 2);
        for &id in self.schedule.order() {
            let Some(pair) = self.schedule.pair(id) else {
                continue;
            };
            for edge_id in [pair.first, pair.second] {
                let edge = self.graph.edge(edge_id);
                let span = D::distance(&self.positions[edge.a.index()], &self.positions[edge.b.index()]);
                let residual = if edge.length > 0.0 {
                    (span - edge.length).abs() / edge.length
                } else {
                    span
                };
                out.push((edge_id, residual));
            }
        }
        out
    }
}

fn validate_motors<D: Dimension>(graph: &JointGraph<D>, motors: &[MotorConfig]) -> Result<(), LinkageError> {
    let role_of = |id: JointId, what: &str| {
        graph
            .role(id)
            .map_err(|_| LinkageError::config(format!("{what} {id} does not exist")))
    };

    let mut drivers = vec![0usize; graph.len()];
    for cfg in motors {
        let driven = role_of(cfg.driven, "motor-driven joint")?;
        if driven != JointRole::MotorDriven {
            return Err(LinkageError::config(format!(
                "motor drives {} whose role is {driven:?}",
                cfg.driven
            )));
        }
        let pivot = role_of(cfg.pivot, "motor pivot")?;
        if pivot != JointRole::Anchored {
            return Err(LinkageError::config(format!(
                "motor pivot {} must be anchored, found {pivot:?}",
                cfg.pivot
            )));
        }
        if !D::supports_axis(&cfg.axis) {
            return Err(LinkageError::config(format!(
                "motor on {}: axis {:?} is not valid for a {} mechanism",
                cfg.driven,
                cfg.axis.as_slice(),
                D::NAME
            )));
        }
        drivers[cfg.driven.index()] += 1;
    }

    for joint in graph.joints() {
        let count = drivers[joint.id.index()];
        if joint.role == JointRole::MotorDriven && count != 1 {
            return Err(LinkageError::config(format!(
                "motor-driven joint {} has {count} motors, expected exactly one",
                joint.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::space::{Orientation, Planar};
    use approx::assert_abs_diff_eq;
    use nalgebra::{Vector2, Vector3};

    /// Crank-rocker: ground A–D, crank A–B, coupler B–C, rocker C–D.
    fn four_bar() -> Simulation<Planar> {
        let mut b = GraphBuilder::<Planar>::new();
        let a = b.add_joint(JointRole::Anchored, Vector2::new(0.0, 0.0));
        let bj = b.add_joint(JointRole::MotorDriven, Vector2::new(1.0, 0.0));
        let c = b.add_joint(JointRole::Dynamic, Vector2::new(2.0, 2.0));
        let d = b.add_joint(JointRole::Anchored, Vector2::new(3.0, 0.0));
        b.declare_edge(a, bj).declare_edge(bj, c).declare_edge(c, d);
        Simulation::new(
            b.finalize().unwrap(),
            vec![MotorConfig::new(a, bj)],
            Orientation::CounterClockwise,
            SolverConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn idle_tick_reproduces_authored_pose() {
        let mut sim = four_bar();
        let report = sim.tick(0.1).unwrap();
        assert_eq!(report.solved, 1);
        assert_eq!(report.motors_moved, 0);
        assert_abs_diff_eq!(sim.positions()[2], Vector2::new(2.0, 2.0), epsilon = 1e-9);
    }

    #[test]
    fn crank_quarter_turn_keeps_bar_lengths() {
        let mut sim = four_bar();
        sim.command_motor(JointId(1), MotorCommand::Absolute(90.0)).unwrap();
        sim.tick(0.0).unwrap();
        assert_abs_diff_eq!(sim.positions()[1], Vector2::new(0.0, 1.0), epsilon = 1e-12);
        for (_, residual) in sim.length_residuals() {
            assert!(residual < 1e-9, "residual {residual}");
        }
        assert!(sim.positions()[2].y > 0.0);
    }

    #[test]
    fn degenerate_tick_rolls_back_everything() {
        let mut sim = four_bar();
        sim.command_motor(JointId(1), MotorCommand::Absolute(30.0)).unwrap();
        sim.tick(0.0).unwrap();
        let before = sim.positions().to_vec();
        let angle = sim.motors()[0].angle();

        // Rocker pivot pulled out of reach of the coupler.
        sim.set_anchor(JointId(3), Vector2::new(10.0, 0.0)).unwrap();
        sim.command_motor(JointId(1), MotorCommand::Absolute(60.0)).unwrap();
        let err = sim.tick(0.0).unwrap_err();
        assert!(matches!(
            err,
            LinkageError::DegenerateGeometry { joint: JointId(2), .. }
        ));
        assert!(err.is_recoverable());
        assert_eq!(&sim.positions()[..3], &before[..3]);
        assert_eq!(sim.motors()[0].angle(), angle);
        assert_eq!(sim.tick_count(), 1);

        sim.set_anchor(JointId(3), Vector2::new(3.0, 0.0)).unwrap();
        sim.tick(0.0).unwrap();
        assert_abs_diff_eq!(sim.motors()[0].angle(), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn non_finite_inputs_leave_state_untouched() {
        let mut sim = four_bar();
        sim.command_motor(JointId(1), MotorCommand::Speed(0.25)).unwrap();
        sim.tick(0.5).unwrap();
        let positions = sim.positions().to_vec();
        let motors = sim.motors().to_vec();

        for dt in [f64::NAN, f64::INFINITY] {
            let err = sim.tick(dt).unwrap_err();
            assert!(matches!(err, LinkageError::InvalidInput { .. }));
            assert_eq!(err.category(), "usage");
        }
        for bad in [MotorCommand::Absolute(f64::NAN), MotorCommand::Speed(f64::INFINITY)] {
            let err = sim.command_motor(JointId(1), bad).unwrap_err();
            assert!(matches!(err, LinkageError::InvalidInput { .. }));
        }
        let err = sim
            .set_anchor(JointId(0), Vector2::new(f64::NAN, 0.0))
            .unwrap_err();
        assert!(matches!(err, LinkageError::InvalidInput { .. }));

        assert_eq!(sim.positions(), positions.as_slice());
        assert_eq!(sim.motors(), motors.as_slice());
        assert_eq!(sim.tick_count(), 1);

        let report = sim.tick(0.5).unwrap();
        assert!(sim.positions().iter().all(|p| p.iter().all(|c| c.is_finite())));
        assert_eq!(report.motors_moved, 1);
    }

    #[test]
    fn set_anchor_rejects_other_roles() {
        let mut sim = four_bar();
        let err = sim.set_anchor(JointId(2), Vector2::zeros()).unwrap_err();
        assert_eq!(
            err,
            LinkageError::RoleMismatch {
                joint: JointId(2),
                expected: JointRole::Anchored,
                actual: JointRole::Dynamic,
            }
        );
    }

    #[test]
    fn moving_a_pivot_carries_its_crank() {
        let mut sim = four_bar();
        sim.set_anchor(JointId(0), Vector2::new(0.5, 0.0)).unwrap();
        assert_abs_diff_eq!(sim.positions()[1], Vector2::new(1.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn reset_restores_authored_pose() {
        let mut sim = four_bar();
        sim.command_motor(JointId(1), MotorCommand::Speed(0.1)).unwrap();
        for _ in 0..5 {
            sim.tick(0.5).unwrap();
        }
        sim.reset();
        assert_eq!(sim.positions(), sim.graph().authored_positions().as_slice());
        assert_abs_diff_eq!(sim.motors()[0].angle(), 0.0, epsilon = 1e-12);
        assert_eq!(sim.tick_count(), 0);
    }

    #[test]
    fn unknown_motor_is_reported() {
        let mut sim = four_bar();
        let err = sim
            .command_motor(JointId(2), MotorCommand::Speed(1.0))
            .unwrap_err();
        assert_eq!(err, LinkageError::MotorNotFound { joint: JointId(2) });
    }

    #[test]
    fn motor_validation() {
        let build = |motors: Vec<MotorConfig>| {
            let mut b = GraphBuilder::<Planar>::new();
            let a = b.add_joint(JointRole::Anchored, Vector2::new(0.0, 0.0));
            let m = b.add_joint(JointRole::MotorDriven, Vector2::new(1.0, 0.0));
            let f = b.add_joint(JointRole::Anchored, Vector2::new(2.0, 0.0));
            b.declare_edge(a, m).declare_edge(m, f);
            Simulation::new(
                b.finalize().unwrap(),
                motors,
                Orientation::CounterClockwise,
                SolverConfig::default(),
            )
        };

        assert!(build(vec![MotorConfig::new(JointId(0), JointId(1))]).is_ok());
        // missing motor
        assert!(build(vec![]).is_err());
        // pivot is the driven joint itself
        assert!(build(vec![MotorConfig::new(JointId(1), JointId(1))]).is_err());
        // planar motor about a tilted axis
        let tilted = MotorConfig::new(JointId(0), JointId(1)).with_axis(Vector3::new(1.0, 0.0, 1.0));
        assert!(build(vec![tilted]).is_err());
        // two motors on one joint
        assert!(build(vec![
            MotorConfig::new(JointId(0), JointId(1)),
            MotorConfig::new(JointId(2), JointId(1)),
        ])
        .is_err());
    }

    #[test]
    fn frame_lists_every_bar() {
        let sim = four_bar();
        let frame = sim.frame();
        assert_eq!(frame.positions.len(), 4);
        assert_eq!(frame.bars.len(), 3);
        for bar in &frame.bars {
            assert_abs_diff_eq!(bar.span, bar.length, epsilon = 1e-12);
        }
        assert_eq!(frame.bars[1].midpoint, Vector2::new(1.5, 1.0));
    }
}
