use approx::assert_abs_diff_eq;
use linkwork_core::{
    GeometryFault, LinkageError, MechanismSpec, MotorCommand, RadicandPolicy, Simulation,
    SolverConfig, Spatial,
};
use nalgebra::Vector3;

fn init_tracing() {
    let default_filter = "linkwork_core=debug";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn cone_crank(config: SolverConfig) -> Simulation<Spatial> {
    let spec: MechanismSpec<Spatial> =
        linkwork_test_fixtures::mechanisms::load("cone-crank").expect("load cone-crank");
    Simulation::from_spec(&spec, config).expect("build cone-crank")
}

fn apex_distance(sim: &Simulation<Spatial>, p: &Vector3<f64>) -> f64 {
    (p - sim.reference().apex).norm()
}

#[test]
fn half_turn_places_elbow_on_authored_side() {
    init_tracing();
    let mut sim = cone_crank(SolverConfig::default());
    let crank = sim.joint_id("crank").unwrap();
    let elbow = sim.joint_id("elbow").unwrap();

    sim.command_motor(crank, MotorCommand::Absolute(180.0)).unwrap();
    sim.tick(0.0).unwrap();

    assert_abs_diff_eq!(
        sim.position(crank).unwrap(),
        Vector3::new(-1.0, 0.0, 0.0),
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        sim.position(elbow).unwrap(),
        Vector3::new(1.0, 1.3125f64.sqrt(), 1.0),
        epsilon = 1e-9
    );
}

#[test]
fn full_revolution_keeps_bars_and_apex_distances() {
    init_tracing();
    let mut sim = cone_crank(SolverConfig::default());
    let authored = sim.graph().authored_positions();
    let wrist = sim.joint_id("wrist").unwrap();
    let elbow = sim.joint_id("elbow").unwrap();

    // 0.25 rev/s authored speed, four seconds
    for _ in 0..80 {
        sim.tick(0.05).unwrap();
        for (edge, residual) in sim.length_residuals() {
            assert!(residual < 1e-9, "{edge} residual {residual}");
        }
        for joint in [elbow, wrist] {
            let p = sim.position(joint).unwrap();
            assert_abs_diff_eq!(
                apex_distance(&sim, &p),
                apex_distance(&sim, &authored[joint.index()]),
                epsilon = 1e-9
            );
        }
    }
    for (now, then) in sim.positions().iter().zip(&authored) {
        assert_abs_diff_eq!(now, then, epsilon = 1e-6);
    }
}

#[test]
fn unreachable_post_fails_strict_and_is_patched_by_lenient_policies() {
    init_tracing();
    let far = Vector3::new(10.0, 0.0, 0.0);

    let mut strict = cone_crank(SolverConfig::default());
    let post = strict.joint_id("post").unwrap();
    let elbow = strict.joint_id("elbow").unwrap();
    strict.set_anchor(post, far).unwrap();
    match strict.tick(0.0).unwrap_err() {
        LinkageError::DegenerateGeometry { joint, fault } => {
            assert_eq!(joint, elbow);
            assert!(matches!(fault, GeometryFault::NegativeRadicand { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }

    let mut clamped = cone_crank(SolverConfig {
        radicand_policy: RadicandPolicy::ClampToZero,
        ..SolverConfig::default()
    });
    clamped.set_anchor(post, far).unwrap();
    clamped.tick(0.0).unwrap();
    let worst = clamped
        .length_residuals()
        .into_iter()
        .map(|(_, r)| r)
        .fold(0.0, f64::max);
    assert!(worst > 1e-3, "clamped solve cannot satisfy every bar");

    let mut absolute = cone_crank(SolverConfig {
        radicand_policy: RadicandPolicy::Absolute,
        ..SolverConfig::default()
    });
    absolute.set_anchor(post, far).unwrap();
    absolute.tick(0.0).unwrap();
    assert!(absolute
        .positions()
        .iter()
        .all(|p| p.iter().all(|c| c.is_finite())));
    // |radicand| lifts the elbow off the base plane the clamped solve leaves it in
    let lifted = absolute.position(elbow).unwrap() - clamped.position(elbow).unwrap();
    assert!(lifted.norm() > 1e-3, "absolute and clamped elbows coincide");

    // the lenient solve is repeatable from the same state
    let mut again = cone_crank(SolverConfig {
        radicand_policy: RadicandPolicy::Absolute,
        ..SolverConfig::default()
    });
    again.set_anchor(post, far).unwrap();
    again.tick(0.0).unwrap();
    assert_eq!(again.positions(), absolute.positions());
}

#[test]
fn spec_round_trips_through_json() {
    let spec: MechanismSpec<Spatial> =
        linkwork_test_fixtures::mechanisms::load("cone-crank").unwrap();
    let text = spec.to_json().unwrap();
    let back = MechanismSpec::<Spatial>::from_json(&text).unwrap();
    assert_eq!(back, spec);
    assert_eq!(back.reference.apex, Vector3::new(0.0, 0.0, 4.0));
}
