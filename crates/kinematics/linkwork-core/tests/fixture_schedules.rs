use linkwork_core::{Dimension, JointRole, MechanismSpec, Planar, Schedule, Spatial};
use linkwork_test_fixtures::mechanisms;

fn check_fixture<D: Dimension>(name: &str) {
    let spec: MechanismSpec<D> = mechanisms::load(name).expect("load fixture");
    let compiled = match spec.compile() {
        Ok(compiled) => compiled,
        Err(err) => panic!("{name} failed to compile: {err}"),
    };
    let graph = compiled.graph;
    let schedule = match Schedule::build(&graph, &spec.reference) {
        Ok(schedule) => schedule,
        // Only fixtures authored to be underconstrained may fail here.
        Err(err) => {
            assert_eq!(name, "underconstrained", "{name}: {err}");
            return;
        }
    };

    let dynamic: Vec<_> = graph
        .joints()
        .iter()
        .filter(|j| j.role == JointRole::Dynamic)
        .map(|j| j.id)
        .collect();
    assert_eq!(schedule.order().len(), dynamic.len(), "{name}");

    for (pos, &id) in schedule.order().iter().enumerate() {
        let pair = schedule.pair(id).expect("dynamic joint has a pair");
        assert_ne!(pair.first, pair.second, "{name}: {id} pair reuses an edge");
        for (edge, dep) in [(pair.first, pair.first_joint), (pair.second, pair.second_joint)] {
            assert_eq!(graph.edge(edge).other(id), Some(dep), "{name}");
            let known = graph.role(dep).unwrap().is_driven() || schedule.order()[..pos].contains(&dep);
            assert!(known, "{name}: {dep} is solved after {id}");
        }
    }

    // Rebuilding from the same input is bit-for-bit identical.
    let again = spec.compile().unwrap();
    assert_eq!(again.graph, graph, "{name}");
    assert_eq!(Schedule::build(&again.graph, &spec.reference).unwrap(), schedule, "{name}");
}

#[test]
fn planar_fixtures_schedule_topologically() {
    let keys = mechanisms::keys_for("planar");
    assert!(keys.len() >= 3);
    for name in keys {
        check_fixture::<Planar>(&name);
    }
}

#[test]
fn spatial_fixtures_schedule_topologically() {
    for name in mechanisms::keys_for("spatial") {
        check_fixture::<Spatial>(&name);
    }
}
