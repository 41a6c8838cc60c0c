//! Trajectory engine scenarios: buffer shapes, step lengths, containment
//! and target contacts.

use spermsim_common::{SimulationConfig, Vec3};
use spermsim_engine::{IoStatus, SpermSimulation};

const TOL: f64 = 1e-6;

fn config(shape: &str, seed: u64) -> SimulationConfig {
    let mut c = SimulationConfig::default();
    c.container.shape = shape.to_string();
    c.run.seed = Some(seed);
    c
}

/// Scenario A: small cube, trajectory shape [1][5][3]; every step the
/// resolver left alone has exactly the step length.
#[test]
fn small_cube_scenario() -> anyhow::Result<()> {
    let mut c = config("cube", 7);
    c.container.radius = 0.05;
    c.motion.step_length = 0.02;
    c.motion.n_simulation = 5;
    c.motion.number_of_sperm = 1;

    let run = SpermSimulation::new(&c)?.run()?;
    assert_eq!(run.trajectory.shape(), [1, 5, 3]);

    for (i, d) in run.trajectory.step_lengths(0).iter().enumerate() {
        if !run.trajectory.was_clipped(0, i + 1) {
            assert!((d - 0.02).abs() < TOL, "step {} has length {}", i + 1, d);
        }
    }
    Ok(())
}

/// Scenario B: drop container, every consecutive pair classifies.
#[test]
fn drop_scenario_classifies_every_pair() -> anyhow::Result<()> {
    let mut c = config("drop", 8);
    c.container.drop_radius = 0.1;
    c.container.drop_angle = 0.52;
    c.motion.step_length = 0.02;
    c.motion.n_simulation = 5;

    let mut sim = SpermSimulation::new(&c)?;
    let run = sim.run()?;
    let positions = run.trajectory.particle(0);
    assert_eq!(positions.len(), 5);
    for pair in positions.windows(2) {
        let status = sim.container().classify(pair[0], pair[1]);
        assert!(matches!(status, IoStatus::Inside | IoStatus::TempSurface | IoStatus::Outside));
        assert!(pair[1].is_finite());
    }
    Ok(())
}

/// Scenario C: ten sperm, fifty steps.
#[test]
fn many_sperm_shape() -> anyhow::Result<()> {
    let mut c = config("cube", 9);
    c.container.radius = 1.0;
    c.motion.number_of_sperm = 10;
    c.motion.n_simulation = 50;
    c.motion.step_length = 0.01;

    let run = SpermSimulation::new(&c)?.run()?;
    assert_eq!(run.trajectory.shape(), [10, 50, 3]);
    assert_eq!(run.trajectory.to_nested().len(), 10);
    assert!(run.trajectory.to_nested().iter().all(|p| p.len() == 50));
    Ok(())
}

#[test]
fn unclipped_steps_have_step_length_for_all_shapes() -> anyhow::Result<()> {
    for (shape, seed) in [("cube", 1), ("drop", 2), ("spot", 3)] {
        for deviation in [0.0, 0.4, 1.0] {
            let mut c = config(shape, seed);
            c.container.radius = 0.1;
            c.container.drop_radius = 0.1;
            c.container.spot_radius = 0.08;
            c.motion.step_length = 0.03;
            c.motion.n_simulation = 30;
            c.motion.number_of_sperm = 3;
            c.motion.deviation = deviation;

            let run = SpermSimulation::new(&c)?.run()?;
            for particle in 0..3 {
                for (i, d) in run.trajectory.step_lengths(particle).iter().enumerate() {
                    if !run.trajectory.was_clipped(particle, i + 1) {
                        assert!((d - 0.03).abs() < TOL, "{shape}, deviation {deviation}: {d}");
                    }
                }
            }
        }
    }
    Ok(())
}

#[test]
fn interior_walk_is_never_clipped() -> anyhow::Result<()> {
    let mut c = config("cube", 4);
    c.motion.number_of_sperm = 3;
    c.motion.n_simulation = 50;

    let mut sim = SpermSimulation::new(&c)?;
    // 49 steps of 0.01 cannot reach a face 1.0 away.
    let run = sim.run_from(&[Vec3::zero(), Vec3::new(0.2, -0.2, 0.0), Vec3::new(0.0, 0.0, -0.3)])?;

    assert_eq!(run.trajectory.clipped_count(), 0);
    for particle in 0..3 {
        for d in run.trajectory.step_lengths(particle) {
            assert!((d - 0.01).abs() < TOL);
        }
    }
    Ok(())
}

#[test]
fn default_cube_egg_counts_every_step() -> anyhow::Result<()> {
    let mut c = config("cube", 5);
    c.motion.number_of_sperm = 2;
    c.motion.n_simulation = 20;

    let run = SpermSimulation::new(&c)?.run_from(&[Vec3::zero(), Vec3::new(0.1, 0.1, 0.1)])?;
    assert_eq!(run.contacts.len(), 2 * 19);

    // Step-major, then particle order; elapsed time is step * 4 s.
    assert_eq!((run.contacts[0].sperm, run.contacts[0].step), (0, 1));
    assert_eq!((run.contacts[1].sperm, run.contacts[1].step), (1, 1));
    for contact in &run.contacts {
        assert_eq!(contact.t_sec, contact.step as f64 * 4.0);
        assert_eq!(contact.position, run.trajectory.position(contact.sperm, contact.step));
    }
    Ok(())
}

#[test]
fn separate_egg_out_of_reach_gives_no_contacts() -> anyhow::Result<()> {
    let mut c = config("cube", 6);
    c.motion.n_simulation = 50;
    c.target.egg_radius = Some(0.05);
    c.target.egg_center = [0.9, 0.9, 0.9];

    let run = SpermSimulation::new(&c)?.run_from(&[Vec3::zero()])?;
    assert!(run.contacts.is_empty());
    Ok(())
}

/// The legacy resolver can leave a cap through the supporting plane: a
/// ballistic step into the rim of a hemisphere slides down the wall.
#[test]
fn legacy_resolver_can_leave_through_the_plane() -> anyhow::Result<()> {
    let mut c = config("drop", 31);
    c.container.drop_angle = std::f64::consts::FRAC_PI_2;
    c.motion.step_length = 0.02;
    c.motion.deviation = 0.0;
    c.motion.n_simulation = 2;
    let start = [Vec3::new(0.99, 0.0, 0.005)];

    let mut sim = SpermSimulation::new(&c)?;
    let run = sim.run_from(&start)?;
    let p = run.trajectory.position(0, 1);
    assert!(p.z < -0.01, "{p:?}");
    assert!(run.trajectory.was_clipped(0, 1));
    assert_eq!(sim.container().classify(start[0], p), IoStatus::Outside);

    c.run.resolver = "corrected".to_string();
    let run = SpermSimulation::new(&c)?.run_from(&start)?;
    assert_eq!(run.trajectory.position(0, 1), start[0]);
    Ok(())
}

#[test]
fn corrected_resolver_keeps_caps_contained() -> anyhow::Result<()> {
    for (shape, seed) in [("drop", 21), ("spot", 22)] {
        let mut c = config(shape, seed);
        c.container.drop_radius = 0.1;
        c.container.drop_angle = 0.52;
        c.container.spot_radius = 0.08;
        c.motion.step_length = 0.02;
        c.motion.n_simulation = 200;
        c.motion.number_of_sperm = 5;
        c.run.resolver = "corrected".to_string();

        let mut sim = SpermSimulation::new(&c)?;
        let run = sim.run()?;
        for particle in 0..5 {
            for &p in run.trajectory.particle(particle) {
                assert!(p.z >= -1e-12, "{shape}: z = {}", p.z);
                assert_ne!(sim.container().classify(p, p), IoStatus::Outside, "{shape}: {p:?}");
            }
        }
    }
    Ok(())
}

#[test]
fn corrected_resolver_keeps_cube_contained() -> anyhow::Result<()> {
    let mut c = config("cube", 23);
    c.container.radius = 0.05;
    c.motion.step_length = 0.02;
    c.motion.n_simulation = 200;
    c.motion.number_of_sperm = 4;
    c.motion.deviation = 0.2;
    c.run.resolver = "corrected".to_string();

    let mut sim = SpermSimulation::new(&c)?;
    let run = sim.run()?;
    for particle in 0..4 {
        for &p in run.trajectory.particle(particle) {
            assert_ne!(sim.container().classify(p, p), IoStatus::Outside, "{p:?}");
        }
    }
    Ok(())
}
