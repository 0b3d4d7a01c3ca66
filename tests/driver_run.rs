use std::sync::Arc;

use approx::assert_relative_eq;
use postseismic::analytic::{ExactVelocity, InitSzx, InitSzy};
use postseismic::config::{BoundaryValue, SchemeKind};
use postseismic::ic::ZeroFunction;
use postseismic::{units, BootstrapPolicy, InitialState, SimpleSolver, SimulationConfig, ViscoError};

fn small_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.domain.nx = 8;
    config.domain.ny = 4;
    config.domain.degree = 1;
    config.time_stepping.t_end_years = 2.0;
    config.time_stepping.dt_years = 1.0;
    config.time_stepping.first_step_substeps = 2;
    config.refinement.max_refinement_level = 1;
    config
}

#[test]
fn test_run_switches_to_configured_scheme() {
    let config = small_config();
    let (mut solver, tla) = SimpleSolver::from_config(config).unwrap();

    let vel0 = ExactVelocity::new(Arc::clone(&tla), 0.0);
    let szx0 = InitSzx(Arc::clone(&tla));
    let szy0 = InitSzy(Arc::clone(&tla));
    let summary = solver
        .run(&InitialState::new(&vel0, &szx0, &szy0), None)
        .unwrap();

    // Two Forward Euler sub-steps, then one BDF2 step
    assert_eq!(summary.steps, 3);
    assert_eq!(summary.refinements, 0);
    assert_eq!(solver.scheme().name(), "BDF2");
    assert_relative_eq!(
        summary.time,
        units::years_to_seconds(2.0),
        max_relative = 1e-12
    );
    assert!(summary.velocity_error.is_none());

    let exact = ExactVelocity::new(tla, summary.time);
    let err = solver
        .solution()
        .velocity_l2_error(solver.problem(), &exact)
        .unwrap();
    assert!(err.is_finite());
    assert!(solver.solution().current.vel.iter().all(|v| v.is_finite()));
}

#[test]
fn test_initial_adaptive_refinement() {
    let mut config = small_config();
    config.refinement.initial_adaptive_refinement = 1;
    config.time_stepping.scheme = SchemeKind::FwdEuler;
    config.time_stepping.t_end_years = 1.0;
    config.boundary.value = BoundaryValue::Zero;

    let (mut solver, tla) = SimpleSolver::from_config(config).unwrap();
    let vel0 = ZeroFunction;
    let szx0 = InitSzx(Arc::clone(&tla));
    let szy0 = InitSzy(tla);
    let exact = ZeroFunction;
    let summary = solver
        .run(&InitialState::new(&vel0, &szx0, &szy0), Some(&exact))
        .unwrap();

    assert_eq!(summary.refinements, 1);
    assert_eq!(solver.problem().mesh().nx, 16);
    assert_eq!(solver.problem().mesh().level, 1);
    assert_eq!(solver.scheme().name(), "FwdEuler");
    // Time restarts after the adaptive cycle
    assert_relative_eq!(summary.time, units::years_to_seconds(1.0), max_relative = 1e-12);
    assert!(summary.velocity_error.is_some_and(|e| e.is_finite()));
}

#[test]
fn test_reject_policy_runs_from_seeded_history() {
    // The initial condition is seeded as the previous level, so the
    // rejecting BDF2 never needs a first-order start
    let mut config = small_config();
    config.time_stepping.bootstrap = BootstrapPolicy::Reject;
    config.time_stepping.t_end_years = 3.0;

    let (mut solver, tla) = SimpleSolver::from_config(config).unwrap();
    let vel0 = ExactVelocity::new(Arc::clone(&tla), 0.0);
    let szx0 = InitSzx(Arc::clone(&tla));
    let szy0 = InitSzy(tla);
    let summary = solver
        .run(&InitialState::new(&vel0, &szx0, &szy0), None)
        .unwrap();

    assert_eq!(summary.steps, 4);
    assert_relative_eq!(summary.time, units::years_to_seconds(3.0), max_relative = 1e-12);
}

fn two_layer_config(scheme: SchemeKind, t_end_years: f64) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.domain.nx = 8;
    config.domain.ny = 4;
    config.time_stepping.scheme = scheme;
    config.time_stepping.dt_years = 0.5;
    config.time_stepping.t_end_years = t_end_years;
    config.time_stepping.check_stability = false;
    config
}

/// L2 velocity error against the two-layer solution at t_end
fn two_layer_error(scheme: SchemeKind, t_end_years: f64) -> f64 {
    let (mut solver, tla) = SimpleSolver::from_config(two_layer_config(scheme, t_end_years)).unwrap();
    let vel0 = ExactVelocity::new(Arc::clone(&tla), 0.0);
    let szx0 = InitSzx(Arc::clone(&tla));
    let szy0 = InitSzy(Arc::clone(&tla));
    let exact = ExactVelocity::new(tla, units::years_to_seconds(t_end_years));
    let summary = solver
        .run(&InitialState::new(&vel0, &szx0, &szy0), Some(&exact))
        .unwrap();
    summary.velocity_error.unwrap()
}

#[test]
fn test_two_layer_bdf2_error_stays_bounded() {
    let bdf_short = two_layer_error(SchemeKind::Bdf2, 2.0);
    let bdf_long = two_layer_error(SchemeKind::Bdf2, 8.0);
    let fe_long = two_layer_error(SchemeKind::FwdEuler, 8.0);

    assert!(bdf_long.is_finite() && fe_long.is_finite());
    assert!(
        bdf_long < 2.0 * bdf_short,
        "BDF2 error grew from {:e} to {:e}",
        bdf_short,
        bdf_long
    );
    assert!(
        bdf_long < 1.5 * fe_long,
        "BDF2 error {:e} against Forward Euler {:e}",
        bdf_long,
        fe_long
    );
}

#[test]
fn test_bdf2_velocity_matches_boundary_data() {
    let (mut solver, tla) = SimpleSolver::from_config(two_layer_config(SchemeKind::Bdf2, 3.0)).unwrap();
    let vel0 = ExactVelocity::new(Arc::clone(&tla), 0.0);
    let szx0 = InitSzx(Arc::clone(&tla));
    let szy0 = InitSzy(Arc::clone(&tla));
    let summary = solver
        .run(&InitialState::new(&vel0, &szx0, &szy0), None)
        .unwrap();
    assert_eq!(solver.scheme().name(), "BDF2");

    let (pd, vel) = (solver.problem(), &solver.solution().current.vel);
    let vmax = vel.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    assert!(vmax > 0.0);
    for &side in pd.dirichlet_sides() {
        for dof in pd.dofs().boundary_dofs(side) {
            let p = pd.dofs().support_point(dof);
            let expected = tla.velocity(p.x, p.y, summary.time);
            assert_relative_eq!(vel[dof], expected, epsilon = 1e-6 * vmax);
        }
    }
}

#[test]
fn test_last_step_lands_on_t_end() {
    // dt = 1 yr does not divide 2.5 yr: two sub-steps, one full step, one half step
    let mut config = small_config();
    config.time_stepping.t_end_years = 2.5;
    let (mut solver, tla) = SimpleSolver::from_config(config).unwrap();
    let vel0 = ExactVelocity::new(Arc::clone(&tla), 0.0);
    let szx0 = InitSzx(Arc::clone(&tla));
    let szy0 = InitSzy(tla);
    let summary = solver
        .run(&InitialState::new(&vel0, &szx0, &szy0), None)
        .unwrap();

    assert_eq!(summary.steps, 4);
    assert_relative_eq!(summary.time, units::years_to_seconds(2.5), max_relative = 1e-12);
    assert_relative_eq!(solver.solution().time(), summary.time);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = small_config();
    config.boundary.dirichlet_sides.clear();
    assert!(matches!(
        SimpleSolver::from_config(config),
        Err(ViscoError::Config(_))
    ));
}
