use std::sync::Arc;

use approx::assert_relative_eq;
use postseismic::bc::{FnBc, ZeroBc};
use postseismic::ic::{ConstantFunction, FnFunction, ZeroFunction};
use postseismic::{
    Bdf2, BootstrapPolicy, BoundarySide, ConstantInvViscosity, FwdEuler, InitialState, ProblemData,
    Scheme, SimpleSolver, SimulationConfig, Solution, StepState, Stress, StructuredMesh, Velocity,
    ViscoError,
};

const MU: f64 = 2.0;
const G: f64 = 0.05;
/// Boundary velocity v = RAMP t x
const RAMP: f64 = 1.0;

fn problem() -> ProblemData {
    let mesh = StructuredMesh::new(0.0, 4.0, 0.0, 2.0, 4, 2, 2);
    ProblemData::new(mesh, MU, Arc::new(ConstantInvViscosity::from_inverse(G)))
        .with_dirichlet_sides(vec![BoundarySide::Left, BoundarySide::Right, BoundarySide::Bottom])
}

fn solver() -> SimpleSolver {
    SimpleSolver::new(SimulationConfig::default(), problem(), Box::new(ZeroBc::new()))
}

fn uniform_szx(solver: &mut SimpleSolver, s0: f64) {
    let (zero, szx) = (ZeroFunction, ConstantFunction(s0));
    solver
        .apply_init_cond(&InitialState::new(&zero, &szx, &zero))
        .unwrap();
}

#[test]
fn test_zero_state_stays_zero() {
    let mut solver = solver();
    uniform_szx(&mut solver, 0.0);
    solver.step(0.25).unwrap();

    let soln = solver.solution();
    assert_eq!(soln.state(), StepState::Committed);
    assert_relative_eq!(soln.time(), 0.25);
    assert!(soln.current.vel.iter().all(|v| v.abs() < 1e-14));
    assert!(soln.current.strs.iter().flatten().all(|s| s.abs() < 1e-14));
}

#[test]
fn test_uniform_stress_relaxes_forward_euler() {
    // Uniform σ_zx with the sides clamped: no velocity, σ decays as (1 - dt μ g)
    let dt = 0.5;
    let mut solver = solver();
    uniform_szx(&mut solver, 1.0);

    solver.step(dt).unwrap();
    solver.step(dt).unwrap();

    let factor = 1.0 - dt * MU * G;
    let soln = solver.solution();
    for &s in &soln.current.strs[0] {
        assert_relative_eq!(s, factor * factor, epsilon = 1e-9);
    }
    assert!(soln.current.strs[1].iter().all(|s| s.abs() < 1e-9));
    assert!(soln.current.vel.iter().all(|v| v.abs() < 1e-9));
    assert_eq!(soln.num_levels(), 2);
}

#[test]
fn test_uniform_stress_relaxes_bdf2() {
    let dt = 0.5;
    let a = dt * MU * G;
    let mut solver = solver();
    solver.set_scheme(Box::new(Bdf2::new(BootstrapPolicy::FirstOrder)));
    uniform_szx(&mut solver, 1.0);

    // First step falls back to first order
    solver.step(dt).unwrap();
    let s1 = 1.0 - a;
    for &s in &solver.solution().current.strs[0] {
        assert_relative_eq!(s, s1, epsilon = 1e-9);
    }

    // Constant step: σ² = 4/3 σ¹ - 1/3 σ⁰ - (2/3) dt μ g (2σ¹ - σ⁰)
    solver.step(dt).unwrap();
    let s2 = 4.0 / 3.0 * s1 - 1.0 / 3.0 - 2.0 / 3.0 * a * (2.0 * s1 - 1.0);
    for &s in &solver.solution().current.strs[0] {
        assert_relative_eq!(s, s2, epsilon = 1e-9);
    }
}

/// Uniform σ_zx driven by v = RAMP t x on the clamped sides
///
/// Stays uniform with v = RAMP t x everywhere, so σ_zx follows
/// dσ/dt = μ RAMP t - μ g σ exactly. Returns the largest stress error at T.
fn ramped_shear_error(bdf2: bool, dt: f64, t_final: f64) -> f64 {
    let ramp = FnBc::new(|p, t| RAMP * t * p.x);
    let mut solver = SimpleSolver::new(SimulationConfig::default(), problem(), Box::new(ramp));
    if bdf2 {
        solver.set_scheme(Box::new(Bdf2::new(BootstrapPolicy::FirstOrder)));
    }
    uniform_szx(&mut solver, 0.0);

    let steps = (t_final / dt).round() as usize;
    for _ in 0..steps {
        solver.step(dt).unwrap();
    }

    let (pd, soln) = (solver.problem(), solver.solution());
    let t = soln.time();
    assert_relative_eq!(t, t_final, epsilon = 1e-12);
    for dof in 0..pd.n_dofs() {
        let p = pd.dofs().support_point(dof);
        assert_relative_eq!(soln.current.vel[dof], RAMP * t * p.x, epsilon = 1e-6);
        assert!(soln.current.strs[1][dof].abs() < 1e-6);
    }

    let k = MU * G;
    let exact = MU * RAMP / k * (t - (1.0 - (-k * t).exp()) / k);
    soln.current.strs[0]
        .iter()
        .fold(0.0_f64, |m, s| m.max((s - exact).abs()))
}

#[test]
fn test_ramped_shear_temporal_convergence() {
    let dts = [0.5, 0.25, 0.125];
    let fe: Vec<f64> = dts.iter().map(|&dt| ramped_shear_error(false, dt, 4.0)).collect();
    let bdf: Vec<f64> = dts.iter().map(|&dt| ramped_shear_error(true, dt, 4.0)).collect();

    for i in 0..2 {
        let fe_ratio = fe[i] / fe[i + 1];
        assert!(fe_ratio > 1.8 && fe_ratio < 2.2, "Forward Euler ratio {}", fe_ratio);
        let bdf_ratio = bdf[i] / bdf[i + 1];
        assert!(bdf_ratio > 3.6 && bdf_ratio < 4.4, "BDF2 ratio {}", bdf_ratio);
    }
    assert!(bdf[2] < 0.1 * fe[2]);
}

#[test]
fn test_ramped_shear_bdf2_error_bounded_over_long_runs() {
    // Fixed dt: the error settles instead of growing with the step count
    let short = ramped_shear_error(true, 0.25, 4.0);
    let long = ramped_shear_error(true, 0.25, 16.0);
    assert!(long < 2.0 * short, "error grew from {} to {}", short, long);
}

#[test]
fn test_bdf2_reject_policy_rolls_back() {
    let mut solver = solver();
    solver.set_scheme(Box::new(Bdf2::new(BootstrapPolicy::Reject)));
    uniform_szx(&mut solver, 1.0);

    let err = solver.step(0.5).unwrap_err();
    assert!(matches!(
        err,
        ViscoError::InsufficientHistory { required: 2, available: 1, .. }
    ));
    assert!(err.is_precondition());

    let soln = solver.solution();
    assert_eq!(soln.state(), StepState::Committed);
    assert_eq!(soln.time(), 0.0);
    assert!(soln.current.strs[0].iter().all(|&s| s == 1.0));

    // A first-order step is still possible from the restored state
    solver.set_scheme(Box::new(FwdEuler::new()));
    solver.step(0.5).unwrap();
}

#[test]
fn test_components_require_reinit() {
    let pd = problem();
    let mut soln = Solution::new(&pd);
    let mut scheme = FwdEuler::new();
    scheme.reinit(&pd);

    soln.start_timestep(0.1).unwrap();
    let err = Stress::new().tentative_step(&mut soln, &scheme).unwrap_err();
    assert!(matches!(err, ViscoError::NotInitialized { component: "Stress" }));

    let unbound = FwdEuler::new();
    let mut stress = Stress::new();
    stress.reinit(&pd);
    let err = stress.tentative_step(&mut soln, &unbound).unwrap_err();
    assert!(matches!(err, ViscoError::NotInitialized { component: "Scheme" }));

    soln.advance(StepState::Started, StepState::Tentative).unwrap();
    let err = Velocity::new()
        .step(&mut soln, &scheme, &ZeroBc::new())
        .unwrap_err();
    assert!(matches!(err, ViscoError::NotInitialized { component: "Velocity" }));
}

#[test]
fn test_phases_out_of_order() {
    let pd = problem();
    let mut soln = Solution::new(&pd);
    let mut scheme = FwdEuler::new();
    scheme.reinit(&pd);
    let mut stress = Stress::new();
    stress.reinit(&pd);
    let mut velocity = Velocity::new();
    velocity.reinit(&pd);
    let bc = ZeroBc::new();

    // Nothing before start_timestep
    assert!(matches!(
        stress.tentative_step(&mut soln, &scheme),
        Err(ViscoError::StepOrder(_))
    ));

    soln.start_timestep(0.1).unwrap();
    assert!(matches!(
        velocity.step(&mut soln, &scheme, &bc),
        Err(ViscoError::StepOrder(_))
    ));
    assert!(matches!(
        stress.correction_step(&mut soln, &scheme),
        Err(ViscoError::StepOrder(_))
    ));
    assert!(matches!(soln.commit_timestep(), Err(ViscoError::StepOrder(_))));

    stress.tentative_step(&mut soln, &scheme).unwrap();
    assert!(matches!(
        stress.tentative_step(&mut soln, &scheme),
        Err(ViscoError::StepOrder(_))
    ));
    velocity.step(&mut soln, &scheme, &bc).unwrap();
    stress.correction_step(&mut soln, &scheme).unwrap();
    soln.commit_timestep().unwrap();
    assert_eq!(soln.state(), StepState::Committed);
}

#[test]
fn test_shear_stress_drives_velocity() {
    // σ_zy varying with depth is not in equilibrium and must produce flow
    let mut solver = solver();
    let zero = ZeroFunction;
    let szy = FnFunction(|p: &nalgebra::Point2<f64>| p.y * (2.0 - p.y));
    solver
        .apply_init_cond(&InitialState::new(&zero, &zero, &szy))
        .unwrap();
    solver.step(0.5).unwrap();

    let vmax = solver
        .solution()
        .current
        .vel
        .iter()
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    assert!(vmax > 1e-6);
}

#[test]
fn test_invalid_step_size_rejected() {
    let mut solver = solver();
    uniform_szx(&mut solver, 1.0);
    assert!(matches!(solver.step(0.0), Err(ViscoError::StepOrder(_))));
    assert!(matches!(solver.step(f64::NAN), Err(ViscoError::StepOrder(_))));
    assert_eq!(solver.solution().state(), StepState::Committed);
    solver.step(0.1).unwrap();
}
