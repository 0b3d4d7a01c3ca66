/// Validation Benchmark: Two-layer Post-seismic Relaxation
///
/// **Problem Setup:**
/// - Strike-slip fault breaking the surface, locked below the elastic layer
/// - Elastic layer of thickness H over a Maxwell half-space (η, μ)
/// - Coseismic stress as initial condition, exact velocity on the sides
/// - The fault tip sits on a mesh node; its 1/r stress terms are dropped there
///
/// **Reference Solutions:**
/// - Image-sum surface velocity with relaxation time τ = 2η/μ (space + time error)
/// - The same mesh run with a much smaller dt (time error only)
///
/// **Success Criteria:**
/// - Temporal error decreases as dt is halved
/// - BDF2 ratio approaches 4, Forward Euler approaches 2

use std::sync::Arc;

use nalgebra::Point2;
use postseismic::analytic::{ExactVelocity, InitSzx, InitSzy};
use postseismic::config::SchemeKind;
use postseismic::fem::transfer;
use postseismic::{units, InitialState, SimpleSolver, SimulationConfig, SpatialFunction, StructuredMesh};

const T_END_YEARS: f64 = 10.0;
const REFERENCE_DT_YEARS: f64 = 1.0 / 32.0;

/// Nodal field of a finished run, evaluated anywhere in its mesh
struct DiscreteField {
    mesh: StructuredMesh,
    values: Vec<f64>,
}

impl SpatialFunction for DiscreteField {
    fn value(&self, p: &Point2<f64>) -> f64 {
        transfer::evaluate(&self.mesh, &self.values, p)
    }
}

fn run_case(scheme: SchemeKind, dt_years: f64) -> postseismic::Result<(SimpleSolver, f64)> {
    let mut config = SimulationConfig::default();
    config.domain.nx = 20;
    config.domain.ny = 10;
    config.time_stepping.scheme = scheme;
    config.time_stepping.dt_years = dt_years;
    config.time_stepping.t_end_years = T_END_YEARS;
    config.time_stepping.check_stability = false;

    let (mut solver, tla) = SimpleSolver::from_config(config)?;
    let vel0 = ExactVelocity::new(Arc::clone(&tla), 0.0);
    let szx0 = InitSzx(Arc::clone(&tla));
    let szy0 = InitSzy(Arc::clone(&tla));
    let summary = solver.run(&InitialState::new(&vel0, &szx0, &szy0), None)?;

    let exact = ExactVelocity::new(tla, summary.time);
    let err = solver.solution().velocity_l2_error(solver.problem(), &exact)?;
    Ok((solver, err))
}

fn reference(scheme: SchemeKind) -> postseismic::Result<DiscreteField> {
    let (solver, _) = run_case(scheme, REFERENCE_DT_YEARS)?;
    Ok(DiscreteField {
        mesh: solver.problem().mesh().clone(),
        values: solver.solution().current.vel.clone(),
    })
}

fn print_row(dt_years: f64, analytic: f64, temporal: f64, ratio: Option<f64>) {
    match ratio {
        Some(r) => println!("  {:>10.3}  {:>14.6e}  {:>14.6e}  {:>8.3}", dt_years, analytic, temporal, r),
        None => println!("  {:>10.3}  {:>14.6e}  {:>14.6e}  {:>8}", dt_years, analytic, temporal, "-"),
    }
}

fn main() {
    env_logger::init();

    println!("═══════════════════════════════════════════════════════");
    println!("  Two-layer Relaxation: Temporal Convergence");
    println!("═══════════════════════════════════════════════════════\n");

    let defaults = SimulationConfig::default();
    let tau = 2.0 * defaults.material.viscosity / defaults.material.shear_modulus;
    println!("Relaxation time τ = {:.2} yr", units::seconds_to_years(tau));
    println!("Reference dt = {} yr, t_end = {} yr\n", REFERENCE_DT_YEARS, T_END_YEARS);

    for scheme in [SchemeKind::FwdEuler, SchemeKind::Bdf2] {
        println!("{:?}:", scheme);
        let fine = match reference(scheme) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("  reference run failed: {}", e);
                continue;
            }
        };

        println!(
            "  {:>10}  {:>14}  {:>14}  {:>8}",
            "dt (yr)", "||v_h - v||", "||v_h - v_ref||", "ratio"
        );
        let mut previous: Option<f64> = None;
        for dt_years in [2.0, 1.0, 0.5, 0.25] {
            let outcome = run_case(scheme, dt_years).and_then(|(solver, analytic)| {
                let temporal = solver.solution().velocity_l2_error(solver.problem(), &fine)?;
                Ok((analytic, temporal))
            });
            match outcome {
                Ok((analytic, temporal)) => {
                    print_row(dt_years, analytic, temporal, previous.map(|p| p / temporal));
                    previous = Some(temporal);
                }
                Err(e) => {
                    eprintln!("  dt = {} yr failed: {}", dt_years, e);
                    break;
                }
            }
        }
        println!();
    }
}
