use std::sync::Arc;

use postseismic::analytic::{ExactVelocity, InitSzx, InitSzy};
use postseismic::{units, InitialState, SimpleSolver, SimulationConfig};

fn main() {
    env_logger::init();

    println!("═══════════════════════════════════════════════════════════════");
    println!("  Post-seismic Relaxation: Elastic Layer over Maxwell Half-space");
    println!("═══════════════════════════════════════════════════════════════\n");

    let args: Vec<String> = std::env::args().collect();
    let config = if args.len() > 1 {
        SimulationConfig::from_file(&args[1]).unwrap_or_else(|e| {
            eprintln!("ERROR loading config: {}", e);
            std::process::exit(1);
        })
    } else {
        SimulationConfig::default()
    };
    config.print_summary();

    let (mut solver, tla) = SimpleSolver::from_config(config).unwrap_or_else(|e| {
        eprintln!("ERROR setting up problem: {}", e);
        std::process::exit(1);
    });

    println!(
        "\nRelaxation time τ = {:.2} yr",
        units::seconds_to_years(tla.relaxation_time())
    );

    // Coseismic stress and the matching early post-seismic velocity
    let vel0 = ExactVelocity::new(Arc::clone(&tla), 0.0);
    let szx0 = InitSzx(Arc::clone(&tla));
    let szy0 = InitSzy(Arc::clone(&tla));
    let init = InitialState::new(&vel0, &szx0, &szy0);

    let summary = match solver.run(&init, None) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR during time stepping: {}", e);
            std::process::exit(1);
        }
    };

    let exact = ExactVelocity::new(Arc::clone(&tla), summary.time);
    let error = solver
        .solution()
        .velocity_l2_error(solver.problem(), &exact)
        .unwrap_or(f64::NAN);

    println!("\nRun finished:");
    println!("  Steps:        {}", summary.steps);
    println!("  Refinements:  {}", summary.refinements);
    println!("  Final time:   {:.3} yr", units::seconds_to_years(summary.time));
    println!("  Mesh:         {} × {} cells", solver.problem().mesh().nx, solver.problem().mesh().ny);
    println!("  ||v_h - v||:  {:.4e}", error);

    let soln = solver.solution();
    let vmax = soln.current.vel.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let smax = soln.current.strs.iter().flatten().fold(0.0_f64, |m, s| m.max(s.abs()));
    println!("  max |v|:      {:.4} cm/yr", units::m_per_s_to_cm_per_year(vmax));
    println!("  max |σ|:      {:.4} MPa", units::pa_to_mpa(smax));
}
