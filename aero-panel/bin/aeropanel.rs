//! Unsteady panel / vortex-particle solver driver
//!
//! Runs every velocity of a JSON case configuration over one geometry,
//! reusing the influence-coefficient cache between cases.
//!
//! Usage:
//!   cargo run --release --bin aeropanel -- --config wing_case.json
//!   cargo run --release --bin aeropanel -- --config wing_case.json -t 8 -v

use aero_panel::core::io::tri::TriMesh;
use aero_panel::core::mesh::GraphOptions;
use aero_panel::{AeroCase, CaseConfig, Graph};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "aeropanel")]
#[command(about = "Unsteady panel method with a vortex-particle wake", long_about = None)]
struct Args {
    /// Path to the JSON case configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Root directory for per-case output (default: working directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of worker threads (default: all cores)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if args.verbose {
        "info"
    } else {
        "warn"
    }))
    .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let config = CaseConfig::from_file(&args.config)?;
    println!("geometry: {}", config.geom_file.display());

    let mesh = TriMesh::from_file(&config.geom_file)?;
    let mut graph = Graph::build(
        &mesh,
        GraphOptions {
            vortex_particles: config.vortex_particles,
            dt: config.time_step,
            input_v: config.velocities.first().copied().unwrap_or(1.0),
            norm_flag: config.norm_flag,
            ..GraphOptions::default()
        },
    )?;
    println!(
        "panels: {} body, {} wake, {} wakes",
        graph.n_body(),
        graph.n_wake(),
        graph.wakes.len()
    );

    let cache_path = config.inf_coeff_path();
    graph.ensure_influence(Some(cache_path.as_path()), config.write_coeff_flag)?;

    println!(
        "{:<8} {:<8} {:<8} {:>10} {:>10} {:>10} {:>8} {:>8} {:>8}",
        "V", "alpha", "beta", "CL", "CDi", "CMy", "forces", "trefftz", "stab"
    );

    for &v in &config.velocities {
        let mut case = AeroCase::new(&mut graph, &config, v);
        if let Some(out) = &args.output {
            case.set_output_root(out.clone());
        }
        let summary = case.run()?;

        println!(
            "{:<8} {:<8} {:<8} {:>10.5} {:>10.6} {:>10.5} {:>8} {:>8} {:>8}",
            summary.v_mag,
            summary.alpha,
            summary.beta,
            summary.cl_trefftz,
            summary.cd_trefftz,
            summary.cm.y,
            "\u{2713}",
            "\u{2713}",
            if summary.stability.is_some() {
                "\u{2713}"
            } else {
                "X"
            }
        );

        if let Some(stab) = summary.stability {
            println!(
                "  dCL/dalpha = {:.4} /rad   dCL/dbeta = {:.4} /rad",
                stab.df_dalpha.z, stab.df_dbeta.z
            );
            println!(
                "  dCM/dalpha = ({:.4}, {:.4}, {:.4}) /rad",
                stab.dm_dalpha.x, stab.dm_dalpha.y, stab.dm_dalpha.z
            );
        }
        if !summary.converged {
            println!("*** Warning : Solution did not converge ***");
        }
    }

    Ok(())
}
