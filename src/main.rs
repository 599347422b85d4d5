//! Command-line driver for the Ising analysis pipeline
//! (see `ising::config::Config` for all defaults).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ising::config::Config;
use ising::data::{
    analytical_path, burn_in_path, read_state_summary, samples_path, state_summary_path, values_path,
    write_burn_in, write_samples, write_state_summary, write_thermo_rows,
};
use ising::lattice::SpinInit;
use ising::plot::{render, PlotKind};
use ising::sampling::{self, linspace, RunParams};
use ising::states::{enumerate_states, total_degeneracy};
use ising::thermo::{
    analytical_table, compare_sampled, cross_check, default_analytical_temperatures, CrossCheck, ExactTwoByTwo,
    Thermodynamics, DEFAULT_CROSS_CHECK_TOLERANCE,
};
use ising::zoom::{zoom, ExternalRunner, InProcess, ZoomBackend};

#[derive(Parser)]
#[command(name = "ising", about = "Exact and Monte Carlo analysis of the 2D Ising model")]
struct Cli {
    /// Directory for CSV output
    #[arg(long, global = true, default_value = "output")]
    output_dir: PathBuf,

    /// Directory for rendered plots
    #[arg(long, global = true, default_value = "plots")]
    plots_dir: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enumerate every microstate of an L×L lattice
    States {
        #[arg(long, default_value = "2")]
        size: usize,
    },
    /// Cross-check enumerated and closed-form 2×2 averages and tabulate the latter
    Analytical {
        #[arg(long, default_value = "1.0")]
        temperature: f64,
    },
    /// Running averages from ordered and random starts
    BurnIn {
        #[arg(long)]
        size: Option<usize>,
        #[arg(long, value_delimiter = ',')]
        temps: Option<Vec<f64>>,
        #[arg(long)]
        cycles: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Record ε after every cycle past equilibration
    Samples {
        #[arg(long)]
        size: Option<usize>,
        #[arg(long, value_delimiter = ',')]
        temps: Option<Vec<f64>>,
        #[arg(long)]
        cycles: Option<usize>,
        #[arg(long)]
        burn_in: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Measure ⟨ε⟩, ⟨|m|⟩, C_v and χ over a temperature grid
    Scan {
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<usize>>,
        #[arg(long)]
        t_min: Option<f64>,
        #[arg(long)]
        t_max: Option<f64>,
        #[arg(long)]
        points: Option<usize>,
        #[arg(long)]
        cycles: Option<usize>,
        #[arg(long)]
        burn_in: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Rescan around the C_v and χ peaks of each size
    Zoom {
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<usize>>,
        #[arg(long)]
        margin: Option<usize>,
        #[arg(long)]
        points: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// External runner invoked as `RUNNER -z L T_min T_max seed`
        #[arg(long)]
        runner: Option<PathBuf>,
    },
    /// Compare a sampled 2×2 lattice with the exact solution
    Validate {
        #[arg(long, default_value = "1.0")]
        temperature: f64,
        #[arg(long, default_value = "1000000")]
        cycles: usize,
        #[arg(long, default_value = "10000")]
        burn_in: usize,
        /// Maximum relative error per observable
        #[arg(long, default_value = "0.05")]
        tolerance: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Render charts from existing CSV output
    Plot {
        #[arg(value_enum, default_value = "all")]
        kind: PlotKind,
    },
    /// Enumerate, cross-check and plot whatever data is present
    All,
}

fn print_check(check: &CrossCheck) {
    println!("T = {}", check.temperature);
    for (name, left, right) in &check.comparisons {
        println!("  {name:<18} {left:>22.15e} {right:>22.15e}");
    }
    println!("  max relative difference {:.3e} (tolerance {:.1e})", check.max_relative_difference(), check.tolerance);
}

fn run_states(cfg: &Config, size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let rows = enumerate_states(size)?;
    let path = state_summary_path(&cfg.output_dir, size);
    write_state_summary(&path, &rows)?;
    tracing::info!(groups = rows.len(), states = total_degeneracy(&rows), "wrote {}", path.display());
    Ok(())
}

fn run_analytical(cfg: &Config, temperature: f64) -> Result<(), Box<dyn std::error::Error>> {
    let summary_path = state_summary_path(&cfg.output_dir, 2);
    let states = if summary_path.exists() {
        read_state_summary(&summary_path)?
    } else {
        enumerate_states(2)?
    };
    let check = cross_check(&states, temperature, DEFAULT_CROSS_CHECK_TOLERANCE)?;
    print_check(&check);

    let rows = analytical_table(&default_analytical_temperatures())?;
    let path = analytical_path(&cfg.output_dir);
    write_thermo_rows(&path, &rows)?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

fn run_burn_in(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    for &temperature in &cfg.burn_in_temperatures {
        for init in [SpinInit::Ordered, SpinInit::Random] {
            let params = RunParams {
                size: cfg.burn_in_size,
                temperature,
                cycles: cfg.burn_in_cycles,
                burn_in: 0,
                init,
                seed: cfg.seed,
            };
            let rows = sampling::burn_in(&params)?;
            let path = burn_in_path(&cfg.output_dir, cfg.burn_in_size, temperature, init);
            write_burn_in(&path, &rows)?;
            tracing::info!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn run_samples(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    for (i, &temperature) in cfg.sample_temperatures.iter().enumerate() {
        let params = RunParams {
            size: cfg.sample_size,
            temperature,
            cycles: cfg.sample_cycles,
            burn_in: cfg.equil_cycles,
            init: SpinInit::Random,
            seed: cfg.seed.wrapping_add(i as u64),
        };
        let eps = sampling::samples(&params)?;
        let path = samples_path(&cfg.output_dir, cfg.sample_size, temperature);
        write_samples(&path, &eps)?;
        tracing::info!("wrote {}", path.display());
    }
    Ok(())
}

fn run_scan(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let temps = linspace(cfg.scan_t_min, cfg.scan_t_max, cfg.scan_points);
    for (k, &size) in cfg.scan_sizes.iter().enumerate() {
        let template = RunParams { seed: cfg.seed.wrapping_add(k as u64), ..cfg.scan_template(size) };
        let rows = sampling::scan(&template, &temps)?;
        let path = values_path(&cfg.output_dir, size);
        write_thermo_rows(&path, &rows)?;
        tracing::info!("wrote {}", path.display());
    }
    Ok(())
}

fn run_validate(
    cfg: &Config,
    temperature: f64,
    cycles: usize,
    burn_in: usize,
    tolerance: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = RunParams { size: 2, temperature, cycles, burn_in, init: SpinInit::Random, seed: cfg.seed };
    let sampled = sampling::measure(&params)?;
    let exact = ExactTwoByTwo::new(temperature)?.row();
    let check = compare_sampled(&exact, &sampled, tolerance)?;
    print_check(&check);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    ising::logging::init(if cli.quiet { 0 } else { cli.verbose + 1 });

    let mut cfg = Config {
        output_dir: cli.output_dir,
        plots_dir: cli.plots_dir,
        ..Config::default()
    };
    tracing::debug!("configuration:\n{cfg:#?}");

    match cli.command {
        Command::States { size } => run_states(&cfg, size)?,
        Command::Analytical { temperature } => run_analytical(&cfg, temperature)?,
        Command::BurnIn { size, temps, cycles, seed } => {
            if let Some(v) = size { cfg.burn_in_size = v; }
            if let Some(v) = temps { cfg.burn_in_temperatures = v; }
            if let Some(v) = cycles { cfg.burn_in_cycles = v; }
            if let Some(v) = seed { cfg.seed = v; }
            run_burn_in(&cfg)?;
        }
        Command::Samples { size, temps, cycles, burn_in, seed } => {
            if let Some(v) = size { cfg.sample_size = v; }
            if let Some(v) = temps { cfg.sample_temperatures = v; }
            if let Some(v) = cycles { cfg.sample_cycles = v; }
            if let Some(v) = burn_in { cfg.equil_cycles = v; }
            if let Some(v) = seed { cfg.seed = v; }
            run_samples(&cfg)?;
        }
        Command::Scan { sizes, t_min, t_max, points, cycles, burn_in, seed } => {
            if let Some(v) = sizes { cfg.scan_sizes = v; }
            if let Some(v) = t_min { cfg.scan_t_min = v; }
            if let Some(v) = t_max { cfg.scan_t_max = v; }
            if let Some(v) = points { cfg.scan_points = v; }
            if let Some(v) = cycles { cfg.scan_cycles = v; }
            if let Some(v) = burn_in { cfg.equil_cycles = v; }
            if let Some(v) = seed { cfg.seed = v; }
            run_scan(&cfg)?;
        }
        Command::Zoom { sizes, margin, points, seed, runner } => {
            if let Some(v) = sizes { cfg.scan_sizes = v; }
            if let Some(v) = margin { cfg.zoom_margin = v; }
            if let Some(v) = points { cfg.zoom_points = v; }
            if let Some(v) = seed { cfg.zoom_seed = v; }
            let backend: Box<dyn ZoomBackend> = match runner {
                Some(program) => Box::new(ExternalRunner { program }),
                None => Box::new(InProcess::from_config(&cfg)),
            };
            zoom(&cfg, backend.as_ref())?;
        }
        Command::Validate { temperature, cycles, burn_in, tolerance, seed } => {
            if let Some(v) = seed { cfg.seed = v; }
            run_validate(&cfg, temperature, cycles, burn_in, tolerance)?;
        }
        Command::Plot { kind } => render(&cfg, kind, false)?,
        Command::All => {
            run_states(&cfg, cfg.enumeration_size)?;
            run_analytical(&cfg, cfg.cross_check_temperature)?;
            render(&cfg, PlotKind::All, true)?;
        }
    }
    Ok(())
}
