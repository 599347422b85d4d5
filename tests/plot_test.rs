//! Chart rendering from CSV tables written to a scratch directory.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use ising::config::Config;
use ising::data::{burn_in_path, samples_path, values_path, write_burn_in, write_samples, write_thermo_rows, zoom_values_path};
use ising::lattice::SpinInit;
use ising::plot::{render, PlotKind};
use ising::sampling::{burn_in, samples, RunParams};
use ising::thermo::ThermoRow;

fn small_config(root: &Path) -> Config {
    Config {
        output_dir: root.join("output"),
        plots_dir: root.join("plots"),
        burn_in_size: 4,
        burn_in_temperatures: vec![1.0, 2.4],
        burn_in_cycles: 100,
        sample_size: 4,
        sample_temperatures: vec![1.0, 2.1, 2.4],
        sample_cycles: 200,
        plot_sizes: vec![4, 6, 8],
        ..Config::default()
    }
}

fn peaked_table(t_peak: f64) -> Vec<ThermoRow> {
    (0..11)
        .map(|i| {
            let t = 2.0 + 0.04 * i as f64;
            let d = (t - t_peak).abs();
            ThermoRow { temperature: t, epsilon: -1.5 + d, abs_m: 0.5 - d, heat_capacity: 2.0 - d, susceptibility: 30.0 - d }
        })
        .collect()
}

fn write_inputs(cfg: &Config) {
    let out = &cfg.output_dir;
    for &t in &cfg.burn_in_temperatures {
        for init in [SpinInit::Ordered, SpinInit::Random] {
            let params = RunParams { size: cfg.burn_in_size, temperature: t, cycles: cfg.burn_in_cycles, burn_in: 0, init, seed: 3 };
            write_burn_in(&burn_in_path(out, cfg.burn_in_size, t, init), &burn_in(&params).unwrap()).unwrap();
        }
    }
    for &t in &cfg.sample_temperatures {
        let params = RunParams { size: cfg.sample_size, temperature: t, cycles: cfg.sample_cycles, burn_in: 50, init: SpinInit::Random, seed: 5 };
        write_samples(&samples_path(out, cfg.sample_size, t), &samples(&params).unwrap()).unwrap();
    }
    for (&l, t_peak) in cfg.plot_sizes.iter().zip([2.32, 2.28, 2.24]) {
        write_thermo_rows(&values_path(out, l), &peaked_table(t_peak)).unwrap();
        write_thermo_rows(&zoom_values_path(out, l), &peaked_table(t_peak)).unwrap();
    }
}

/// Every file under `dir`, relative to it.
fn files_under(dir: &Path) -> BTreeSet<PathBuf> {
    let mut found = BTreeSet::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(d) = pending.pop() {
        let Ok(entries) = fs::read_dir(&d) else { continue };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                found.insert(path.strip_prefix(dir).unwrap().to_path_buf());
            }
        }
    }
    found
}

#[test]
fn test_render_all_writes_every_chart() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = small_config(dir.path());
    write_inputs(&cfg);

    render(&cfg, PlotKind::All, false).unwrap();

    let expected: BTreeSet<PathBuf> = [
        "burn_in/burn_in_time_unordered_L_equals_4.svg",
        "burn_in/burn_in_time_ordered_L_equals_4.svg",
        "burn_in/magnetization_for_L_equals_4.svg",
        "distributions/epsilon_L=4_T=1.0.svg",
        "distributions/epsilon_L=4_T=2.1.svg",
        "distributions/epsilon_L=4_T=2.4.svg",
        "values/values.svg",
        "T_inf/estimating_T_inf_C_v.svg",
        "T_inf/estimating_T_inf_chi.svg",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    let written = files_under(&cfg.plots_dir);
    assert_eq!(written, expected);

    for file in &written {
        let text = fs::read_to_string(cfg.plots_dir.join(file)).unwrap();
        assert!(text.contains("<svg"), "{} is not an SVG document", file.display());
    }
}

#[test]
fn test_render_single_family() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = small_config(dir.path());
    write_inputs(&cfg);

    render(&cfg, PlotKind::TInf, false).unwrap();
    let written = files_under(&cfg.plots_dir);
    assert_eq!(written.len(), 2);
    assert!(written.iter().all(|p| p.starts_with("T_inf")));
}

#[test]
fn test_render_skips_missing_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = small_config(dir.path());

    render(&cfg, PlotKind::All, true).unwrap();
    assert!(files_under(&cfg.plots_dir).is_empty());

    // Without skipping, absent tables are an error.
    assert!(render(&cfg, PlotKind::Values, false).is_err());
}
