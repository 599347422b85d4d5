//! Run-time configuration (single source of truth).
//!
//! Every CLI flag overrides one field of [`Config`]; the defaults reproduce
//! the standard analysis pipeline.

use std::path::PathBuf;

use crate::lattice::SpinInit;
use crate::sampling::RunParams;

#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub plots_dir: PathBuf,

    /// Lattice used for exact enumeration.
    pub enumeration_size: usize,
    /// Temperature of the numerical vs closed-form cross-check.
    pub cross_check_temperature: f64,

    pub burn_in_size: usize,
    pub burn_in_temperatures: Vec<f64>,
    pub burn_in_cycles: usize,

    pub sample_size: usize,
    pub sample_temperatures: Vec<f64>,
    pub sample_cycles: usize,

    /// Sizes scanned over temperature (and later zoomed).
    pub scan_sizes: Vec<usize>,
    pub scan_t_min: f64,
    pub scan_t_max: f64,
    pub scan_points: usize,
    pub scan_cycles: usize,
    /// Cycles discarded before measuring.
    pub equil_cycles: usize,

    /// Sizes shown in the value plots and used for the T_c fit.
    pub plot_sizes: Vec<usize>,

    pub zoom_margin: usize,
    pub zoom_points: usize,
    pub zoom_seed: u64,

    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            plots_dir: PathBuf::from("plots"),
            enumeration_size: 2,
            cross_check_temperature: 1.0,
            burn_in_size: 20,
            burn_in_temperatures: vec![1.0, 2.4],
            burn_in_cycles: 20_000,
            sample_size: 20,
            sample_temperatures: vec![1.0, 2.1, 2.4],
            sample_cycles: 100_000,
            scan_sizes: (20..160).step_by(20).collect(),
            scan_t_min: 2.1,
            scan_t_max: 2.4,
            scan_points: 16,
            scan_cycles: 100_000,
            equil_cycles: 5_000,
            plot_sizes: (40..160).step_by(20).collect(),
            zoom_margin: 2,
            zoom_points: 16,
            zoom_seed: 9642,
            seed: 7773,
        }
    }
}

impl Config {
    /// Measurement parameters shared by every point of a temperature scan.
    pub fn scan_template(&self, size: usize) -> RunParams {
        RunParams {
            size,
            temperature: self.scan_t_min,
            cycles: self.scan_cycles,
            burn_in: self.equil_cycles,
            init: SpinInit::Random,
            seed: self.seed,
        }
    }
}
