// zoom.rs - Refine temperature scans around the C_v and χ peaks

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::Config;
use crate::data::{read_thermo_rows, values_path, write_thermo_rows, zoom_values_path};
use crate::error::{IsingError, Result};
use crate::finite_size::{argmax, Observable};
use crate::sampling::{linspace, scan, RunParams};
use crate::thermo::ThermoRow;

/// Temperature interval that brackets both peaks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomWindow {
    pub t_min: f64,
    pub t_max: f64,
    /// T at the C_v peak.
    pub t_peak_heat_capacity: f64,
    /// T at the χ peak.
    pub t_peak_susceptibility: f64,
}

impl ZoomWindow {
    /// Widen [argmin, argmax] of the two peaks by `margin` rows on each side,
    /// clamped to the table.
    pub fn select(rows: &[ThermoRow], margin: usize) -> Result<Self> {
        let mut sorted = rows.to_vec();
        sorted.sort_by(|a, b| a.temperature.total_cmp(&b.temperature));
        let empty = || IsingError::EmptyData("cannot zoom on an empty table".into());
        let a = argmax(&sorted, Observable::HeatCapacity).ok_or_else(empty)?;
        let b = argmax(&sorted, Observable::Susceptibility).ok_or_else(empty)?;
        let lo = a.min(b).saturating_sub(margin);
        let hi = (a.max(b) + margin).min(sorted.len() - 1);
        Ok(Self {
            t_min: sorted[lo].temperature,
            t_max: sorted[hi].temperature,
            t_peak_heat_capacity: sorted[a].temperature,
            t_peak_susceptibility: sorted[b].temperature,
        })
    }
}

/// Produces the refined `values_zoom_L={L}.csv` table for one window.
pub trait ZoomBackend {
    fn refine(&self, size: usize, window: &ZoomWindow, seed: u64) -> Result<()>;
}

/// Runs the Metropolis scan inside this process.
#[derive(Debug, Clone)]
pub struct InProcess {
    pub output_dir: PathBuf,
    pub points: usize,
    pub template: RunParams,
}

impl InProcess {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            points: config.zoom_points,
            template: config.scan_template(0),
        }
    }
}

impl ZoomBackend for InProcess {
    fn refine(&self, size: usize, window: &ZoomWindow, seed: u64) -> Result<()> {
        let template = RunParams { size, seed, ..self.template };
        let temps = linspace(window.t_min, window.t_max, self.points);
        let rows = scan(&template, &temps)?;
        write_thermo_rows(&zoom_values_path(&self.output_dir, size), &rows)
    }
}

/// Delegates to an external runner invoked as `program -z L T_min T_max seed`.
#[derive(Debug, Clone)]
pub struct ExternalRunner {
    pub program: PathBuf,
}

impl ExternalRunner {
    pub fn arguments(size: usize, window: &ZoomWindow, seed: u64) -> Vec<String> {
        vec![
            "-z".to_string(),
            size.to_string(),
            window.t_min.to_string(),
            window.t_max.to_string(),
            seed.to_string(),
        ]
    }
}

impl ZoomBackend for ExternalRunner {
    fn refine(&self, size: usize, window: &ZoomWindow, seed: u64) -> Result<()> {
        let program = self.program.display().to_string();
        let status = Command::new(&self.program)
            .args(Self::arguments(size, window, seed))
            .status()
            .map_err(|e| IsingError::Runner { program: program.clone(), reason: e.to_string() })?;
        if !status.success() {
            return Err(IsingError::Runner { program, reason: format!("exited with {status}") });
        }
        Ok(())
    }
}

/// Zoom every configured size; seeds start at `zoom_seed` and increase by one per size.
pub fn zoom(config: &Config, backend: &dyn ZoomBackend) -> Result<Vec<(usize, ZoomWindow)>> {
    zoom_sizes(&config.output_dir, &config.scan_sizes, config.zoom_margin, config.zoom_seed, backend)
}

pub fn zoom_sizes(
    output_dir: &Path,
    sizes: &[usize],
    margin: usize,
    first_seed: u64,
    backend: &dyn ZoomBackend,
) -> Result<Vec<(usize, ZoomWindow)>> {
    let mut windows = Vec::with_capacity(sizes.len());
    for (k, &size) in sizes.iter().enumerate() {
        let rows = read_thermo_rows(&values_path(output_dir, size))?;
        let window = ZoomWindow::select(&rows, margin)?;
        tracing::info!(
            "L = {size} - argmax C_v: {}, argmax chi: {}",
            window.t_peak_heat_capacity,
            window.t_peak_susceptibility
        );
        tracing::info!("look between temperatures {} and {}", window.t_min, window.t_max);
        backend.refine(size, &window, first_seed + k as u64)?;
        windows.push((size, window));
    }
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[(f64, f64, f64)]) -> Vec<ThermoRow> {
        values
            .iter()
            .map(|&(t, c, x)| ThermoRow { temperature: t, epsilon: 0.0, abs_m: 0.0, heat_capacity: c, susceptibility: x })
            .collect()
    }

    #[test]
    fn window_brackets_both_peaks_with_margin() {
        let table = rows(&[
            (2.00, 0.1, 0.1),
            (2.05, 0.2, 0.2),
            (2.10, 0.3, 0.3),
            (2.15, 0.9, 0.4),
            (2.20, 0.5, 0.5),
            (2.25, 0.4, 0.9),
            (2.30, 0.3, 0.3),
            (2.35, 0.2, 0.2),
            (2.40, 0.1, 0.1),
        ]);
        let w = ZoomWindow::select(&table, 2).unwrap();
        assert_eq!(w.t_peak_heat_capacity, 2.15);
        assert_eq!(w.t_peak_susceptibility, 2.25);
        assert_eq!(w.t_min, 2.05);
        assert_eq!(w.t_max, 2.35);
    }

    #[test]
    fn window_is_clamped_and_order_independent() {
        let mut table = rows(&[(2.0, 5.0, 1.0), (2.1, 1.0, 1.0), (2.2, 1.0, 6.0)]);
        table.reverse();
        let w = ZoomWindow::select(&table, 2).unwrap();
        assert_eq!(w.t_min, 2.0);
        assert_eq!(w.t_max, 2.2);
        assert!(ZoomWindow::select(&[], 2).is_err());
    }

    #[test]
    fn runner_arguments_use_legacy_order() {
        let w = ZoomWindow { t_min: 2.2, t_max: 2.35, t_peak_heat_capacity: 2.25, t_peak_susceptibility: 2.3 };
        assert_eq!(ExternalRunner::arguments(60, &w, 9643), vec!["-z", "60", "2.2", "2.35", "9643"]);
    }
}
