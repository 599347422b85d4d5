// sampling.rs - Metropolis Monte Carlo runs: burn-in traces, energy samples and temperature scans

use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use crate::error::{IsingError, Result};
use crate::lattice::{IsingModel, SpinInit};
use crate::stats::{Moments, OnlineStats};
use crate::thermo::ThermoRow;
use crate::utils::rng::stream_seed;

/// Parameters of a single Monte Carlo run.
#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    pub size: usize,
    pub temperature: f64,
    /// Cycles that are recorded.
    pub cycles: usize,
    /// Cycles discarded before recording (ignored by `burn_in`).
    pub burn_in: usize,
    pub init: SpinInit,
    pub seed: u64,
}

/// Running averages after `cycle` cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnInRow {
    pub cycle: usize,
    pub expected_epsilon: f64,
    pub expected_abs_m: f64,
}

fn prepare(params: &RunParams) -> Result<(IsingModel, ChaCha20Rng)> {
    if params.cycles == 0 {
        return Err(IsingError::EmptyData("a run needs at least one recorded cycle".into()));
    }
    let mut rng = ChaCha20Rng::seed_from_u64(params.seed);
    let model = IsingModel::new(params.size, params.temperature, params.init, &mut rng)?;
    Ok((model, rng))
}

fn equilibrate(model: &mut IsingModel, rng: &mut ChaCha20Rng, cycles: usize) {
    for _ in 0..cycles {
        model.metropolis_cycle(rng);
    }
}

/// Running ⟨ε⟩ and ⟨|m|⟩ from the very first cycle, without discarding.
pub fn burn_in(params: &RunParams) -> Result<Vec<BurnInRow>> {
    let (mut model, mut rng) = prepare(params)?;
    let mut eps = OnlineStats::default();
    let mut mag = OnlineStats::default();
    let mut rows = Vec::with_capacity(params.cycles);
    for cycle in 1..=params.cycles {
        model.metropolis_cycle(&mut rng);
        eps.push(model.epsilon());
        mag.push(model.abs_m());
        rows.push(BurnInRow {
            cycle,
            expected_epsilon: eps.mean(),
            expected_abs_m: mag.mean(),
        });
    }
    tracing::debug!(
        size = params.size,
        temperature = params.temperature,
        init = params.init.label(),
        final_epsilon = eps.mean(),
        "burn-in trace done"
    );
    Ok(rows)
}

/// ε after each recorded cycle.
pub fn samples(params: &RunParams) -> Result<Vec<f64>> {
    let (mut model, mut rng) = prepare(params)?;
    equilibrate(&mut model, &mut rng, params.burn_in);
    let mut out = Vec::with_capacity(params.cycles);
    for _ in 0..params.cycles {
        model.metropolis_cycle(&mut rng);
        out.push(model.epsilon());
    }
    Ok(out)
}

/// Equilibrate, then estimate ⟨ε⟩, ⟨|m|⟩, C_v and χ over the recorded cycles.
pub fn measure(params: &RunParams) -> Result<ThermoRow> {
    let (mut model, mut rng) = prepare(params)?;
    equilibrate(&mut model, &mut rng, params.burn_in);
    let mut moments = Moments::default();
    let mut accepted = 0usize;
    for _ in 0..params.cycles {
        accepted += model.metropolis_cycle(&mut rng);
        moments.push(model.energy(), model.magnetization());
    }
    let rate = accepted as f64 / (params.cycles * model.spin_count()) as f64;
    tracing::trace!(size = params.size, temperature = params.temperature, acceptance = rate, "measured");
    moments.thermo_row(params.temperature, model.spin_count())
}

/// `n` evenly spaced points from `a` to `b`, both ends included.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => {
            let step = (b - a) / (n - 1) as f64;
            (0..n).map(|i| if i == n - 1 { b } else { a + step * i as f64 }).collect()
        }
    }
}

/// Measure every temperature in parallel.
///
/// Temperature `i` runs with seed `stream_seed(template.seed, i)`, so results do
/// not depend on thread scheduling. Rows are returned sorted by T.
pub fn scan(template: &RunParams, temperatures: &[f64]) -> Result<Vec<ThermoRow>> {
    let bar = ProgressBar::new(temperatures.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(" L={msg} {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(template.size.to_string());

    let mut rows = temperatures
        .par_iter()
        .enumerate()
        .map(|(i, &temperature)| {
            let params = RunParams { temperature, seed: stream_seed(template.seed, i), ..*template };
            let row = measure(&params);
            bar.inc(1);
            row
        })
        .collect::<Result<Vec<_>>>()?;
    bar.finish_and_clear();

    rows.sort_by(|a, b| a.temperature.total_cmp(&b.temperature));
    tracing::info!(size = template.size, points = rows.len(), "temperature scan complete");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(size: usize, temperature: f64) -> RunParams {
        RunParams { size, temperature, cycles: 200, burn_in: 50, init: SpinInit::Ordered, seed: 11 }
    }

    #[test]
    fn linspace_includes_both_ends() {
        let t = linspace(2.1, 2.4, 4);
        assert_eq!(t.len(), 4);
        assert_eq!(t[0], 2.1);
        assert_eq!(t[3], 2.4);
        assert!((t[1] - 2.2).abs() < 1e-12);
        assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
        assert!(linspace(1.0, 2.0, 0).is_empty());
    }

    #[test]
    fn burn_in_rows_are_numbered_from_one() {
        let rows = burn_in(&params(4, 1.0)).unwrap();
        assert_eq!(rows.len(), 200);
        assert_eq!(rows[0].cycle, 1);
        assert_eq!(rows[199].cycle, 200);
        assert!(rows.iter().all(|r| (-2.0..=2.0).contains(&r.expected_epsilon)));
        assert!(rows.iter().all(|r| (0.0..=1.0).contains(&r.expected_abs_m)));
    }

    #[test]
    fn runs_are_reproducible_for_a_fixed_seed() {
        let p = params(6, 2.3);
        assert_eq!(samples(&p).unwrap(), samples(&p).unwrap());
        assert_eq!(measure(&p).unwrap(), measure(&p).unwrap());
    }

    #[test]
    fn cold_ordered_lattice_stays_ordered() {
        // At T = 0.5 a flip costs at least exp(-8/0.5) ≈ 1e-7.
        let row = measure(&params(8, 0.5)).unwrap();
        assert!(row.abs_m > 0.99);
        assert!(row.epsilon < -1.98);
    }

    #[test]
    fn scan_returns_sorted_rows() {
        let template = params(4, 1.0);
        let rows = scan(&template, &[2.4, 1.0, 1.7]).unwrap();
        let temps: Vec<f64> = rows.iter().map(|r| r.temperature).collect();
        assert_eq!(temps, vec![1.0, 1.7, 2.4]);
    }

    #[test]
    fn zero_cycles_is_an_error() {
        let mut p = params(4, 1.0);
        p.cycles = 0;
        assert!(matches!(measure(&p), Err(IsingError::EmptyData(_))));
    }
}
