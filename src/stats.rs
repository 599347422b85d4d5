// stats.rs - Sample statistics: distributions, moments, histograms, linear fits

use std::collections::BTreeMap;

use crate::error::{IsingError, Result};
use crate::thermo::ThermoRow;

/// Relative frequency of each distinct sample.
pub fn distribution(samples: &[i64]) -> BTreeMap<i64, f64> {
    let mut buckets = BTreeMap::new();
    if samples.is_empty() {
        return buckets;
    }
    let w = 1.0 / samples.len() as f64;
    for &s in samples {
        *buckets.entry(s).or_insert(0.0) += w;
    }
    buckets
}

/// Σ x p(x)
pub fn expected_value(dist: &BTreeMap<i64, f64>) -> f64 {
    expected_value_with(dist, |x| x as f64)
}

/// Σ f(x) p(x)
pub fn expected_value_with<F>(dist: &BTreeMap<i64, f64>, f: F) -> f64
where
    F: Fn(i64) -> f64,
{
    dist.iter().map(|(&x, &p)| f(x) * p).sum()
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample variance with n - 1 in the denominator.
pub fn variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}

/// Welford online stats.
#[derive(Debug, Default, Clone)]
pub struct OnlineStats {
    n: u64,
    mean: f64,
    m2: f64,
}

impl OnlineStats {
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }
    pub fn count(&self) -> u64 { self.n }
    pub fn mean(&self) -> f64 { self.mean }
    pub fn var(&self) -> f64 { if self.n > 1 { self.m2 / (self.n - 1) as f64 } else { 0.0 } }
    pub fn std(&self) -> f64 { self.var().sqrt() }
}

/// Accumulates E, E², |M| and M² over Monte Carlo cycles.
#[derive(Debug, Default, Clone)]
pub struct Moments {
    n: u64,
    sum_e: f64,
    sum_e2: f64,
    sum_abs_m: f64,
    sum_m2: f64,
}

impl Moments {
    pub fn push(&mut self, energy: i64, magnetization: i64) {
        let e = energy as f64;
        let m = magnetization as f64;
        self.n += 1;
        self.sum_e += e;
        self.sum_e2 += e * e;
        self.sum_abs_m += m.abs();
        self.sum_m2 += m * m;
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    /// Per-spin averages and fluctuation estimates of C_v and χ.
    pub fn thermo_row(&self, temperature: f64, spins: usize) -> Result<ThermoRow> {
        if self.n == 0 {
            return Err(IsingError::EmptyData(format!("no cycles recorded at T = {temperature}")));
        }
        let n = self.n as f64;
        let spins = spins as f64;
        let e = self.sum_e / n;
        let e2 = self.sum_e2 / n;
        let abs_m = self.sum_abs_m / n;
        let m2 = self.sum_m2 / n;
        Ok(ThermoRow {
            temperature,
            epsilon: e / spins,
            abs_m: abs_m / spins,
            heat_capacity: (e2 - e * e) / (spins * temperature * temperature),
            susceptibility: (m2 - abs_m * abs_m) / (spins * temperature),
        })
    }
}

/// Linear-interpolated percentile of sorted data, q ∈ [0, 100].
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Equal-width histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    pub start: f64,
    pub width: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Bin width = min(Sturges, Freedman–Diaconis), like numpy's "auto" rule.
    pub fn auto(data: &[f64]) -> Result<Self> {
        if data.is_empty() {
            return Err(IsingError::EmptyData("histogram of empty sample".into()));
        }
        let mut sorted = data.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let lo = sorted[0];
        let hi = sorted[sorted.len() - 1];
        let range = hi - lo;
        if range == 0.0 {
            return Ok(Self { start: lo - 0.5, width: 1.0, counts: vec![data.len() as u64] });
        }

        let n = data.len() as f64;
        let sturges = range / (n.log2() + 1.0);
        let iqr = percentile(&sorted, 75.0) - percentile(&sorted, 25.0);
        let fd = 2.0 * iqr / n.cbrt();
        let width = if fd > 0.0 { fd.min(sturges) } else { sturges };
        let bins = ((range / width).ceil() as usize).max(1);
        let width = range / bins as f64;

        let mut counts = vec![0u64; bins];
        for &x in data {
            let k = (((x - lo) / width) as usize).min(bins - 1);
            counts[k] += 1;
        }
        Ok(Self { start: lo, width, counts })
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// (left edge, right edge) of bin k.
    pub fn edges(&self, k: usize) -> (f64, f64) {
        let left = self.start + k as f64 * self.width;
        (left, left + self.width)
    }

    /// Heights normalized so that the total area is 1.
    pub fn density(&self) -> Vec<f64> {
        let total: u64 = self.counts.iter().sum();
        let norm = total as f64 * self.width;
        self.counts.iter().map(|&c| c as f64 / norm).collect()
    }
}

/// Ordinary least squares y = intercept + slope·x, with standard errors.
#[derive(Debug, Clone, Copy)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub stderr: f64,
    pub intercept_stderr: f64,
}

impl LinearFit {
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(IsingError::DegenerateFit(format!("{} x values but {} y values", x.len(), y.len())));
        }
        if x.len() < 2 {
            return Err(IsingError::DegenerateFit(format!("need at least 2 points, got {}", x.len())));
        }
        let n = x.len() as f64;
        let xm = mean(x);
        let ym = mean(y);
        let ssxm = x.iter().map(|&v| (v - xm).powi(2)).sum::<f64>() / n;
        let ssym = y.iter().map(|&v| (v - ym).powi(2)).sum::<f64>() / n;
        let ssxym = x.iter().zip(y).map(|(&a, &b)| (a - xm) * (b - ym)).sum::<f64>() / n;
        if ssxm == 0.0 {
            return Err(IsingError::DegenerateFit("all x values are identical".into()));
        }

        let r = if ssym == 0.0 { 0.0 } else { (ssxym / (ssxm * ssym).sqrt()).clamp(-1.0, 1.0) };
        let slope = ssxym / ssxm;
        let intercept = ym - slope * xm;

        let (stderr, intercept_stderr) = if x.len() == 2 {
            (0.0, 0.0)
        } else {
            let df = n - 2.0;
            let s = ((1.0 - r * r) * ssym / ssxm / df).sqrt();
            (s, s * (ssxm + xm * xm).sqrt())
        };
        Ok(Self { slope, intercept, r, stderr, intercept_stderr })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}
