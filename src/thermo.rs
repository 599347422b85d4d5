// thermo.rs - Exact thermodynamic averages: enumerated sums and the closed-form 2×2 solution

use crate::error::{IsingError, Result};
use crate::states::StateSummary;

/// One row of a `T,<epsilon>,<|m|>,C_v,chi` table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermoRow {
    pub temperature: f64,
    pub epsilon: f64,
    pub abs_m: f64,
    pub heat_capacity: f64,
    pub susceptibility: f64,
}

/// Canonical-ensemble averages of an Ising lattice at fixed temperature.
pub trait Thermodynamics {
    fn temperature(&self) -> f64;
    fn spin_count(&self) -> usize;
    fn partition_function(&self) -> f64;
    fn expected_energy(&self) -> f64;
    fn expected_energy_squared(&self) -> f64;
    fn expected_abs_magnetization(&self) -> f64;
    fn expected_magnetization_squared(&self) -> f64;

    fn beta(&self) -> f64 {
        1.0 / self.temperature()
    }

    fn expected_epsilon(&self) -> f64 {
        self.expected_energy() / self.spin_count() as f64
    }

    fn expected_epsilon_squared(&self) -> f64 {
        let n = self.spin_count() as f64;
        self.expected_energy_squared() / (n * n)
    }

    fn expected_abs_m(&self) -> f64 {
        self.expected_abs_magnetization() / self.spin_count() as f64
    }

    fn expected_m_squared(&self) -> f64 {
        let n = self.spin_count() as f64;
        self.expected_magnetization_squared() / (n * n)
    }

    fn heat_capacity(&self) -> f64 {
        fluctuation_heat_capacity(self)
    }

    fn susceptibility(&self) -> f64 {
        fluctuation_susceptibility(self)
    }

    fn row(&self) -> ThermoRow {
        ThermoRow {
            temperature: self.temperature(),
            epsilon: self.expected_epsilon(),
            abs_m: self.expected_abs_m(),
            heat_capacity: self.heat_capacity(),
            susceptibility: self.susceptibility(),
        }
    }
}

/// C_v = (⟨E²⟩ - ⟨E⟩²) / (N T²)
pub fn fluctuation_heat_capacity<T: Thermodynamics + ?Sized>(model: &T) -> f64 {
    let t = model.temperature();
    let e = model.expected_energy();
    (model.expected_energy_squared() - e * e) / (model.spin_count() as f64 * t * t)
}

/// χ = (⟨M²⟩ - ⟨|M|⟩²) / (N T)
pub fn fluctuation_susceptibility<T: Thermodynamics + ?Sized>(model: &T) -> f64 {
    let m = model.expected_abs_magnetization();
    (model.expected_magnetization_squared() - m * m) / (model.spin_count() as f64 * model.temperature())
}

fn check_temperature(t: f64) -> Result<()> {
    if !(t.is_finite() && t > 0.0) {
        return Err(IsingError::InvalidTemperature(t));
    }
    Ok(())
}

/// Boltzmann averages summed over an enumerated state table.
///
/// Weights are taken relative to the ground-state energy, so averages stay
/// finite at temperatures where exp(-βE) itself overflows.
#[derive(Debug, Clone)]
pub struct EnumeratedModel {
    temperature: f64,
    spins: usize,
    states: Vec<StateSummary>,
    e_min: f64,
    // Σ g exp(-β (E - E_min))
    z_shifted: f64,
}

impl EnumeratedModel {
    pub fn new(states: &[StateSummary], temperature: f64) -> Result<Self> {
        check_temperature(temperature)?;
        let total: u64 = states.iter().map(|s| s.degeneracy).sum();
        if total == 0 || !total.is_power_of_two() {
            return Err(IsingError::EmptyData(format!(
                "state table covers {total} configurations, expected a power of two"
            )));
        }
        let spins = total.trailing_zeros() as usize;
        let beta = 1.0 / temperature;
        let e_min = states.iter().map(|s| s.energy).min().unwrap_or(0) as f64;
        let z_shifted = states
            .iter()
            .map(|s| s.degeneracy as f64 * (-beta * (s.energy as f64 - e_min)).exp())
            .sum();
        Ok(Self { temperature, spins, states: states.to_vec(), e_min, z_shifted })
    }

    /// Probability of one microstate with energy `energy`.
    pub fn probability(&self, energy: f64) -> f64 {
        (-self.beta() * (energy - self.e_min)).exp() / self.z_shifted
    }

    fn average<F: Fn(&StateSummary) -> f64>(&self, f: F) -> f64 {
        self.states
            .iter()
            .map(|s| s.degeneracy as f64 * f(s) * self.probability(s.energy as f64))
            .sum()
    }
}

impl Thermodynamics for EnumeratedModel {
    fn temperature(&self) -> f64 { self.temperature }
    fn spin_count(&self) -> usize { self.spins }
    fn partition_function(&self) -> f64 {
        self.z_shifted * (-self.beta() * self.e_min).exp()
    }

    fn expected_energy(&self) -> f64 {
        self.average(|s| s.energy as f64)
    }

    fn expected_energy_squared(&self) -> f64 {
        self.average(|s| (s.energy as f64).powi(2))
    }

    fn expected_abs_magnetization(&self) -> f64 {
        self.average(|s| s.magnetization.abs() as f64)
    }

    fn expected_magnetization_squared(&self) -> f64 {
        self.average(|s| (s.magnetization as f64).powi(2))
    }
}

/// Closed-form solution of the periodic 2×2 lattice.
#[derive(Debug, Clone, Copy)]
pub struct ExactTwoByTwo {
    temperature: f64,
}

impl ExactTwoByTwo {
    pub const SPINS: usize = 4;

    pub fn new(temperature: f64) -> Result<Self> {
        check_temperature(temperature)?;
        Ok(Self { temperature })
    }

    fn cosh8(&self) -> f64 { (8.0 * self.beta()).cosh() }
    fn sinh8(&self) -> f64 { (8.0 * self.beta()).sinh() }
    fn exp8(&self) -> f64 { (8.0 * self.beta()).exp() }
}

impl Thermodynamics for ExactTwoByTwo {
    fn temperature(&self) -> f64 { self.temperature }
    fn spin_count(&self) -> usize { Self::SPINS }

    fn partition_function(&self) -> f64 {
        4.0 * self.cosh8() + 12.0
    }

    fn expected_energy(&self) -> f64 {
        Self::SPINS as f64 * self.expected_epsilon()
    }

    fn expected_epsilon(&self) -> f64 {
        -2.0 * self.sinh8() / (self.cosh8() + 3.0)
    }

    fn expected_energy_squared(&self) -> f64 {
        (Self::SPINS * Self::SPINS) as f64 * self.expected_epsilon_squared()
    }

    fn expected_epsilon_squared(&self) -> f64 {
        4.0 * self.cosh8() / (self.cosh8() + 3.0)
    }

    fn expected_abs_magnetization(&self) -> f64 {
        Self::SPINS as f64 * self.expected_abs_m()
    }

    fn expected_abs_m(&self) -> f64 {
        (self.exp8() + 2.0) / (2.0 * self.cosh8() + 6.0)
    }

    fn expected_magnetization_squared(&self) -> f64 {
        (Self::SPINS * Self::SPINS) as f64 * self.expected_m_squared()
    }

    fn expected_m_squared(&self) -> f64 {
        (self.exp8() + 1.0) / (2.0 * self.cosh8() + 6.0)
    }

    fn heat_capacity(&self) -> f64 {
        let t = self.temperature;
        let c = self.cosh8();
        16.0 / (t * t) * (1.0 + 3.0 * c) / (c + 3.0).powi(2)
    }

    fn susceptibility(&self) -> f64 {
        let c = self.cosh8();
        let x = self.exp8();
        let n = Self::SPINS as f64;
        (1.0 / (n * self.temperature))
            * ((8.0 * x + 8.0) / (c + 3.0) - 4.0 * (x + 2.0).powi(2) / (c + 3.0).powi(2))
    }
}

/// NaN when either side is not finite, so overflowed values never compare equal.
fn relative_difference(a: f64, b: f64) -> f64 {
    if !(a.is_finite() && b.is_finite()) {
        return f64::NAN;
    }
    let scale = a.abs().max(b.abs());
    if scale == 0.0 { 0.0 } else { (a - b).abs() / scale }
}

/// One compared quantity: (name, left value, right value).
pub type Comparison = (&'static str, f64, f64);

/// Outcome of comparing two sets of thermodynamic values.
#[derive(Debug, Clone)]
pub struct CrossCheck {
    pub temperature: f64,
    pub tolerance: f64,
    pub comparisons: Vec<Comparison>,
}

impl CrossCheck {
    fn verify(self) -> Result<Self> {
        for &(quantity, left, right) in &self.comparisons {
            let rel_diff = relative_difference(left, right);
            if !(rel_diff <= self.tolerance) {
                return Err(IsingError::Mismatch {
                    quantity: quantity.to_string(),
                    left,
                    right,
                    rel_diff,
                    tol: self.tolerance,
                });
            }
        }
        Ok(self)
    }

    /// Largest relative difference; NaN if any compared value is not finite.
    pub fn max_relative_difference(&self) -> f64 {
        self.comparisons
            .iter()
            .map(|&(_, a, b)| relative_difference(a, b))
            .fold(0.0, |acc, d| if d.is_nan() || acc.is_nan() { f64::NAN } else { acc.max(d) })
    }
}

pub const DEFAULT_CROSS_CHECK_TOLERANCE: f64 = 1e-10;

/// Compare the enumerated 2×2 sums with the closed-form expressions, and the
/// closed-form C_v and χ with their fluctuation formulas.
pub fn cross_check(states: &[StateSummary], temperature: f64, tolerance: f64) -> Result<CrossCheck> {
    let numerical = EnumeratedModel::new(states, temperature)?;
    if numerical.spin_count() != ExactTwoByTwo::SPINS {
        return Err(IsingError::UnexpectedSpinCount {
            expected: ExactTwoByTwo::SPINS,
            found: numerical.spin_count(),
        });
    }
    let exact = ExactTwoByTwo::new(temperature)?;

    let comparisons = vec![
        ("Z", numerical.partition_function(), exact.partition_function()),
        ("<epsilon>", numerical.expected_epsilon(), exact.expected_epsilon()),
        ("<E>", numerical.expected_energy(), exact.expected_energy()),
        ("<epsilon^2>", numerical.expected_epsilon_squared(), exact.expected_epsilon_squared()),
        ("<E^2>", numerical.expected_energy_squared(), exact.expected_energy_squared()),
        ("<|m|>", numerical.expected_abs_m(), exact.expected_abs_m()),
        ("<|M|>", numerical.expected_abs_magnetization(), exact.expected_abs_magnetization()),
        ("<m^2>", numerical.expected_m_squared(), exact.expected_m_squared()),
        ("<M^2>", numerical.expected_magnetization_squared(), exact.expected_magnetization_squared()),
        ("C_v", numerical.heat_capacity(), exact.heat_capacity()),
        ("C_v (fluctuation)", fluctuation_heat_capacity(&exact), exact.heat_capacity()),
        ("chi", numerical.susceptibility(), exact.susceptibility()),
        ("chi (fluctuation)", fluctuation_susceptibility(&exact), exact.susceptibility()),
    ];

    CrossCheck { temperature, tolerance, comparisons }.verify()
}

/// Compare a sampled row against exact values, observable by observable.
pub fn compare_sampled(exact: &ThermoRow, sampled: &ThermoRow, tolerance: f64) -> Result<CrossCheck> {
    let comparisons = vec![
        ("<epsilon>", sampled.epsilon, exact.epsilon),
        ("<|m|>", sampled.abs_m, exact.abs_m),
        ("C_v", sampled.heat_capacity, exact.heat_capacity),
        ("chi", sampled.susceptibility, exact.susceptibility),
    ];
    CrossCheck { temperature: exact.temperature, tolerance, comparisons }.verify()
}

/// T = 1.0, 1.1, …, 2.4
pub fn default_analytical_temperatures() -> Vec<f64> {
    (0..15).map(|i| 1.0 + 0.1 * i as f64).collect()
}

/// Closed-form 2×2 values on a temperature grid.
pub fn analytical_table(temperatures: &[f64]) -> Result<Vec<ThermoRow>> {
    temperatures
        .iter()
        .map(|&t| ExactTwoByTwo::new(t).map(|m| m.row()))
        .collect()
}
