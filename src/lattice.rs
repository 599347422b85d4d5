// lattice.rs - Periodic L×L Ising lattice with single-spin-flip Metropolis updates

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::error::{IsingError, Result};

/// Initial spin configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinInit {
    /// Every spin +1.
    Ordered,
    /// Each spin ±1 with probability ½.
    Random,
}

impl SpinInit {
    /// Label used in burn-in file names.
    pub fn label(self) -> &'static str {
        match self {
            SpinInit::Ordered => "nonrandom",
            SpinInit::Random => "random",
        }
    }
}

/// Square Ising lattice with J = 1, k_B = 1 and periodic boundaries.
///
/// Energy and magnetization are kept as running integers and updated on
/// every accepted flip.
#[derive(Debug, Clone)]
pub struct IsingModel {
    spins: DMatrix<i8>,
    l: usize,
    energy: i64,
    magnetization: i64,
    temperature: f64,
    // exp(-β ΔE) for ΔE = -8, -4, 0, 4, 8
    exp_factors: [f64; 5],
}

fn check_size(l: usize) -> Result<()> {
    if l < 2 {
        return Err(IsingError::InvalidLatticeSize(l));
    }
    Ok(())
}

fn check_temperature(t: f64) -> Result<()> {
    if !(t.is_finite() && t > 0.0) {
        return Err(IsingError::InvalidTemperature(t));
    }
    Ok(())
}

/// E(s) = -Σ s_i s_j over right and down neighbours with wrap-around.
pub fn lattice_energy(spins: &DMatrix<i8>) -> i64 {
    let l = spins.nrows();
    let mut sum = 0i64;
    for i in 0..l {
        for j in 0..l {
            let s = spins[(i, j)] as i64;
            sum += s * spins[((i + 1) % l, j)] as i64;
            sum += s * spins[(i, (j + 1) % l)] as i64;
        }
    }
    -sum
}

/// M(s) = Σ s_i.
pub fn lattice_magnetization(spins: &DMatrix<i8>) -> i64 {
    spins.iter().map(|&s| s as i64).sum()
}

impl IsingModel {
    pub fn new<R: Rng + ?Sized>(l: usize, temperature: f64, init: SpinInit, rng: &mut R) -> Result<Self> {
        check_size(l)?;
        check_temperature(temperature)?;
        let spins = match init {
            SpinInit::Ordered => DMatrix::from_element(l, l, 1i8),
            SpinInit::Random => DMatrix::from_fn(l, l, |_, _| if rng.gen_bool(0.5) { 1 } else { -1 }),
        };
        Ok(Self::build(spins, temperature))
    }

    /// Build a model from an explicit square configuration of ±1 entries.
    pub fn from_spins(spins: DMatrix<i8>, temperature: f64) -> Result<Self> {
        if spins.nrows() != spins.ncols() {
            return Err(IsingError::InvalidLatticeSize(spins.nrows().min(spins.ncols())));
        }
        check_size(spins.nrows())?;
        check_temperature(temperature)?;
        for i in 0..spins.nrows() {
            for j in 0..spins.ncols() {
                let value = spins[(i, j)];
                if value != 1 && value != -1 {
                    return Err(IsingError::InvalidSpin { row: i, col: j, value });
                }
            }
        }
        Ok(Self::build(spins, temperature))
    }

    fn build(spins: DMatrix<i8>, temperature: f64) -> Self {
        let beta = 1.0 / temperature;
        let mut exp_factors = [0.0; 5];
        for (k, w) in exp_factors.iter_mut().enumerate() {
            let delta_e = 4 * k as i64 - 8;
            *w = (-beta * delta_e as f64).exp();
        }
        Self {
            l: spins.nrows(),
            energy: lattice_energy(&spins),
            magnetization: lattice_magnetization(&spins),
            spins,
            temperature,
            exp_factors,
        }
    }

    pub fn size(&self) -> usize { self.l }
    pub fn spin_count(&self) -> usize { self.l * self.l }
    pub fn temperature(&self) -> f64 { self.temperature }
    pub fn spins(&self) -> &DMatrix<i8> { &self.spins }
    pub fn energy(&self) -> i64 { self.energy }
    pub fn magnetization(&self) -> i64 { self.magnetization }

    /// Energy per spin.
    pub fn epsilon(&self) -> f64 {
        self.energy as f64 / self.spin_count() as f64
    }

    /// Absolute magnetization per spin.
    pub fn abs_m(&self) -> f64 {
        self.magnetization.abs() as f64 / self.spin_count() as f64
    }

    /// Precomputed exp(-β ΔE); `None` unless ΔE ∈ {-8, -4, 0, 4, 8}.
    pub fn boltzmann_factor(&self, delta_e: i64) -> Option<f64> {
        if delta_e % 4 != 0 || !(-8..=8).contains(&delta_e) {
            return None;
        }
        Some(self.exp_factors[((delta_e + 8) / 4) as usize])
    }

    fn neighbour_sum(&self, i: usize, j: usize) -> i64 {
        let l = self.l;
        let s = &self.spins;
        s[((i + 1) % l, j)] as i64
            + s[((i + l - 1) % l, j)] as i64
            + s[(i, (j + 1) % l)] as i64
            + s[(i, (j + l - 1) % l)] as i64
    }

    /// One Monte Carlo cycle: N attempted flips at uniformly random sites.
    /// Returns the number of accepted flips.
    pub fn metropolis_cycle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let index = Uniform::from(0..self.l);
        let mut accepted = 0;
        for _ in 0..self.spin_count() {
            let i = index.sample(rng);
            let j = index.sample(rng);
            let s = self.spins[(i, j)] as i64;
            let delta_e = 2 * s * self.neighbour_sum(i, j);

            let accept = delta_e <= 0 || rng.gen::<f64>() < self.exp_factors[((delta_e + 8) / 4) as usize];
            if accept {
                self.spins[(i, j)] = -self.spins[(i, j)];
                self.energy += delta_e;
                self.magnetization -= 2 * s;
                accepted += 1;
            }
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn ordered_lattice_is_ground_state() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let model = IsingModel::new(4, 1.0, SpinInit::Ordered, &mut rng).unwrap();
        assert_eq!(model.energy(), -32);
        assert_eq!(model.magnetization(), 16);
        assert_eq!(model.epsilon(), -2.0);
        assert_eq!(model.abs_m(), 1.0);
    }

    #[test]
    fn checkerboard_two_by_two_has_maximal_energy() {
        let spins = DMatrix::from_row_slice(2, 2, &[1, -1, -1, 1]);
        let model = IsingModel::from_spins(spins, 1.0).unwrap();
        assert_eq!(model.energy(), 8);
        assert_eq!(model.magnetization(), 0);
    }

    #[test]
    fn running_totals_match_recomputed_values() {
        let mut rng = ChaCha20Rng::seed_from_u64(7773);
        let mut model = IsingModel::new(6, 2.3, SpinInit::Random, &mut rng).unwrap();
        for _ in 0..50 {
            model.metropolis_cycle(&mut rng);
            assert_eq!(model.energy(), lattice_energy(model.spins()));
            assert_eq!(model.magnetization(), lattice_magnetization(model.spins()));
            assert_eq!(model.energy() % 4, 0);
        }
    }

    #[test]
    fn boltzmann_factors_cover_five_energy_changes() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let model = IsingModel::new(2, 2.0, SpinInit::Ordered, &mut rng).unwrap();
        assert_eq!(model.boltzmann_factor(0), Some(1.0));
        assert!((model.boltzmann_factor(8).unwrap() - (-4.0f64).exp()).abs() < 1e-15);
        assert!((model.boltzmann_factor(-4).unwrap() - 2.0f64.exp()).abs() < 1e-12);
        assert_eq!(model.boltzmann_factor(2), None);
        assert_eq!(model.boltzmann_factor(12), None);
    }

    #[test]
    fn rejects_bad_input() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert!(matches!(
            IsingModel::new(1, 1.0, SpinInit::Ordered, &mut rng),
            Err(IsingError::InvalidLatticeSize(1))
        ));
        assert!(matches!(
            IsingModel::new(4, 0.0, SpinInit::Ordered, &mut rng),
            Err(IsingError::InvalidTemperature(_))
        ));
        let spins = DMatrix::from_row_slice(2, 2, &[1, 0, -1, 1]);
        assert!(matches!(
            IsingModel::from_spins(spins, 1.0),
            Err(IsingError::InvalidSpin { row: 0, col: 1, value: 0 })
        ));
    }
}
