// states.rs - Brute-force enumeration of every spin configuration of a small lattice

use std::collections::HashMap;

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::error::{IsingError, Result};
use crate::lattice::{lattice_energy, lattice_magnetization};

/// Largest lattice (in spins) accepted by `enumerate_states`.
pub const MAX_ENUMERABLE_SPINS: usize = 25;

/// All microstates sharing the same positive-spin count, energy and magnetization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSummary {
    pub positive_spins: u32,
    pub energy: i64,
    pub magnetization: i64,
    pub degeneracy: u64,
}

type Key = (u32, i64, i64);

fn fill_from_mask(buf: &mut DMatrix<i8>, mask: u64) {
    let l = buf.nrows();
    for k in 0..l * l {
        buf[(k / l, k % l)] = if (mask >> k) & 1 == 1 { 1 } else { -1 };
    }
}

/// Visit all 2^N configurations of an L×L lattice and group them.
///
/// Bit k of the configuration index is spin k in row-major order (set = +1).
/// Rows come back sorted by (positive_spins, energy, magnetization).
pub fn enumerate_states(l: usize) -> Result<Vec<StateSummary>> {
    if l < 2 {
        return Err(IsingError::InvalidLatticeSize(l));
    }
    let n = l * l;
    if n > MAX_ENUMERABLE_SPINS {
        return Err(IsingError::TooManySpins { spins: n, max: MAX_ENUMERABLE_SPINS });
    }

    let counts: HashMap<Key, u64> = (0..1u64 << n)
        .into_par_iter()
        .fold(
            || (DMatrix::from_element(l, l, 1i8), HashMap::new()),
            |(mut buf, mut acc): (DMatrix<i8>, HashMap<Key, u64>), mask| {
                fill_from_mask(&mut buf, mask);
                let key = (mask.count_ones(), lattice_energy(&buf), lattice_magnetization(&buf));
                *acc.entry(key).or_insert(0) += 1;
                (buf, acc)
            },
        )
        .map(|(_, acc)| acc)
        .reduce(HashMap::new, |mut a, b| {
            for (key, count) in b {
                *a.entry(key).or_insert(0) += count;
            }
            a
        });

    let mut rows: Vec<StateSummary> = counts
        .into_iter()
        .map(|((positive_spins, energy, magnetization), degeneracy)| StateSummary {
            positive_spins,
            energy,
            magnetization,
            degeneracy,
        })
        .collect();
    rows.sort_by_key(|r| (r.positive_spins, r.energy, r.magnetization));

    tracing::debug!(size = l, groups = rows.len(), "enumerated microstates");
    Ok(rows)
}

/// Σ degeneracy; equals 2^N for a complete enumeration.
pub fn total_degeneracy(rows: &[StateSummary]) -> u64 {
    rows.iter().map(|r| r.degeneracy).sum()
}
