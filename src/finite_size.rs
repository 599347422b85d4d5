// finite_size.rs - Extrapolate T_c(L → ∞) from the peak positions of C_v and χ

use crate::error::{IsingError, Result};
use crate::stats::LinearFit;
use crate::thermo::ThermoRow;

/// Observable whose peak locates T_c(L).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observable {
    HeatCapacity,
    Susceptibility,
}

impl Observable {
    /// Column name in the value tables.
    pub fn column(self) -> &'static str {
        match self {
            Observable::HeatCapacity => "C_v",
            Observable::Susceptibility => "chi",
        }
    }

    pub fn value(self, row: &ThermoRow) -> f64 {
        match self {
            Observable::HeatCapacity => row.heat_capacity,
            Observable::Susceptibility => row.susceptibility,
        }
    }
}

/// Index of the first maximum of `observable`.
pub fn argmax(rows: &[ThermoRow], observable: Observable) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, row) in rows.iter().enumerate() {
        let v = observable.value(row);
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Row where `observable` peaks.
pub fn peak(rows: &[ThermoRow], observable: Observable) -> Result<&ThermoRow> {
    argmax(rows, observable)
        .map(|i| &rows[i])
        .ok_or_else(|| IsingError::EmptyData(format!("no rows to locate the {} peak", observable.column())))
}

/// T_c(L) against 1/L with a straight-line fit; the intercept estimates T_c(∞).
#[derive(Debug, Clone)]
pub struct CriticalEstimate {
    pub observable: Observable,
    /// (L, 1/L, T_c(L))
    pub points: Vec<(usize, f64, f64)>,
    pub fit: LinearFit,
}

impl CriticalEstimate {
    pub fn t_inf(&self) -> f64 {
        self.fit.intercept
    }

    pub fn inverse_sizes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.1).collect()
    }

    pub fn critical_temperatures(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.2).collect()
    }
}

pub fn critical_temperature_estimate(
    tables: &[(usize, Vec<ThermoRow>)],
    observable: Observable,
) -> Result<CriticalEstimate> {
    let points = tables
        .iter()
        .map(|(size, rows)| Ok((*size, 1.0 / *size as f64, peak(rows, observable)?.temperature)))
        .collect::<Result<Vec<_>>>()?;

    let x: Vec<f64> = points.iter().map(|p| p.1).collect();
    let y: Vec<f64> = points.iter().map(|p| p.2).collect();
    let fit = LinearFit::fit(&x, &y)?;
    Ok(CriticalEstimate { observable, points, fit })
}
