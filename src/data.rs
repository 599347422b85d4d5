// data.rs - CSV readers and writers for state summaries, observables and samples

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::{IsingError, Result};
use crate::lattice::SpinInit;
use crate::sampling::BurnInRow;
use crate::states::StateSummary;
use crate::thermo::ThermoRow;

pub const STATE_HEADER: [&str; 4] = ["positive_spins", "E(s)", "M(s)", "degeneracy"];
pub const THERMO_HEADER: [&str; 5] = ["T", "<epsilon>", "<|m|>", "C_v", "chi"];
pub const BURN_IN_HEADER: [&str; 3] = ["N", "expected_E", "expected_M"];
pub const SAMPLES_HEADER: [&str; 1] = ["epsilon"];

pub fn state_summary_path(dir: &Path, size: usize) -> PathBuf {
    if size == 2 {
        dir.join("state_summary.csv")
    } else {
        dir.join(format!("state_summary_L={size}.csv"))
    }
}

pub fn analytical_path(dir: &Path) -> PathBuf {
    dir.join("analytical_L=2.csv")
}

pub fn burn_in_path(dir: &Path, size: usize, temperature: f64, init: SpinInit) -> PathBuf {
    dir.join(format!("burn_in_L_{size}_T_{temperature:.6}_{}.csv", init.label()))
}

pub fn samples_path(dir: &Path, size: usize, temperature: f64) -> PathBuf {
    dir.join(format!("samples_L={size}_T={temperature:.1}.csv"))
}

pub fn values_path(dir: &Path, size: usize) -> PathBuf {
    dir.join(format!("values_L={size}.csv"))
}

pub fn zoom_values_path(dir: &Path, size: usize) -> PathBuf {
    dir.join(format!("values_zoom_L={size}.csv"))
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| IsingError::io(parent, e))?;
        }
    }
    Ok(())
}

fn write_rows<I, R>(path: &Path, header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    ensure_parent(path)?;
    let mut wtr = WriterBuilder::new().from_path(path)?;
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush().map_err(|e| IsingError::io(path, e))?;
    tracing::debug!(path = %path.display(), "wrote csv");
    Ok(())
}

/// A CSV file whose columns are looked up by header name.
struct Table {
    file: String,
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl Table {
    fn read(path: &Path) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_path(path)?;
        let headers = rdr.headers()?.clone();
        let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { file: path.display().to_string(), headers, records })
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IsingError::MissingColumn { file: self.file.clone(), column: name.to_string() })
    }

    fn get<T: FromStr>(&self, row: usize, col: usize) -> Result<T> {
        let value = self.records[row].get(col).unwrap_or("");
        value.parse().map_err(|_| IsingError::Parse {
            file: self.file.clone(),
            row: row + 1,
            column: self.headers.get(col).unwrap_or("").to_string(),
            value: value.to_string(),
        })
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

pub fn write_state_summary(path: &Path, rows: &[StateSummary]) -> Result<()> {
    write_rows(
        path,
        &STATE_HEADER,
        rows.iter().map(|r| {
            [
                r.positive_spins.to_string(),
                r.energy.to_string(),
                r.magnetization.to_string(),
                r.degeneracy.to_string(),
            ]
        }),
    )
}

pub fn read_state_summary(path: &Path) -> Result<Vec<StateSummary>> {
    let t = Table::read(path)?;
    let cols: Vec<usize> = STATE_HEADER.iter().map(|h| t.column(h)).collect::<Result<_>>()?;
    (0..t.len())
        .map(|i| {
            Ok(StateSummary {
                positive_spins: t.get(i, cols[0])?,
                energy: t.get(i, cols[1])?,
                magnetization: t.get(i, cols[2])?,
                degeneracy: t.get(i, cols[3])?,
            })
        })
        .collect()
}

pub fn write_thermo_rows(path: &Path, rows: &[ThermoRow]) -> Result<()> {
    write_rows(
        path,
        &THERMO_HEADER,
        rows.iter().map(|r| {
            [
                r.temperature.to_string(),
                r.epsilon.to_string(),
                r.abs_m.to_string(),
                r.heat_capacity.to_string(),
                r.susceptibility.to_string(),
            ]
        }),
    )
}

/// Read a `T,<epsilon>,<|m|>,C_v,chi` table, sorted by T.
pub fn read_thermo_rows(path: &Path) -> Result<Vec<ThermoRow>> {
    let t = Table::read(path)?;
    let cols: Vec<usize> = THERMO_HEADER.iter().map(|h| t.column(h)).collect::<Result<_>>()?;
    let mut rows = (0..t.len())
        .map(|i| {
            Ok(ThermoRow {
                temperature: t.get(i, cols[0])?,
                epsilon: t.get(i, cols[1])?,
                abs_m: t.get(i, cols[2])?,
                heat_capacity: t.get(i, cols[3])?,
                susceptibility: t.get(i, cols[4])?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    rows.sort_by(|a, b| a.temperature.total_cmp(&b.temperature));
    Ok(rows)
}

pub fn write_burn_in(path: &Path, rows: &[BurnInRow]) -> Result<()> {
    write_rows(
        path,
        &BURN_IN_HEADER,
        rows.iter().map(|r| [r.cycle.to_string(), r.expected_epsilon.to_string(), r.expected_abs_m.to_string()]),
    )
}

pub fn read_burn_in(path: &Path) -> Result<Vec<BurnInRow>> {
    let t = Table::read(path)?;
    let cols: Vec<usize> = BURN_IN_HEADER.iter().map(|h| t.column(h)).collect::<Result<_>>()?;
    (0..t.len())
        .map(|i| {
            Ok(BurnInRow {
                cycle: t.get(i, cols[0])?,
                expected_epsilon: t.get(i, cols[1])?,
                expected_abs_m: t.get(i, cols[2])?,
            })
        })
        .collect()
}

pub fn write_samples(path: &Path, samples: &[f64]) -> Result<()> {
    write_rows(path, &SAMPLES_HEADER, samples.iter().map(|x| [x.to_string()]))
}

pub fn read_samples(path: &Path) -> Result<Vec<f64>> {
    let t = Table::read(path)?;
    let col = t.column(SAMPLES_HEADER[0])?;
    (0..t.len()).map(|i| t.get(i, col)).collect()
}
