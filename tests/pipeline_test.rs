//! End-to-end checks of the CSV pipeline: enumeration, analytical tables,
//! temperature scans and zoom refinement.

use std::cell::RefCell;
use std::fs;

use ising::data::{
    analytical_path, read_burn_in, read_samples, read_state_summary, read_thermo_rows, state_summary_path,
    values_path, write_burn_in, write_samples, write_state_summary, write_thermo_rows, zoom_values_path,
};
use ising::finite_size::{critical_temperature_estimate, Observable};
use ising::lattice::SpinInit;
use ising::sampling::{burn_in, samples, RunParams};
use ising::states::enumerate_states;
use ising::thermo::{analytical_table, cross_check, default_analytical_temperatures, ThermoRow};
use ising::zoom::{zoom_sizes, ExternalRunner, InProcess, ZoomBackend, ZoomWindow};
use ising::IsingError;

fn peaked_table(t_peak: f64) -> Vec<ThermoRow> {
    (0..11)
        .map(|i| {
            let t = 2.0 + 0.04 * i as f64;
            let d = (t - t_peak).abs();
            ThermoRow { temperature: t, epsilon: -1.5, abs_m: 0.5, heat_capacity: 2.0 - d, susceptibility: 30.0 - d }
        })
        .collect()
}

#[test]
fn test_state_summary_survives_csv_and_cross_checks() {
    let dir = tempfile::tempdir().unwrap();
    let path = state_summary_path(dir.path(), 2);
    write_state_summary(&path, &enumerate_states(2).unwrap()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("positive_spins,E(s),M(s),degeneracy\n"));

    let states = read_state_summary(&path).unwrap();
    assert_eq!(states.len(), 6);
    for &t in &[1.0, 1.7, 2.4] {
        cross_check(&states, t, 1e-10).unwrap();
    }
}

#[test]
fn test_analytical_table_file() {
    let dir = tempfile::tempdir().unwrap();
    let rows = analytical_table(&default_analytical_temperatures()).unwrap();
    let path = analytical_path(dir.path());
    write_thermo_rows(&path, &rows).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().next(), Some("T,<epsilon>,<|m|>,C_v,chi"));
    let back = read_thermo_rows(&path).unwrap();
    assert_eq!(back.len(), 15);
    assert_eq!(back[0].temperature, 1.0);
    assert!((back[0].epsilon - rows[0].epsilon).abs() < 1e-15);
}

#[test]
fn test_burn_in_and_sample_files() {
    let dir = tempfile::tempdir().unwrap();
    let params = RunParams { size: 4, temperature: 1.0, cycles: 100, burn_in: 10, init: SpinInit::Random, seed: 1 };

    let trace = burn_in(&params).unwrap();
    let path = dir.path().join("burn_in_L_4_T_1.000000_random.csv");
    write_burn_in(&path, &trace).unwrap();
    assert_eq!(read_burn_in(&path).unwrap(), trace);

    let eps = samples(&params).unwrap();
    let path = dir.path().join("samples_L=4_T=1.0.csv");
    write_samples(&path, &eps).unwrap();
    assert_eq!(read_samples(&path).unwrap(), eps);
}

#[test]
fn test_reader_finds_columns_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("values_L=20.csv");
    fs::write(&path, "chi,T,C_v,<|m|>,<epsilon>\n3.0,2.3,1.5,0.4,-1.2\n5.0,2.2,1.8,0.6,-1.4\n").unwrap();

    let rows = read_thermo_rows(&path).unwrap();
    assert_eq!(rows[0].temperature, 2.2);
    assert_eq!(rows[0].susceptibility, 5.0);
    assert_eq!(rows[1].heat_capacity, 1.5);
    assert_eq!(rows[1].epsilon, -1.2);
}

#[test]
fn test_reader_errors_name_the_problem() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.csv");
    fs::write(&missing, "T,<epsilon>,<|m|>,C_v\n2.0,-1.0,0.5,1.0\n").unwrap();
    match read_thermo_rows(&missing) {
        Err(IsingError::MissingColumn { column, .. }) => assert_eq!(column, "chi"),
        other => panic!("expected MissingColumn, got {other:?}"),
    }

    let garbled = dir.path().join("garbled.csv");
    fs::write(&garbled, "epsilon\n-1.5\nabc\n").unwrap();
    match read_samples(&garbled) {
        Err(IsingError::Parse { row, value, .. }) => {
            assert_eq!(row, 2);
            assert_eq!(value, "abc");
        }
        other => panic!("expected Parse, got {other:?}"),
    }
}

/// Records every refinement request instead of running it.
struct Recorder(RefCell<Vec<(usize, ZoomWindow, u64)>>);

impl ZoomBackend for Recorder {
    fn refine(&self, size: usize, window: &ZoomWindow, seed: u64) -> ising::Result<()> {
        self.0.borrow_mut().push((size, *window, seed));
        Ok(())
    }
}

#[test]
fn test_zoom_walks_sizes_with_increasing_seeds() {
    let dir = tempfile::tempdir().unwrap();
    write_thermo_rows(&values_path(dir.path(), 20), &peaked_table(2.2)).unwrap();
    write_thermo_rows(&values_path(dir.path(), 40), &peaked_table(2.32)).unwrap();

    let recorder = Recorder(RefCell::new(Vec::new()));
    let windows = zoom_sizes(dir.path(), &[20, 40], 2, 9642, &recorder).unwrap();
    assert_eq!(windows.len(), 2);

    let calls = recorder.0.into_inner();
    assert_eq!(calls[0].0, 20);
    assert_eq!(calls[0].2, 9642);
    assert_eq!(calls[1].2, 9643);
    assert!((calls[0].1.t_peak_heat_capacity - 2.2).abs() < 1e-9);
    assert!((calls[0].1.t_min - 2.12).abs() < 1e-9);
    assert!((calls[0].1.t_max - 2.28).abs() < 1e-9);
}

#[test]
fn test_in_process_zoom_writes_refined_table() {
    let dir = tempfile::tempdir().unwrap();
    write_thermo_rows(&values_path(dir.path(), 4), &peaked_table(2.2)).unwrap();

    let backend = InProcess {
        output_dir: dir.path().to_path_buf(),
        points: 3,
        template: RunParams { size: 0, temperature: 1.0, cycles: 50, burn_in: 10, init: SpinInit::Random, seed: 0 },
    };
    zoom_sizes(dir.path(), &[4], 2, 9642, &backend).unwrap();

    let rows = read_thermo_rows(&zoom_values_path(dir.path(), 4)).unwrap();
    assert_eq!(rows.len(), 3);
    assert!((rows[0].temperature - 2.12).abs() < 1e-9);
    assert!((rows[2].temperature - 2.28).abs() < 1e-9);
}

#[test]
fn test_missing_runner_is_reported() {
    let backend = ExternalRunner { program: "/nonexistent/ising-runner".into() };
    let window = ZoomWindow { t_min: 2.2, t_max: 2.3, t_peak_heat_capacity: 2.25, t_peak_susceptibility: 2.26 };
    assert!(matches!(backend.refine(20, &window, 1), Err(IsingError::Runner { .. })));
}

#[test]
fn test_critical_temperature_from_zoom_tables() {
    let tables: Vec<(usize, Vec<ThermoRow>)> = [(40usize, 2.32), (60, 2.28), (80, 2.24)]
        .iter()
        .map(|&(l, tc)| (l, peaked_table(tc)))
        .collect();
    let est = critical_temperature_estimate(&tables, Observable::Susceptibility).unwrap();
    let peaks = est.critical_temperatures();
    assert!((peaks[0] - 2.32).abs() < 1e-9);
    assert!(est.t_inf() < 2.24);
    assert!(est.fit.slope > 0.0);
}
