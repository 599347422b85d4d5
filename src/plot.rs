// plot.rs - SVG diagnostics: burn-in traces, ε distributions, observable curves, T_c extrapolation

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::config::Config;
use crate::data::{burn_in_path, ensure_parent, read_burn_in, read_samples, read_thermo_rows, samples_path, values_path, zoom_values_path};
use crate::error::Result;
use crate::finite_size::{critical_temperature_estimate, CriticalEstimate, Observable};
use crate::lattice::SpinInit;
use crate::sampling::BurnInRow;
use crate::stats::{distribution, expected_value, expected_value_with, mean, variance, Histogram};
use crate::thermo::ThermoRow;

type Panel<'a> = DrawingArea<SVGBackend<'a>, Shift>;
type Series = (String, Vec<(f64, f64)>);

const FONT: &str = "sans-serif";

/// Which chart family to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PlotKind {
    BurnIn,
    Distributions,
    Values,
    TInf,
    All,
}

/// Data range padded by 5 % on each side; a flat range is widened to ±0.5.
pub fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    if hi - lo == 0.0 {
        return (lo - 0.5)..(hi + 0.5);
    }
    let pad = 0.05 * (hi - lo);
    (lo - pad)..(hi + pad)
}

/// (N, ⟨ε⟩) and (N, ⟨|m|⟩) traces of a burn-in table.
pub fn burn_in_series(rows: &[BurnInRow]) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let eps = rows.iter().map(|r| (r.cycle as f64, r.expected_epsilon)).collect();
    let mag = rows.iter().map(|r| (r.cycle as f64, r.expected_abs_m)).collect();
    (eps, mag)
}

/// (T, value) pairs of one column of a value table.
pub fn value_series(rows: &[ThermoRow], column: &str) -> Vec<(f64, f64)> {
    rows.iter()
        .map(|r| {
            let v = match column {
                "<epsilon>" => r.epsilon,
                "<|m|>" => r.abs_m,
                "C_v" => r.heat_capacity,
                _ => r.susceptibility,
            };
            (r.temperature, v)
        })
        .collect()
}

/// p(E) over the discrete energy levels visited by a sample of ε values.
pub fn energy_distribution(eps: &[f64], size: usize) -> BTreeMap<i64, f64> {
    let n = (size * size) as f64;
    let energies: Vec<i64> = eps.iter().map(|e| (e * n).round() as i64).collect();
    distribution(&energies)
}

fn plot_file(config: &Config, sub: &str, name: &str) -> Result<PathBuf> {
    let path = config.plots_dir.join(sub).join(name);
    ensure_parent(&path)?;
    Ok(path)
}

fn draw_lines(area: &Panel<'_>, title: &str, x_desc: &str, y_desc: &str, series: &[Series], legend: bool) -> Result<()> {
    let xr = padded_range(series.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.0)));
    let yr = padded_range(series.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.1)));

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 16))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(55)
        .build_cartesian_2d(xr, yr)?;
    chart.configure_mesh().x_desc(x_desc).y_desc(y_desc).draw()?;

    for (i, (label, pts)) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(pts.iter().copied(), color.stroke_width(1)))?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], color.stroke_width(2)));
    }
    if legend {
        chart
            .configure_series_labels()
            .label_font((FONT, 10))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

/// ⟨|m|⟩ against N for T = 1.0 and a random start.
pub fn plot_abs_m_unordered(config: &Config, size: usize) -> Result<PathBuf> {
    let rows = read_burn_in(&burn_in_path(&config.output_dir, size, 1.0, SpinInit::Random))?;
    let (_, mag) = burn_in_series(&rows);
    let path = plot_file(config, "burn_in", &format!("magnetization_for_L_equals_{size}.svg"))?;
    let root = SVGBackend::new(&path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    draw_lines(
        &root,
        "<|m|> for T=1.0 and unordered initial spins",
        "N",
        "<|m|>",
        &[("<|m|>".to_string(), mag)],
        false,
    )?;
    root.present()?;
    Ok(path.clone())
}

/// 2×2 grids (rows: temperatures, columns: ⟨ε⟩ and ⟨|m|⟩), one file per start.
pub fn plot_burn_in_times(config: &Config, size: usize) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (init, name) in [(SpinInit::Random, "unordered"), (SpinInit::Ordered, "ordered")] {
        let path = plot_file(config, "burn_in", &format!("burn_in_time_{name}_L_equals_{size}.svg"))?;
        let root = SVGBackend::new(&path, (1000, 800)).into_drawing_area();
        root.fill(&WHITE)?;
        let body = root.titled(&format!("Expected values for {name} initial spins"), (FONT, 22))?;
        let panels = body.split_evenly((config.burn_in_temperatures.len(), 2));

        for (i, &t) in config.burn_in_temperatures.iter().enumerate() {
            let rows = read_burn_in(&burn_in_path(&config.output_dir, size, t, init))?;
            let (eps, mag) = burn_in_series(&rows);
            draw_lines(&panels[2 * i], &format!("<ε> for T={t} J/k_B"), "N", "<ε> [J]", &[("<ε>".into(), eps)], false)?;
            draw_lines(&panels[2 * i + 1], &format!("<|m|> for T={t} J/k_B"), "N", "<|m|> [1]", &[("<|m|>".into(), mag)], false)?;
        }
        root.present()?;
        written.push(path.clone());
    }
    Ok(written)
}

/// Density histograms of ε; logs the sample mean and variance.
pub fn plot_probability_distributions(config: &Config) -> Result<Vec<PathBuf>> {
    let size = config.sample_size;
    let mut written = Vec::new();
    for &t in &config.sample_temperatures {
        let eps = read_samples(&samples_path(&config.output_dir, size, t))?;
        let hist = Histogram::auto(&eps)?;
        let density = hist.density();

        let path = plot_file(config, "distributions", &format!("epsilon_L={size}_T={t:.1}.svg"))?;
        let root = SVGBackend::new(&path, (800, 600)).into_drawing_area();
        root.fill(&WHITE)?;
        let (x0, _) = hist.edges(0);
        let (_, x1) = hist.edges(hist.bins() - 1);
        let ymax = density.iter().copied().fold(0.0, f64::max);
        let mut chart = ChartBuilder::on(&root)
            .caption(format!("Estimated probability distribution of ε at T={t:.1} J/k_B"), (FONT, 18))
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(55)
            .build_cartesian_2d(padded_range([x0, x1]), 0.0..ymax * 1.05)?;
        chart
            .configure_mesh()
            .x_desc("ε [J]")
            .y_desc(format!("p(ε; {t:.1} J/k_B)"))
            .draw()?;
        chart.draw_series(density.iter().enumerate().map(|(k, &h)| {
            let (l, r) = hist.edges(k);
            Rectangle::new([(l, 0.0), (r, h)], BLUE.mix(0.6).filled())
        }))?;
        root.present()?;

        tracing::info!("variance at T={t:.1}: {}", variance(&eps));
        tracing::info!("expected value at T={t:.1}: {}", mean(&eps));
        let levels = energy_distribution(&eps, size);
        tracing::info!(
            levels = levels.len(),
            "<E> at T={t:.1}: {}, <E^2>: {}",
            expected_value(&levels),
            expected_value_with(&levels, |e| (e * e) as f64)
        );
        written.push(path.clone());
    }
    Ok(written)
}

/// ⟨ε⟩, ⟨|m|⟩, C_v and χ against T, one line per lattice size.
pub fn plot_values(config: &Config) -> Result<PathBuf> {
    let tables = config
        .plot_sizes
        .iter()
        .map(|&l| Ok((l, read_thermo_rows(&values_path(&config.output_dir, l))?)))
        .collect::<Result<Vec<_>>>()?;

    let path = plot_file(config, "values", "values.svg")?;
    let root = SVGBackend::new(&path, (1100, 850)).into_drawing_area();
    root.fill(&WHITE)?;
    let body = root.titled("Estimated values for different sizes of the Ising model", (FONT, 22))?;
    let panels = body.split_evenly((2, 2));

    let quantities = [
        ("<epsilon>", "<ε> [J]"),
        ("<|m|>", "<|m|> [1]"),
        ("C_v", "C_v [k_B]"),
        ("chi", "χ [1/J]"),
    ];
    for (panel, (column, y_desc)) in panels.iter().zip(quantities) {
        let series: Vec<Series> = tables
            .iter()
            .map(|(l, rows)| (format!("L={l}"), value_series(rows, column)))
            .collect();
        draw_lines(panel, "", "T", y_desc, &series, true)?;
    }
    root.present()?;
    Ok(path.clone())
}

fn load_zoom_tables(config: &Config) -> Result<Vec<(usize, Vec<ThermoRow>)>> {
    config
        .plot_sizes
        .iter()
        .map(|&l| Ok((l, read_thermo_rows(&zoom_values_path(&config.output_dir, l))?)))
        .collect()
}

/// Scatter of T_c(L) against 1/L with the fitted line down to 1/L = 0.
pub fn plot_t_inf(config: &Config, observable: Observable) -> Result<CriticalEstimate> {
    let estimate = critical_temperature_estimate(&load_zoom_tables(config)?, observable)?;
    let t_inf = estimate.t_inf();
    let observed: Vec<(f64, f64)> = estimate.points.iter().map(|&(_, x, y)| (x, y)).collect();
    let x_max = estimate.inverse_sizes().into_iter().fold(0.0, f64::max);

    let path = plot_file(config, "T_inf", &format!("estimating_T_inf_{}.svg", observable.column()))?;
    let root = SVGBackend::new(&path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let label = match observable {
        Observable::HeatCapacity => "C_v",
        Observable::Susceptibility => "χ",
    };
    let ys = estimate.critical_temperatures().into_iter().chain([t_inf]);
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Estimating T_c(∞) using {label}"), (FONT, 18))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(padded_range([0.0, x_max]), padded_range(ys))?;
    chart.configure_mesh().x_desc("1/L [1]").y_desc("T_c [J/k_B]").draw()?;

    chart
        .draw_series(LineSeries::new(
            [0.0, x_max].into_iter().map(|x| (x, estimate.fit.predict(x))),
            BLACK.stroke_width(1),
        ))?
        .label("linear fit")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], BLACK));
    chart
        .draw_series(observed.iter().map(|&p| Circle::new(p, 4, BLUE.filled())))?
        .label("Observed T_c")
        .legend(|(x, y)| Circle::new((x, y), 4, BLUE.filled()));
    chart
        .draw_series(std::iter::once(Circle::new((0.0, t_inf), 6, RED.filled())))?
        .label(format!("T_c(∞) = {t_inf:.3}"))
        .legend(|(x, y)| Circle::new((x, y), 6, RED.filled()));
    chart
        .configure_series_labels()
        .label_font((FONT, 12))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;

    tracing::info!(
        "T_c(inf) from {}: {t_inf:.4}, standard error {}",
        observable.column(),
        estimate.fit.stderr
    );
    Ok(estimate)
}

fn inputs_exist(paths: &[PathBuf]) -> bool {
    paths.iter().all(|p| Path::new(p).exists())
}

/// Render one chart family. With `skip_missing`, families whose input files
/// are absent are skipped with a warning instead of failing.
pub fn render(config: &Config, kind: PlotKind, skip_missing: bool) -> Result<()> {
    let out = &config.output_dir;
    let wanted = |k: PlotKind| kind == PlotKind::All || kind == k;

    if wanted(PlotKind::BurnIn) {
        let size = config.burn_in_size;
        let inputs: Vec<PathBuf> = config
            .burn_in_temperatures
            .iter()
            .flat_map(|&t| [SpinInit::Random, SpinInit::Ordered].map(|i| burn_in_path(out, size, t, i)))
            .chain([burn_in_path(out, size, 1.0, SpinInit::Random)])
            .collect();
        if skip_missing && !inputs_exist(&inputs) {
            tracing::warn!("burn-in data missing, skipping burn-in plots");
        } else {
            plot_burn_in_times(config, size)?;
            plot_abs_m_unordered(config, size)?;
        }
    }
    if wanted(PlotKind::Distributions) {
        let inputs: Vec<PathBuf> = config
            .sample_temperatures
            .iter()
            .map(|&t| samples_path(out, config.sample_size, t))
            .collect();
        if skip_missing && !inputs_exist(&inputs) {
            tracing::warn!("sample data missing, skipping distribution plots");
        } else {
            plot_probability_distributions(config)?;
        }
    }
    if wanted(PlotKind::Values) {
        let inputs: Vec<PathBuf> = config.plot_sizes.iter().map(|&l| values_path(out, l)).collect();
        if skip_missing && !inputs_exist(&inputs) {
            tracing::warn!("scan data missing, skipping value plots");
        } else {
            plot_values(config)?;
        }
    }
    if wanted(PlotKind::TInf) {
        let inputs: Vec<PathBuf> = config.plot_sizes.iter().map(|&l| zoom_values_path(out, l)).collect();
        if skip_missing && !inputs_exist(&inputs) {
            tracing::warn!("zoom data missing, skipping T_c extrapolation");
        } else {
            plot_t_inf(config, Observable::HeatCapacity)?;
            plot_t_inf(config, Observable::Susceptibility)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_range_handles_flat_and_empty_data() {
        let r = padded_range([1.0, 3.0]);
        assert!((r.start - 0.9).abs() < 1e-12 && (r.end - 3.1).abs() < 1e-12);
        assert_eq!(padded_range([2.0, 2.0]), 1.5..2.5);
        assert_eq!(padded_range(Vec::<f64>::new()), 0.0..1.0);
        assert_eq!(padded_range([f64::NAN, 1.0]), 0.5..1.5);
    }

    #[test]
    fn series_extraction() {
        let rows = vec![
            BurnInRow { cycle: 1, expected_epsilon: -1.5, expected_abs_m: 0.8 },
            BurnInRow { cycle: 2, expected_epsilon: -1.6, expected_abs_m: 0.85 },
        ];
        let (eps, mag) = burn_in_series(&rows);
        assert_eq!(eps, vec![(1.0, -1.5), (2.0, -1.6)]);
        assert_eq!(mag[1], (2.0, 0.85));

        let values = vec![ThermoRow { temperature: 2.2, epsilon: -1.4, abs_m: 0.6, heat_capacity: 1.9, susceptibility: 20.0 }];
        assert_eq!(value_series(&values, "C_v"), vec![(2.2, 1.9)]);
        assert_eq!(value_series(&values, "chi"), vec![(2.2, 20.0)]);
        assert_eq!(value_series(&values, "<|m|>"), vec![(2.2, 0.6)]);
    }

    #[test]
    fn energy_distribution_groups_samples_by_level() {
        // 4×4 lattice: ε = -2.0 is E = -32, ε = -1.75 is E = -28.
        let levels = energy_distribution(&[-2.0, -2.0, -1.75, -2.0], 4);
        assert_eq!(levels.keys().copied().collect::<Vec<_>>(), vec![-32, -28]);
        assert!((levels[&-32] - 0.75).abs() < 1e-12);
        assert!((expected_value(&levels) - -31.0).abs() < 1e-12);
    }
}
