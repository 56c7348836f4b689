use std::path::{Path, PathBuf};

use anyhow::Result;
use itertools::Itertools;
use palette::{LinSrgb, Mix, Srgb};
use plotters::prelude::*;
use tracing::info;

use crate::dataset::CaseTable;
use crate::select::Selection;

/// Number of bin endpoints, matching the feed maps this replaces
/// (15 endpoints, 16 color bins).
const NUM_ENDPOINTS: usize = 15;

/// Evenly spaced integer endpoints from `lo` to `hi` inclusive.
pub fn binning_endpoints(lo: i64, hi: i64) -> Vec<i64> {
    (0..NUM_ENDPOINTS)
        .map(|k| {
            let t = k as f64 / (NUM_ENDPOINTS - 1) as f64;
            (lo as f64 + t * (hi - lo) as f64).round() as i64
        })
        .collect()
}

/// Endpoints for the day-change view: symmetric around zero so the
/// diverging scale keeps white at no-change, sized by whichever side
/// has the larger magnitude.
pub fn day_change_endpoints(values: &[i64]) -> Vec<i64> {
    let min = values.iter().copied().min().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(0);
    if min.abs() > max.abs() {
        binning_endpoints(min, -min)
    } else {
        binning_endpoints(-max, max)
    }
}

/// Index of the bin a value falls in: below the first endpoint is bin
/// 0, at or above the last is the final bin.
pub fn bin_index(value: i64, endpoints: &[i64]) -> usize {
    endpoints.iter().filter(|e| value >= **e).count()
}

/// `n` colors interpolated along the given stops, mixed in linear RGB.
fn gradient(stops: &[Srgb<f32>], n: usize) -> Vec<RGBColor> {
    (0..n)
        .map(|i| {
            let t = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.0 };
            let scaled = t * (stops.len() - 1) as f32;
            let seg = (scaled.floor() as usize).min(stops.len() - 2);
            let frac = scaled - seg as f32;
            let mixed: LinSrgb<f32> = stops[seg]
                .into_linear()
                .mix(stops[seg + 1].into_linear(), frac);
            let out: Srgb<u8> = Srgb::<f32>::from_linear(mixed).into_format();
            RGBColor(out.red, out.green, out.blue)
        })
        .collect()
}

fn totals_colors(n: usize) -> Vec<RGBColor> {
    gradient(
        &[Srgb::new(1.0, 1.0, 1.0), Srgb::new(1.0, 0.0, 0.0)],
        n,
    )
}

fn day_change_colors(n: usize) -> Vec<RGBColor> {
    gradient(
        &[
            Srgb::new(0.0, 1.0, 0.0),
            Srgb::new(1.0, 1.0, 1.0),
            Srgb::new(1.0, 0.0, 0.0),
        ],
        n,
    )
}

struct Entry {
    label: String,
    value: i64,
}

/// Cumulative totals for the selected date, one colored bar per county
/// ranked by count.
pub fn render_totals(
    table: &CaseTable,
    sel: &Selection,
    state: &str,
    postal: &str,
    outdir: &Path,
) -> Result<PathBuf> {
    let entries = entries(table, sel.newest.iter().map(|v| *v as i64));
    let max = entries.iter().map(|e| e.value).max().unwrap_or(0);
    // Totals are always non-negative, so bins start from zero.
    let endpoints = binning_endpoints(0, max);
    let colors = totals_colors(endpoints.len() + 1);
    let path = outdir.join(format!("{}_totals.png", postal));
    render_bars(
        &path,
        &format!("{} confirmed COVID cases today", state),
        &entries,
        &endpoints,
        &colors,
    )?;
    info!("wrote {}", path.display());
    Ok(path)
}

/// Day-over-day change against the selection's comparison baseline.
pub fn render_day_change(
    table: &CaseTable,
    sel: &Selection,
    state: &str,
    postal: &str,
    outdir: &Path,
) -> Result<PathBuf> {
    let changes: Vec<i64> = sel
        .newest
        .iter()
        .zip(&sel.prior)
        .map(|(n, p)| *n as i64 - *p as i64)
        .collect();
    let entries = entries(table, changes.iter().copied());
    let endpoints = day_change_endpoints(&changes);
    let colors = day_change_colors(endpoints.len() + 1);
    let path = outdir.join(format!("{}_day_change.png", postal));
    render_bars(
        &path,
        &format!("{} confirmed COVID cases day change", state),
        &entries,
        &endpoints,
        &colors,
    )?;
    info!("wrote {}", path.display());
    Ok(path)
}

fn entries(table: &CaseTable, values: impl Iterator<Item = i64>) -> Vec<Entry> {
    table
        .rows
        .iter()
        .zip(values)
        .map(|(row, value)| Entry {
            label: if row.county.is_empty() {
                row.fips.clone()
            } else {
                row.county.clone()
            },
            value,
        })
        .sorted_by_key(|e| std::cmp::Reverse(e.value))
        .collect()
}

fn render_bars(
    path: &Path,
    title: &str,
    entries: &[Entry],
    endpoints: &[i64],
    colors: &[RGBColor],
) -> Result<()> {
    let n = entries.len();
    let height = 140 + 18 * n as u32;
    let root = BitMapBackend::new(path, (1024, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let lo = *endpoints.first().unwrap_or(&0);
    let mut hi = *endpoints.last().unwrap_or(&0);
    if hi <= lo {
        hi = lo + 1;
    }

    let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(title, ("sans-serif", 30))
        .set_label_area_size(LabelAreaPosition::Left, 140)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(lo..hi, 0i32..n as i32)?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|idx| {
            labels
                .get(*idx as usize)
                .map(|s| s.to_string())
                .unwrap_or_default()
        })
        .x_desc("Confirmed cases")
        .draw()?;
    chart.draw_series(entries.iter().enumerate().map(|(i, e)| {
        let color = colors[bin_index(e.value, endpoints)];
        Rectangle::new([(0, i as i32), (e.value, i as i32 + 1)], color.filled())
    }))?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_span_the_range() {
        let eps = binning_endpoints(0, 1400);
        assert_eq!(eps.len(), 15);
        assert_eq!(eps[0], 0);
        assert_eq!(eps[14], 1400);
        assert!(eps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn degenerate_range_collapses() {
        let eps = binning_endpoints(0, 0);
        assert!(eps.iter().all(|e| *e == 0));
    }

    #[test]
    fn day_change_bins_track_larger_magnitude() {
        // Positive side dominates: span is -max..max.
        let eps = day_change_endpoints(&[-5, 0, 20]);
        assert_eq!(*eps.first().unwrap(), -20);
        assert_eq!(*eps.last().unwrap(), 20);

        // Negative side dominates: span is min..-min.
        let eps = day_change_endpoints(&[-30, 0, 10]);
        assert_eq!(*eps.first().unwrap(), -30);
        assert_eq!(*eps.last().unwrap(), 30);
    }

    #[test]
    fn bin_index_covers_both_tails() {
        let eps = binning_endpoints(0, 14);
        assert_eq!(bin_index(-1, &eps), 0);
        assert_eq!(bin_index(0, &eps), 1);
        assert_eq!(bin_index(14, &eps), 15);
        assert_eq!(bin_index(100, &eps), 15);
    }

    #[test]
    fn gradient_hits_its_stops() {
        let colors = totals_colors(16);
        assert_eq!(colors.len(), 16);
        assert_eq!(colors[0], RGBColor(255, 255, 255));
        assert_eq!(colors[15], RGBColor(255, 0, 0));
    }

    #[test]
    fn diverging_gradient_is_white_in_the_middle() {
        let colors = day_change_colors(17);
        assert_eq!(colors[8], RGBColor(255, 255, 255));
        assert_eq!(*colors.first().unwrap(), RGBColor(0, 255, 0));
        assert_eq!(*colors.last().unwrap(), RGBColor(255, 0, 0));
    }
}
