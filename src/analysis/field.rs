/// Spatial field builder: OVATION samples to a renderable probability raster.
///
/// The sample cloud is sparse, uneven and crosses the antimeridian. The
/// build runs in a fixed order:
///   1. drop samples below `threshold`
///   2. normalize longitudes into [-180, 180)
///   3. duplicate samples near the seam shifted by 360 degrees
///   4. Clough-Tocher cubic interpolation over the lon/lat mesh (no
///      extrapolation outside the sample hull), closing the ring when the
///      first and last columns are the same meridian
///   5. clamp to [0, 100]
///   6. masked Gaussian smoothing, once per configured sigma
///   7. re-mask cells at or below `threshold + REMASK_MARGIN`
///
/// The result is deterministic for identical inputs.

use std::collections::BTreeSet;

use crate::analysis::smoothing;
use crate::analysis::triangulation::{CloughTocher, Point};
use crate::config::FieldConfig;
use crate::logging::{self, DataSource};
use crate::model::{Raster, SpatialSample};

// ---------------------------------------------------------------------------
// Tuned constants
// ---------------------------------------------------------------------------

/// Minimum probability (percent) a sample needs to take part.
pub const DEFAULT_THRESHOLD: f64 = 5.0;

/// Samples within this many degrees of +/-180 are duplicated across the seam.
pub const SEAM_WRAP_MARGIN_DEG: f64 = 10.0;

/// Output cells must exceed `threshold` by more than this to stay unmasked.
pub const REMASK_MARGIN: f64 = 1.0;

/// Twice the 360 distinct longitudes of the OVATION grid.
pub const DEFAULT_LON_NODES: usize = 720;
pub const DEFAULT_LAT_NODES: usize = 200;

/// Successive blur widths, in mesh cells.
pub const DEFAULT_SMOOTHING_SIGMAS: [f64; 2] = [2.0, 1.5];

// ---------------------------------------------------------------------------
// Mesh
// ---------------------------------------------------------------------------

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Empty output of the configured dimensions.
pub fn masked_field(config: &FieldConfig) -> Raster {
    Raster::masked(
        linspace(config.lon_min, config.lon_max, config.lon_nodes),
        linspace(config.lat_min, config.lat_max, config.lat_nodes),
    )
}

// ---------------------------------------------------------------------------
// Sample preparation
// ---------------------------------------------------------------------------

pub fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Steps 1-3: threshold, longitude normalization and seam padding.
/// Exact duplicate positions keep their first sample.
pub fn prepare_samples(samples: &[SpatialSample], threshold: f64, wrap_margin: f64) -> Vec<SpatialSample> {
    let mut kept: Vec<SpatialSample> = Vec::new();
    let mut seen: BTreeSet<(u64, u64)> = BTreeSet::new();
    let mut push = |s: SpatialSample, kept: &mut Vec<SpatialSample>| {
        // +0.0 and -0.0 compare equal but differ in bits
        let key = ((s.longitude + 0.0).to_bits(), (s.latitude + 0.0).to_bits());
        if seen.insert(key) {
            kept.push(s);
        }
    };

    let base: Vec<SpatialSample> = samples
        .iter()
        .filter(|s| s.longitude.is_finite() && s.latitude.is_finite() && s.probability.is_finite())
        .filter(|s| s.probability >= threshold)
        .map(|s| SpatialSample::new(normalize_longitude(s.longitude), s.latitude, s.probability))
        .collect();

    for s in &base {
        push(*s, &mut kept);
    }
    for s in &base {
        if s.longitude < -180.0 + wrap_margin {
            push(SpatialSample::new(s.longitude + 360.0, s.latitude, s.probability), &mut kept);
        }
        if s.longitude > 180.0 - wrap_margin {
            push(SpatialSample::new(s.longitude - 360.0, s.latitude, s.probability), &mut kept);
        }
    }
    kept
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Builds the raster. Never fails: with too few samples to form a surface
/// the result is entirely masked.
pub fn build_field(samples: &[SpatialSample], config: &FieldConfig) -> Raster {
    let mut raster = masked_field(config);
    let prepared = prepare_samples(samples, config.threshold, config.wrap_margin_deg);
    if prepared.len() < 3 {
        logging::debug(
            DataSource::Field,
            None,
            &format!("{} usable samples, field fully masked", prepared.len()),
        );
        return raster;
    }

    let points: Vec<Point> = prepared.iter().map(|s| [s.longitude, s.latitude]).collect();
    let values: Vec<f64> = prepared.iter().map(|s| s.probability).collect();
    let Some(surface) = CloughTocher::new(points, values) else {
        logging::warn(DataSource::Field, None, "samples are collinear, field fully masked");
        return raster;
    };

    let mut cells: Vec<Option<f64>> = surface
        .rasterize(&raster.longitudes, &raster.latitudes)
        .into_iter()
        .map(|v| v.map(|p| p.clamp(0.0, 100.0)))
        .collect();

    let wrap_period = spans_full_circle(config).then(|| raster.width() - 1);
    if wrap_period.is_some() {
        close_ring(&mut cells, raster.width());
    }
    for sigma in &config.smoothing_sigmas {
        cells = smoothing::smooth_masked(&cells, raster.width(), raster.height(), *sigma, wrap_period);
    }

    let floor = config.threshold + REMASK_MARGIN;
    for cell in cells.iter_mut() {
        if matches!(cell, Some(v) if *v <= floor) {
            *cell = None;
        }
    }

    raster.cells = cells;
    logging::debug(
        DataSource::Field,
        None,
        &format!(
            "field built from {} samples, {}/{} cells unmasked",
            prepared.len(),
            raster.unmasked_count(),
            raster.cells.len()
        ),
    );
    raster
}

/// Gives the duplicated seam column one value per row: the mean where both
/// copies are defined, otherwise whichever one is.
fn close_ring(cells: &mut [Option<f64>], width: usize) {
    if width < 2 {
        return;
    }
    for row in cells.chunks_mut(width) {
        let merged = match (row[0], row[width - 1]) {
            (Some(a), Some(b)) => Some((a + b) / 2.0),
            (a, b) => a.or(b),
        };
        row[0] = merged;
        row[width - 1] = merged;
    }
}

/// First and last mesh columns are the same meridian.
fn spans_full_circle(config: &FieldConfig) -> bool {
    config.lon_nodes > 2 && ((config.lon_max - config.lon_min) - 360.0).abs() < 1e-9
}
