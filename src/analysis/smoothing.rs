/// Masked Gaussian smoothing over a row-major grid.
///
/// Only defined cells contribute and only defined cells are written: each
/// output value is the kernel-weighted mean of the defined cells in its
/// window, so masked cells neither leak into nor receive smoothed values.
/// The kernel is separable and truncated at four sigma.

const TRUNCATE: f64 = 4.0;

/// Normalized 1-D Gaussian weights, index 0 is offset `-radius`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// One smoothing pass with `sigma` measured in cells. With `wrap_period`
/// set, columns are cyclic with that period.
pub fn smooth_masked(
    cells: &[Option<f64>],
    width: usize,
    height: usize,
    sigma: f64,
    wrap_period: Option<usize>,
) -> Vec<Option<f64>> {
    if sigma <= 0.0 || width == 0 || height == 0 {
        return cells.to_vec();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;

    let weighted: Vec<f64> = cells.iter().map(|c| c.unwrap_or(0.0)).collect();
    let support: Vec<f64> = cells.iter().map(|c| if c.is_some() { 1.0 } else { 0.0 }).collect();

    let column = |c: usize, k: i64| -> Option<usize> {
        let j = c as i64 + k;
        match wrap_period {
            Some(period) if period > 0 => Some(j.rem_euclid(period as i64) as usize),
            _ if j >= 0 && (j as usize) < width => Some(j as usize),
            _ => None,
        }
    };

    // Horizontal pass over both the weighted values and the support
    let mut h_val = vec![0.0; cells.len()];
    let mut h_sup = vec![0.0; cells.len()];
    for r in 0..height {
        let row = r * width;
        for c in 0..width {
            let (mut v, mut s) = (0.0, 0.0);
            for (i, w) in kernel.iter().enumerate() {
                if let Some(j) = column(c, i as i64 - radius) {
                    v += w * weighted[row + j];
                    s += w * support[row + j];
                }
            }
            h_val[row + c] = v;
            h_sup[row + c] = s;
        }
    }

    // Vertical pass, then normalize at defined cells only
    let mut out = vec![None; cells.len()];
    for r in 0..height {
        for c in 0..width {
            let idx = r * width + c;
            if cells[idx].is_none() {
                continue;
            }
            let (mut v, mut s) = (0.0, 0.0);
            for (i, w) in kernel.iter().enumerate() {
                let rr = r as i64 + i as i64 - radius;
                if rr < 0 || rr as usize >= height {
                    continue;
                }
                let j = rr as usize * width + c;
                v += w * h_val[j];
                s += w * h_sup[j];
            }
            out[idx] = if s > 0.0 { Some(v / s) } else { cells[idx] };
        }
    }
    out
}
