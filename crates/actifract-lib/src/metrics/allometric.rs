//! Allometric aggregation: fractal dimension from how the variance of block
//! sums grows with their mean.
//!
//! For a block length `n`, the series is cut into blocks, each block is
//! summed, and the mean and variance of those sums are taken. For a
//! self-similar signal `ln var = a + b ln mean`, and the fractal dimension is
//! `D = 2 - b / 2` (1.5 for white noise, 1 for a perfectly persistent signal).

use crate::error::{AnalysisError, Result};
use crate::metrics::blocks::{mean_variance, BlockSums, CumulativeSums, ScaleLadder};
use serde::{Deserialize, Serialize};

/// Default growth factor between consecutive scales.
pub const DEFAULT_SPREAD: f64 = 1.1;

/// Result of the fixed-block estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllometricFit {
    pub dimension: f64,
    /// Slope of `ln var` against `ln mean`.
    pub slope: f64,
    pub intercept: f64,
    /// Mean block sum for `n = 1..=n_max`.
    pub means: Vec<f64>,
    pub variances: Vec<f64>,
}

/// Result of the multi-scale estimator; index `i` of every vector refers to
/// `scales[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiScaleFit {
    pub dimensions: Vec<f64>,
    pub scales: Vec<usize>,
    pub means: Vec<f64>,
    pub variances: Vec<f64>,
    /// Cubic `c0 + c1 x + c2 x^2 + c3 x^3` in `x = ln mean`.
    pub coefficients: [f64; 4],
}

impl MultiScaleFit {
    /// Fitted `ln var` at `ln mean = x`.
    pub fn fitted(&self, x: f64) -> f64 {
        let c = &self.coefficients;
        c[0] + x * (c[1] + x * (c[2] + x * c[3]))
    }
}

/// Fixed-block allometric aggregation over `n = 1..=n_max`.
///
/// Blocks do not overlap and the last one takes whatever samples remain, so
/// short series suffer from end effects. That bias is left in place.
pub fn allometric_aggregation(series: &[f64], n_max: usize) -> Result<AllometricFit> {
    if n_max < 2 {
        return Err(AnalysisError::invalid(format!(
            "n_max must be at least 2 to fit a slope, got {n_max}"
        )));
    }
    if series.is_empty() {
        return Err(AnalysisError::insufficient("empty series"));
    }
    let sums = CumulativeSums::new(series);
    let mut means = Vec::with_capacity(n_max);
    let mut variances = Vec::with_capacity(n_max);
    for n in 1..=n_max {
        let (mean, var) = mean_variance(BlockSums::tiling(&sums, n))
            .ok_or_else(|| AnalysisError::insufficient(format!("no block at scale {n}")))?;
        means.push(mean);
        variances.push(var);
    }
    let scales: Vec<usize> = (1..=n_max).collect();
    let (x, y) = log_points(&scales, &means, &variances)?;
    let (slope, intercept) = linear_fit(&x, &y)?;
    Ok(AllometricFit {
        dimension: 2.0 - slope / 2.0,
        slope,
        intercept,
        means,
        variances,
    })
}

/// Multi-scale allometric aggregation with overlapping blocks and a cubic
/// fit, giving a local dimension per scale.
pub fn adapted_allometric_aggregation(
    series: &[f64],
    n_min: usize,
    n_max: usize,
    spread: f64,
) -> Result<MultiScaleFit> {
    let ladder = ScaleLadder::new(n_min, n_max, spread)?;
    if series.len() < n_min {
        return Err(AnalysisError::insufficient(format!(
            "{} samples cannot fill a block of {n_min}",
            series.len()
        )));
    }
    let sums = CumulativeSums::new(series);
    let mut scales = Vec::new();
    let mut means = Vec::new();
    let mut variances = Vec::new();
    for scale in ladder {
        let (mean, var) = mean_variance(BlockSums::overlapping(&sums, scale)).ok_or_else(|| {
            AnalysisError::insufficient(format!(
                "{} samples yield no block at scale {}",
                series.len(),
                scale.n
            ))
        })?;
        scales.push(scale.n);
        means.push(mean);
        variances.push(var);
    }
    if scales.len() < 4 {
        return Err(AnalysisError::insufficient(format!(
            "a cubic fit needs at least 4 scales, [{n_min}, {n_max}] with spread {spread} gives {}",
            scales.len()
        )));
    }
    let (x, y) = log_points(&scales, &means, &variances)?;
    let cubic = CubicFit::fit(&x, &y)?;
    let dimensions = x.iter().map(|&xi| 2.0 - cubic.derivative(xi) / 2.0).collect();
    Ok(MultiScaleFit {
        dimensions,
        scales,
        means,
        variances,
        coefficients: cubic.coefficients(),
    })
}

fn log_points(scales: &[usize], means: &[f64], variances: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut x = Vec::with_capacity(means.len());
    let mut y = Vec::with_capacity(means.len());
    for ((&scale, &mean), &var) in scales.iter().zip(means).zip(variances) {
        if !(mean > 0.0) {
            return Err(AnalysisError::NumericalDomain {
                quantity: "mean",
                scale,
                value: mean,
            });
        }
        if !(var > 0.0) {
            return Err(AnalysisError::NumericalDomain {
                quantity: "variance",
                scale,
                value: var,
            });
        }
        x.push(mean.ln());
        y.push(var.ln());
    }
    Ok((x, y))
}

fn linear_fit(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    let n = x.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_xy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        sum_x += xi;
        sum_y += yi;
        sum_xx += xi * xi;
        sum_xy += xi * yi;
    }
    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return Err(AnalysisError::insufficient(
            "block means do not vary across scales",
        ));
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    Ok((slope, intercept))
}

/// Least-squares cubic, solved on the abscissa mapped to `[-1, 1]`.
struct CubicFit {
    coef: [f64; 4],
    offset: f64,
    scale: f64,
}

impl CubicFit {
    fn fit(x: &[f64], y: &[f64]) -> Result<Self> {
        let lo = x.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(hi - lo > 0.0) {
            return Err(AnalysisError::insufficient(
                "block means do not vary across scales",
            ));
        }
        let scale = 2.0 / (hi - lo);
        let offset = -(hi + lo) / (hi - lo);

        // normal equations of the Vandermonde system
        let mut ata = [[0.0; 4]; 4];
        let mut aty = [0.0; 4];
        for (&xi, &yi) in x.iter().zip(y) {
            let u = offset + scale * xi;
            let powers = [1.0, u, u * u, u * u * u];
            for r in 0..4 {
                aty[r] += powers[r] * yi;
                for c in 0..4 {
                    ata[r][c] += powers[r] * powers[c];
                }
            }
        }
        let coef = solve4(ata, aty)
            .ok_or_else(|| AnalysisError::insufficient("singular cubic fit"))?;
        Ok(Self { coef, offset, scale })
    }

    fn derivative(&self, x: f64) -> f64 {
        let u = self.offset + self.scale * x;
        let c = &self.coef;
        self.scale * (c[1] + 2.0 * c[2] * u + 3.0 * c[3] * u * u)
    }

    /// Coefficients re-expressed in the unmapped variable.
    fn coefficients(&self) -> [f64; 4] {
        let (a, b) = (self.offset, self.scale);
        let c = &self.coef;
        // expand c_k (a + b x)^k
        [
            c[0] + c[1] * a + c[2] * a * a + c[3] * a * a * a,
            b * (c[1] + 2.0 * c[2] * a + 3.0 * c[3] * a * a),
            b * b * (c[2] + 3.0 * c[3] * a),
            b * b * b * c[3],
        ]
    }
}

/// Gaussian elimination with partial pivoting.
fn solve4(mut m: [[f64; 4]; 4], mut rhs: [f64; 4]) -> Option<[f64; 4]> {
    for col in 0..4 {
        let pivot = (col..4).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);
        for row in col + 1..4 {
            let factor = m[row][col] / m[col][col];
            for k in col..4 {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }
    let mut out = [0.0; 4];
    for row in (0..4).rev() {
        let tail: f64 = (row + 1..4).map(|k| m[row][k] * out[k]).sum();
        out[row] = (rhs[row] - tail) / m[row][row];
    }
    Some(out)
}
