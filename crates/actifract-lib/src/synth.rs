//! Synthetic self-similar series with a known Hurst exponent.
//!
//! Fractional Gaussian noise is drawn exactly by circulant embedding
//! (Davies–Harte): the autocovariance is wrapped into a circulant of size
//! `2 * len`, whose eigenvalues come from one real FFT, and a Hermitian
//! spectrum of scaled Gaussians is inverted back to the time domain.

use crate::error::{AnalysisError, Result};
use crate::signal::CountsSeries;
use chrono::{Duration, NaiveDateTime};
use rand::{rngs::StdRng, Rng, SeedableRng};
use realfft::{num_complex::Complex64, RealFftPlanner};

/// Unit-variance fractional Gaussian noise of length `len`.
pub fn fractional_gaussian_noise<R: Rng + ?Sized>(len: usize, hurst: f64, rng: &mut R) -> Result<Vec<f64>> {
    if !(hurst > 0.0 && hurst < 1.0) {
        return Err(AnalysisError::invalid(format!(
            "Hurst exponent must lie in (0, 1), got {hurst}"
        )));
    }
    if len == 0 {
        return Ok(Vec::new());
    }
    let m = 2 * len;
    let mut row = vec![0.0; m];
    for k in 0..=len {
        row[k] = autocovariance(k, hurst);
    }
    for k in 1..len {
        row[m - k] = row[k];
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(m);
    let mut eigen = r2c.make_output_vec();
    r2c.process(&mut row, &mut eigen)
        .map_err(|e| AnalysisError::invalid(format!("circulant FFT failed: {e}")))?;

    let peak = eigen.iter().map(|c| c.re).fold(0.0, f64::max);
    let mut spectrum = Vec::with_capacity(eigen.len());
    for (k, lambda) in eigen.iter().enumerate() {
        let lambda = lambda.re;
        if lambda < -1e-9 * peak {
            return Err(AnalysisError::NumericalDomain {
                quantity: "circulant eigenvalue",
                scale: k,
                value: lambda,
            });
        }
        let lambda = lambda.max(0.0);
        let z = if k == 0 || k == len {
            Complex64::new(lambda.sqrt() * standard_normal(rng), 0.0)
        } else {
            let amp = (lambda / 2.0).sqrt();
            Complex64::new(amp * standard_normal(rng), amp * standard_normal(rng))
        };
        spectrum.push(z);
    }

    let c2r = planner.plan_fft_inverse(m);
    let mut out = c2r.make_output_vec();
    c2r.process(&mut spectrum, &mut out)
        .map_err(|e| AnalysisError::invalid(format!("inverse FFT failed: {e}")))?;
    let norm = (m as f64).sqrt();
    out.truncate(len);
    for v in out.iter_mut() {
        *v /= norm;
    }
    Ok(out)
}

/// Non-negative minute counts shaped as `mean + sd * fGn`, clipped at zero.
pub fn synthetic_counts(
    len: usize,
    hurst: f64,
    mean: f64,
    sd: f64,
    start: NaiveDateTime,
    seed: u64,
) -> Result<CountsSeries> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = fractional_gaussian_noise(len, hurst, &mut rng)?;
    let timestamps = (0..len)
        .map(|i| start + Duration::minutes(i as i64))
        .collect();
    let counts = noise.into_iter().map(|v| (mean + sd * v).max(0.0)).collect();
    CountsSeries::new(timestamps, counts)
}

fn autocovariance(k: usize, hurst: f64) -> f64 {
    let k = k as f64;
    let h2 = 2.0 * hurst;
    0.5 * ((k + 1.0).powf(h2) - 2.0 * k.powf(h2) + (k - 1.0).abs().powf(h2))
}

/// Box–Muller draw from N(0, 1).
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
