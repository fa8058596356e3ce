//! Butterworth design in second-order sections and zero-phase application.

use crate::error::{AnalysisError, Result};
use crate::signal::TimeSeries;
use realfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Default Butterworth order.
pub const DEFAULT_ORDER: usize = 5;

/// Pass band, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Band {
    LowPass { highcut: f64 },
    BandPass { lowcut: f64, highcut: f64 },
}

impl Band {
    /// `lowcut == 0` selects a pure low-pass.
    pub fn from_cutoffs(lowcut: f64, highcut: f64) -> Self {
        if lowcut == 0.0 {
            Band::LowPass { highcut }
        } else {
            Band::BandPass { lowcut, highcut }
        }
    }

    fn validate(&self, fs: f64) -> Result<()> {
        if !(fs.is_finite() && fs > 0.0) {
            return Err(AnalysisError::invalid(format!("sampling rate must be positive, got {fs}")));
        }
        let nyquist = 0.5 * fs;
        let (lowcut, highcut) = match *self {
            Band::LowPass { highcut } => (0.0, highcut),
            Band::BandPass { lowcut, highcut } => (lowcut, highcut),
        };
        if !(lowcut >= 0.0) {
            return Err(AnalysisError::invalid(format!("lowcut must be >= 0, got {lowcut}")));
        }
        if !(highcut > 0.0 && highcut < nyquist) {
            return Err(AnalysisError::invalid(format!(
                "highcut {highcut} Hz must lie in (0, {nyquist}) Hz"
            )));
        }
        if lowcut >= highcut {
            return Err(AnalysisError::invalid(format!(
                "lowcut {lowcut} Hz must be below highcut {highcut} Hz"
            )));
        }
        Ok(())
    }
}

/// Cascade of biquads; each row is `[b0, b1, b2, 1, a1, a2]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sos {
    pub sections: Vec<[f64; 6]>,
}

/// Design a digital Butterworth filter as second-order sections.
///
/// Analog prototype, frequency prewarping, low-pass or band-pass
/// transformation, then the bilinear transform. Poles closest to the unit
/// circle end up in the last section.
pub fn butterworth_sos(order: usize, band: Band, fs: f64) -> Result<Sos> {
    if order == 0 {
        return Err(AnalysisError::invalid("filter order must be positive"));
    }
    band.validate(fs)?;
    let nyquist = 0.5 * fs;
    let n = order as f64;
    let prototype: Vec<Complex64> = (0..order)
        .map(|k| {
            let m = -(n - 1.0) + 2.0 * k as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect();
    // design at a normalised sampling rate of 2, so 2 * fs = 4
    let warp = |wn: f64| 4.0 * (PI * wn / 2.0).tan();

    let (zeros, poles, gain) = match band {
        Band::LowPass { highcut } => {
            let wo = warp(highcut / nyquist);
            let poles: Vec<Complex64> = prototype.iter().map(|p| *p * wo).collect();
            (Vec::new(), poles, wo.powi(order as i32))
        }
        Band::BandPass { lowcut, highcut } => {
            let w1 = warp(lowcut / nyquist);
            let w2 = warp(highcut / nyquist);
            let bw = w2 - w1;
            let wo = (w1 * w2).sqrt();
            let mut poles = Vec::with_capacity(2 * order);
            for p in &prototype {
                let p_lp = *p * (bw / 2.0);
                let root = (p_lp * p_lp - wo * wo).sqrt();
                poles.push(p_lp + root);
                poles.push(p_lp - root);
            }
            (vec![Complex64::new(0.0, 0.0); order], poles, bw.powi(order as i32))
        }
    };

    let fs2 = Complex64::new(4.0, 0.0);
    let num: Complex64 = zeros.iter().map(|z| fs2 - *z).product();
    let den: Complex64 = poles.iter().map(|p| fs2 - *p).product();
    let gain = gain * (num / den).re;
    // Butterworth low/band-pass designs only have real digital zeros (+1 or -1)
    let mut digital_zeros: Vec<f64> = zeros.iter().map(|z| ((fs2 + *z) / (fs2 - *z)).re).collect();
    digital_zeros.resize(poles.len(), -1.0);
    let digital_poles: Vec<Complex64> = poles.iter().map(|p| (fs2 + *p) / (fs2 - *p)).collect();

    let mut sections = pair_sections(digital_zeros, &digital_poles);
    if let Some(first) = sections.first_mut() {
        for b in first.iter_mut().take(3) {
            *b *= gain;
        }
    }
    Ok(Sos { sections })
}

fn pair_sections(mut zeros: Vec<f64>, poles: &[Complex64]) -> Vec<[f64; 6]> {
    let tol = 1e-12;
    let mut groups: Vec<Vec<Complex64>> = poles
        .iter()
        .filter(|p| p.im > tol)
        .map(|p| vec![*p, p.conj()])
        .collect();
    let mut real: Vec<f64> = poles
        .iter()
        .filter(|p| p.im.abs() <= tol)
        .map(|p| p.re)
        .collect();
    real.sort_by(|a, b| a.total_cmp(b));
    for chunk in real.chunks(2) {
        groups.push(chunk.iter().map(|r| Complex64::new(*r, 0.0)).collect());
    }
    let radius = |g: &Vec<Complex64>| g.iter().map(|p| p.norm()).fold(0.0, f64::max);
    groups.sort_by(|a, b| radius(a).total_cmp(&radius(b)));

    // hand out zeros starting from the poles nearest the unit circle
    let mut sections = vec![[0.0; 6]; groups.len()];
    for (slot, group) in groups.iter().enumerate().rev() {
        let anchor = group[0];
        let mut picked = Vec::with_capacity(group.len());
        for _ in 0..group.len() {
            let nearest = zeros
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    (anchor - **a).norm().total_cmp(&(anchor - **b).norm())
                })
                .map(|(i, _)| i);
            if let Some(i) = nearest {
                picked.push(zeros.swap_remove(i));
            }
        }
        let b = match picked.as_slice() {
            [z1, z2] => [1.0, -(z1 + z2), z1 * z2],
            [z1] => [1.0, -z1, 0.0],
            _ => [1.0, 0.0, 0.0],
        };
        let a = match group.as_slice() {
            [p1, p2] => [1.0, -(p1 + p2).re, (p1 * p2).re],
            [p] => [1.0, -p.re, 0.0],
            _ => [1.0, 0.0, 0.0],
        };
        sections[slot] = [b[0], b[1], b[2], a[0], a[1], a[2]];
    }
    sections
}

impl Sos {
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Length of the odd extension applied at both ends by [`Sos::filtfilt`].
    pub fn pad_len(&self) -> usize {
        let trivial_b = self.sections.iter().filter(|s| s[2] == 0.0).count();
        let trivial_a = self.sections.iter().filter(|s| s[5] == 0.0).count();
        3 * (2 * self.sections.len() + 1 - trivial_b.min(trivial_a))
    }

    /// Apply forward then backward so the output has no phase lag.
    pub fn filtfilt(&self, data: &[f64]) -> Result<Vec<f64>> {
        let edge = self.pad_len();
        if data.len() <= edge {
            return Err(AnalysisError::insufficient(format!(
                "zero-phase filtering needs more than {edge} samples, got {}",
                data.len()
            )));
        }
        let ext = odd_extension(data, edge);
        let zi = self.step_state();

        let forward = self.filter_from(&ext, &zi, ext[0]);
        let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
        let x0 = reversed[0];
        reversed = self.filter_from(&reversed, &zi, x0);
        reversed.reverse();
        Ok(reversed[edge..edge + data.len()].to_vec())
    }

    /// Run the cascade once, starting from `zi * x0`.
    fn filter_from(&self, data: &[f64], zi: &[[f64; 2]], x0: f64) -> Vec<f64> {
        let mut state: Vec<[f64; 2]> = zi.iter().map(|z| [z[0] * x0, z[1] * x0]).collect();
        let mut out = Vec::with_capacity(data.len());
        for &x in data {
            let mut v = x;
            for (s, st) in self.sections.iter().zip(state.iter_mut()) {
                let y = s[0] * v + st[0];
                st[0] = s[1] * v - s[4] * y + st[1];
                st[1] = s[2] * v - s[5] * y;
                v = y;
            }
            out.push(v);
        }
        out
    }

    /// Per-section state after an infinitely long unit step (transposed direct form II).
    fn step_state(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|s| {
                let gain = (s[0] + s[1] + s[2]) / (s[3] + s[4] + s[5]);
                let zi = [scale * (gain - s[0]), scale * (s[2] - s[5] * gain)];
                scale *= gain;
                zi
            })
            .collect()
    }
}

fn odd_extension(data: &[f64], edge: usize) -> Vec<f64> {
    let n = data.len();
    let first = data[0];
    let last = data[n - 1];
    let mut ext = Vec::with_capacity(n + 2 * edge);
    ext.extend((1..=edge).rev().map(|i| 2.0 * first - data[i]));
    ext.extend_from_slice(data);
    ext.extend((1..=edge).map(|i| 2.0 * last - data[n - 1 - i]));
    ext
}

/// Zero-phase Butterworth filtering followed by clipping negatives to zero.
pub fn butter_filter(data: &[f64], lowcut: f64, highcut: f64, fs: f64, order: usize) -> Result<Vec<f64>> {
    let sos = butterworth_sos(order, Band::from_cutoffs(lowcut, highcut), fs)?;
    let mut filtered = sos.filtfilt(data)?;
    for v in filtered.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
    Ok(filtered)
}

/// [`butter_filter`] over a timestamped signal, using its own sampling rate.
pub fn bandpass_filter(signal: TimeSeries, lowcut: f64, highcut: f64, order: usize) -> Result<TimeSeries> {
    let data = butter_filter(&signal.data, lowcut, highcut, signal.fs, order)?;
    Ok(TimeSeries { data, ..signal })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const FS: f64 = 50.0;

    impl Sos {
        /// Magnitude of the frequency response at `freq` Hz.
        fn frequency_response(&self, freq: f64, fs: f64) -> f64 {
            let w = 2.0 * PI * freq / fs;
            let z1 = Complex64::from_polar(1.0, -w);
            let z2 = z1 * z1;
            self.sections
                .iter()
                .map(|s| {
                    let num = s[0] + z1 * s[1] + z2 * s[2];
                    let den = s[3] + z1 * s[4] + z2 * s[5];
                    num / den
                })
                .product::<Complex64>()
                .norm()
        }
    }

    #[test]
    fn lowpass_is_half_power_at_cutoff() {
        let sos = butterworth_sos(5, Band::LowPass { highcut: 2.5 }, FS).unwrap();
        assert_eq!(sos.len(), 3);
        assert!((sos.frequency_response(0.0, FS) - 1.0).abs() < 1e-9);
        assert!((sos.frequency_response(2.5, FS) - 0.5f64.sqrt()).abs() < 1e-6);
        assert!(sos.frequency_response(10.0, FS) < 1e-3);
    }

    #[test]
    fn bandpass_edges_and_centre() {
        let (low, high) = (1.0 / 60.0, 2.5);
        let sos = butterworth_sos(5, Band::BandPass { lowcut: low, highcut: high }, FS).unwrap();
        assert_eq!(sos.len(), 5);
        let half = 0.5f64.sqrt();
        assert!((sos.frequency_response(low, FS) - half).abs() < 1e-4);
        assert!((sos.frequency_response(high, FS) - half).abs() < 1e-4);
        let centre = FS / PI * ((PI * low / FS).tan() * (PI * high / FS).tan()).sqrt().atan();
        assert!((sos.frequency_response(centre, FS) - 1.0).abs() < 1e-4);
        assert!(sos.frequency_response(0.0, FS) < 1e-9);
    }

    #[test]
    fn lowpass_has_no_phase_lag() {
        let data: Vec<f64> = (0..1000)
            .map(|i| 2.0 + (2.0 * PI * 1.0 * i as f64 / FS).sin())
            .collect();
        let out = butter_filter(&data, 0.0, 2.5, FS, 5).unwrap();
        assert_eq!(out.len(), data.len());
        for i in 200..800 {
            assert!((out[i] - data[i]).abs() < 1e-2, "sample {i}: {} vs {}", out[i], data[i]);
        }
    }

    #[test]
    fn output_matches_length_and_is_rectified() {
        let mut rng = StdRng::seed_from_u64(7);
        let data: Vec<f64> = (0..2000).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let out = butter_filter(&data, 0.5, 5.0, FS, 4).unwrap();
        assert_eq!(out.len(), data.len());
        assert!(out.iter().all(|v| *v >= 0.0));
        assert!(out.iter().any(|v| *v > 0.0));
    }

    #[test]
    fn constant_input_is_removed_by_bandpass() {
        let data = vec![1.0; 3000];
        let out = butter_filter(&data, 1.0 / 60.0, 2.5, FS, 5).unwrap();
        assert!(out.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn rejects_bad_bands() {
        for (low, high) in [(3.0, 2.5), (2.5, 2.5), (0.5, 25.0), (0.5, 30.0), (-1.0, 2.0)] {
            assert!(
                matches!(butter_filter(&[0.0; 100], low, high, FS, 5), Err(AnalysisError::InvalidParameter(_))),
                "({low}, {high}) accepted"
            );
        }
        assert!(butter_filter(&[0.0; 100], 0.0, 2.5, FS, 0).is_err());
    }

    #[test]
    fn short_input_is_insufficient() {
        let sos = butterworth_sos(5, Band::LowPass { highcut: 2.5 }, FS).unwrap();
        let short = vec![1.0; sos.pad_len()];
        assert!(matches!(sos.filtfilt(&short), Err(AnalysisError::InsufficientData(_))));
    }
}
