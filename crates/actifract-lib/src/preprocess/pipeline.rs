use crate::{
    error::Result,
    preprocess::{
        aggregate::{aggregate, Column, Metric},
        counts::{aggregate_counts, calculate_counts},
        filter::{bandpass_filter, DEFAULT_ORDER},
    },
    signal::{AxisTriplet, CountsSeries, RawSample},
    timebase::parse_duration,
};
use chrono::Duration;
use log::{debug, info};

/// Configurable parameters for the raw-acceleration to counts transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountsPipelineConfig {
    /// How the three axes are combined.
    pub metric: Metric,
    /// Column passed to the count encoder.
    pub column: Column,
    /// Nominal sampling rate of the recording (Hz).
    pub fs: f64,
    /// High-pass edge (Hz); zero selects a pure low-pass.
    pub lowcut_hz: f64,
    /// Low-pass edge (Hz).
    pub highcut_hz: f64,
    /// Butterworth order.
    pub order: usize,
    /// Epoch over which filtered samples are averaged.
    pub epoch: Duration,
    /// Interval over which epoch counts are summed.
    pub interval: Duration,
}

impl Default for CountsPipelineConfig {
    /// The reference Actigraph-style parameters.
    fn default() -> Self {
        Self {
            metric: Metric::Magnitude,
            column: Column::R,
            fs: 50.0,
            lowcut_hz: 1.0 / 60.0,
            highcut_hz: 2.5,
            order: DEFAULT_ORDER,
            epoch: Duration::seconds(1),
            interval: Duration::minutes(1),
        }
    }
}

impl CountsPipelineConfig {
    /// Build from duration strings such as `"1S"` and `"1 min"`.
    pub fn with_durations(mut self, epoch: &str, interval: &str) -> Result<Self> {
        self.epoch = parse_duration(epoch)?;
        self.interval = parse_duration(interval)?;
        Ok(self)
    }
}

/// Approximation of the Actigraph counts algorithm: vector magnitude,
/// 1/60–2.5 Hz band-pass at 50 Hz, 1 s counts summed per minute.
pub fn run_actigraph_pipeline(samples: Vec<RawSample>) -> Result<CountsSeries> {
    run_counts_pipeline(samples, &CountsPipelineConfig::default())
}

/// Run aggregation, zero-phase filtering and count encoding with `cfg`.
pub fn run_counts_pipeline(samples: Vec<RawSample>, cfg: &CountsPipelineConfig) -> Result<CountsSeries> {
    let n_samples = samples.len();
    let axes = AxisTriplet::from_samples(samples);
    let aggregated = aggregate(axes, cfg.metric, cfg.fs)?;
    debug!("aggregated {} samples with {:?}", aggregated.r.len(), cfg.metric);

    let signal = aggregated.into_column(cfg.column)?;
    let filtered = bandpass_filter(signal, cfg.lowcut_hz, cfg.highcut_hz, cfg.order)?;
    debug!(
        "filtered {:.4}-{:.4} Hz, order {}",
        cfg.lowcut_hz, cfg.highcut_hz, cfg.order
    );

    let epochs = calculate_counts(&filtered, cfg.epoch)?;
    let counts = aggregate_counts(&epochs, cfg.interval)?;
    info!(
        "{} raw samples -> {} epochs -> {} intervals",
        n_samples,
        epochs.len(),
        counts.len()
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::f64::consts::PI;

    fn recording(n: usize, z: impl Fn(usize) -> f32) -> Vec<RawSample> {
        let t0 = NaiveDate::from_ymd_opt(2020, 2, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| RawSample {
                timestamp: t0 + Duration::milliseconds(20 * i as i64),
                x: 0.0,
                y: 0.0,
                z: z(i),
            })
            .collect()
    }

    #[test]
    fn resting_device_produces_no_counts() {
        let samples = recording(3000, |_| 1.0);
        let counts = run_actigraph_pipeline(samples).unwrap();
        assert_eq!(counts.len(), 1);
        assert!(counts.counts().iter().all(|c| c.abs() < 1e-6));
    }

    #[test]
    fn epoch_counts_of_resting_device_are_zero() {
        let cfg = CountsPipelineConfig {
            interval: Duration::seconds(1),
            ..CountsPipelineConfig::default()
        };
        let counts = run_counts_pipeline(recording(3000, |_| 1.0), &cfg).unwrap();
        assert_eq!(counts.len(), 60);
        assert!(counts.counts().iter().all(|c| c.abs() < 1e-6));
    }

    #[test]
    fn movement_produces_counts() {
        let samples = recording(3000, |i| 1.0 + 0.5 * (2.0 * PI * 1.0 * i as f64 / 50.0).sin() as f32);
        let counts = run_actigraph_pipeline(samples).unwrap();
        assert!(counts.counts()[0] > 100.0);
    }

    #[test]
    fn enmo_column_requires_enmo_metric() {
        let cfg = CountsPipelineConfig {
            column: Column::Enmo,
            ..CountsPipelineConfig::default()
        };
        assert!(run_counts_pipeline(recording(3000, |_| 1.0), &cfg).is_err());
    }

    #[test]
    fn duration_strings_override_defaults() {
        let cfg = CountsPipelineConfig::default()
            .with_durations("5S", "15 min")
            .unwrap();
        assert_eq!(cfg.epoch, Duration::seconds(5));
        assert_eq!(cfg.interval, Duration::minutes(15));
    }
}
