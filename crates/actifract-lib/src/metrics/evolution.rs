use crate::{
    error::{AnalysisError, Result},
    metrics::{
        allometric::{adapted_allometric_aggregation, MultiScaleFit, DEFAULT_SPREAD},
        blocks::ScaleLadder,
    },
    signal::CountsSeries,
};
use chrono::{Duration, NaiveDateTime};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Parameters of the sliding-window complexity sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvolutionConfig {
    pub width: Duration,
    pub step: Duration,
    pub n_min: usize,
    pub n_max: usize,
    pub spread: f64,
}

impl EvolutionConfig {
    pub fn new(width: Duration, step: Duration, n_min: usize, n_max: usize) -> Self {
        Self {
            width,
            step,
            n_min,
            n_max,
            spread: DEFAULT_SPREAD,
        }
    }
}

/// Half-open analysis window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Fractal dimensions over time.
///
/// Row `i` of `dimensions` belongs to the window ending at
/// `end_timestamps[i]`; column `j` to `scales[j]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evolution {
    pub dimensions: Vec<Vec<f64>>,
    pub end_timestamps: Vec<NaiveDateTime>,
    pub scales: Vec<usize>,
}

impl Evolution {
    pub fn len(&self) -> usize {
        self.end_timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.end_timestamps.is_empty()
    }

    /// Dimension over time at one scale index.
    pub fn track(&self, scale_index: usize) -> Result<Vec<f64>> {
        if scale_index >= self.scales.len() {
            return Err(AnalysisError::invalid(format!(
                "scale index {scale_index} out of range ({} scales)",
                self.scales.len()
            )));
        }
        Ok(self.dimensions.iter().map(|row| row[scale_index]).collect())
    }
}

/// Complete windows of `width` advanced by `step` from `first`, kept while
/// the window end does not pass `last`.
pub fn windows(first: NaiveDateTime, last: NaiveDateTime, width: Duration, step: Duration) -> Result<Vec<Window>> {
    check_stride(width, step)?;
    let mut out = Vec::new();
    let mut start = first;
    while start + width <= last {
        out.push(Window {
            start,
            end: start + width,
        });
        start += step;
    }
    Ok(out)
}

fn check_stride(width: Duration, step: Duration) -> Result<()> {
    if width <= Duration::zero() {
        return Err(AnalysisError::invalid(format!("window width must be positive, got {width}")));
    }
    if step <= Duration::zero() {
        return Err(AnalysisError::invalid(format!("window step must be positive, got {step}")));
    }
    Ok(())
}

/// Slide a window over `series` and run the multi-scale estimator on each.
///
/// Windows are independent; with the `parallel` feature they are analysed on
/// the rayon pool and collected back in start order. No complete window is
/// an empty result, not an error.
pub fn sweep(series: &CountsSeries, cfg: &EvolutionConfig) -> Result<Evolution> {
    let scales: Vec<usize> = ScaleLadder::new(cfg.n_min, cfg.n_max, cfg.spread)?
        .map(|s| s.n)
        .collect();
    check_stride(cfg.width, cfg.step)?;
    let windows = match (series.first_timestamp(), series.last_timestamp()) {
        (Some(first), Some(last)) => windows(first, last, cfg.width, cfg.step)?,
        _ => Vec::new(),
    };
    debug!(
        "sweeping {} windows of {} over {} counts",
        windows.len(),
        cfg.width,
        series.len()
    );

    let analyse = |w: &Window| -> Result<MultiScaleFit> {
        adapted_allometric_aggregation(series.slice(w.start, w.end), cfg.n_min, cfg.n_max, cfg.spread)
    };
    #[cfg(feature = "parallel")]
    let fits: Vec<Result<MultiScaleFit>> = {
        use rayon::prelude::*;
        windows.par_iter().map(analyse).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let fits: Vec<Result<MultiScaleFit>> = windows.iter().map(analyse).collect();

    let mut dimensions = Vec::with_capacity(windows.len());
    let mut end_timestamps = Vec::with_capacity(windows.len());
    for (window, fit) in windows.iter().zip(fits) {
        match fit {
            Ok(fit) => {
                dimensions.push(fit.dimensions);
                end_timestamps.push(window.end);
            }
            Err(err) => {
                warn!("window ending {} failed: {}", window.end, err);
                return Err(err);
            }
        }
    }
    info!(
        "complexity evolution: {} windows x {} scales",
        end_timestamps.len(),
        scales.len()
    );
    Ok(Evolution {
        dimensions,
        end_timestamps,
        scales,
    })
}

/// [`sweep`] with the default spread factor.
pub fn complexity_evolution(
    series: &CountsSeries,
    width: Duration,
    step: Duration,
    n_min: usize,
    n_max: usize,
) -> Result<Evolution> {
    sweep(series, &EvolutionConfig::new(width, step, n_min, n_max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::synthetic_counts;
    use chrono::NaiveDate;

    fn day_of_counts(len: usize) -> CountsSeries {
        let start = NaiveDate::from_ymd_opt(2021, 4, 12)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        synthetic_counts(len, 0.5, 50.0, 10.0, start, 21).unwrap()
    }

    #[test]
    fn window_count_and_alignment() {
        let series = day_of_counts(1440);
        let width = Duration::hours(12);
        let step = Duration::minutes(30);
        let evo = complexity_evolution(&series, width, step, 1, 60).unwrap();
        // duration 1439 min: floor((1439 - 720) / 30) + 1
        assert_eq!(evo.len(), 24);
        assert_eq!(evo.dimensions.len(), evo.end_timestamps.len());
        assert_eq!(
            evo.end_timestamps[0],
            series.first_timestamp().unwrap() + width
        );
        assert!(evo.end_timestamps.windows(2).all(|w| w[1] - w[0] == step));
        assert!(evo.dimensions.iter().all(|row| row.len() == evo.scales.len()));
        assert!(evo.end_timestamps.last().unwrap() <= &series.last_timestamp().unwrap());
    }

    #[test]
    fn windows_hold_exactly_width_samples() {
        let series = day_of_counts(300);
        let first = series.first_timestamp().unwrap();
        let w = windows(first, series.last_timestamp().unwrap(), Duration::minutes(100), Duration::minutes(50))
            .unwrap();
        assert_eq!(w.len(), 4);
        assert!(w.iter().all(|w| series.slice(w.start, w.end).len() == 100));
    }

    #[test]
    fn series_shorter_than_width_gives_empty_result() {
        let series = day_of_counts(200);
        let evo = complexity_evolution(&series, Duration::days(1), Duration::minutes(5), 1, 60).unwrap();
        assert!(evo.is_empty());
        assert!(!evo.scales.is_empty());
    }

    #[test]
    fn window_matches_standalone_estimate() {
        let series = day_of_counts(720);
        let evo = complexity_evolution(&series, Duration::hours(6), Duration::hours(3), 1, 60).unwrap();
        let first = series.first_timestamp().unwrap();
        let direct = adapted_allometric_aggregation(
            series.slice(first, first + Duration::hours(6)),
            1,
            60,
            DEFAULT_SPREAD,
        )
        .unwrap();
        assert_eq!(evo.dimensions[0], direct.dimensions);
        assert_eq!(evo.scales, direct.scales);
        assert_eq!(evo.track(3).unwrap().len(), evo.len());
        assert!(evo.track(evo.scales.len()).is_err());
    }

    #[test]
    fn serializes_with_iso_end_timestamps() {
        let series = day_of_counts(360);
        let evo = complexity_evolution(&series, Duration::hours(4), Duration::hours(1), 1, 30).unwrap();
        let json = serde_json::to_value(&evo).unwrap();
        assert_eq!(json["end_timestamps"][0], "2021-04-12T04:00:00");
        assert_eq!(json["dimensions"].as_array().unwrap().len(), 2);
        assert_eq!(json["scales"][0], 1);
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let series = day_of_counts(100);
        assert!(matches!(
            complexity_evolution(&series, Duration::minutes(10), Duration::zero(), 1, 20),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }
}
