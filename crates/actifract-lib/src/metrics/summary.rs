use crate::{
    error::{AnalysisError, Result},
    metrics::evolution::windows,
    signal::CountsSeries,
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One day of one-minute epochs.
pub const MINUTES_PER_DAY: usize = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    /// Number of complete days summed.
    pub days: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

/// Mean and standard deviation of daily count totals.
///
/// Days are consecutive runs of `epochs_per_day` values from the start of the
/// series; a trailing partial day is ignored.
pub fn daily_mean_std(series: &CountsSeries, epochs_per_day: usize) -> Result<DailyStats> {
    if epochs_per_day == 0 {
        return Err(AnalysisError::invalid("epochs_per_day must be positive"));
    }
    let totals: Vec<f64> = series
        .counts()
        .chunks_exact(epochs_per_day)
        .map(|day| day.iter().sum())
        .collect();
    if totals.is_empty() {
        return Err(AnalysisError::insufficient(format!(
            "{} epochs do not cover one day of {epochs_per_day}",
            series.len()
        )));
    }
    let n = totals.len() as f64;
    let mean = totals.iter().sum::<f64>() / n;
    let std = (totals.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n).sqrt();
    Ok(DailyStats {
        days: totals.len(),
        mean,
        std,
    })
}

/// Total counts inside each evolution window, aligned with the window ends
/// reported by the complexity sweep.
pub fn sliding_window_activity(
    series: &CountsSeries,
    width: Duration,
    step: Duration,
) -> Result<(Vec<f64>, Vec<NaiveDateTime>)> {
    let (Some(first), Some(last)) = (series.first_timestamp(), series.last_timestamp()) else {
        return Ok((Vec::new(), Vec::new()));
    };
    let windows = windows(first, last, width, step)?;
    let sums = windows
        .iter()
        .map(|w| series.slice(w.start, w.end).iter().sum())
        .collect();
    let ends = windows.iter().map(|w| w.end).collect();
    Ok((sums, ends))
}

/// Every `stride`-th value, starting with the first.
pub fn sample_every(values: &[f64], stride: usize) -> Vec<f64> {
    values.iter().step_by(stride.max(1)).copied().collect()
}

/// Pearson correlation; NaN when either side is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(AnalysisError::invalid(format!(
            "correlation needs equal lengths, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(AnalysisError::insufficient("correlation needs at least two pairs"));
    }
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    Ok(sxy / (sxx * syy).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn minutes(counts: Vec<f64>) -> CountsSeries {
        let t0 = NaiveDate::from_ymd_opt(2020, 9, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timestamps = (0..counts.len())
            .map(|i| t0 + Duration::minutes(i as i64))
            .collect();
        CountsSeries::new(timestamps, counts).unwrap()
    }

    #[test]
    fn partial_day_is_ignored() {
        let mut counts = vec![1.0; MINUTES_PER_DAY];
        counts.extend(vec![3.0; MINUTES_PER_DAY]);
        counts.extend(vec![100.0; 600]);
        let stats = daily_mean_std(&minutes(counts), MINUTES_PER_DAY).unwrap();
        assert_eq!(stats.days, 2);
        assert_eq!(stats.mean, 2.0 * MINUTES_PER_DAY as f64);
        assert_eq!(stats.std, MINUTES_PER_DAY as f64);
    }

    #[test]
    fn less_than_a_day_is_insufficient() {
        let series = minutes(vec![1.0; 100]);
        assert!(matches!(
            daily_mean_std(&series, MINUTES_PER_DAY),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn window_sums_line_up_with_window_ends() {
        let series = minutes((0..10).map(|v| v as f64).collect());
        let (sums, ends) =
            sliding_window_activity(&series, Duration::minutes(4), Duration::minutes(2)).unwrap();
        assert_eq!(sums, vec![6.0, 14.0, 22.0]);
        assert_eq!(ends[0], series.timestamps()[4]);
        assert_eq!(ends.len(), sums.len());
    }

    #[test]
    fn correlation_of_linear_relation_is_one() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < 1e-12);
        assert!(pearson(&x, &[1.0; 4]).unwrap().is_nan());
        assert!(pearson(&x, &y[..3]).is_err());
        assert_eq!(sample_every(&[1.0, 2.0, 3.0, 4.0, 5.0], 2), vec![1.0, 3.0, 5.0]);
    }
}
