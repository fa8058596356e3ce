use crate::error::Result;
use crate::signal::{CountsSeries, TimeSeries};
use crate::timebase::{Reduce, TimeBuckets};
use chrono::Duration;

/// Device resolution in g per count: a ±8 g range over a 10-bit converter.
pub const RESOLUTION: f64 = 16.0 / 1024.0;

/// Mean of `signal` per calendar-aligned epoch, expressed in counts.
///
/// Epochs inside the covered range that hold no sample come out as NaN.
pub fn calculate_counts(signal: &TimeSeries, epoch: Duration) -> Result<CountsSeries> {
    let Some(first) = signal.timestamps.first() else {
        return CountsSeries::new(Vec::new(), Vec::new());
    };
    let buckets = TimeBuckets::start_of_day(*first, epoch)?;
    let (timestamps, means) = buckets.resample(&signal.timestamps, &signal.data, Reduce::Mean)?;
    let counts = means.into_iter().map(|m| m / RESOLUTION).collect();
    CountsSeries::new(timestamps, counts)
}

/// Re-bin counts into coarser calendar-aligned intervals by summation.
pub fn aggregate_counts(series: &CountsSeries, interval: Duration) -> Result<CountsSeries> {
    let Some(first) = series.first_timestamp() else {
        return Ok(series.clone());
    };
    let buckets = TimeBuckets::start_of_day(first, interval)?;
    let (timestamps, sums) = buckets.resample(series.timestamps(), series.counts(), Reduce::Sum)?;
    CountsSeries::new(timestamps, sums)
}
