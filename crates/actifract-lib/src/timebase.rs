//! Calendar-aligned time bucketing and duration parsing.
//!
//! Bucket `k` covers `[origin + k * width, origin + (k + 1) * width)`, with the
//! origin fixed at midnight of the first sample's day. Whole-second and
//! whole-minute buckets therefore line up with wall-clock boundaries.

use crate::error::{AnalysisError, Result};
use chrono::{Duration, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBuckets {
    origin: NaiveDateTime,
    width_ns: i64,
}

/// How values falling in the same bucket are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    /// Arithmetic mean; an empty bucket is NaN.
    Mean,
    /// Sum; NaN members propagate and an empty bucket is NaN.
    Sum,
}

impl TimeBuckets {
    pub fn new(origin: NaiveDateTime, width: Duration) -> Result<Self> {
        let width_ns = width
            .num_nanoseconds()
            .filter(|ns| *ns > 0)
            .ok_or_else(|| AnalysisError::invalid(format!("bucket width must be positive, got {width}")))?;
        Ok(Self { origin, width_ns })
    }

    /// Buckets anchored at midnight of the day containing `first`.
    pub fn start_of_day(first: NaiveDateTime, width: Duration) -> Result<Self> {
        let origin = first
            .date()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AnalysisError::invalid("cannot derive midnight origin"))?;
        Self::new(origin, width)
    }

    pub fn index(&self, t: NaiveDateTime) -> Result<i64> {
        let offset = (t - self.origin).num_nanoseconds().ok_or_else(|| {
            AnalysisError::invalid(format!("timestamp {t} too far from bucket origin"))
        })?;
        Ok(offset.div_euclid(self.width_ns))
    }

    pub fn start(&self, index: i64) -> NaiveDateTime {
        self.origin + Duration::nanoseconds(index * self.width_ns)
    }

    /// Groups `(timestamp, value)` pairs into consecutive buckets.
    ///
    /// The output covers every bucket from the first sample's to the last
    /// sample's, including empty ones. Timestamps must be non-decreasing.
    pub fn resample(
        &self,
        timestamps: &[NaiveDateTime],
        values: &[f64],
        reduce: Reduce,
    ) -> Result<(Vec<NaiveDateTime>, Vec<f64>)> {
        if timestamps.len() != values.len() {
            return Err(AnalysisError::invalid(format!(
                "{} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(pos) = timestamps.windows(2).position(|w| w[1] < w[0]) {
            return Err(AnalysisError::invalid(format!(
                "timestamps out of order at sample {}: {} follows {}",
                pos + 1,
                timestamps[pos + 1],
                timestamps[pos]
            )));
        }
        let (first, last) = match (timestamps.first(), timestamps.last()) {
            (Some(first), Some(last)) => (self.index(*first)?, self.index(*last)?),
            _ => return Ok((Vec::new(), Vec::new())),
        };
        let n_buckets = (last - first + 1) as usize;
        let mut sums = vec![0.0; n_buckets];
        let mut members = vec![0usize; n_buckets];
        for (t, v) in timestamps.iter().zip(values) {
            let slot = (self.index(*t)? - first) as usize;
            sums[slot] += v;
            members[slot] += 1;
        }
        let starts = (first..=last).map(|k| self.start(k)).collect();
        let reduced = sums
            .into_iter()
            .zip(members)
            .map(|(sum, count)| match (count, reduce) {
                (0, _) => f64::NAN,
                (_, Reduce::Sum) => sum,
                (_, Reduce::Mean) => sum / count as f64,
            })
            .collect();
        Ok((starts, reduced))
    }
}

/// Parse durations such as `"3 days"`, `"5 min"`, `"1S"`, `"1T"` or `"250ms"`.
///
/// A missing magnitude means one unit (`"T"` is one minute).
pub fn parse_duration(text: &str) -> Result<Duration> {
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (magnitude, unit) = trimmed.split_at(split);
    let magnitude: f64 = if magnitude.is_empty() {
        1.0
    } else {
        magnitude
            .parse()
            .map_err(|_| AnalysisError::invalid(format!("bad duration magnitude in {text:?}")))?
    };
    let unit_ns: f64 = match unit.trim() {
        "ns" => 1.0,
        "us" | "µs" => 1e3,
        "ms" | "L" => 1e6,
        "S" | "s" | "sec" | "secs" | "second" | "seconds" => 1e9,
        "T" | "min" | "mins" | "minute" | "minutes" => 60e9,
        "H" | "h" | "hr" | "hour" | "hours" => 3_600e9,
        "D" | "d" | "day" | "days" => 86_400e9,
        "W" | "w" | "week" | "weeks" => 604_800e9,
        other => {
            return Err(AnalysisError::invalid(format!(
                "unknown duration unit {other:?} in {text:?}"
            )))
        }
    };
    Ok(Duration::nanoseconds((magnitude * unit_ns).round() as i64))
}
