use crate::error::{AnalysisError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One raw accelerometer reading, accelerations in g.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp: NaiveDateTime,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Column layout of a raw recording.
///
/// Aggregation takes this by value: once the axes are folded into a scalar
/// signal they are gone.
#[derive(Debug, Clone, Default)]
pub struct AxisTriplet {
    pub timestamps: Vec<NaiveDateTime>,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
}

impl AxisTriplet {
    pub fn from_samples(samples: Vec<RawSample>) -> Self {
        let n = samples.len();
        let mut out = Self {
            timestamps: Vec::with_capacity(n),
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
        };
        for s in samples {
            out.timestamps.push(s.timestamp);
            out.x.push(s.x);
            out.y.push(s.y);
            out.z.push(s.z);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Timestamped scalar signal sampled at a nominal uniform rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Nominal sampling frequency in Hz
    pub fs: f64,
    pub timestamps: Vec<NaiveDateTime>,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Activity counts, one value per epoch, keyed by the epoch start.
///
/// Timestamps are strictly increasing and pair one-to-one with counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountsSeries {
    timestamps: Vec<NaiveDateTime>,
    counts: Vec<f64>,
}

impl CountsSeries {
    pub fn new(timestamps: Vec<NaiveDateTime>, counts: Vec<f64>) -> Result<Self> {
        if timestamps.len() != counts.len() {
            return Err(AnalysisError::invalid(format!(
                "{} timestamps but {} counts",
                timestamps.len(),
                counts.len()
            )));
        }
        if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(AnalysisError::invalid(format!(
                "epoch timestamps must be strictly increasing, {} follows {}",
                timestamps[pos + 1],
                timestamps[pos]
            )));
        }
        Ok(Self { timestamps, counts })
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn into_counts(self) -> Vec<f64> {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// Counts with timestamps in `[start, end)`.
    pub fn slice(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[f64] {
        let lo = self.timestamps.partition_point(|t| *t < start);
        let hi = self.timestamps.partition_point(|t| *t < end);
        &self.counts[lo..hi.max(lo)]
    }
}
