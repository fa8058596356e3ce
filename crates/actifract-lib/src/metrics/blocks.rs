//! Block aggregation shared by both allometric estimators.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// A block length together with the stride between block starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationScale {
    pub n: usize,
    pub step: usize,
}

impl AggregationScale {
    /// Blocks advanced by `max(1, n / 16)`, giving roughly sixteen times as
    /// many (overlapping) blocks as tiling would.
    pub fn overlapping(n: usize) -> Self {
        Self {
            n,
            step: (n / 16).max(1),
        }
    }
}

/// Running totals of a series, so any block sum is one subtraction.
///
/// Built once per series and shared by every scale.
#[derive(Debug, Clone)]
pub struct CumulativeSums {
    /// `totals[i]` is the sum of the first `i` samples.
    totals: Vec<f64>,
}

impl CumulativeSums {
    pub fn new(data: &[f64]) -> Self {
        let mut totals = Vec::with_capacity(data.len() + 1);
        let mut acc = 0.0;
        totals.push(acc);
        for v in data {
            acc += v;
            totals.push(acc);
        }
        Self { totals }
    }

    pub fn len(&self) -> usize {
        self.totals.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of samples `start..end`, both clipped to the series.
    pub fn range(&self, start: usize, end: usize) -> f64 {
        let end = end.min(self.len());
        let start = start.min(end);
        self.totals[end] - self.totals[start]
    }
}

/// Sums over consecutive blocks of a series.
///
/// Blocks are clipped at the end of the data, so the last block of a tiling
/// may be short, and with overlap the last start may sit up to `step`
/// samples past the final full block.
#[derive(Debug, Clone)]
pub struct BlockSums<'a> {
    sums: &'a CumulativeSums,
    len: usize,
    step: usize,
    next: usize,
    /// Exclusive bound on block starts.
    bound: usize,
}

impl<'a> BlockSums<'a> {
    /// Non-overlapping blocks of `n` covering the whole series; starts `i < len`.
    pub fn tiling(sums: &'a CumulativeSums, n: usize) -> Self {
        Self {
            sums,
            len: n,
            step: n.max(1),
            next: 0,
            bound: sums.len(),
        }
    }

    /// Blocks of `scale.n` starting every `scale.step`, while
    /// `i <= len - n + step`.
    pub fn overlapping(sums: &'a CumulativeSums, scale: AggregationScale) -> Self {
        let step = scale.step.max(1);
        let bound = (sums.len() + step + 1).saturating_sub(scale.n);
        Self {
            sums,
            len: scale.n,
            step,
            next: 0,
            bound,
        }
    }
}

impl Iterator for BlockSums<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.next >= self.bound {
            return None;
        }
        let start = self.next;
        self.next += self.step;
        Some(self.sums.range(start, start + self.len))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bound.saturating_sub(self.next).div_ceil(self.step);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BlockSums<'_> {}

/// Population mean and variance of block sums; `None` when there are none.
pub fn mean_variance(sums: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let sums: Vec<f64> = sums.collect();
    if sums.is_empty() {
        return None;
    }
    let n = sums.len() as f64;
    let mean = sums.iter().sum::<f64>() / n;
    let var = sums.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    Some((mean, var))
}

/// Geometric ladder of block lengths from `n_min` up to `n_max`.
///
/// Each length is `ceil(previous * spread)`, bumped by one whenever rounding
/// would repeat a value. A fresh ladder can be cloned to replay the sequence.
#[derive(Debug, Clone)]
pub struct ScaleLadder {
    next: usize,
    n_max: usize,
    spread: f64,
}

impl ScaleLadder {
    pub fn new(n_min: usize, n_max: usize, spread: f64) -> Result<Self> {
        if n_min == 0 {
            return Err(AnalysisError::invalid("n_min must be positive"));
        }
        if n_max < n_min {
            return Err(AnalysisError::invalid(format!(
                "n_max ({n_max}) must be at least n_min ({n_min})"
            )));
        }
        if !(spread > 1.0 && spread.is_finite()) {
            return Err(AnalysisError::invalid(format!(
                "spread factor must be finite and > 1, got {spread}"
            )));
        }
        Ok(Self {
            next: n_min,
            n_max,
            spread,
        })
    }
}

impl Iterator for ScaleLadder {
    type Item = AggregationScale;

    fn next(&mut self) -> Option<AggregationScale> {
        if self.next > self.n_max {
            return None;
        }
        let n = self.next;
        let grown = (n as f64 * self.spread).ceil() as usize;
        self.next = grown.max(n + 1);
        Some(AggregationScale::overlapping(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiling_keeps_short_final_block() {
        let data = CumulativeSums::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let sums: Vec<f64> = BlockSums::tiling(&data, 3).collect();
        assert_eq!(sums, vec![6.0, 15.0, 7.0]);
        assert_eq!(BlockSums::tiling(&data, 3).len(), 3);
    }

    #[test]
    fn overlapping_blocks_may_under_run_by_one_step() {
        // starts 0..=7 for n = 4, step = 1 over ten samples; the last block
        // only sees three samples
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let data = CumulativeSums::new(&values);
        let scale = AggregationScale { n: 4, step: 1 };
        let sums: Vec<f64> = BlockSums::overlapping(&data, scale).collect();
        assert_eq!(sums.len(), 8);
        assert_eq!(sums[0], 10.0);
        assert_eq!(sums[6], 7.0 + 8.0 + 9.0 + 10.0);
        assert_eq!(sums[7], 8.0 + 9.0 + 10.0);
    }

    #[test]
    fn overlapping_unit_blocks_end_with_an_empty_block() {
        let data = CumulativeSums::new(&[2.0, 4.0, 6.0]);
        let sums: Vec<f64> = BlockSums::overlapping(&data, AggregationScale::overlapping(1)).collect();
        assert_eq!(sums, vec![2.0, 4.0, 6.0, 0.0]);
    }

    #[test]
    fn block_sums_match_direct_sums() {
        let values: Vec<f64> = (0..300).map(|i| ((i * 37) % 11) as f64 + 0.25).collect();
        let data = CumulativeSums::new(&values);
        let scale = AggregationScale::overlapping(40);
        let direct: Vec<f64> = (0..)
            .step_by(scale.step)
            .take_while(|i| *i <= values.len() - scale.n + scale.step)
            .map(|i| values[i..(i + scale.n).min(values.len())].iter().sum::<f64>())
            .collect();
        let fast: Vec<f64> = BlockSums::overlapping(&data, scale).collect();
        assert_eq!(fast.len(), direct.len());
        assert!(fast.iter().zip(&direct).all(|(a, b)| (a - b).abs() < 1e-9));
        assert_eq!(data.range(290, 1000), values[290..].iter().sum::<f64>());
    }

    #[test]
    fn overlapping_stride_is_a_sixteenth() {
        assert_eq!(AggregationScale::overlapping(15).step, 1);
        assert_eq!(AggregationScale::overlapping(64).step, 4);
        assert_eq!(AggregationScale::overlapping(100).step, 6);
    }

    #[test]
    fn no_blocks_when_series_is_too_short() {
        let data = CumulativeSums::new(&[1.0; 5]);
        let scale = AggregationScale::overlapping(32);
        assert_eq!(BlockSums::overlapping(&data, scale).count(), 0);
        assert!(mean_variance(BlockSums::overlapping(&data, scale)).is_none());
    }

    #[test]
    fn ladder_is_strictly_increasing_and_bounded() {
        let scales: Vec<usize> = ScaleLadder::new(3, 2000, 1.1).unwrap().map(|s| s.n).collect();
        assert_eq!(&scales[..5], &[3, 4, 5, 6, 7]);
        assert!(scales.windows(2).all(|w| w[0] < w[1]));
        assert!(scales.iter().all(|n| (3..=2000).contains(n)));
        let tight: Vec<usize> = ScaleLadder::new(5, 5, 1.1).unwrap().map(|s| s.n).collect();
        assert_eq!(tight, vec![5]);
    }

    #[test]
    fn ladder_rejects_bad_parameters() {
        assert!(ScaleLadder::new(0, 10, 1.1).is_err());
        assert!(ScaleLadder::new(10, 5, 1.1).is_err());
        assert!(ScaleLadder::new(1, 10, 1.0).is_err());
    }

    #[test]
    fn population_variance() {
        let (mean, var) = mean_variance([1.0, 2.0, 3.0, 4.0].into_iter()).unwrap();
        assert_eq!(mean, 2.5);
        assert_eq!(var, 1.25);
    }
}
