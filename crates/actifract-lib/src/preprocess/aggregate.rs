use crate::error::{AnalysisError, Result};
use crate::signal::{AxisTriplet, TimeSeries};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the three axes are folded into one scalar per timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Vector magnitude minus 1 g, clipped at zero.
    Enmo,
    /// Vector magnitude with gravity still in it.
    Magnitude,
    /// Magnitude of the per-axis first differences.
    Diff,
}

impl FromStr for Metric {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "enmo" => Ok(Metric::Enmo),
            "magnitude" => Ok(Metric::Magnitude),
            "diff" => Ok(Metric::Diff),
            other => Err(AnalysisError::invalid(format!(
                "unknown aggregation metric {other:?}"
            ))),
        }
    }
}

/// Which aggregated column feeds the count encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Column {
    R,
    Enmo,
}

/// Output of [`aggregate`]: the vector magnitude `R`, plus `ENMO` in enmo mode.
#[derive(Debug, Clone)]
pub struct Aggregated {
    pub r: TimeSeries,
    pub enmo: Option<TimeSeries>,
}

impl Aggregated {
    pub fn into_column(self, column: Column) -> Result<TimeSeries> {
        match column {
            Column::R => Ok(self.r),
            Column::Enmo => self
                .enmo
                .ok_or_else(|| AnalysisError::invalid("ENMO column requires the enmo metric")),
        }
    }
}

/// Fold X/Y/Z into a scalar signal, consuming the raw axes.
pub fn aggregate(axes: AxisTriplet, metric: Metric, fs: f64) -> Result<Aggregated> {
    let AxisTriplet {
        mut timestamps,
        x,
        y,
        z,
    } = axes;
    if x.len() != timestamps.len() || y.len() != timestamps.len() || z.len() != timestamps.len() {
        return Err(AnalysisError::invalid(format!(
            "axis lengths differ: t={} x={} y={} z={}",
            timestamps.len(),
            x.len(),
            y.len(),
            z.len()
        )));
    }

    let r: Vec<f64> = match metric {
        Metric::Enmo | Metric::Magnitude => x
            .iter()
            .zip(&y)
            .zip(&z)
            .map(|((&x, &y), &z)| magnitude(x as f64, y as f64, z as f64))
            .collect(),
        Metric::Diff => {
            if !timestamps.is_empty() {
                timestamps.remove(0);
            }
            x.windows(2)
                .zip(y.windows(2))
                .zip(z.windows(2))
                .map(|((dx, dy), dz)| {
                    magnitude(
                        (dx[1] - dx[0]) as f64,
                        (dy[1] - dy[0]) as f64,
                        (dz[1] - dz[0]) as f64,
                    )
                })
                .collect()
        }
    };

    let enmo = match metric {
        Metric::Enmo => Some(TimeSeries {
            fs,
            timestamps: timestamps.clone(),
            data: r.iter().map(|v| (v - 1.0).max(0.0)).collect(),
        }),
        _ => None,
    };

    Ok(Aggregated {
        r: TimeSeries {
            fs,
            timestamps,
            data: r,
        },
        enmo,
    })
}

fn magnitude(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}
