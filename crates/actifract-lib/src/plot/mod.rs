//! Renderer-agnostic figure descriptions for the analysis results.

use crate::error::Result;
use crate::metrics::{AllometricFit, Evolution, MultiScaleFit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

impl Axis {
    fn labelled(label: &str) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

/// `0xRRGGBB`
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(PointSeries),
    Scatter(PointSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(s) | Series::Scatter(s) => &s.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over all finite points.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut finite = self
            .series
            .iter()
            .flat_map(|s| s.points().iter())
            .filter(|p| p[0].is_finite() && p[1].is_finite());
        let first = finite.next()?;
        Some(finite.fold(
            (first[0], first[0], first[1], first[1]),
            |(x0, x1, y0, y1), p| (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1])),
        ))
    }
}

/// Keep at most `max_points` evenly spaced points.
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    (0..max_points)
        .map(|i| (i as f64 * bucket_size).floor() as usize)
        .take_while(|&start| start < points.len())
        .map(|start| points[start])
        .collect()
}

fn line(name: &str, points: Vec<[f64; 2]>, color: u32) -> Series {
    Series::Line(PointSeries {
        name: name.into(),
        points,
        style: Style {
            width: 1.6,
            color: Color(color),
        },
    })
}

fn scatter(name: &str, points: Vec<[f64; 2]>, color: u32) -> Series {
    Series::Scatter(PointSeries {
        name: name.into(),
        points,
        style: Style {
            width: 3.0,
            color: Color(color),
        },
    })
}

/// Local fractal dimension against scale, one-minute epochs shown in hours.
pub fn figure_dimension_across_scales(fit: &MultiScaleFit) -> Figure {
    let points = fit
        .scales
        .iter()
        .zip(&fit.dimensions)
        .map(|(n, d)| [*n as f64 / 60.0, *d])
        .collect();
    let mut fig = Figure::new(Some("Fractal dimension across scales".into()));
    fig.x = Axis::labelled("scale (hours)");
    fig.y = Axis::labelled("D");
    fig.add_series(line("D", points, 0x1F77B4));
    fig
}

/// Dimension at one scale over time, x in hours since the first window end.
pub fn figure_evolution_track(evolution: &Evolution, scale_index: usize, max_points: usize) -> Result<Figure> {
    let track = evolution.track(scale_index)?;
    let points: Vec<[f64; 2]> = match evolution.end_timestamps.first() {
        Some(first) => evolution
            .end_timestamps
            .iter()
            .zip(track)
            .map(|(ts, d)| [(*ts - *first).num_seconds() as f64 / 3600.0, d])
            .collect(),
        None => Vec::new(),
    };
    let scale = evolution.scales[scale_index];
    let mut fig = Figure::new(Some(format!("Fractal dimension at {scale} min")));
    fig.x = Axis::labelled("time since first window (hours)");
    fig.y = Axis::labelled("D");
    fig.add_series(line("D", decimate_points(&points, max_points), 0xD62728));
    Ok(fig)
}

/// `ln var` against `ln mean` for the fixed-block fit, with its regression line.
pub fn figure_loglog_fixed(fit: &AllometricFit) -> Figure {
    let observed = log_pairs(&fit.means, &fit.variances);
    let fitted = observed
        .iter()
        .map(|p| [p[0], fit.intercept + fit.slope * p[0]])
        .collect();
    loglog("Allometric scaling", observed, fitted)
}

/// `ln var` against `ln mean` for the multi-scale fit, with its cubic.
pub fn figure_loglog_multi(fit: &MultiScaleFit) -> Figure {
    let observed = log_pairs(&fit.means, &fit.variances);
    let fitted = observed.iter().map(|p| [p[0], fit.fitted(p[0])]).collect();
    loglog("Allometric scaling (multi-scale)", observed, fitted)
}

fn log_pairs(means: &[f64], variances: &[f64]) -> Vec<[f64; 2]> {
    means
        .iter()
        .zip(variances)
        .map(|(m, v)| [m.ln(), v.ln()])
        .collect()
}

fn loglog(title: &str, observed: Vec<[f64; 2]>, fitted: Vec<[f64; 2]>) -> Figure {
    let mut fig = Figure::new(Some(title.into()));
    fig.x = Axis::labelled("ln mean");
    fig.y = Axis::labelled("ln variance");
    fig.add_series(scatter("observed", observed, 0x2CA02C));
    fig.add_series(line("fit", fitted, 0x333333));
    fig
}
