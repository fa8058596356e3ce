//! TOML analysis configuration.
//!
//! ```toml
//! [pipeline]
//! metric = "magnitude"
//! lowcut_hz = 0.016666
//! highcut_hz = 2.5
//! epoch = "1S"
//! interval = "1T"
//!
//! [evolution]
//! width = "3 days"
//! step = "5 min"
//! n_min = 1
//! n_max = 1440
//! ```
//!
//! Every field is optional and falls back to the reference parameters.

use crate::{
    metrics::{allometric::DEFAULT_SPREAD, evolution::EvolutionConfig},
    preprocess::{aggregate::Column, aggregate::Metric, pipeline::CountsPipelineConfig},
    timebase::parse_duration,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub pipeline: PipelineSection,
    pub evolution: EvolutionSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub metric: Metric,
    pub column: Column,
    pub fs: f64,
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
    pub order: usize,
    pub epoch: String,
    pub interval: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        let reference = CountsPipelineConfig::default();
        Self {
            metric: reference.metric,
            column: reference.column,
            fs: reference.fs,
            lowcut_hz: reference.lowcut_hz,
            highcut_hz: reference.highcut_hz,
            order: reference.order,
            epoch: "1S".into(),
            interval: "1T".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvolutionSection {
    pub width: String,
    pub step: String,
    pub n_min: usize,
    pub n_max: usize,
    pub spread_factor: f64,
}

impl Default for EvolutionSection {
    fn default() -> Self {
        Self {
            width: "3 days".into(),
            step: "5 min".into(),
            n_min: 1,
            n_max: 1440,
            spread_factor: DEFAULT_SPREAD,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn pipeline_config(&self) -> Result<CountsPipelineConfig> {
        let p = &self.pipeline;
        let cfg = CountsPipelineConfig {
            metric: p.metric,
            column: p.column,
            fs: p.fs,
            lowcut_hz: p.lowcut_hz,
            highcut_hz: p.highcut_hz,
            order: p.order,
            ..CountsPipelineConfig::default()
        };
        Ok(cfg.with_durations(&p.epoch, &p.interval)?)
    }

    pub fn evolution_config(&self) -> Result<EvolutionConfig> {
        let e = &self.evolution;
        Ok(EvolutionConfig {
            width: parse_duration(&e.width)?,
            step: parse_duration(&e.step)?,
            n_min: e.n_min,
            n_max: e.n_max,
            spread: e.spread_factor,
        })
    }
}
