//! Engine configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir
//!    (~/.local/share/tally/config/engine.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Every key is optional; missing keys keep the `Default` value.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::feed::SortBy;
use crate::insights::Dimension;
use crate::scoring::IntervalMethod;
use crate::timeseries::{Metric, Period};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/engine.toml");

/// Trend generator settings
#[derive(Debug, Clone, PartialEq)]
pub struct TrendConfig {
    pub window: usize,
    pub min_history: usize,
    pub threshold_percent: f64,
    pub high_percent: f64,
    pub medium_percent: f64,
    pub metrics: Vec<Metric>,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 4,
            min_history: 1,
            threshold_percent: 15.0,
            high_percent: 35.0,
            medium_percent: 20.0,
            metrics: Metric::defaults().to_vec(),
        }
    }
}

/// Anomaly generator settings
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyConfig {
    pub sigma: f64,
    pub min_samples: usize,
    pub metrics: Vec<Metric>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            min_samples: 3,
            metrics: Metric::defaults().to_vec(),
        }
    }
}

/// Comparative generator settings
#[derive(Debug, Clone, PartialEq)]
pub struct ComparativeConfig {
    pub threshold_percent: f64,
    pub high_percent: f64,
    pub medium_percent: f64,
    pub min_group_size: usize,
    pub dimensions: Vec<Dimension>,
}

impl Default for ComparativeConfig {
    fn default() -> Self {
        Self {
            threshold_percent: 25.0,
            high_percent: 50.0,
            medium_percent: 35.0,
            min_group_size: 1,
            dimensions: vec![Dimension::Category, Dimension::AmountTier],
        }
    }
}

/// Success model settings
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub baseline: f64,
    pub min_estimate: f64,
    pub max_estimate: f64,
    pub amount_reference: f64,
    pub trials: usize,
    pub jitter: f64,
    pub interval: IntervalMethod,
    /// Fixed RNG seed; `None` draws from OS entropy on every score
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            baseline: 60.0,
            min_estimate: 5.0,
            max_estimate: 98.0,
            amount_reference: 100.0,
            trials: 1000,
            jitter: 7.0,
            interval: IntervalMethod::Empirical,
            seed: None,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub period: Period,
    pub trend: TrendConfig,
    pub anomaly: AnomalyConfig,
    pub comparative: ComparativeConfig,
    pub model: ModelConfig,
    pub default_sort: SortBy,
}

impl EngineConfig {
    /// Load from an explicit path, the data-dir override, or embedded defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => read_config(path)?,
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => read_config(&default_path)?,
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        let config = parse_config(&content)?;
        tracing::debug!(period = config.period.as_str(), "Loaded engine config");
        Ok(config)
    }

    /// The embedded defaults
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("engine.toml"))
}

fn read_config(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    aggregation: Option<RawAggregation>,
    trend: Option<RawTrend>,
    anomaly: Option<RawAnomaly>,
    comparative: Option<RawComparative>,
    model: Option<RawModel>,
    feed: Option<RawFeed>,
}

#[derive(Debug, Deserialize)]
struct RawAggregation {
    period: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTrend {
    window: Option<usize>,
    min_history: Option<usize>,
    threshold_percent: Option<f64>,
    high_percent: Option<f64>,
    medium_percent: Option<f64>,
    metrics: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawAnomaly {
    sigma: Option<f64>,
    min_samples: Option<usize>,
    metrics: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawComparative {
    threshold_percent: Option<f64>,
    high_percent: Option<f64>,
    medium_percent: Option<f64>,
    min_group_size: Option<usize>,
    dimensions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    baseline: Option<f64>,
    min_estimate: Option<f64>,
    max_estimate: Option<f64>,
    amount_reference: Option<f64>,
    trials: Option<usize>,
    jitter: Option<f64>,
    interval: Option<String>,
    fixed_half_width: Option<f64>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawFeed {
    sort: Option<String>,
}

/// Parse known names, skipping unknown ones
fn parse_list<T: std::str::FromStr>(names: Vec<String>) -> Vec<T> {
    names
        .iter()
        .filter_map(|name| match name.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(name = name.as_str(), "Skipping unknown config entry");
                None
            }
        })
        .collect()
}

/// Parse config from TOML content
pub fn parse_config(content: &str) -> Result<EngineConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = EngineConfig::default();

    if let Some(period) = raw.aggregation.and_then(|a| a.period) {
        config.period = period.parse().map_err(Error::Config)?;
    }

    if let Some(trend) = raw.trend {
        let t = &mut config.trend;
        if let Some(v) = trend.window {
            t.window = v.max(1);
        }
        if let Some(v) = trend.min_history {
            t.min_history = v.max(1);
        }
        if let Some(v) = trend.threshold_percent {
            t.threshold_percent = v;
        }
        if let Some(v) = trend.high_percent {
            t.high_percent = v;
        }
        if let Some(v) = trend.medium_percent {
            t.medium_percent = v;
        }
        if let Some(names) = trend.metrics {
            t.metrics = parse_list(names);
        }
    }

    if let Some(anomaly) = raw.anomaly {
        let a = &mut config.anomaly;
        if let Some(v) = anomaly.sigma {
            a.sigma = v;
        }
        if let Some(v) = anomaly.min_samples {
            // Variance needs at least three points to be meaningful
            a.min_samples = v.max(3);
        }
        if let Some(names) = anomaly.metrics {
            a.metrics = parse_list(names);
        }
    }

    if let Some(comparative) = raw.comparative {
        let c = &mut config.comparative;
        if let Some(v) = comparative.threshold_percent {
            c.threshold_percent = v;
        }
        if let Some(v) = comparative.high_percent {
            c.high_percent = v;
        }
        if let Some(v) = comparative.medium_percent {
            c.medium_percent = v;
        }
        if let Some(v) = comparative.min_group_size {
            c.min_group_size = v.max(1);
        }
        if let Some(names) = comparative.dimensions {
            c.dimensions = parse_list(names);
        }
    }

    if let Some(model) = raw.model {
        let m = &mut config.model;
        if let Some(v) = model.baseline {
            m.baseline = v;
        }
        if let Some(v) = model.min_estimate {
            m.min_estimate = v;
        }
        if let Some(v) = model.max_estimate {
            m.max_estimate = v;
        }
        if m.min_estimate > m.max_estimate {
            return Err(Error::Config(format!(
                "model.min_estimate ({}) exceeds model.max_estimate ({})",
                m.min_estimate, m.max_estimate
            )));
        }
        if !(m.min_estimate..=m.max_estimate).contains(&m.baseline) {
            return Err(Error::Config(format!(
                "model.baseline ({}) must lie within the estimate bounds",
                m.baseline
            )));
        }
        if let Some(v) = model.amount_reference {
            if v <= 0.0 {
                return Err(Error::Config(
                    "model.amount_reference must be positive".to_string(),
                ));
            }
            m.amount_reference = v;
        }
        if let Some(v) = model.trials {
            m.trials = v.max(2);
        }
        if let Some(v) = model.jitter {
            m.jitter = v.abs();
        }
        let half_width = model.fixed_half_width.unwrap_or(4.0);
        match model.interval.as_deref() {
            Some("fixed") => m.interval = IntervalMethod::FixedBand { half_width },
            Some("empirical") | None => {}
            Some(other) => {
                return Err(Error::Config(format!("Unknown interval method: {}", other)))
            }
        }
        m.seed = model.seed;
    }

    if let Some(sort) = raw.feed.and_then(|f| f.sort) {
        config.default_sort = sort.parse().map_err(Error::Config)?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = EngineConfig::embedded().unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = parse_config(
            r#"
            [trend]
            window = 6
            metrics = ["approval_rate", "not_a_metric"]

            [model]
            interval = "fixed"
            fixed_half_width = 3.5
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.trend.window, 6);
        assert_eq!(config.trend.threshold_percent, 15.0);
        assert_eq!(config.trend.metrics, vec![Metric::ApprovalRate]);
        assert_eq!(
            config.model.interval,
            IntervalMethod::FixedBand { half_width: 3.5 }
        );
        assert_eq!(config.model.seed, Some(7));
        assert_eq!(config.period, Period::Week);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            parse_config("[model]\nmin_estimate = 90.0\nmax_estimate = 10.0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_config("[aggregation]\nperiod = \"fortnight\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(parse_config("not toml ["), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "[aggregation]\nperiod = \"month\"\n").unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.period, Period::Month);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            EngineConfig::load(Some(&missing)),
            Err(Error::Config(_))
        ));
    }
}
