//! TOML configuration for spoofwatch.
//!
//! Layered lookup: an explicit path, then the `SPOOFWATCH_CONFIG`
//! environment variable, then `./spoofwatch.toml`, then compiled-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::geo::DistanceMetric;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("detector.neighbor_count must be at least 1")]
    ZeroNeighborCount,
    #[error("detector.min_samples must be at least 1")]
    ZeroMinSamples,
    #[error("detector.eps_quantile must be within [0, 1], got {0}")]
    QuantileOutOfRange(f64),
    #[error("detector.density_cutoff must be within [0, 1], got {0}")]
    DensityCutoffOutOfRange(f64),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.detector.validate()?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve configuration. An explicit path must load; the fallbacks
    /// only warn on failure.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var("SPOOFWATCH_CONFIG") {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "SPOOFWATCH_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new("spoofwatch.toml");
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Parameters of the per-vessel analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    /// k for the k-nearest-neighbor radius estimate (the point itself counts).
    pub neighbor_count: usize,
    /// Minimum points within eps (the point itself counts) for a core point.
    pub min_samples: usize,
    /// Quantile of k-th neighbor distances taken as eps.
    pub eps_quantile: f64,
    /// Speed threshold is mean + sigma_multiplier * std_dev of reported SOG.
    pub sigma_multiplier: f64,
    /// Vessels whose threshold is at or below this (knots) are skipped.
    pub stationary_knots: f64,
    /// Anomaly density above which identity spoofing is considered.
    pub density_cutoff: f64,
    pub distance_metric: DistanceMetric,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            neighbor_count: 5,
            min_samples: 5,
            eps_quantile: 0.9,
            sigma_multiplier: 4.0,
            stationary_knots: 1.0,
            density_cutoff: 0.1,
            distance_metric: DistanceMetric::Haversine,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neighbor_count == 0 {
            return Err(ConfigError::ZeroNeighborCount);
        }
        if self.min_samples == 0 {
            return Err(ConfigError::ZeroMinSamples);
        }
        if !(0.0..=1.0).contains(&self.eps_quantile) {
            return Err(ConfigError::QuantileOutOfRange(self.eps_quantile));
        }
        if !(0.0..=1.0).contains(&self.density_cutoff) {
            return Err(ConfigError::DensityCutoffOutOfRange(self.density_cutoff));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------------

/// Record validation applied before analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub min_speed_knots: f64,
    pub max_speed_knots: f64,
    /// Also drop records whose MMSI is malformed or a known placeholder.
    pub require_valid_mmsi: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_speed_knots: 0.0,
            max_speed_knots: 80.0,
            require_valid_mmsi: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Batch / output / server / logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads; 0 uses one per CPU.
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for per-vessel outlier CSV files.
    pub outlier_dir: PathBuf,
    /// Optional SQLite database for results and outliers.
    pub database: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            outlier_dir: PathBuf::from("Clusters"),
            database: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.detector.neighbor_count, 5);
        assert_eq!(cfg.detector.min_samples, 5);
        assert_eq!(cfg.detector.eps_quantile, 0.9);
        assert_eq!(cfg.detector.distance_metric, DistanceMetric::Haversine);
        assert_eq!(cfg.output.outlier_dir, PathBuf::from("Clusters"));
        assert!(cfg.detector.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [detector]
            neighbor_count = 7
            distance_metric = "law_of_cosines"

            [logging]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.detector.neighbor_count, 7);
        assert_eq!(cfg.detector.min_samples, 5);
        assert_eq!(cfg.detector.distance_metric, DistanceMetric::LawOfCosines);
        assert!(cfg.logging.json);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut d = DetectorConfig::default();
        d.neighbor_count = 0;
        assert_eq!(d.validate(), Err(ConfigError::ZeroNeighborCount));

        let mut d = DetectorConfig::default();
        d.eps_quantile = 1.5;
        assert_eq!(d.validate(), Err(ConfigError::QuantileOutOfRange(1.5)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spoofwatch.toml");
        std::fs::write(&path, "[batch]\nworkers = 3\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.batch.workers, 3);

        let cfg = Config::resolve(Some(&path)).unwrap();
        assert_eq!(cfg.batch.workers, 3);
    }

    #[test]
    fn test_load_rejects_invalid_detector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[detector]\nmin_samples = 0\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
