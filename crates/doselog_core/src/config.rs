//! Timeline tuning configuration.
//!
//! # Responsibility
//! - Hold the axis blend weights, sample counts and warp exponent used when
//!   drawing timelines.
//! - Load overrides from a JSON document; every field is optional.
//!
//! # Invariants
//! - A config returned by `load`/`from_json_str`/`discover` has passed
//!   `validate()`.
//! - The grace multiplier is not configurable
//!   (`model::curve::GRACE_PERIOD_MULTIPLIER`).

use crate::timeline::intensity::SamplingStrategy;
use crate::timeline::scale::AxisScale;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "DOSELOG_CONFIG";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Json(err) => write!(f, "invalid config document: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Axis for a single dose's timeline.
    pub single_axis: AxisScale,
    /// Axis for the shared multi-dose timeline.
    pub composite_axis: AxisScale,
    pub sample_points: usize,
    pub composite_sample_points: usize,
    pub early_warp_exponent: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            single_axis: AxisScale::single_experience(),
            composite_axis: AxisScale::composite(),
            sample_points: 200,
            composite_sample_points: 120,
            early_warp_exponent: 2.5,
        }
    }
}

impl TimelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        info!(
            "event=config_load module=config status=ok path={}",
            path.display()
        );
        Ok(config)
    }

    /// Loads `explicit` if given, else the file named by `DOSELOG_CONFIG`.
    ///
    /// A path that does not exist yields defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .filter(|path| path.exists());
        match candidate {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_axis("single_axis", &self.single_axis)?;
        validate_axis("composite_axis", &self.composite_axis)?;
        if self.sample_points < 2 {
            return Err(ConfigError::Invalid(
                "sample_points must be at least 2".to_string(),
            ));
        }
        if self.composite_sample_points < 2 {
            return Err(ConfigError::Invalid(
                "composite_sample_points must be at least 2".to_string(),
            ));
        }
        if !self.early_warp_exponent.is_finite() || self.early_warp_exponent <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "early_warp_exponent must be positive, got {}",
                self.early_warp_exponent
            )));
        }
        Ok(())
    }

    pub fn early_warped(&self) -> SamplingStrategy {
        SamplingStrategy::EarlyWarped {
            exponent: self.early_warp_exponent,
        }
    }
}

fn validate_axis(name: &str, axis: &AxisScale) -> Result<(), ConfigError> {
    let weights = [axis.log_weight, axis.linear_weight];
    if weights.iter().any(|weight| !weight.is_finite() || *weight < 0.0) {
        return Err(ConfigError::Invalid(format!(
            "{name} weights must be finite and non-negative"
        )));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "{name} weights cannot both be zero"
        )));
    }
    if !axis.log_base.is_finite() || axis.log_base <= 1.0 {
        return Err(ConfigError::Invalid(format!(
            "{name}.log_base must be greater than 1, got {}",
            axis.log_base
        )));
    }
    if !axis.epsilon.is_finite() || axis.epsilon <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "{name}.epsilon must be positive, got {}",
            axis.epsilon
        )));
    }
    Ok(())
}
