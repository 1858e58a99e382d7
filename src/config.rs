//! Analysis tunables
//!
//! Every stage that depends on a threshold receives an `AnalysisConfig`
//! explicitly, so several configurations can be run side by side.

use crate::error::VmrkError;
use serde::{Deserialize, Serialize};

/// Default lower bound of the admissible response time interval (ms)
pub const DEFAULT_LOW_MS: f64 = 150.0;

/// Default upper bound of the admissible response time interval (ms)
pub const DEFAULT_HIGH_MS: f64 = 3000.0;

/// Responses faster than this are counted as anticipatory (ms)
pub const DEFAULT_ANTICIPATORY_THRESHOLD_MS: f64 = 150.0;

/// Converts raw marker ticks into milliseconds
pub const DEFAULT_TICK_SCALE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Trials with a response time below this are dropped as outliers
    pub low_ms: f64,
    /// Trials with a response time above this are dropped as outliers
    pub high_ms: f64,
    /// Delta degrees of freedom for standard deviations (0 = population)
    pub ddof: u32,
    /// Fixed threshold for the anticipatory response counts, independent of `low_ms`
    pub anticipatory_threshold_ms: f64,
    /// Multiplier applied to the stimulus/response tick delta
    pub tick_scale: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            low_ms: DEFAULT_LOW_MS,
            high_ms: DEFAULT_HIGH_MS,
            ddof: 0,
            anticipatory_threshold_ms: DEFAULT_ANTICIPATORY_THRESHOLD_MS,
            tick_scale: DEFAULT_TICK_SCALE,
        }
    }
}

impl AnalysisConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, VmrkError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, VmrkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Override the outlier interval
    pub fn with_bounds(mut self, low_ms: f64, high_ms: f64) -> Self {
        self.low_ms = low_ms;
        self.high_ms = high_ms;
        self
    }

    pub fn validate(&self) -> Result<(), VmrkError> {
        let values = [
            ("low_ms", self.low_ms),
            ("high_ms", self.high_ms),
            ("anticipatory_threshold_ms", self.anticipatory_threshold_ms),
            ("tick_scale", self.tick_scale),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(VmrkError::InvalidConfig(format!("{name} must be finite")));
            }
        }
        if self.low_ms > self.high_ms {
            return Err(VmrkError::InvalidConfig(format!(
                "low_ms ({}) exceeds high_ms ({})",
                self.low_ms, self.high_ms
            )));
        }
        if self.tick_scale <= 0.0 {
            return Err(VmrkError::InvalidConfig(
                "tick_scale must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.low_ms, 150.0);
        assert_eq!(config.high_ms, 3000.0);
        assert_eq!(config.ddof, 0);
        assert_eq!(config.tick_scale, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AnalysisConfig::from_json(r#"{ "high_ms": 2000, "ddof": 1 }"#).unwrap();
        assert_eq!(config.low_ms, 150.0);
        assert_eq!(config.high_ms, 2000.0);
        assert_eq!(config.ddof, 1);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = AnalysisConfig::from_json(r#"{ "low_ms": 500, "high_ms": 100 }"#);
        assert!(matches!(result, Err(VmrkError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_scale_rejected() {
        let config = AnalysisConfig {
            tick_scale: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AnalysisConfig::default().with_bounds(100.0, 2500.0);
        let restored = AnalysisConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(restored, config);
    }
}
