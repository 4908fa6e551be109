//! Viewer configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest zoom the preview allows.
pub const DEFAULT_MIN_SCALE: f64 = 0.05;
/// Largest zoom the preview allows.
pub const DEFAULT_MAX_SCALE: f64 = 15.0;
/// Padding kept around the diagram when fitting it to the viewport.
pub const DEFAULT_FIT_PADDING: f64 = 20.0;
/// Distance in screen pixels moved by one arrow key press.
pub const DEFAULT_PAN_STEP: f64 = 50.0;
/// Zoom factor applied by one key press, wheel notch or zoom button.
pub const DEFAULT_ZOOM_STEP: f64 = 1.2;
/// Delay between the last edit and an automatic render.
pub const DEFAULT_RENDER_DEBOUNCE_MS: u64 = 750;
/// Versioned key under which the session record is stored.
///
/// Bump the suffix whenever the record shape changes.
pub const DEFAULT_SESSION_KEY: &str = "graphmaster.session.v6";

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid scale bounds: min {min}, max {max}")]
    ScaleBounds { min: f64, max: f64 },
    #[error("Zoom step must be greater than 1, got {0}")]
    ZoomStep(f64),
    #[error("Invalid {field}: {value}")]
    Invalid { field: &'static str, value: f64 },
    #[error("Session key must not be empty")]
    EmptySessionKey,
    #[error("Config parse error: {0}")]
    Parse(String),
}

/// Tunables for a viewer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub fit_padding: f64,
    pub pan_step: f64,
    pub zoom_step: f64,
    pub render_debounce_ms: u64,
    pub session_key: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            fit_padding: DEFAULT_FIT_PADDING,
            pan_step: DEFAULT_PAN_STEP,
            zoom_step: DEFAULT_ZOOM_STEP,
            render_debounce_ms: DEFAULT_RENDER_DEBOUNCE_MS,
            session_key: DEFAULT_SESSION_KEY.to_string(),
        }
    }
}

impl ViewerConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds_ok = self.min_scale.is_finite()
            && self.max_scale.is_finite()
            && self.min_scale > 0.0
            && self.min_scale <= self.max_scale;
        if !bounds_ok {
            return Err(ConfigError::ScaleBounds {
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            return Err(ConfigError::ZoomStep(self.zoom_step));
        }
        if !(self.fit_padding.is_finite() && self.fit_padding >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "fit_padding",
                value: self.fit_padding,
            });
        }
        if !self.pan_step.is_finite() {
            return Err(ConfigError::Invalid {
                field: "pan_step",
                value: self.pan_step,
            });
        }
        if self.session_key.trim().is_empty() {
            return Err(ConfigError::EmptySessionKey);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ViewerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ViewerConfig::from_json(r#"{ "max_scale": 8.0 }"#).unwrap();
        assert!((config.max_scale - 8.0).abs() < f64::EPSILON);
        assert!((config.min_scale - DEFAULT_MIN_SCALE).abs() < f64::EPSILON);
        assert_eq!(config.session_key, DEFAULT_SESSION_KEY);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = ViewerConfig::from_json(r#"{ "min_scale": 4.0, "max_scale": 2.0 }"#);
        assert!(matches!(result, Err(ConfigError::ScaleBounds { .. })));
    }

    #[test]
    fn test_zoom_step_must_grow() {
        let config = ViewerConfig {
            zoom_step: 1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZoomStep(1.0)));
    }

    #[test]
    fn test_garbage_json() {
        assert!(matches!(
            ViewerConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
