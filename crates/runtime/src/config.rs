use std::path::Path;

use serde::{Deserialize, Serialize};

use foundation::viewport::ZoomExtent;

use crate::debounce::DEFAULT_RESIZE_QUIET_MS;

/// Tunables for the frame loop and request scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// A compute request unanswered for this long restarts the worker.
    /// `0` disables the timeout.
    pub request_timeout_ms: u64,

    /// Quiet period after the last resize event before recomputing.
    pub resize_quiet_ms: u64,

    /// Zoom extent relative to the home view.
    pub min_zoom: f32,
    pub max_zoom: f32,

    /// Home view density; `1/200` maps a window to `±width/400`.
    pub world_units_per_pixel: f32,

    /// Log every request latency at `info` instead of `debug`.
    pub dump_timings: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            resize_quiet_ms: DEFAULT_RESIZE_QUIET_MS,
            min_zoom: 1.0,
            max_zoom: 40.0,
            world_units_per_pixel: 1.0 / 200.0,
            dump_timings: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config read failed: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse failed: {e}"),
            ConfigError::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(payload).map_err(ConfigError::Parse)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_zoom > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_zoom must be positive, got {}",
                self.min_zoom
            )));
        }
        if self.max_zoom < self.min_zoom {
            return Err(ConfigError::Invalid(format!(
                "max_zoom {} is below min_zoom {}",
                self.max_zoom, self.min_zoom
            )));
        }
        if !(self.world_units_per_pixel > 0.0 && self.world_units_per_pixel.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "world_units_per_pixel must be positive, got {}",
                self.world_units_per_pixel
            )));
        }
        Ok(())
    }

    pub fn request_timeout_ms(&self) -> Option<f64> {
        (self.request_timeout_ms > 0).then_some(self.request_timeout_ms as f64)
    }

    pub fn zoom_extent(&self) -> ZoomExtent {
        ZoomExtent {
            min: self.min_zoom,
            max: self.max_zoom,
            world_units_per_pixel: self.world_units_per_pixel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RuntimeConfig};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg = RuntimeConfig::from_json_str(r#"{ "request_timeout_ms": 0 }"#).unwrap();
        assert_eq!(cfg.request_timeout_ms(), None);
        assert_eq!(cfg.resize_quiet_ms, 250);
        assert_eq!(cfg.max_zoom, 40.0);
    }

    #[test]
    fn rejects_inverted_zoom_extent() {
        let err = RuntimeConfig::from_json_str(r#"{ "min_zoom": 4, "max_zoom": 2 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = RuntimeConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "dump_timings": true, "resize_quiet_ms": 100 }}"#).unwrap();
        let cfg = RuntimeConfig::load(file.path()).unwrap();
        assert!(cfg.dump_timings);
        assert_eq!(cfg.resize_quiet_ms, 100);
        assert_eq!(cfg.request_timeout_ms(), Some(5000.0));
    }
}
