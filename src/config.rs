//! Overlay configuration.
//!
//! Hosts pass configuration as JSON (or build it in code). Every field has a
//! default, so a partial document like `{"version": 1, "showLabels": false}`
//! is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::keybindings::KeyBindings;

/// Verbosity for the `log` facade, stored by name in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Which spatial index backs hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpatialIndexKind {
    /// Reverse linear scan. Fine for tens of annotations.
    #[default]
    Linear,
    /// Uniform grid buckets in display space, for dense images.
    Grid,
}

/// Format version written by this build. Files with a newer version are
/// rejected.
pub const CONFIG_VERSION: u32 = 1;

/// Smallest accepted `grid_cell_px`.
pub const MIN_GRID_CELL_PX: f32 = 8.0;

/// Touch tolerance used when `device_tolerance_px` is not set.
pub const DEFAULT_TOUCH_TOLERANCE_PX: f32 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayConfig {
    /// Version of the configuration format
    pub version: u32,

    /// When false, input is ignored and no hover/discover events fire
    pub interactive: bool,

    /// Draw label chips next to annotation boxes
    pub show_labels: bool,

    /// Hit-test tolerance for touch input in display pixels.
    /// `None` means 20 px on touch, 0 px on mouse and pen.
    pub device_tolerance_px: Option<f32>,

    pub hover_debounce_ms: u64,
    pub input_debounce_ms: u64,

    /// How long a touch hover stays up without a leave event
    pub touch_hover_timeout_ms: u64,

    pub perf_report_interval_ms: u64,

    /// Number of frame samples in the rolling FPS window
    pub perf_window: usize,

    /// Merge two dirty rects when their union is at most this multiple of
    /// their summed area
    pub merge_ratio: f32,

    /// Above this many regions a redraw pass falls back to the full surface
    pub max_dirty_regions: usize,

    pub spatial_index: SpatialIndexKind,
    pub grid_cell_px: f32,

    /// Decoded images kept by [`ImageCache`](crate::ImageCache)
    pub image_cache_capacity: usize,

    pub log_level: LogLevel,

    pub keybindings: KeyBindings,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            interactive: true,
            show_labels: true,
            device_tolerance_px: None,
            hover_debounce_ms: 16,
            input_debounce_ms: 16,
            touch_hover_timeout_ms: 3000,
            perf_report_interval_ms: 2000,
            perf_window: 60,
            merge_ratio: 1.5,
            max_dirty_regions: 32,
            spatial_index: SpatialIndexKind::default(),
            grid_cell_px: 64.0,
            image_cache_capacity: 8,
            log_level: LogLevel::default(),
            keybindings: KeyBindings::default(),
        }
    }
}

impl OverlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a config document, then check its version and value ranges.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(tolerance) = self.device_tolerance_px {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "deviceTolerancePx must be a non-negative number, got {}",
                    tolerance
                )));
            }
        }
        if !self.merge_ratio.is_finite() || self.merge_ratio < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "mergeRatio must be at least 1.0, got {}",
                self.merge_ratio
            )));
        }
        if !self.grid_cell_px.is_finite() || self.grid_cell_px < MIN_GRID_CELL_PX {
            return Err(ConfigError::Invalid(format!(
                "gridCellPx must be at least {}, got {}",
                MIN_GRID_CELL_PX, self.grid_cell_px
            )));
        }
        if let Some((chord, first, second)) = self.keybindings.find_conflict() {
            return Err(ConfigError::Invalid(format!(
                "{:?}{} is bound to both {} and {}",
                chord.key,
                if chord.shift { " with shift" } else { "" },
                first,
                second
            )));
        }
        if self.perf_window == 0 {
            return Err(ConfigError::Invalid("perfWindow must be at least 1".into()));
        }
        if self.max_dirty_regions == 0 {
            return Err(ConfigError::Invalid(
                "maxDirtyRegions must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn hover_debounce(&self) -> Duration {
        Duration::from_millis(self.hover_debounce_ms)
    }

    pub fn input_debounce(&self) -> Duration {
        Duration::from_millis(self.input_debounce_ms)
    }

    pub fn touch_hover_timeout(&self) -> Duration {
        Duration::from_millis(self.touch_hover_timeout_ms)
    }

    pub fn perf_report_interval(&self) -> Duration {
        Duration::from_millis(self.perf_report_interval_ms)
    }

    /// Touch tolerance after applying the default.
    pub fn touch_tolerance_px(&self) -> f32 {
        self.device_tolerance_px
            .unwrap_or(DEFAULT_TOUCH_TOLERANCE_PX)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("overlay config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("overlay config version {file_version} is newer than {supported_version}")]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("overlay config rejected: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OverlayConfig::default();
        assert!(config.interactive);
        assert!(config.show_labels);
        assert_eq!(config.touch_tolerance_px(), 20.0);
        assert_eq!(config.hover_debounce(), Duration::from_millis(16));
        assert_eq!(config.touch_hover_timeout(), Duration::from_secs(3));
        assert_eq!(config.spatial_index, SpatialIndexKind::Linear);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            OverlayConfig::from_json(r#"{"version": 1, "showLabels": false, "spatialIndex": "grid"}"#)
                .unwrap();
        assert!(!config.show_labels);
        assert!(config.interactive);
        assert_eq!(config.spatial_index, SpatialIndexKind::Grid);
        assert_eq!(config.perf_window, 60);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = OverlayConfig::default();
        config.device_tolerance_px = Some(12.0);
        let json = config.to_json().unwrap();
        let parsed = OverlayConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.touch_tolerance_px(), 12.0);
    }

    #[test]
    fn test_version_too_new() {
        let err = OverlayConfig::from_json(r#"{"version": 99}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::VersionTooNew {
                file_version: 99,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            OverlayConfig::from_json(r#"{"deviceTolerancePx": -3}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            OverlayConfig::from_json(r#"{"mergeRatio": 0.5}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            OverlayConfig::from_json(r#"{"spatialIndex": "grid", "gridCellPx": 0.5}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(OverlayConfig::from_json(r#"{"gridCellPx": 8}"#).is_ok());
        let mut config = OverlayConfig::default();
        config.keybindings.focus_prev.push(config.keybindings.focus_next[0]);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(matches!(
            OverlayConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
