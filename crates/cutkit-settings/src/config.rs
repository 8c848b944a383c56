//! Configuration model.
//!
//! Two sections: how documents are streamed to the controller and how
//! geometry is approximated. Files are JSON or TOML, picked by extension.

use crate::error::{Result, SettingsError};
use cutkit_core::constants::{DEFAULT_MAX_QUEUE_DEPTH, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SAFE_Z};
use cutkit_core::MeasurementSystem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Streaming and machine-motion settings used by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Queue depth above which no further command is pushed
    pub max_queue_depth: usize,
    /// Sleep between queue polls while backpressured
    pub poll_interval_ms: u64,
    /// Retract height for rapid travel
    pub safe_z: f64,
    /// Feed for Z plunges; the shape feed is used when unset
    pub plunge_feed: Option<f64>,
    /// Unit word emitted in the preamble
    pub measurement_system: MeasurementSystem,
    /// Emit explicit peck moves instead of canned drill cycles
    pub expand_drill_cycles: bool,
    /// Coordinate precision of emitted commands
    pub decimal_places: usize,
    /// Listener snapshot cadence, in commands
    pub gui_update_every: usize,
    /// Command log file started for the duration of a run
    pub command_log: Option<PathBuf>,
    /// Wait for an empty queue and an idle controller before finishing
    pub wait_for_idle: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            safe_z: DEFAULT_SAFE_Z,
            plunge_feed: None,
            measurement_system: MeasurementSystem::Metric,
            expand_drill_cycles: true,
            decimal_places: 4,
            gui_update_every: 25,
            command_log: None,
            wait_for_idle: true,
        }
    }
}

impl ExecutionSettings {
    /// Poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Geometry approximation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    /// Endpoint distance under which two shapes are joined
    pub join_tolerance: f64,
    /// Chord distance under which a polyline vertex may be dropped
    pub simplify_tolerance: f64,
    /// Minimum angle (degrees) at a vertex for it to be dropped
    pub simplify_min_angle_deg: f64,
    /// Safety cap on pocket offset iterations
    pub pocket_max_iterations: usize,
    /// Let the travel optimizer reorder inside nested groups
    pub optimize_recurse_groups: bool,
    /// Maximum chord error of circles in offset areas
    pub circle_tolerance: f64,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            join_tolerance: 0.01,
            simplify_tolerance: 0.01,
            simplify_min_angle_deg: 90.0,
            pocket_max_iterations: 500,
            optimize_recurse_groups: true,
            circle_tolerance: 1e-4,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Execution settings
    pub execution: ExecutionSettings,
    /// Geometry settings
    pub geometry: GeometrySettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config location: `<config dir>/cutkit/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("cutkit").join("config.toml"))
            .ok_or_else(|| SettingsError::ConfigDirectory("no user config directory".into()))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match extension(path) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(SettingsError::LoadError(
                    "Config file must be .json or .toml".to_string(),
                ))
            }
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the file at `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = match extension(path) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            _ => {
                return Err(SettingsError::SaveError(
                    "Config file must be .json or .toml".to_string(),
                ))
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let exec = &self.execution;
        if exec.max_queue_depth == 0 {
            return Err(SettingsError::invalid(
                "execution.max_queue_depth",
                "must be > 0",
            ));
        }
        if exec.poll_interval_ms == 0 {
            return Err(SettingsError::invalid(
                "execution.poll_interval_ms",
                "must be > 0",
            ));
        }
        if !exec.safe_z.is_finite() {
            return Err(SettingsError::invalid("execution.safe_z", "must be finite"));
        }
        if exec.plunge_feed.is_some_and(|f| !(f > 0.0)) {
            return Err(SettingsError::invalid(
                "execution.plunge_feed",
                "must be > 0 when set",
            ));
        }
        if exec.decimal_places > 8 {
            return Err(SettingsError::invalid(
                "execution.decimal_places",
                "must be <= 8",
            ));
        }

        let geo = &self.geometry;
        for (key, value) in [
            ("geometry.join_tolerance", geo.join_tolerance),
            ("geometry.simplify_tolerance", geo.simplify_tolerance),
            ("geometry.circle_tolerance", geo.circle_tolerance),
        ] {
            if !(value > 0.0) {
                return Err(SettingsError::invalid(key, "must be > 0"));
            }
        }
        if !(0.0..=180.0).contains(&geo.simplify_min_angle_deg) {
            return Err(SettingsError::invalid(
                "geometry.simplify_min_angle_deg",
                "must be within 0..=180",
            ));
        }
        if geo.pocket_max_iterations == 0 {
            return Err(SettingsError::invalid(
                "geometry.pocket_max_iterations",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}
