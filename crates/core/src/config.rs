//! Session configuration.
//!
//! Values come from built-in defaults, an optional JSON file, and `FOLIO_*`
//! environment variables, applied in that order.

use folio_cache::{
    Viewport, ZoomLimits, DEFAULT_BASE_SCALE, DEFAULT_THUMBNAIL_SCALE, MAX_ZOOM, MIN_ZOOM,
    ZOOM_STEP,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

/// Default number of undo steps kept per tab.
pub const DEFAULT_UNDO_DEPTH: usize = 20;

const MAX_DEFAULT_WORKERS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    fn invalid(key: &str, value: impl ToString) -> Self {
        Self::InvalidValue { key: key.to_owned(), value: value.to_string() }
    }
}

/// Tunables for a [`crate::Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Undo steps kept per tab
    pub undo_depth: usize,
    /// Scale pages are rasterized at, independent of zoom
    pub base_scale: f32,
    /// Scale thumbnails are rasterized at
    pub thumbnail_scale: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Multiplier for one zoom-in/zoom-out step
    pub zoom_step: f32,
    /// Zoom a newly opened tab starts at
    pub default_zoom: f32,
    /// Render worker threads; 0 runs jobs inline via `Session::run_queued_jobs`
    pub worker_threads: usize,
    pub poll_interval_ms: u64,
    /// Where undo snapshots are written; the OS temp dir if unset
    pub snapshot_dir: Option<PathBuf>,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            undo_depth: DEFAULT_UNDO_DEPTH,
            base_scale: DEFAULT_BASE_SCALE,
            thumbnail_scale: DEFAULT_THUMBNAIL_SCALE,
            zoom_min: MIN_ZOOM,
            zoom_max: MAX_ZOOM,
            zoom_step: ZOOM_STEP,
            default_zoom: 1.0,
            worker_threads: default_workers(),
            poll_interval_ms: 10,
            snapshot_dir: None,
            viewport_width: 1200.0,
            viewport_height: 800.0,
        }
    }
}

fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(MAX_DEFAULT_WORKERS)
}

impl SessionConfig {
    pub fn with_undo_depth(mut self, depth: usize) -> Self {
        self.undo_depth = depth;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_snapshot_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.snapshot_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_viewport(mut self, width: f32, height: f32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits { min: self.zoom_min, max: self.zoom_max, step: self.zoom_step }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    /// `<config dir>/folio/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("folio").join("config.json"))
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `FOLIO_UNDO_DEPTH`
    /// - `FOLIO_BASE_SCALE`
    /// - `FOLIO_THUMBNAIL_SCALE`
    /// - `FOLIO_WORKER_THREADS`
    /// - `FOLIO_SNAPSHOT_DIR`
    ///
    /// # Errors
    /// Returns an error if any variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Applies `FOLIO_*` environment variables to this configuration.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(depth) = env_parse::<usize>("FOLIO_UNDO_DEPTH")? {
            self.undo_depth = depth;
        }
        if let Some(scale) = env_parse::<f32>("FOLIO_BASE_SCALE")? {
            self.base_scale = scale;
        }
        if let Some(scale) = env_parse::<f32>("FOLIO_THUMBNAIL_SCALE")? {
            self.thumbnail_scale = scale;
        }
        if let Some(threads) = env_parse::<usize>("FOLIO_WORKER_THREADS")? {
            self.worker_threads = threads;
        }
        if let Ok(dir) = env::var("FOLIO_SNAPSHOT_DIR") {
            self.snapshot_dir = Some(PathBuf::from(dir));
        }
        self.validate()?;
        Ok(self)
    }

    /// Loads configuration from a JSON file. Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Default file if present, then environment overrides.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let base = match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::from_file(path)?
            }
            _ => Self::default(),
        };
        base.with_env_overrides()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.undo_depth == 0 {
            return Err(ConfigError::invalid("undo_depth", self.undo_depth));
        }
        if !positive(self.base_scale) {
            return Err(ConfigError::invalid("base_scale", self.base_scale));
        }
        if !positive(self.thumbnail_scale) {
            return Err(ConfigError::invalid("thumbnail_scale", self.thumbnail_scale));
        }
        if !positive(self.zoom_min) || self.zoom_min > self.zoom_max {
            return Err(ConfigError::invalid("zoom_min", self.zoom_min));
        }
        if !positive(self.zoom_step - 1.0) {
            return Err(ConfigError::invalid("zoom_step", self.zoom_step));
        }
        Ok(())
    }
}

fn positive(value: f32) -> bool {
    value > 0.0
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::invalid(key, &value)),
        Err(_) => Ok(None),
    }
}
