//! Configuration loading for the anchoring pipeline
//!
//! Resolution priority:
//! 1. Explicit path passed by the caller
//! 2. `ARLOCK_CONFIG` environment variable
//! 3. Compiled defaults
//!
//! Every field has a serde default so a partial config file is valid.

use crate::error::{Error, Result};
use crate::geometry::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ARLOCK_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionOptions,
    pub content: ContentStyle,
    pub fetch: FetchConfig,
    pub events: EventConfig,
}

/// Tracking-session options passed through to the world-tracking engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Ask the engine to detect horizontal planes
    pub horizontal_plane_detection: bool,
    /// Show the engine's fps/timing statistics overlay
    pub show_statistics: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            horizontal_plane_detection: false,
            show_statistics: true,
        }
    }
}

/// What kind of content is attached to the anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Payload rendered as a text label on a backing plane
    Text,
    /// Payload names an embedded 3-D asset
    Model,
    /// Payload is a remote-storage key for an image
    Image,
}

/// Content construction constants
///
/// Scale factors are per-kind real-world sizing constants, not derived values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentStyle {
    pub kind: ContentKind,

    /// Uniform scale applied to text geometry
    pub text_scale: f32,
    /// Uniform scale applied to embedded 3-D assets
    pub model_scale: f32,
    /// Uniform scale applied to image planes
    pub image_scale: f32,

    /// Backing plane behind text labels, meters
    pub backing_width: f32,
    pub backing_height: f32,

    /// Image plane size budget (width, height) in scale units; the longer
    /// image dimension fills its budget axis, the other follows aspect ratio
    pub image_budget: (f32, f32),

    pub text_color: Color,
    pub backing_color: Color,

    /// Asset shown while a remote image is in flight
    pub placeholder_asset: String,
    /// Asset shown when a remote fetch fails
    pub error_asset: String,
}

impl Default for ContentStyle {
    fn default() -> Self {
        Self {
            kind: ContentKind::Text,
            text_scale: 0.001,
            model_scale: 0.01,
            image_scale: 0.05,
            backing_width: 0.1,
            backing_height: 0.1,
            image_budget: (4.0, 3.0),
            text_color: Color::WHITE,
            backing_color: Color::BLACK,
            placeholder_asset: "placeholder".to_string(),
            error_asset: "error".to_string(),
        }
    }
}

/// Remote object fetch limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum object size accepted from remote storage
    pub max_object_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            // 1 MiB cap, matching the storage service's download limit
            max_object_bytes: 1024 * 1024,
        }
    }
}

/// Event bus sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub bus_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { bus_capacity: 256 }
    }
}

impl Config {
    /// Load configuration following the resolution priority order
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        tracing::debug!("No config file given, using compiled defaults");
        Ok(Self::default())
    }

    /// Load and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&text)?;
        Ok(config)
    }
}
