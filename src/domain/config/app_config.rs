//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::capture::{Duration, Facing, JpegQuality, Surface};

/// Backend used when nothing else is configured
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Camera pane dimensions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend_url: Option<String>,
    /// "auto" uses `camera_source`, "none" starts without a camera
    pub camera: Option<String>,
    pub camera_source: Option<String>,
    pub facing: Option<String>,
    pub quality: Option<String>,
    pub fallback_delay: Option<String>,
    pub demo_addresses: Option<Vec<String>>,
    pub surface: Option<SurfaceConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            backend_url: Some(DEFAULT_BACKEND_URL.to_string()),
            camera: Some("auto".to_string()),
            camera_source: None,
            facing: Some("environment".to_string()),
            quality: Some("0.9".to_string()),
            fallback_delay: Some("500ms".to_string()),
            demo_addresses: Some(Vec::new()),
            surface: Some(SurfaceConfig {
                width: Some(Surface::default().width()),
                height: Some(Surface::default().height()),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            backend_url: other.backend_url.or(self.backend_url),
            camera: other.camera.or(self.camera),
            camera_source: other.camera_source.or(self.camera_source),
            facing: other.facing.or(self.facing),
            quality: other.quality.or(self.quality),
            fallback_delay: other.fallback_delay.or(self.fallback_delay),
            demo_addresses: other.demo_addresses.or(self.demo_addresses),
            surface: Self::merge_surface_config(self.surface, other.surface),
        }
    }

    /// Merge surface sections
    fn merge_surface_config(
        base: Option<SurfaceConfig>,
        other: Option<SurfaceConfig>,
    ) -> Option<SurfaceConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(SurfaceConfig {
                width: o.width.or(b.width),
                height: o.height.or(b.height),
            }),
        }
    }

    /// Get backend URL, or the local default
    pub fn backend_url_or_default(&self) -> &str {
        self.backend_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL)
    }

    /// Whether the camera is disabled outright
    pub fn camera_disabled(&self) -> bool {
        self.camera
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("none"))
    }

    /// Get the camera frame source path, if any
    pub fn camera_source_path(&self) -> Option<PathBuf> {
        self.camera_source
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Get facing as parsed Facing, or default if not set/invalid
    pub fn facing_or_default(&self) -> Facing {
        self.facing
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get quality as parsed JpegQuality, or default if not set/invalid
    pub fn quality_or_default(&self) -> JpegQuality {
        self.quality
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get fallback delay as parsed Duration, or default if not set/invalid
    pub fn fallback_delay_or_default(&self) -> Duration {
        self.fallback_delay
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_fallback_delay)
    }

    /// Get the camera surface, falling back to default dimensions
    pub fn surface_or_default(&self) -> Surface {
        let default = Surface::default();
        let width = self
            .surface
            .as_ref()
            .and_then(|s| s.width)
            .unwrap_or(default.width());
        let height = self
            .surface
            .as_ref()
            .and_then(|s| s.height)
            .unwrap_or(default.height());
        Surface::new(default.id(), width, height)
    }

    /// Get demo addresses, or an empty list
    pub fn demo_addresses_or_default(&self) -> &[String] {
        self.demo_addresses.as_deref().unwrap_or(&[])
    }
}
