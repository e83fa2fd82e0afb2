use std::path::Path;

use glam::Vec3;
use serde::Deserialize;

use crate::camera::{OrthographicConfig, PerspectiveConfig};
use crate::error::{Result, SceneError};
use crate::math::Color;
use crate::pointer::PointerMapping;
use crate::render::{OutputEncoding, RendererSettings};

/// Renderer creation options
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub alpha: bool,
    pub antialias: bool,
    pub output_encoding: OutputEncoding,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            alpha: true,
            antialias: true,
            output_encoding: OutputEncoding::Linear,
        }
    }
}

impl RendererConfig {
    pub fn settings(&self) -> RendererSettings {
        RendererSettings {
            alpha: self.alpha,
            antialias: self.antialias,
            output_encoding: self.output_encoding,
            ..Default::default()
        }
    }
}

/// Controller configuration. Every field is optional in JSON.
///
/// ```json
/// { "debug": true, "perspective": { "fov": 60 }, "pointer_mapping": "standard" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Adds the axes helper and the stats overlay
    pub debug: bool,
    /// Start with the orthographic camera instead of the perspective one
    pub orthographic: bool,
    pub perspective: PerspectiveConfig,
    pub orthographic_params: OrthographicConfig,
    pub camera_position: [f32; 3],
    pub look_at: [f32; 3],
    pub renderer: RendererConfig,
    pub pointer_mapping: PointerMapping,
    pub scene_color: Option<Color>,
    pub axes_size: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            orthographic: false,
            perspective: PerspectiveConfig::default(),
            orthographic_params: OrthographicConfig::default(),
            camera_position: [0.0, 3.0, 10.0],
            look_at: [0.0, 0.0, 0.0],
            renderer: RendererConfig::default(),
            pointer_mapping: PointerMapping::default(),
            scene_color: None,
            axes_size: 5.0,
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SceneError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SceneError::Config(format!("cannot read {:?}: {e}", path)))?;
        log::info!("Loaded configuration from {:?}", path);
        Self::from_json_str(&text)
    }

    pub fn camera_position(&self) -> Vec3 {
        Vec3::from_array(self.camera_position)
    }

    pub fn look_at(&self) -> Vec3 {
        Vec3::from_array(self.look_at)
    }
}
