mod composer;
mod headless;
mod wgpu_renderer;

pub use composer::{EffectComposer, Pass, RenderPass};
pub use headless::{HeadlessRenderer, RenderRecord};
pub use wgpu_renderer::WgpuRenderer;

use serde::Deserialize;

use crate::camera::Camera;
use crate::core::Viewport;
use crate::error::Result;
use crate::math::Color;
use crate::scene::Scene;
use crate::stats::StatsPanel;

/// How shaded colours are written to the output surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    /// Values are written as-is
    #[default]
    Linear,
    /// Values are converted to sRGB on write
    Srgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowMapType {
    #[default]
    Pcf,
    Vsm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadowMap {
    pub enabled: bool,
    pub kind: ShadowMapType,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererSettings {
    pub output_encoding: OutputEncoding,
    pub shadow_map: ShadowMap,
    /// Keep an alpha channel so the page shows through
    pub alpha: bool,
    pub antialias: bool,
    pub clear_color: Color,
    pub clear_alpha: f64,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            output_encoding: OutputEncoding::Linear,
            shadow_map: ShadowMap::default(),
            alpha: true,
            antialias: true,
            clear_color: Color::BLACK,
            clear_alpha: 1.0,
        }
    }
}

/// The renderer's drawing surface: a layout size and a backing buffer size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Canvas {
    /// Layout size in logical pixels
    pub client_width: f64,
    pub client_height: f64,
    /// Backing buffer size in physical pixels
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// Resize the backing buffer; `update_style` also moves the layout size
    pub fn set_size(&mut self, width: f64, height: f64, update_style: bool) {
        self.width = width.max(0.0).floor() as u32;
        self.height = height.max(0.0).floor() as u32;
        if update_style {
            self.client_width = width;
            self.client_height = height;
        }
    }
}

/// Something that can draw a scene through a camera
pub trait RenderBackend {
    fn canvas(&self) -> &Canvas;

    /// Resize the output. Sizes are in pixels of the backing buffer; with
    /// `update_style` the layout size follows.
    fn set_size(&mut self, width: f64, height: f64, update_style: bool);

    fn settings(&self) -> &RendererSettings;

    fn settings_mut(&mut self) -> &mut RendererSettings;

    fn set_clear_color(&mut self, color: Color, alpha: f64) {
        let settings = self.settings_mut();
        settings.clear_color = color;
        settings.clear_alpha = alpha;
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()>;

    /// Debug overlay drawn on top of the next frames
    fn set_overlay(&mut self, _panel: Option<StatsPanel>) {}
}

/// Builds a backend for a given kind of container
pub trait CreateBackend<V: Viewport>: RenderBackend + Sized {
    fn create(viewport: &V, settings: RendererSettings, use_gl_fallback: bool) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_set_size_with_style() {
        let mut canvas = Canvas::default();
        canvas.set_size(800.5, 600.9, true);
        assert_eq!((canvas.width, canvas.height), (800, 600));
        assert_eq!((canvas.client_width, canvas.client_height), (800.5, 600.9));
    }

    #[test]
    fn test_canvas_set_size_buffer_only() {
        let mut canvas = Canvas::default();
        canvas.set_size(800.0, 600.0, true);
        canvas.set_size(1600.0, 1200.0, false);
        assert_eq!((canvas.width, canvas.height), (1600, 1200));
        assert_eq!((canvas.client_width, canvas.client_height), (800.0, 600.0));
    }

    #[test]
    fn test_default_settings() {
        let settings = RendererSettings::default();
        assert!(settings.alpha);
        assert!(settings.antialias);
        assert_eq!(settings.output_encoding, OutputEncoding::Linear);
        assert!(!settings.shadow_map.enabled);
    }
}
