use super::{Canvas, CreateBackend, RenderBackend, RendererSettings};
use crate::camera::Camera;
use crate::core::Viewport;
use crate::error::Result;
use crate::scene::Scene;
use crate::stats::StatsPanel;

/// What one headless frame would have drawn
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRecord {
    pub frame: u64,
    pub width: u32,
    pub height: u32,
    pub visible_meshes: usize,
    pub perspective: bool,
}

/// Renderer without a GPU surface. Keeps a log of frames for tests and
/// the `--headless` mode of the binary.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    canvas: Canvas,
    settings: RendererSettings,
    history: Vec<RenderRecord>,
    overlay: Option<StatsPanel>,
    resizes: usize,
}

impl HeadlessRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.history.len() as u64
    }

    pub fn history(&self) -> &[RenderRecord] {
        &self.history
    }

    pub fn last_frame(&self) -> Option<&RenderRecord> {
        self.history.last()
    }

    /// Number of `set_size` calls so far
    pub fn resize_count(&self) -> usize {
        self.resizes
    }

    pub fn overlay(&self) -> Option<&StatsPanel> {
        self.overlay.as_ref()
    }
}

impl RenderBackend for HeadlessRenderer {
    fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    fn set_size(&mut self, width: f64, height: f64, update_style: bool) {
        self.resizes += 1;
        self.canvas.set_size(width, height, update_style);
    }

    fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()> {
        let visible_meshes = scene.meshes().filter(|(id, _)| scene.is_visible(*id)).count();
        let record = RenderRecord {
            frame: self.history.len() as u64,
            width: self.canvas.width,
            height: self.canvas.height,
            visible_meshes,
            perspective: camera.is_perspective(),
        };
        log::trace!("headless frame {:?}", record);
        self.history.push(record);
        Ok(())
    }

    fn set_overlay(&mut self, panel: Option<StatsPanel>) {
        self.overlay = panel;
    }
}

impl<V: Viewport> CreateBackend<V> for HeadlessRenderer {
    fn create(_viewport: &V, settings: RendererSettings, use_gl_fallback: bool) -> Result<Self> {
        if use_gl_fallback {
            log::debug!("headless renderer ignores the GL fallback switch");
        }
        Ok(Self::new(settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveConfig;
    use crate::geometry::Geometry;
    use crate::material::Material;
    use crate::scene::{Mesh, Node, NodeKind};
    use glam::Vec3;

    #[test]
    fn test_records_frames() {
        let mut renderer = HeadlessRenderer::default();
        renderer.set_size(320.0, 240.0, true);

        let mut scene = Scene::new();
        let cube = scene.add_to_root(Node::new(
            "cube",
            NodeKind::Mesh(Mesh {
                geometry: Geometry::cuboid(1.0, 1.0, 1.0),
                material: Material::default(),
            }),
        ));
        let hidden = scene.add_to_root(Node::new(
            "hidden",
            NodeKind::Mesh(Mesh {
                geometry: Geometry::plane(1.0, 1.0),
                material: Material::default(),
            }),
        ));
        scene.node_mut(hidden).unwrap().visible = false;
        let camera = Camera::perspective(&PerspectiveConfig::default(), 1.0, Vec3::new(0.0, 3.0, 10.0), Vec3::ZERO);

        renderer.render(&scene, &camera).unwrap();
        renderer.render(&scene, &camera).unwrap();

        assert_eq!(renderer.frames_rendered(), 2);
        let last = renderer.last_frame().unwrap();
        assert_eq!(last.frame, 1);
        assert_eq!((last.width, last.height), (320, 240));
        assert_eq!(last.visible_meshes, 1);
        assert!(last.perspective);
        assert!(scene.contains(cube));
    }

    #[test]
    fn test_set_clear_color_updates_settings() {
        let mut renderer = HeadlessRenderer::default();
        renderer.set_clear_color(crate::math::Color::WHITE, 0.0);
        assert_eq!(renderer.settings().clear_alpha, 0.0);
        assert_eq!(renderer.settings().clear_color, crate::math::Color::WHITE);
    }
}
