use super::RenderBackend;
use crate::camera::Camera;
use crate::error::Result;
use crate::scene::Scene;

/// One step of a post-processing chain
pub trait Pass {
    fn name(&self) -> &str;

    fn enabled(&self) -> bool {
        true
    }

    fn render(&mut self, renderer: &mut dyn RenderBackend, scene: &Scene, camera: &Camera) -> Result<()>;
}

/// Draws the scene as-is; normally the first pass
#[derive(Debug)]
pub struct RenderPass {
    pub enabled: bool,
}

impl RenderPass {
    pub fn new() -> Self {
        Self { enabled: true }
    }
}

impl Default for RenderPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for RenderPass {
    fn name(&self) -> &str {
        "render"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn render(&mut self, renderer: &mut dyn RenderBackend, scene: &Scene, camera: &Camera) -> Result<()> {
        renderer.render(scene, camera)
    }
}

/// Ordered pass chain. When present on the controller it replaces the
/// direct render call of each tick.
#[derive(Default)]
pub struct EffectComposer {
    passes: Vec<Box<dyn Pass>>,
}

impl EffectComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn render(&mut self, renderer: &mut dyn RenderBackend, scene: &Scene, camera: &Camera) -> Result<()> {
        for pass in self.passes.iter_mut().filter(|p| p.enabled()) {
            log::trace!("composer pass {}", pass.name());
            pass.render(renderer, scene, camera)?;
        }
        Ok(())
    }
}
