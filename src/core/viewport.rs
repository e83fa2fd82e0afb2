use std::sync::Arc;

use winit::window::Window;

/// The container the scene renders into
pub trait Viewport {
    /// Layout size of the container in logical pixels
    fn client_size(&self) -> (f64, f64);

    /// Size of the whole window in logical pixels
    fn window_size(&self) -> (f64, f64);

    /// Physical pixels per logical pixel
    fn device_pixel_ratio(&self) -> f64;

    /// Insert the renderer's output surface into the container
    fn append_canvas(&mut self);

    fn aspect(&self) -> f32 {
        let (w, h) = self.client_size();
        if h > 0.0 {
            (w / h) as f32
        } else {
            1.0
        }
    }
}

/// Fixed-size container for headless runs and tests
#[derive(Debug, Clone, PartialEq)]
pub struct FixedViewport {
    pub client_width: f64,
    pub client_height: f64,
    pub window_width: f64,
    pub window_height: f64,
    pub pixel_ratio: f64,
    pub canvases: usize,
}

impl FixedViewport {
    /// Container filling the whole window
    pub fn new(width: f64, height: f64, pixel_ratio: f64) -> Self {
        Self {
            client_width: width,
            client_height: height,
            window_width: width,
            window_height: height,
            pixel_ratio,
            canvases: 0,
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.client_width = width;
        self.client_height = height;
        self.window_width = width;
        self.window_height = height;
    }
}

impl Viewport for FixedViewport {
    fn client_size(&self) -> (f64, f64) {
        (self.client_width, self.client_height)
    }

    fn window_size(&self) -> (f64, f64) {
        (self.window_width, self.window_height)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn append_canvas(&mut self) {
        self.canvases += 1;
    }
}

/// A winit window acting as both window and container
pub struct WinitViewport {
    window: Arc<Window>,
}

impl WinitViewport {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }
}

impl Viewport for WinitViewport {
    fn client_size(&self) -> (f64, f64) {
        let size = self.window.inner_size().to_logical::<f64>(self.window.scale_factor());
        (size.width, size.height)
    }

    fn window_size(&self) -> (f64, f64) {
        self.client_size()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn append_canvas(&mut self) {
        // The surface is created on the window itself
        log::debug!("surface attached to window {:?}", self.window.id());
    }
}
