use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::ControllerConfig;
use crate::controller::{SceneController, SceneHooks};
use crate::core::{HostEvent, PointerButton, Viewport, WinitEventAdapter, WinitViewport};
use crate::render::{RenderBackend, WgpuRenderer};

const INITIAL_WINDOW_WIDTH: u32 = 800;
const INITIAL_WINDOW_HEIGHT: u32 = 600;

pub type WindowController = SceneController<WgpuRenderer, WinitViewport>;

/// Assets and switches applied once the controller is ready
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub use_gl_fallback: bool,
    pub model: Option<PathBuf>,
    pub fbx: Option<PathBuf>,
    pub audio: Option<PathBuf>,
    /// Log the picked object on every primary click
    pub pick: bool,
}

/// Load the requested assets into a ready controller. Failures are logged
/// and skipped.
pub fn apply_launch_options<R: RenderBackend, V: Viewport>(controller: &mut SceneController<R, V>, options: &LaunchOptions) {
    if let Some(path) = &options.model {
        match pollster::block_on(controller.load_model(path.clone())) {
            Ok(model) => {
                let root = controller.scene().root();
                controller.scene_mut().add_model(root, model);
            }
            Err(e) => log::error!("{e}"),
        }
    }

    if let Some(path) = &options.fbx {
        match pollster::block_on(controller.load_fbx_model(path.clone())) {
            Ok(model) => {
                let root = controller.scene().root();
                controller.scene_mut().add_model(root, model);
            }
            Err(e) => log::error!("{e}"),
        }
    }

    #[cfg(feature = "audio")]
    if let Some(path) = &options.audio {
        controller.create_audio_source();
        let played = pollster::block_on(controller.load_audio(path.clone())).and_then(|_| controller.play_audio());
        if let Err(e) = played {
            log::error!("{e}");
        }
    }
    #[cfg(not(feature = "audio"))]
    if options.audio.is_some() {
        log::warn!("built without the audio feature; ignoring --audio");
    }

    if options.pick {
        controller.create_raycaster();
    }
    controller.track_mouse_speed();
}

/// Window host for a [`WindowController`]
pub struct App<H: SceneHooks> {
    config: ControllerConfig,
    options: LaunchOptions,
    hooks: H,
    controller: Option<WindowController>,
    input: WinitEventAdapter,
}

impl<H: SceneHooks> App<H> {
    pub fn new(config: ControllerConfig, options: LaunchOptions, hooks: H) -> Self {
        Self {
            config,
            options,
            hooks,
            controller: None,
            input: WinitEventAdapter::new(),
        }
    }

    fn pick(controller: &mut WindowController) {
        match controller.get_intersects(None) {
            Ok(hits) => match hits.first() {
                Some(hit) => {
                    let name = controller.scene().node(hit.object).map(|n| n.name.as_str()).unwrap_or("?");
                    log::info!("picked {:?} at {:.2} ({:?})", name, hit.distance, hit.point);
                }
                None => log::info!("picked nothing"),
            },
            Err(e) => log::warn!("{e}"),
        }
    }
}

impl<H: SceneHooks> ApplicationHandler for App<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.controller.is_some() {
            return;
        }

        let window = match event_loop.create_window(
            Window::default_attributes()
                .with_title("scene-base")
                .with_inner_size(winit::dpi::LogicalSize::new(INITIAL_WINDOW_WIDTH, INITIAL_WINDOW_HEIGHT)),
        ) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let viewport = WinitViewport::new(window);
        let mut controller =
            match WindowController::init_with(viewport, self.config.clone(), self.options.use_gl_fallback) {
                Ok(c) => c,
                Err(e) => {
                    log::error!("Failed to initialize scene: {}", e);
                    event_loop.exit();
                    return;
                }
            };

        apply_launch_options(&mut controller, &self.options);
        self.controller = Some(controller);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(controller) = &mut self.controller else {
            return;
        };

        // Let egui handle the event first
        if controller.renderer_mut().handle_window_event(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => {
                controller.remove_listeners();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = controller.tick(&mut self.hooks) {
                    log::error!("Render error: {}", e);
                }
            }
            other => {
                let scale = controller.viewport().device_pixel_ratio();
                if let Some(host_event) = self.input.translate(&other, scale) {
                    controller.handle_event(&host_event);
                    if self.options.pick
                        && host_event
                            == (HostEvent::PointerButton {
                                button: PointerButton::Primary,
                                pressed: true,
                            })
                    {
                        Self::pick(controller);
                    }
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(controller) = &self.controller {
            if controller.is_looping() {
                controller.viewport().window().request_redraw();
            }
        }
    }
}
