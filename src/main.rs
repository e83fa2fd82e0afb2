use anyhow::{Context, Result};
use clap::Parser;
use glam::Quat;
use winit::event_loop::EventLoop;

use scene_base::app::{apply_launch_options, App};
use scene_base::cli::Cli;
use scene_base::controller::{FrameContext, SceneController, SceneHooks};
use scene_base::core::FixedViewport;
use scene_base::render::HeadlessRenderer;
use scene_base::scene::NodeKind;

const HEADLESS_WIDTH: f64 = 800.0;
const HEADLESS_HEIGHT: f64 = 600.0;

/// Spins the default cube
struct Turntable {
    speed: f32,
}

impl SceneHooks for Turntable {
    fn update(&mut self, ctx: FrameContext<'_>) {
        let root = ctx.scene.root();
        let targets: Vec<_> = ctx
            .scene
            .children(root)
            .iter()
            .copied()
            .filter(|id| {
                ctx.scene
                    .node(*id)
                    .is_some_and(|n| n.name == "mesh" && matches!(n.kind, NodeKind::Mesh(_)))
            })
            .collect();
        let spin = Quat::from_rotation_y(self.speed * ctx.frame.delta);
        for id in targets {
            if let Some(node) = ctx.scene.node_mut(id) {
                node.transform.rotation = spin * node.transform.rotation;
            }
        }
    }
}

fn run_headless(cli: &Cli, frames: u64) -> Result<()> {
    let config = cli.controller_config()?;
    let viewport = FixedViewport::new(HEADLESS_WIDTH, HEADLESS_HEIGHT, 1.0);
    let mut controller = SceneController::<HeadlessRenderer, _>::init_with(viewport, config, cli.use_gl_fallback)
        .context("Failed to initialize headless scene")?;
    apply_launch_options(&mut controller, &cli.launch_options());

    let mut hooks = Turntable { speed: 1.0 };
    for _ in 0..frames {
        controller.tick(&mut hooks).context("Headless frame failed")?;
    }

    if let Some(frame) = controller.renderer().last_frame() {
        println!(
            "Rendered {} frames at {}x{} ({} visible meshes)",
            controller.renderer().frames_rendered(),
            frame.width,
            frame.height,
            frame.visible_meshes
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(frames) = cli.headless {
        return run_headless(&cli, frames);
    }

    let config = cli.controller_config()?;
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, cli.launch_options(), Turntable { speed: 1.0 });

    println!("scene-base - drag to orbit, wheel to zoom, right-drag to pan, Escape to quit");
    event_loop.run_app(&mut app)?;

    Ok(())
}
