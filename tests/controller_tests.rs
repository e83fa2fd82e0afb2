use glam::{Vec2, Vec3};
use scene_base::camera::Projection;
use scene_base::controller::{FrameContext, MeshObject, SceneBuilder, SceneController, SceneHooks};
use scene_base::core::{FixedViewport, HostEvent, ListenerKind};
use scene_base::material::{ShaderMaterial, UniformValue, RESOLUTION_UNIFORM};
use scene_base::pointer::PointerMapping;
use scene_base::render::{EffectComposer, HeadlessRenderer, RenderBackend, RenderPass};
use scene_base::scene::NodeId;
use scene_base::ControllerConfig;

type Controller = SceneController<HeadlessRenderer, FixedViewport>;

fn controller_with(config: ControllerConfig, width: f64, height: f64, ratio: f64) -> Controller {
    Controller::init(FixedViewport::new(width, height, ratio), config).unwrap()
}

fn default_controller() -> Controller {
    controller_with(ControllerConfig::default(), 800.0, 600.0, 1.0)
}

fn default_mesh(controller: &Controller) -> NodeId {
    controller.scene().meshes().next().map(|(id, _)| id).unwrap()
}

fn pointer_move(x: f32, y: f32) -> HostEvent {
    HostEvent::PointerMove {
        client: Vec2::new(x, y),
        page: Vec2::new(x, y),
    }
}

#[cfg(test)]
mod init_tests {
    use super::*;

    #[test]
    fn test_init_appends_canvas_and_sizes_renderer() {
        let controller = controller_with(ControllerConfig::default(), 800.0, 600.0, 1.0);

        assert_eq!(controller.viewport().canvases, 1, "canvas should be appended once");
        let canvas = controller.renderer().canvas();
        assert_eq!((canvas.client_width, canvas.client_height), (800.0, 600.0));
        assert_eq!((canvas.width, canvas.height), (800, 600));
    }

    #[test]
    fn test_init_scales_backing_buffer_by_pixel_ratio() {
        let controller = controller_with(ControllerConfig::default(), 800.0, 600.0, 2.0);

        let canvas = controller.renderer().canvas();
        assert_eq!((canvas.client_width, canvas.client_height), (800.0, 600.0));
        assert_eq!((canvas.width, canvas.height), (1600, 1200));
        assert_eq!(controller.viewport().canvases, 1);
    }

    #[test]
    fn test_init_camera_faces_origin() {
        let controller = default_controller();
        let camera = controller.camera();
        assert!(camera.is_perspective());
        assert_eq!(camera.target(), Vec3::ZERO);
        assert!((camera.position - Vec3::new(0.0, 3.0, 10.0)).length() < 1e-4);
        match camera.projection {
            Projection::Perspective(p) => {
                assert_eq!(p.fov, 75.0);
                assert!((p.aspect - 800.0 / 600.0).abs() < 1e-6);
            }
            Projection::Orthographic(_) => panic!("expected a perspective camera"),
        }
    }

    #[test]
    fn test_builder_steps_in_custom_order() {
        let mut builder = SceneBuilder::new(FixedViewport::new(640.0, 480.0, 1.0), ControllerConfig::default());
        builder.create_scene().create_orthographic_camera();
        builder.set_camera_up_z().unwrap();
        builder.create_mesh(MeshObject::default(), None).unwrap();
        builder.create_light().unwrap();

        let controller: Controller = builder.create_renderer(true).unwrap();
        assert!(!controller.camera().is_perspective());
        assert_eq!(controller.camera().up, Vec3::Z);
        assert!(controller.controls().is_none());
        assert!(!controller.is_looping());
        assert_eq!(controller.scene().meshes().count(), 1);
    }
}

#[cfg(test)]
mod camera_tests {
    use super::*;

    #[test]
    fn test_orthographic_frustum_after_create() {
        let config = ControllerConfig {
            orthographic: true,
            ..Default::default()
        };
        let controller = controller_with(config, 800.0, 600.0, 1.0);
        let aspect = 800.0f32 / 600.0;

        match controller.camera().projection {
            Projection::Orthographic(o) => {
                assert!((o.left + 2.0 * aspect).abs() < 1e-5);
                assert!((o.right - 2.0 * aspect).abs() < 1e-5);
                assert_eq!(o.top, 2.0);
                assert_eq!(o.bottom, -2.0);
                assert_eq!(o.near, -100.0);
                assert_eq!(o.far, 1000.0);
            }
            Projection::Perspective(_) => panic!("expected an orthographic camera"),
        }
    }

    #[test]
    fn test_update_orthographic_params_follows_aspect() {
        let mut controller = default_controller();
        controller.create_orthographic_camera();
        controller.viewport_mut().resize(1000.0, 250.0);

        let frustum = controller.update_orthographic_camera_params();
        assert_eq!(frustum.left, -8.0);
        assert_eq!(frustum.right, 8.0);
        assert_eq!(frustum.top, 2.0);
        assert_eq!(frustum.bottom, -2.0);
        assert_eq!(controller.orthographic_frustum(), frustum);
    }

    #[test]
    fn test_resize_event_updates_orthographic_camera() {
        let config = ControllerConfig {
            orthographic: true,
            ..Default::default()
        };
        let mut controller = controller_with(config, 800.0, 600.0, 1.0);
        controller.viewport_mut().resize(600.0, 600.0);
        controller.handle_event(&HostEvent::Resize);

        match controller.camera().projection {
            Projection::Orthographic(o) => {
                assert_eq!(o.left, -2.0);
                assert_eq!(o.right, 2.0);
            }
            Projection::Perspective(_) => panic!("camera type changed on resize"),
        }
    }

    #[test]
    fn test_resize_event_updates_perspective_aspect() {
        let mut controller = default_controller();
        controller.viewport_mut().resize(1000.0, 500.0);
        controller.handle_event(&HostEvent::Resize);

        match controller.camera().projection {
            Projection::Perspective(p) => assert!((p.aspect - 2.0).abs() < 1e-6),
            Projection::Orthographic(_) => panic!("camera type changed on resize"),
        }
        let canvas = controller.renderer().canvas();
        assert_eq!((canvas.client_width, canvas.client_height), (1000.0, 500.0));
    }
}

#[cfg(test)]
mod loop_tests {
    use super::*;

    /// Checks what has already happened when the update hook runs
    struct OrderProbe {
        seen_width: Option<u32>,
        calls: u32,
    }

    impl SceneHooks for OrderProbe {
        fn update(&mut self, ctx: FrameContext<'_>) {
            self.calls += 1;
            self.seen_width = Some(ctx.canvas.width);
            let mesh = ctx.scene.meshes().next().map(|(id, _)| id);
            if let Some(node) = mesh.and_then(|id| ctx.scene.node_mut(id)) {
                node.visible = false;
            }
            ctx.camera.position = Vec3::new(0.0, 0.0, 1000.0);
        }
    }

    #[test]
    fn test_tick_order() {
        let mut controller = controller_with(ControllerConfig::default(), 800.0, 600.0, 2.0);
        controller.viewport_mut().resize(400.0, 300.0);
        controller.handle_event(&HostEvent::Resize);
        assert_eq!(controller.renderer().canvas().width, 400);

        if let Some(controls) = controller.controls_mut() {
            controls.max_distance = 20.0;
        }

        let mut probe = OrderProbe {
            seen_width: None,
            calls: 0,
        };
        controller.tick(&mut probe).unwrap();

        // resize check ran before the hook
        assert_eq!(probe.seen_width, Some(800));
        assert_eq!(probe.calls, 1);
        // controls ran after the hook and clamped its camera move
        assert!((controller.camera().position.length() - 20.0).abs() < 1e-3);
        // render ran after the hook
        let frame = controller.renderer().last_frame().unwrap();
        assert_eq!(frame.visible_meshes, 0);
        assert_eq!((frame.width, frame.height), (800, 600));
    }

    #[test]
    fn test_stats_overlay_updated_in_debug() {
        let config = ControllerConfig {
            debug: true,
            ..Default::default()
        };
        let mut controller = controller_with(config, 320.0, 240.0, 1.0);
        controller.tick(&mut ()).unwrap();
        controller.tick(&mut ()).unwrap();

        let overlay = controller.renderer().overlay().unwrap();
        assert_eq!(overlay.frames, 2);
    }

    #[test]
    fn test_no_overlay_without_debug() {
        let mut controller = default_controller();
        controller.tick(&mut ()).unwrap();
        assert!(controller.renderer().overlay().is_none());
    }

    #[test]
    fn test_composer_replaces_direct_render() {
        let mut controller = default_controller();
        let mut composer = EffectComposer::new();
        composer.add_pass(RenderPass::new());
        composer.add_pass(RenderPass::new());
        controller.set_composer(composer);

        controller.tick(&mut ()).unwrap();
        assert_eq!(controller.renderer().frames_rendered(), 2);
    }
}

#[cfg(test)]
mod listener_tests {
    use super::*;

    #[test]
    fn test_mouse_speed_and_reset_on_leave() {
        let mut controller = default_controller();
        controller.track_mouse_speed();

        controller.handle_event(&pointer_move(0.0, 0.0));
        assert_eq!(controller.mouse_speed(), 0.0);
        controller.handle_event(&pointer_move(30.0, -250.0));
        assert!((controller.mouse_speed() - 2.5).abs() < 1e-6);

        controller.handle_event(&HostEvent::PointerLeave);
        assert_eq!(controller.mouse_speed(), 0.0);
    }

    #[test]
    fn test_remove_listeners_stops_event_handling() {
        let mut controller = default_controller();
        controller.create_raycaster();
        controller.track_mouse_speed();
        controller.handle_event(&pointer_move(0.0, 0.0));
        let pointer = controller.pointer();

        let removed = controller.remove_listeners();
        assert!(removed >= 4);
        assert!(controller.listeners().is_empty());

        let resizes = controller.renderer().resize_count();
        controller.handle_event(&pointer_move(200.0, 200.0));
        controller.handle_event(&HostEvent::Resize);

        assert_eq!(controller.pointer(), pointer);
        assert_eq!(controller.mouse_speed(), 0.0);
        assert_eq!(controller.renderer().resize_count(), resizes);
    }

    #[test]
    fn test_remove_single_listener() {
        let mut controller = default_controller();
        let id = controller.track_mouse_speed();
        assert!(controller.remove_listener(id));
        assert!(!controller.listeners().is_subscribed(ListenerKind::MouseSpeed));
        assert!(controller.listeners().is_subscribed(ListenerKind::Resize));
    }

    #[test]
    fn test_touch_updates_pointer() {
        let mut controller = default_controller();
        controller.create_raycaster();
        controller.handle_event(&HostEvent::TouchStart {
            client: Vec2::new(800.0, 0.0),
        });
        assert_eq!(controller.pointer(), Vec2::new(1.0, 1.0));
        controller.handle_event(&HostEvent::TouchMove {
            client: Vec2::new(0.0, 600.0),
        });
        assert_eq!(controller.pointer(), Vec2::new(-1.0, 3.0));
    }

    #[test]
    fn test_fullscreen_shader_resize_path() {
        let mut controller = default_controller();
        let id = controller.set_fullscreen_shader(ShaderMaterial::new());
        let aspect_before = match controller.camera().projection {
            Projection::Perspective(p) => p.aspect,
            Projection::Orthographic(_) => unreachable!(),
        };

        let resolution = |c: &Controller| match &c.scene().node(id).and_then(|n| n.mesh()).unwrap().material {
            scene_base::material::Material::Shader(s) => s.uniform(RESOLUTION_UNIFORM).copied(),
            _ => None,
        };
        assert_eq!(resolution(&controller), Some(UniformValue::Vec2(Vec2::new(800.0, 600.0))));

        controller.viewport_mut().resize(1024.0, 512.0);
        controller.handle_event(&HostEvent::Resize);

        assert_eq!(resolution(&controller), Some(UniformValue::Vec2(Vec2::new(1024.0, 512.0))));
        assert_eq!(controller.renderer().canvas().client_width, 1024.0);
        match controller.camera().projection {
            Projection::Perspective(p) => assert_eq!(p.aspect, aspect_before),
            Projection::Orthographic(_) => unreachable!(),
        }
    }
}

#[cfg(test)]
mod picking_tests {
    use super::*;

    fn standard_mapping() -> Controller {
        let config = ControllerConfig {
            pointer_mapping: PointerMapping::Standard,
            ..Default::default()
        };
        let mut controller = controller_with(config, 800.0, 600.0, 1.0);
        controller.create_raycaster();
        controller
    }

    #[test]
    fn test_pick_default_mesh_at_center() {
        let mut controller = standard_mapping();
        let cube = default_mesh(&controller);
        controller.handle_event(&pointer_move(400.0, 300.0));
        assert_eq!(controller.pointer(), Vec2::ZERO);

        let hit = controller.on_choose_intersect(cube, None).unwrap().unwrap();
        assert_eq!(hit.object, cube);
        assert!(hit.face.is_some());
        assert!(hit.distance > 9.0 && hit.distance < 11.0);
    }

    #[test]
    fn test_pick_other_target_is_none() {
        let mut controller = standard_mapping();
        let other = controller.create_mesh(MeshObject::new().with_position(Vec3::new(5.0, 0.0, 0.0)), None).unwrap();
        controller.handle_event(&pointer_move(400.0, 300.0));

        assert!(!controller.get_intersects(None).unwrap().is_empty());
        assert!(controller.on_choose_intersect(other, None).unwrap().is_none());
    }

    #[test]
    fn test_pick_nothing_is_none() {
        let mut controller = standard_mapping();
        let cube = default_mesh(&controller);
        controller.handle_event(&pointer_move(0.0, 0.0));

        assert!(controller.get_intersects(None).unwrap().is_empty());
        assert!(controller.on_choose_intersect(cube, None).unwrap().is_none());
    }

    #[test]
    fn test_legacy_mapping_at_center_misses() {
        let mut controller = default_controller();
        controller.create_raycaster();
        let cube = default_mesh(&controller);
        controller.handle_event(&pointer_move(400.0, 300.0));
        assert_eq!(controller.pointer(), Vec2::new(0.0, 2.0));
        assert!(controller.on_choose_intersect(cube, None).unwrap().is_none());
    }

    #[test]
    fn test_intersects_limited_to_container() {
        let mut controller = standard_mapping();
        let group = controller.create_mesh(MeshObject::new().with_position(Vec3::new(0.0, 0.0, -20.0)), None).unwrap();
        controller.handle_event(&pointer_move(400.0, 300.0));

        // the group node itself is not tested, only what is below it
        assert!(controller.get_intersects(Some(group)).unwrap().is_empty());
        let all = controller.get_intersects(None).unwrap();
        assert!(all.windows(2).all(|w| w[0].distance <= w[1].distance));
    }
}
