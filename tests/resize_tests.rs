use scene_base::core::{FixedViewport, HostEvent};
use scene_base::render::{HeadlessRenderer, RenderBackend};
use scene_base::{ControllerConfig, SceneController};

type Controller = SceneController<HeadlessRenderer, FixedViewport>;

fn controller(width: f64, height: f64, ratio: f64) -> Controller {
    Controller::init(FixedViewport::new(width, height, ratio), ControllerConfig::default()).unwrap()
}

#[cfg(test)]
mod resize_tests {
    use super::*;

    #[test]
    fn test_backing_buffer_is_floor_of_client_times_ratio() {
        let sizes = [(800.0, 600.0), (333.0, 211.0), (1.0, 1.0), (1919.0, 1079.0)];
        let ratios = [1.0, 1.25, 1.5, 2.0, 3.0];

        for &(w, h) in &sizes {
            for &r in &ratios {
                let c = controller(w, h, r);
                let canvas = c.renderer().canvas();
                assert_eq!(
                    (canvas.width, canvas.height),
                    ((w * r).floor() as u32, (h * r).floor() as u32),
                    "size {}x{} at ratio {}",
                    w,
                    h,
                    r
                );
                assert_eq!((canvas.client_width, canvas.client_height), (w, h));
            }
        }
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut c = controller(800.0, 600.0, 1.5);
        let before = c.renderer().resize_count();

        assert!(!c.resize_renderer_to_display_size(), "nothing changed since creation");
        assert!(!c.resize_renderer_to_display_size());
        assert_eq!(c.renderer().resize_count(), before);
    }

    #[test]
    fn test_resize_after_layout_change() {
        let mut c = controller(800.0, 600.0, 2.0);
        c.viewport_mut().resize(500.0, 400.0);
        c.handle_event(&HostEvent::Resize);

        // the resize listener sets the layout size with a 1:1 buffer
        assert_eq!(c.renderer().canvas().width, 500);

        assert!(c.resize_renderer_to_display_size());
        assert_eq!(c.renderer().canvas().width, 1000);
        assert_eq!(c.renderer().canvas().height, 800);
        assert!(!c.resize_renderer_to_display_size());
    }

    #[test]
    fn test_pixel_ratio_change_alone_triggers_resize() {
        let mut c = controller(640.0, 480.0, 1.0);
        c.viewport_mut().pixel_ratio = 2.0;

        assert!(c.resize_renderer_to_display_size());
        assert_eq!(c.renderer().canvas().width, 1280);
        assert_eq!(c.renderer().canvas().client_width, 640.0, "layout size is untouched");
    }

    #[test]
    fn test_fractional_ratio_floors() {
        let mut c = controller(333.0, 333.0, 1.0);
        c.viewport_mut().pixel_ratio = 1.5;
        assert!(c.resize_renderer_to_display_size());
        assert_eq!(c.renderer().canvas().width, 499);
    }

    #[test]
    fn test_tick_performs_pending_resize() {
        let mut c = controller(200.0, 100.0, 1.0);
        c.viewport_mut().pixel_ratio = 3.0;
        c.tick(&mut ()).unwrap();

        let frame = c.renderer().last_frame().unwrap();
        assert_eq!((frame.width, frame.height), (600, 300));
    }
}
