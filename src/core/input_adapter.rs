use glam::Vec2;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent};

use super::events::{HostEvent, PointerButton};

/// Pixels scrolled per wheel line, matching typical browser line height
const LINE_HEIGHT: f32 = 100.0;

/// Bridges winit window events to [`HostEvent`]s
#[derive(Debug, Clone, Default)]
pub struct WinitEventAdapter {
    /// Touch id standing in for the first touch point
    primary_touch: Option<u64>,
}

impl WinitEventAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one window event; `scale_factor` converts physical to
    /// logical pixels
    pub fn translate(&mut self, event: &WindowEvent, scale_factor: f64) -> Option<HostEvent> {
        match event {
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => Some(HostEvent::Resize),
            WindowEvent::CursorMoved { position, .. } => {
                let point = to_logical(*position, scale_factor);
                Some(HostEvent::PointerMove {
                    client: point,
                    page: point,
                })
            }
            WindowEvent::CursorLeft { .. } => Some(HostEvent::PointerLeave),
            WindowEvent::MouseInput { state, button, .. } => {
                Self::map_button(*button).map(|button| HostEvent::PointerButton {
                    button,
                    pressed: *state == ElementState::Pressed,
                })
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT,
                    MouseScrollDelta::PixelDelta(pos) => -(pos.y / scale_factor) as f32,
                };
                Some(HostEvent::Wheel { delta_y })
            }
            WindowEvent::Touch(touch) => self.translate_touch(touch, scale_factor),
            _ => None,
        }
    }

    fn translate_touch(&mut self, touch: &Touch, scale_factor: f64) -> Option<HostEvent> {
        let client = to_logical(touch.location, scale_factor);
        match touch.phase {
            TouchPhase::Started => {
                if self.primary_touch.is_none() {
                    self.primary_touch = Some(touch.id);
                }
                (self.primary_touch == Some(touch.id)).then_some(HostEvent::TouchStart { client })
            }
            TouchPhase::Moved => (self.primary_touch == Some(touch.id)).then_some(HostEvent::TouchMove { client }),
            TouchPhase::Ended | TouchPhase::Cancelled => {
                if self.primary_touch == Some(touch.id) {
                    self.primary_touch = None;
                }
                None
            }
        }
    }

    fn map_button(button: MouseButton) -> Option<PointerButton> {
        match button {
            MouseButton::Left => Some(PointerButton::Primary),
            MouseButton::Right => Some(PointerButton::Secondary),
            MouseButton::Middle => Some(PointerButton::Middle),
            _ => None,
        }
    }
}

fn to_logical(position: PhysicalPosition<f64>, scale_factor: f64) -> Vec2 {
    let logical = position.to_logical::<f64>(scale_factor);
    Vec2::new(logical.x as f32, logical.y as f32)
}
