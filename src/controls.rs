use std::f32::consts::PI;

use glam::{Quat, Vec2, Vec3};

use crate::camera::{Camera, Projection};
use crate::core::{HostEvent, PointerButton};

const EPS: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Dolly,
    Pan,
}

/// Pending spherical rotation, consumed by `update`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SphericalDelta {
    theta: f32,
    phi: f32,
}

/// Orbits the camera around `target`: left-drag rotates, right-drag pans,
/// wheel or middle-drag dollies.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub enabled: bool,
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,

    drag: Option<DragMode>,
    last_pointer: Option<Vec2>,
    viewport_height: f32,
    spherical_delta: SphericalDelta,
    scale: f32,
    pending_pan: Vec2,
    pan_offset: Vec3,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            enabled: true,
            target,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            drag: None,
            last_pointer: None,
            viewport_height: 1.0,
            spherical_delta: SphericalDelta::default(),
            scale: 1.0,
            pending_pan: Vec2::ZERO,
            pan_offset: Vec3::ZERO,
        }
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    /// Height in logical pixels used to turn drag distances into angles
    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = height.max(1.0);
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Feed a host event; returns whether it was consumed
    pub fn handle_event(&mut self, event: &HostEvent) -> bool {
        if !self.enabled {
            return false;
        }
        match *event {
            HostEvent::PointerButton { button, pressed: true } => {
                self.drag = Some(match button {
                    PointerButton::Primary => DragMode::Rotate,
                    PointerButton::Middle => DragMode::Dolly,
                    PointerButton::Secondary => DragMode::Pan,
                });
                true
            }
            HostEvent::PointerButton { pressed: false, .. } | HostEvent::PointerLeave => {
                self.drag = None;
                self.last_pointer = None;
                true
            }
            HostEvent::PointerMove { client, .. } => {
                let last = self.last_pointer.replace(client);
                match (self.drag, last) {
                    (Some(mode), Some(last)) => {
                        self.drag_by(mode, client - last);
                        true
                    }
                    _ => false,
                }
            }
            HostEvent::Wheel { delta_y } => {
                if delta_y > 0.0 {
                    self.dolly_out();
                } else if delta_y < 0.0 {
                    self.dolly_in();
                }
                true
            }
            _ => false,
        }
    }

    fn drag_by(&mut self, mode: DragMode, delta: Vec2) {
        match mode {
            DragMode::Rotate => {
                let angle = 2.0 * PI * self.rotate_speed / self.viewport_height;
                self.spherical_delta.theta -= delta.x * angle;
                self.spherical_delta.phi -= delta.y * angle;
            }
            DragMode::Dolly => {
                if delta.y > 0.0 {
                    self.dolly_out();
                } else if delta.y < 0.0 {
                    self.dolly_in();
                }
            }
            DragMode::Pan => self.pending_pan += delta * self.pan_speed,
        }
    }

    fn dolly_in(&mut self) {
        self.scale *= self.zoom_scale();
    }

    fn dolly_out(&mut self) {
        self.scale /= self.zoom_scale();
    }

    /// World-space pan for the pending screen delta
    fn screen_pan(&self, camera: &Camera, offset: Vec3) -> Vec3 {
        let forward = -offset.normalize_or(Vec3::Z);
        let right = forward.cross(camera.up).normalize_or(Vec3::X);
        let up = right.cross(forward);

        let world_per_pixel = match camera.projection {
            Projection::Perspective(p) => 2.0 * offset.length() * (p.fov.to_radians() * 0.5).tan() / self.viewport_height,
            Projection::Orthographic(o) => (o.top - o.bottom) / self.viewport_height,
        };
        (-right * self.pending_pan.x + up * self.pending_pan.y) * world_per_pixel
    }

    /// Apply pending input to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let mut offset = camera.position - self.target;

        if self.pending_pan != Vec2::ZERO {
            self.pan_offset += self.screen_pan(camera, offset);
            self.pending_pan = Vec2::ZERO;
        }

        // Spherical coordinates are taken around +Y
        let to_y_up = Quat::from_rotation_arc(camera.up.normalize_or(Vec3::Y), Vec3::Y);
        offset = to_y_up * offset;

        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let step = if self.enable_damping { self.damping_factor } else { 1.0 };
        theta += self.spherical_delta.theta * step;
        phi += self.spherical_delta.phi * step;
        phi = phi.clamp(self.min_polar_angle.max(EPS), self.max_polar_angle.min(PI - EPS));

        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let pan = self.pan_offset * step;
        self.target += pan;

        if let Projection::Orthographic(frustum) = &mut camera.projection {
            frustum.left *= self.scale;
            frustum.right *= self.scale;
            frustum.top *= self.scale;
            frustum.bottom *= self.scale;
        }

        let sin_phi = phi.sin();
        let spherical = Vec3::new(sin_phi * theta.sin(), phi.cos(), sin_phi * theta.cos()) * radius;
        let new_position = self.target + to_y_up.inverse() * spherical;

        let moved = new_position.distance_squared(camera.position) > EPS || pan.length_squared() > EPS;
        camera.position = new_position;
        camera.look_at(self.target);

        if self.enable_damping {
            self.spherical_delta.theta *= 1.0 - self.damping_factor;
            self.spherical_delta.phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.spherical_delta = SphericalDelta::default();
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        moved
    }
}
