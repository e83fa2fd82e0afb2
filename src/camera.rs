use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::Deserialize;

use crate::math::Ray;

/// Stored perspective settings; aspect comes from the container
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PerspectiveConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Stored orthographic settings; the frustum is derived from `zoom`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrthographicConfig {
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrthographicConfig {
    fn default() -> Self {
        Self {
            zoom: 2.0,
            near: -100.0,
            far: 1000.0,
        }
    }
}

impl OrthographicConfig {
    /// Symmetric view volume for `aspect`
    pub fn frustum(&self, aspect: f32) -> OrthographicFrustum {
        OrthographicFrustum {
            left: -self.zoom * aspect,
            right: self.zoom * aspect,
            top: self.zoom,
            bottom: -self.zoom,
            near: self.near,
            far: self.far,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveProjection {
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicFrustum {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective(PerspectiveProjection),
    Orthographic(OrthographicFrustum),
}

impl Projection {
    /// Right-handed projection with a [0, 1] depth range
    pub fn matrix(&self) -> Mat4 {
        match self {
            Projection::Perspective(p) => {
                Mat4::perspective_rh(p.fov.to_radians(), p.aspect.max(f32::EPSILON), p.near, p.far)
            }
            Projection::Orthographic(o) => {
                Mat4::orthographic_rh(o.left, o.right, o.bottom, o.top, o.near, o.far)
            }
        }
    }
}

/// The active camera. Switching between perspective and orthographic
/// replaces the whole value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub up: Vec3,
    target: Vec3,
    pub projection: Projection,
}

impl Camera {
    pub fn perspective(config: &PerspectiveConfig, aspect: f32, position: Vec3, look_at: Vec3) -> Self {
        Self {
            position,
            up: Vec3::Y,
            target: look_at,
            projection: Projection::Perspective(PerspectiveProjection {
                fov: config.fov,
                aspect,
                near: config.near,
                far: config.far,
            }),
        }
    }

    pub fn orthographic(frustum: OrthographicFrustum, position: Vec3, look_at: Vec3) -> Self {
        Self {
            position,
            up: Vec3::Y,
            target: look_at,
            projection: Projection::Orthographic(frustum),
        }
    }

    pub fn is_perspective(&self) -> bool {
        matches!(self.projection, Projection::Perspective(_))
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    /// Per-variant reaction to a container resize
    pub fn update_projection(&mut self, aspect: f32, ortho: &OrthographicConfig) {
        match &mut self.projection {
            Projection::Perspective(p) => p.aspect = aspect,
            Projection::Orthographic(o) => *o = ortho.frustum(aspect),
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        // look_at_rh degenerates when up is parallel to the view direction
        let up = if self.forward().cross(self.up).length_squared() < 1e-8 {
            self.up.any_orthonormal_vector()
        } else {
            self.up
        };
        Mat4::look_at_rh(self.position, self.target, up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    fn unproject(&self, ndc: Vec3) -> Vec3 {
        let inv = self.view_projection().inverse();
        let p = inv * Vec4::new(ndc.x, ndc.y, ndc.z, 1.0);
        p.truncate() / p.w
    }

    /// Ray from the camera through a point in normalized device coordinates
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        match self.projection {
            Projection::Perspective(_) => {
                let through = self.unproject(ndc.extend(0.5));
                Ray::new(self.position, through - self.position)
            }
            Projection::Orthographic(_) => {
                let origin = self.unproject(ndc.extend(0.0));
                Ray::new(origin, self.forward())
            }
        }
    }
}
