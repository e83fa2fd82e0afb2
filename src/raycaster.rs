use glam::{Mat3, Vec2, Vec3};

use crate::camera::Camera;
use crate::math::{intersect_aabb, moller_trumbore_intersect, Ray};
use crate::scene::{Mesh, NodeId, NodeKind, Scene};

/// Triangle that was hit, as vertex indices into the geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    /// Geometric normal in object space
    pub normal: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    /// Distance from the ray origin in world units
    pub distance: f32,
    /// Hit point in world space
    pub point: Vec3,
    pub object: NodeId,
    /// `None` for line-like objects such as axes helpers
    pub face: Option<Face>,
    pub face_index: Option<usize>,
    /// Weights of (a, b, c) at the hit point
    pub barycentric: Option<Vec3>,
}

/// Picks scene nodes along a ray
#[derive(Debug, Clone)]
pub struct Raycaster {
    pub ray: Ray,
    pub near: f32,
    pub far: f32,
    /// Max distance between the ray and a line segment that still counts
    pub line_threshold: f32,
}

impl Default for Raycaster {
    fn default() -> Self {
        Self {
            ray: Ray::new(Vec3::ZERO, Vec3::NEG_Z),
            near: 0.0,
            far: f32::INFINITY,
            line_threshold: 1.0,
        }
    }
}

impl Raycaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_from_camera(&mut self, ndc: Vec2, camera: &Camera) {
        self.ray = camera.ray_from_ndc(ndc);
    }

    /// Hits on `id` (and its descendants when `recursive`), nearest first
    pub fn intersect_object(&self, scene: &Scene, id: NodeId, recursive: bool) -> Vec<Intersection> {
        self.intersect_objects(scene, &[id], recursive)
    }

    /// Hits on every node in `ids` (and their descendants when `recursive`),
    /// nearest first
    pub fn intersect_objects(&self, scene: &Scene, ids: &[NodeId], recursive: bool) -> Vec<Intersection> {
        let mut hits = Vec::new();
        for &id in ids {
            self.collect(scene, id, &mut hits);
            if recursive {
                for child in scene.descendants(id) {
                    self.collect(scene, child, &mut hits);
                }
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn collect(&self, scene: &Scene, id: NodeId, hits: &mut Vec<Intersection>) {
        if !scene.is_visible(id) {
            return;
        }
        let Some(node) = scene.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Mesh(mesh) => self.intersect_mesh(scene, id, mesh, hits),
            NodeKind::AxesHelper { size } => self.intersect_axes(scene, id, *size, hits),
            _ => {}
        }
    }

    fn in_range(&self, distance: f32) -> bool {
        distance >= self.near && distance <= self.far
    }

    fn intersect_mesh(&self, scene: &Scene, id: NodeId, mesh: &Mesh, hits: &mut Vec<Intersection>) {
        let geometry = &mesh.geometry;
        let Some(local_bounds) = geometry.bounding_box() else {
            return;
        };

        let world = scene.world_matrix(id);
        let bounds = local_bounds.transformed(&world);
        if intersect_aabb(self.ray.origin, self.ray.direction, bounds.min, bounds.max) < 0.0 {
            return;
        }

        let inverse = world.inverse();
        let local_ray = self.ray.transformed(&inverse);

        for index in 0..geometry.triangle_count() {
            let [a, b, c] = geometry.triangle(index);
            let (va, vb, vc) = (geometry.vertex(a), geometry.vertex(b), geometry.vertex(c));
            let Some(hit) = moller_trumbore_intersect(local_ray.origin, local_ray.direction, va, vb, vc) else {
                continue;
            };

            let point = world.transform_point3(local_ray.at(hit.t));
            let distance = point.distance(self.ray.origin);
            if !self.in_range(distance) {
                continue;
            }

            hits.push(Intersection {
                distance,
                point,
                object: id,
                face: Some(Face {
                    a,
                    b,
                    c,
                    normal: (vb - va).cross(vc - va).normalize_or_zero(),
                }),
                face_index: Some(index),
                barycentric: Some(hit.barycentric()),
            });
        }
    }

    fn intersect_axes(&self, scene: &Scene, id: NodeId, size: f32, hits: &mut Vec<Intersection>) {
        let world = scene.world_matrix(id);
        let origin = world.transform_point3(Vec3::ZERO);
        let scale = Mat3::from_mat4(world);

        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            let end = origin + scale * (axis * size);
            let Some((distance, point)) = self.closest_on_segment(origin, end) else {
                continue;
            };
            if !self.in_range(distance) {
                continue;
            }
            hits.push(Intersection {
                distance,
                point,
                object: id,
                face: None,
                face_index: None,
                barycentric: None,
            });
        }
    }

    /// Distance along the ray and the closest point on segment `a..b`, if
    /// the segment passes within `line_threshold` in front of the origin
    fn closest_on_segment(&self, a: Vec3, b: Vec3) -> Option<(f32, Vec3)> {
        let d = self.ray.direction;
        let u = b - a;
        let w = self.ray.origin - a;

        let uu = u.dot(u);
        let du = d.dot(u);
        let dw = d.dot(w);
        let uw = u.dot(w);
        let denom = uu - du * du;

        let s = if uu <= f32::EPSILON {
            0.0
        } else if denom.abs() <= f32::EPSILON {
            // Parallel: project the ray origin onto the segment
            (uw / uu).clamp(0.0, 1.0)
        } else {
            ((uw - du * dw) / denom).clamp(0.0, 1.0)
        };

        let on_segment = a + u * s;
        let t = (on_segment - self.ray.origin).dot(d);
        if t < 0.0 {
            return None;
        }
        let on_ray = self.ray.at(t);
        if on_ray.distance(on_segment) > self.line_threshold {
            return None;
        }
        Some((t, on_segment))
    }
}
