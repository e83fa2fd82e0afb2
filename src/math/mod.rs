mod aabb;
mod color;
mod ray;

pub use aabb::AABB;
pub use color::Color;
pub use ray::{intersect_aabb, moller_trumbore_intersect, Ray, TriangleHit};
