use std::collections::BTreeMap;

use glam::Vec3;

use crate::math::AABB;

/// Name of the per-vertex barycentric attribute used by edge/wireframe shaders
pub const BARY_ATTRIBUTE: &str = "aCenter";

/// Barycentric corner pattern repeated for every triangle
const BARY_PATTERN: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0];

/// Extra per-vertex attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub item_size: usize,
    pub data: Vec<f32>,
}

impl Attribute {
    pub fn new(data: Vec<f32>, item_size: usize) -> Self {
        Self { item_size, data }
    }

    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }
}

/// Indexed or non-indexed triangle list with flat xyz buffers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Option<Vec<u32>>,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Geometry {
    pub fn new(positions: Vec<f32>, normals: Vec<f32>, indices: Option<Vec<u32>>) -> Self {
        Self {
            positions,
            normals,
            indices,
            attributes: BTreeMap::new(),
        }
    }

    /// Axis-aligned box centred on the origin, 4 vertices per face
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width * 0.5, height * 0.5, depth * 0.5);

        // (normal, u axis, v axis) per face: +x, -x, +y, -y, +z, -z
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        let half = Vec3::new(hx, hy, hz);

        let mut positions = Vec::with_capacity(24 * 3);
        let mut normals = Vec::with_capacity(24 * 3);
        let mut indices = Vec::with_capacity(36);

        for (face, (normal, u, v)) in faces.iter().enumerate() {
            let base = (face * 4) as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let corner = (*normal + *u * su + *v * sv) * half;
                positions.extend_from_slice(&corner.to_array());
                normals.extend_from_slice(&normal.to_array());
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(positions, normals, Some(indices))
    }

    /// Quad in the XY plane facing +z
    pub fn plane(width: f32, height: f32) -> Self {
        let (hx, hy) = (width * 0.5, height * 0.5);
        let positions = vec![
            -hx, -hy, 0.0, //
            hx, -hy, 0.0, //
            hx, hy, 0.0, //
            -hx, hy, 0.0,
        ];
        let normals = [0.0, 0.0, 1.0].repeat(4);
        Self::new(positions, normals, Some(vec![0, 1, 2, 0, 2, 3]))
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn vertex(&self, index: usize) -> Vec3 {
        let i = index * 3;
        Vec3::new(self.positions[i], self.positions[i + 1], self.positions[i + 2])
    }

    /// Number of triangles drawn
    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    /// Vertex indices of triangle `i`
    pub fn triangle(&self, i: usize) -> [usize; 3] {
        match &self.indices {
            Some(indices) => [
                indices[i * 3] as usize,
                indices[i * 3 + 1] as usize,
                indices[i * 3 + 2] as usize,
            ],
            None => [i * 3, i * 3 + 1, i * 3 + 2],
        }
    }

    pub fn bounding_box(&self) -> Option<AABB> {
        AABB::from_points((0..self.vertex_count()).map(|i| self.vertex(i)))
    }

    /// Flat per-face normals when the source carried none
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.vertex_count()];
        for tri in 0..self.triangle_count() {
            let [a, b, c] = self.triangle(tri);
            let (va, vb, vc) = (self.vertex(a), self.vertex(b), self.vertex(c));
            let n = (vb - va).cross(vc - va);
            normals[a] += n;
            normals[b] += n;
            normals[c] += n;
        }
        self.normals = normals
            .into_iter()
            .flat_map(|n| n.normalize_or_zero().to_array())
            .collect();
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, attribute: Attribute) {
        self.attributes.insert(name.into(), attribute);
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}

/// Attaches the `aCenter` barycentric attribute: three floats per vertex,
/// cycling through the corners (0,0,1), (0,1,0), (1,0,0).
pub fn set_bary_coord(geometry: &mut Geometry) {
    let len = geometry.vertex_count() * 3;
    let data: Vec<f32> = BARY_PATTERN.iter().copied().cycle().take(len).collect();
    geometry.set_attribute(BARY_ATTRIBUTE, Attribute::new(data, 3));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_layout() {
        let cube = Geometry::cuboid(1.0, 1.0, 1.0);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.normals.len(), cube.positions.len());
    }

    #[test]
    fn test_cuboid_bounds() {
        let cube = Geometry::cuboid(2.0, 4.0, 6.0);
        let bounds = cube.bounding_box().unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_cuboid_faces_wind_outward() {
        let cube = Geometry::cuboid(1.0, 1.0, 1.0);
        for tri in 0..cube.triangle_count() {
            let [a, b, c] = cube.triangle(tri);
            let (va, vb, vc) = (cube.vertex(a), cube.vertex(b), cube.vertex(c));
            let face_normal = (vb - va).cross(vc - va).normalize();
            let centroid = (va + vb + vc) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0, "triangle {tri} faces inward");
        }
    }

    #[test]
    fn test_non_indexed_triangles() {
        let geometry = Geometry::new(vec![0.0; 18], Vec::new(), None);
        assert_eq!(geometry.triangle_count(), 2);
        assert_eq!(geometry.triangle(1), [3, 4, 5]);
    }

    #[test]
    fn test_compute_vertex_normals_plane() {
        let mut plane = Geometry::plane(2.0, 2.0);
        plane.normals.clear();
        plane.compute_vertex_normals();
        assert_eq!(&plane.normals[0..3], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_bary_coord_length_and_pattern() {
        let mut cube = Geometry::cuboid(1.0, 1.0, 1.0);
        set_bary_coord(&mut cube);
        let attr = cube.attribute(BARY_ATTRIBUTE).unwrap();
        assert_eq!(attr.item_size, 3);
        assert_eq!(attr.data.len(), 24 * 3);
        for block in attr.data.chunks(9) {
            assert_eq!(block, &BARY_PATTERN[..block.len()]);
        }
    }

    #[test]
    fn test_bary_coord_partial_block() {
        let mut geometry = Geometry::new(vec![0.0; 12], Vec::new(), None);
        set_bary_coord(&mut geometry);
        let attr = geometry.attribute(BARY_ATTRIBUTE).unwrap();
        assert_eq!(attr.data.len(), 12);
        assert_eq!(attr.count(), 4);
        assert_eq!(&attr.data[9..], &[0.0, 0.0, 1.0]);
    }
}
