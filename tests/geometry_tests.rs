use scene_base::geometry::{set_bary_coord, Geometry, BARY_ATTRIBUTE};

const BLOCK: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0];

fn geometry_with_vertices(n: usize) -> Geometry {
    let positions = (0..n * 3).map(|i| i as f32).collect();
    Geometry::new(positions, Vec::new(), None)
}

#[cfg(test)]
mod bary_coord_tests {
    use super::*;

    #[test]
    fn test_length_is_three_per_vertex() {
        for n in [0, 1, 2, 3, 4, 7, 24, 100] {
            let mut geometry = geometry_with_vertices(n);
            set_bary_coord(&mut geometry);
            let attr = geometry.attribute(BARY_ATTRIBUTE).unwrap();
            assert_eq!(attr.data.len(), 3 * n, "vertex count {}", n);
            assert_eq!(attr.item_size, 3);
            assert_eq!(attr.count(), n);
        }
    }

    #[test]
    fn test_pattern_repeats_in_nine_value_blocks() {
        let mut geometry = geometry_with_vertices(9);
        set_bary_coord(&mut geometry);
        let data = &geometry.attribute(BARY_ATTRIBUTE).unwrap().data;

        for chunk in data.chunks(9) {
            assert_eq!(chunk, &BLOCK[..]);
        }
    }

    #[test]
    fn test_partial_block_is_truncated() {
        let mut geometry = Geometry::plane(2.0, 2.0);
        set_bary_coord(&mut geometry);
        let data = &geometry.attribute(BARY_ATTRIBUTE).unwrap().data;

        assert_eq!(data.len(), 12);
        assert_eq!(&data[..9], &BLOCK[..]);
        assert_eq!(&data[9..], &BLOCK[..3]);
    }

    #[test]
    fn test_replaces_existing_attribute() {
        let mut geometry = Geometry::cuboid(1.0, 1.0, 1.0);
        set_bary_coord(&mut geometry);
        set_bary_coord(&mut geometry);
        assert_eq!(geometry.attributes.len(), 1);
        assert_eq!(geometry.attribute(BARY_ATTRIBUTE).unwrap().data.len(), 72);
    }
}

#[cfg(test)]
mod primitive_tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_unit_cube_bounds() {
        let cube = Geometry::cuboid(1.0, 1.0, 1.0);
        let bounds = cube.bounding_box().unwrap();
        assert_eq!(bounds.min, Vec3::splat(-0.5));
        assert_eq!(bounds.max, Vec3::splat(0.5));
    }

    #[test]
    fn test_plane_is_two_triangles() {
        let plane = Geometry::plane(2.0, 2.0);
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.triangle_count(), 2);
        let bounds = plane.bounding_box().unwrap();
        assert_eq!(bounds.size(), Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn test_computed_normals_face_out() {
        let mut plane = Geometry::plane(1.0, 1.0);
        plane.normals.clear();
        plane.compute_vertex_normals();
        for n in plane.normals.chunks(3) {
            assert!((Vec3::from_slice(n) - Vec3::Z).length() < 1e-6);
        }
    }
}
