use std::fs;
use std::path::Path;

use glam::Vec3;
use scene_base::core::FixedViewport;
use scene_base::loaders::load_gltf;
use scene_base::render::HeadlessRenderer;
use scene_base::{ControllerConfig, SceneController, SceneError};

type Controller = SceneController<HeadlessRenderer, FixedViewport>;

fn controller() -> Controller {
    Controller::init(FixedViewport::new(320.0, 240.0, 1.0), ControllerConfig::default()).unwrap()
}

/// One red triangle under a translated node, positions in a side `.bin`
fn write_triangle_gltf(dir: &Path) -> std::path::PathBuf {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let bytes: Vec<u8> = positions.iter().flat_map(|p| p.to_le_bytes()).collect();
    fs::write(dir.join("triangle.bin"), &bytes).unwrap();

    let json = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "name": "demo", "nodes": [0] }],
        "nodes": [{ "name": "triangle", "mesh": 0, "translation": [1.0, 2.0, 3.0] }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }] }],
        "materials": [{ "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } }],
        "buffers": [{ "uri": "triangle.bin", "byteLength": 36 }],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }]
    }"#;
    let path = dir.join("triangle.gltf");
    fs::write(&path, json).unwrap();
    path
}

/// Triangle whose index buffer points past its three vertices
fn write_bad_index_gltf(dir: &Path) -> std::path::PathBuf {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let normals: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let indices: [u16; 3] = [0, 1, 9];
    let mut bytes: Vec<u8> = positions.iter().chain(normals.iter()).flat_map(|p| p.to_le_bytes()).collect();
    bytes.extend(indices.iter().flat_map(|i| i.to_le_bytes()));
    fs::write(dir.join("bad.bin"), &bytes).unwrap();

    let json = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "bad", "mesh": 0 }],
        "meshes": [{ "name": "bad", "primitives": [{ "attributes": { "POSITION": 0, "NORMAL": 1 }, "indices": 2 }] }],
        "buffers": [{ "uri": "bad.bin", "byteLength": 78 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 72, "byteLength": 6 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    }"#;
    let path = dir.join("bad.gltf");
    fs::write(&path, json).unwrap();
    path
}

#[cfg(test)]
mod gltf_tests {
    use super::*;

    #[test]
    fn test_load_gltf_keeps_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle_gltf(dir.path());

        let model = load_gltf(&path).unwrap();
        assert_eq!(model.name, "demo");
        assert_eq!(model.mesh_count(), 1);

        let node = &model.children[0];
        assert_eq!(node.name, "triangle");
        assert_eq!(node.transform.position, Vec3::new(1.0, 2.0, 3.0));

        let mesh = node.mesh.as_ref().unwrap();
        assert_eq!(mesh.geometry.vertex_count(), 3);
        assert_eq!(mesh.geometry.normals.len(), 9, "missing normals are computed");
        assert_eq!(mesh.material.base_color(), scene_base::math::Color::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_load_model_through_controller() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle_gltf(dir.path());
        let mut controller = controller();
        let before = controller.scene().meshes().count();

        let model = pollster::block_on(controller.load_model(path)).unwrap();
        let root = controller.scene().root();
        let id = controller.scene_mut().add_model(root, model);

        assert_eq!(controller.scene().meshes().count(), before + 1);
        assert_eq!(controller.scene().node(id).unwrap().name, "demo");
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bad_index_gltf(dir.path());

        let err = load_gltf(&path).unwrap_err();
        assert!(format!("{err:#}").contains("index past"), "error: {err:#}");

        let controller = controller();
        match pollster::block_on(controller.load_model(path)).unwrap_err() {
            SceneError::AssetLoad { reason, .. } => assert!(reason.contains("index past"), "reason: {reason}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_load_model_failure_keeps_path() {
        let controller = controller();
        let err = pollster::block_on(controller.load_model("missing/robot.glb")).unwrap_err();
        match err {
            SceneError::AssetLoad { path, reason } => {
                assert!(path.ends_with("robot.glb"));
                assert!(reason.contains("glTF"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[cfg(test)]
mod fbx_tests {
    use super::*;

    #[test]
    fn test_ascii_fbx_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ascii.fbx");
        fs::write(&path, "; FBX 7.4.0 project file\nFBXHeaderExtension:  {\n}\n").unwrap();

        let err = pollster::block_on(controller().load_fbx_model(path)).unwrap_err();
        match err {
            SceneError::AssetLoad { reason, .. } => assert!(reason.contains("ASCII"), "reason: {reason}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_fbx_is_asset_error() {
        let err = pollster::block_on(controller().load_fbx_model("nowhere/model.fbx")).unwrap_err();
        assert!(matches!(err, SceneError::AssetLoad { .. }));
    }
}

#[cfg(all(test, feature = "audio"))]
mod audio_tests {
    use super::*;

    fn mono_wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_load_audio_sets_sound_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beep.wav");
        let samples: Vec<i16> = (0..4410).map(|i| ((i % 100) * 300) as i16).collect();
        fs::write(&path, mono_wav(44100, &samples)).unwrap();

        let mut controller = controller();
        controller.create_audio_source();
        let buffer = pollster::block_on(controller.load_audio(path)).unwrap();

        assert_eq!(buffer.sample_rate, 44100);
        assert_eq!(buffer.samples.len(), 4410);
        let sound = controller.sound().unwrap();
        assert_eq!(sound.buffer(), Some(&buffer));
    }

    #[test]
    fn test_load_audio_failure_is_reported() {
        let mut controller = controller();
        let err = pollster::block_on(controller.load_audio("missing/beep.wav")).unwrap_err();
        assert!(matches!(err, SceneError::AssetLoad { .. }));
        assert!(controller.sound().is_none(), "no source is created for a failed load");
    }
}
