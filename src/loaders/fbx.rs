use anyhow::{bail, ensure, Context, Result};
use flate2::read::ZlibDecoder;
use glam::{EulerRot, Quat, Vec3};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use crate::geometry::Geometry;
use crate::material::Material;
use crate::math::Color;
use crate::scene::{Mesh, Model, Transform};

const MAGIC: &[u8] = b"Kaydara FBX Binary  \0";
const HEADER_LEN: usize = 27;
/// Records use 64-bit offsets from this version on
const WIDE_RECORDS_VERSION: u32 = 7500;

/// One property value of an FBX node record
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Raw(Vec<u8>),
    BoolArray(Vec<bool>),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
}

impl Property {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Property::I16(v) => Some(v as f64),
            Property::I32(v) => Some(v as f64),
            Property::I64(v) => Some(v as f64),
            Property::F32(v) => Some(v as f64),
            Property::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Property::I16(v) => Some(v as i64),
            Property::I32(v) => Some(v as i64),
            Property::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(s) => Some(s),
            _ => None,
        }
    }

    fn as_f64_array(&self) -> Option<Vec<f64>> {
        match self {
            Property::F64Array(v) => Some(v.clone()),
            Property::F32Array(v) => Some(v.iter().map(|&x| x as f64).collect()),
            _ => None,
        }
    }

    fn as_i32_array(&self) -> Result<Vec<i32>> {
        match self {
            Property::I32Array(v) => Ok(v.clone()),
            Property::I64Array(v) => v
                .iter()
                .map(|&x| i32::try_from(x).with_context(|| format!("index {x} does not fit in 32 bits")))
                .collect(),
            _ => bail!("expected an integer array"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FbxNode {
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<FbxNode>,
}

impl FbxNode {
    pub fn child(&self, name: &str) -> Option<&FbxNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FbxNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parsed binary FBX document
#[derive(Debug, Clone, PartialEq)]
pub struct FbxDocument {
    pub version: u32,
    pub nodes: Vec<FbxNode>,
}

impl FbxDocument {
    pub fn node(&self, name: &str) -> Option<&FbxNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    wide: bool,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .with_context(|| format!("unexpected end of file at byte {}", self.pos))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    /// Record header field: 32 or 64 bits depending on the file version
    fn offset(&mut self) -> Result<u64> {
        if self.wide {
            self.u64()
        } else {
            self.u32().map(u64::from)
        }
    }

    /// Reads one node record; `None` for the null record closing a list
    fn node(&mut self) -> Result<Option<FbxNode>> {
        let start = self.pos;
        let end_offset = self.offset()? as usize;
        let num_properties = self.offset()?;
        let _property_list_len = self.offset()?;
        let name_len = self.u8()? as usize;
        let name = String::from_utf8_lossy(self.take(name_len)?).into_owned();

        if end_offset == 0 {
            return Ok(None);
        }
        ensure!(
            end_offset > start && end_offset <= self.data.len(),
            "node {name:?} at byte {start} has bad end offset {end_offset}"
        );

        let mut properties = Vec::with_capacity(num_properties.min(1024) as usize);
        for _ in 0..num_properties {
            properties.push(self.property().with_context(|| format!("in node {name:?}"))?);
        }
        ensure!(self.pos <= end_offset, "properties of node {name:?} overrun its end offset");

        let mut children = Vec::new();
        while self.pos < end_offset {
            match self.node()? {
                Some(child) => children.push(child),
                None => break,
            }
        }
        ensure!(self.pos <= end_offset, "children of node {name:?} overrun its end offset");
        self.pos = end_offset;

        Ok(Some(FbxNode {
            name,
            properties,
            children,
        }))
    }

    fn property(&mut self) -> Result<Property> {
        let code = self.u8()?;
        Ok(match code {
            b'C' => Property::Bool(self.u8()? != 0),
            b'Y' => Property::I16(i16::from_le_bytes(self.array()?)),
            b'I' => Property::I32(i32::from_le_bytes(self.array()?)),
            b'L' => Property::I64(i64::from_le_bytes(self.array()?)),
            b'F' => Property::F32(f32::from_le_bytes(self.array()?)),
            b'D' => Property::F64(f64::from_le_bytes(self.array()?)),
            b'S' => {
                let len = self.u32()? as usize;
                Property::String(String::from_utf8_lossy(self.take(len)?).into_owned())
            }
            b'R' => {
                let len = self.u32()? as usize;
                Property::Raw(self.take(len)?.to_vec())
            }
            b'b' => Property::BoolArray(self.array_data(1)?.iter().map(|&b| b != 0).collect()),
            b'i' => Property::I32Array(
                self.array_data(4)?
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            b'l' => Property::I64Array(
                self.array_data(8)?
                    .chunks_exact(8)
                    .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            b'f' => Property::F32Array(
                self.array_data(4)?
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            b'd' => Property::F64Array(
                self.array_data(8)?
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            other => bail!("unknown property type {:?} at byte {}", other as char, self.pos - 1),
        })
    }

    /// Raw element bytes of an array property, inflated when compressed
    fn array_data(&mut self, element_size: usize) -> Result<Vec<u8>> {
        let length = self.u32()? as usize;
        let encoding = self.u32()?;
        let compressed_len = self.u32()? as usize;
        let expected = length
            .checked_mul(element_size)
            .context("array length overflow")?;

        let bytes = match encoding {
            0 => self.take(expected)?.to_vec(),
            1 => {
                let mut out = Vec::new();
                // One byte past `expected` is enough to spot an oversized stream
                ZlibDecoder::new(self.take(compressed_len)?)
                    .take(expected as u64 + 1)
                    .read_to_end(&mut out)
                    .context("corrupt zlib array")?;
                out
            }
            other => bail!("unknown array encoding {other}"),
        };
        ensure!(
            bytes.len() == expected,
            "array holds {} bytes, expected {}",
            bytes.len(),
            expected
        );
        Ok(bytes)
    }
}

/// Parses the node tree of a binary FBX file
pub fn parse_document(data: &[u8]) -> Result<FbxDocument> {
    if data.starts_with(b"; FBX") {
        bail!("ASCII FBX is not supported");
    }
    ensure!(
        data.len() >= HEADER_LEN && data.starts_with(MAGIC),
        "not a binary FBX file"
    );

    let version = u32::from_le_bytes([data[23], data[24], data[25], data[26]]);
    let mut reader = Reader {
        data,
        pos: HEADER_LEN,
        wide: version >= WIDE_RECORDS_VERSION,
    };

    let record_header = if reader.wide { 25 } else { 13 };
    let mut nodes = Vec::new();
    while reader.pos + record_header <= data.len() {
        match reader.node()? {
            Some(node) => nodes.push(node),
            None => break,
        }
    }

    Ok(FbxDocument { version, nodes })
}

/// Values of a `Properties70` entry, keyed by property name
fn properties70(node: &FbxNode) -> HashMap<&str, &[Property]> {
    node.child("Properties70")
        .map(|props| {
            props
                .children_named("P")
                .filter_map(|p| {
                    let name = p.properties.first()?.as_str()?;
                    Some((name, p.properties.get(4..).unwrap_or(&[])))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn vec3_of(values: &[Property]) -> Option<Vec3> {
    match values {
        [x, y, z, ..] => Some(Vec3::new(x.as_f64()? as f32, y.as_f64()? as f32, z.as_f64()? as f32)),
        _ => None,
    }
}

/// Object name without the `\0\x01Class` suffix
fn object_name(node: &FbxNode) -> String {
    node.properties
        .get(1)
        .and_then(Property::as_str)
        .map(|s| s.split('\0').next().unwrap_or_default().to_string())
        .unwrap_or_default()
}

fn object_id(node: &FbxNode) -> Option<i64> {
    node.properties.first()?.as_i64()
}

/// Mesh geometry: `Vertices` plus fan-triangulated `PolygonVertexIndex`
fn read_geometry(node: &FbxNode) -> Result<Geometry> {
    let positions: Vec<f32> = node
        .child("Vertices")
        .and_then(|v| v.properties.first())
        .and_then(Property::as_f64_array)
        .context("geometry has no Vertices")?
        .into_iter()
        .map(|v| v as f32)
        .collect();
    let polygon_indices = node
        .child("PolygonVertexIndex")
        .and_then(|v| v.properties.first())
        .context("geometry has no PolygonVertexIndex")?
        .as_i32_array()
        .context("bad PolygonVertexIndex")?;

    let vertex_count = positions.len() / 3;
    let mut indices = Vec::with_capacity(polygon_indices.len());
    let mut polygon: Vec<u32> = Vec::new();

    for raw in polygon_indices {
        // A negative index closes the polygon and encodes `!index`
        let (index, last) = if raw < 0 { (!raw, true) } else { (raw, false) };
        ensure!(
            (index as usize) < vertex_count,
            "polygon index {index} out of range ({vertex_count} vertices)"
        );
        polygon.push(index as u32);
        if last {
            for i in 1..polygon.len().saturating_sub(1) {
                indices.extend_from_slice(&[polygon[0], polygon[i], polygon[i + 1]]);
            }
            polygon.clear();
        }
    }

    let mut geometry = Geometry::new(positions, Vec::new(), Some(indices));
    geometry.compute_vertex_normals();
    Ok(geometry)
}

fn read_transform(node: &FbxNode) -> Transform {
    let props = properties70(node);
    let position = props.get("Lcl Translation").and_then(|v| vec3_of(v)).unwrap_or(Vec3::ZERO);
    let rotation = props
        .get("Lcl Rotation")
        .and_then(|v| vec3_of(v))
        .map(|deg| {
            let r = deg * (std::f32::consts::PI / 180.0);
            Quat::from_euler(EulerRot::ZYX, r.z, r.y, r.x)
        })
        .unwrap_or(Quat::IDENTITY);
    let scale = props.get("Lcl Scaling").and_then(|v| vec3_of(v)).unwrap_or(Vec3::ONE);
    Transform {
        position,
        rotation,
        scale,
    }
}

fn read_material(node: &FbxNode) -> Material {
    let props = properties70(node);
    let color = props
        .get("DiffuseColor")
        .or_else(|| props.get("Diffuse"))
        .and_then(|v| vec3_of(v))
        .map(|c| Color::new(c.x, c.y, c.z))
        .unwrap_or(Color::WHITE);
    Material::standard(color)
}

/// Builds the model tree from a parsed document
pub fn build_model(document: &FbxDocument, name: &str) -> Result<Model> {
    let objects = document.node("Objects").context("FBX file has no Objects section")?;

    let mut geometries = HashMap::new();
    let mut materials = HashMap::new();
    let mut models = HashMap::new();
    let mut model_order = Vec::new();

    for object in &objects.children {
        let Some(id) = object_id(object) else {
            continue;
        };
        match object.name.as_str() {
            "Geometry" => {
                let geometry = read_geometry(object).with_context(|| format!("geometry {id}"))?;
                geometries.insert(id, geometry);
            }
            "Material" => {
                materials.insert(id, read_material(object));
            }
            "Model" => {
                models.insert(
                    id,
                    Model {
                        name: object_name(object),
                        transform: read_transform(object),
                        ..Default::default()
                    },
                );
                model_order.push(id);
            }
            _ => {}
        }
    }

    // (child, parent) object links
    let links: Vec<(i64, i64)> = document
        .node("Connections")
        .map(|c| {
            c.children_named("C")
                .filter(|c| c.properties.first().and_then(Property::as_str) == Some("OO"))
                .filter_map(|c| Some((c.properties.get(1)?.as_i64()?, c.properties.get(2)?.as_i64()?)))
                .collect()
        })
        .unwrap_or_default();

    let mut model_parent: HashMap<i64, i64> = HashMap::new();
    let mut model_geometry: HashMap<i64, Geometry> = HashMap::new();
    let mut model_material: HashMap<i64, Material> = HashMap::new();
    for &(child, parent) in &links {
        if models.contains_key(&child) {
            model_parent.insert(child, parent);
        } else if let (Some(geometry), true) = (geometries.get(&child), models.contains_key(&parent)) {
            model_geometry.insert(parent, geometry.clone());
        } else if let (Some(material), true) = (materials.get(&child), models.contains_key(&parent)) {
            model_material.entry(parent).or_insert_with(|| material.clone());
        }
    }

    for (id, geometry) in model_geometry {
        if let Some(model) = models.get_mut(&id) {
            let material = model_material.remove(&id).unwrap_or_default();
            model.mesh = Some(Mesh { geometry, material });
        }
    }

    let model_ids: HashSet<i64> = models.keys().copied().collect();
    let children_of = |parent: i64| -> Vec<i64> {
        model_order
            .iter()
            .copied()
            .filter(|id| {
                let p = model_parent.get(id).copied().unwrap_or(0);
                // Unknown parents attach to the root
                if parent == 0 {
                    p == 0 || !model_ids.contains(&p)
                } else {
                    p == parent
                }
            })
            .collect()
    };

    fn assemble(
        id: i64,
        models: &mut HashMap<i64, Model>,
        children_of: &dyn Fn(i64) -> Vec<i64>,
        depth: usize,
    ) -> Option<Model> {
        let mut model = models.remove(&id)?;
        if depth < 256 {
            for child in children_of(id) {
                if let Some(child) = assemble(child, models, children_of, depth + 1) {
                    model.children.push(child);
                }
            }
        }
        Some(model)
    }

    let mut root = Model::group(name);
    let top_level = children_of(0);
    for id in top_level {
        if let Some(model) = assemble(id, &mut models, &children_of, 0) {
            root.children.push(model);
        }
    }

    // Geometry never linked to a model still shows up
    let linked: Vec<i64> = links.iter().map(|&(child, _)| child).collect();
    let mut orphans: Vec<_> = geometries.into_iter().filter(|(id, _)| !linked.contains(id)).collect();
    orphans.sort_by_key(|(id, _)| *id);
    for (id, geometry) in orphans {
        root.children.push(Model {
            name: format!("Geometry{id}"),
            mesh: Some(Mesh {
                geometry,
                material: Material::default(),
            }),
            ..Default::default()
        });
    }

    Ok(root)
}

/// Parses a binary FBX from memory
pub fn parse_fbx(data: &[u8], name: &str) -> Result<Model> {
    let document = parse_document(data)?;
    log::debug!("FBX version {}, {} top-level nodes", document.version, document.nodes.len());
    build_model(&document, name)
}

/// Loads a binary FBX file as a detached model tree
pub fn load_fbx(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    log::info!("Loading FBX file: {:?}", path);
    let data = std::fs::read(path).context(format!("Failed to read FBX file: {:?}", path))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let model = parse_fbx(&data, &name).context(format!("Failed to parse FBX file: {:?}", path))?;
    log::debug!("FBX {:?}: {} meshes", path, model.mesh_count());
    Ok(model)
}
