use glam::{Mat4, Quat, Vec3};

use crate::geometry::Geometry;
use crate::material::Material;
use crate::math::Color;

/// Handle to a node inside a [`Scene`]; equality is object identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: Material,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    /// Shines from the node position towards the origin
    DirectionalLight(Light),
    AmbientLight(Light),
    /// Debug axes of the given length (x red, y green, z blue)
    AxesHelper { size: f32 },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            kind,
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// Detached node tree produced by the model loaders
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub children: Vec<Model>,
}

impl Model {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Meshes in this tree, root included
    pub fn mesh_count(&self) -> usize {
        self.mesh.is_some() as usize + self.children.iter().map(Model::mesh_count).sum::<usize>()
    }
}

/// Arena scene graph rooted at [`Scene::root`]
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<Node>,
    pub background: Option<Color>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("Scene", NodeKind::Group)],
            background: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Appends `node` under `parent`. An unknown parent falls back to the root.
    pub fn add(&mut self, parent: NodeId, node: Node) -> NodeId {
        let parent = if self.contains(parent) {
            parent
        } else {
            log::warn!("unknown parent {:?}, adding {:?} under the root", parent, node.name);
            self.root()
        };
        self.attach(parent, node)
    }

    /// Like [`Scene::add`], but `None` when `parent` is not in this scene
    pub fn try_add(&mut self, parent: NodeId, node: Node) -> Option<NodeId> {
        self.contains(parent).then(|| self.attach(parent, node))
    }

    fn attach(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Convenience for `add(root, node)`
    pub fn add_to_root(&mut self, node: Node) -> NodeId {
        self.add(self.root(), node)
    }

    /// Inserts a loaded model tree; returns the id of its top node
    pub fn add_model(&mut self, parent: NodeId, model: Model) -> NodeId {
        let kind = match model.mesh {
            Some(mesh) => NodeKind::Mesh(mesh),
            None => NodeKind::Group,
        };
        let mut node = Node::new(model.name, kind);
        node.transform = model.transform;
        let id = self.add(parent, node);
        for child in model.children {
            self.add_model(id, child);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    /// All nodes below `id` in depth-first pre-order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Local-to-world matrix, composing every ancestor
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.node(id);
        while let Some(node) = current {
            matrix = node.transform.matrix() * matrix;
            current = node.parent.and_then(|p| self.node(p));
        }
        matrix
    }

    /// Visible all the way up to the root
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = self.node(id);
        while let Some(node) = current {
            if !node.visible {
                return false;
            }
            current = node.parent.and_then(|p| self.node(p));
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &Mesh)> {
        self.iter().filter_map(|(id, n)| n.mesh().map(|m| (id, m)))
    }

    /// Sum of ambient contributions
    pub fn ambient_light(&self) -> Vec3 {
        self.iter()
            .filter_map(|(_, n)| match &n.kind {
                NodeKind::AmbientLight(light) => Some(Vec3::from_array(light.color.to_array()) * light.intensity),
                _ => None,
            })
            .sum()
    }

    /// (direction the light travels, radiance) for every directional light
    pub fn directional_lights(&self) -> Vec<(Vec3, Vec3)> {
        self.iter()
            .filter_map(|(id, n)| match &n.kind {
                NodeKind::DirectionalLight(light) => {
                    let position = self.world_matrix(id).transform_point3(Vec3::ZERO);
                    let direction = (-position).normalize_or(Vec3::NEG_Y);
                    Some((direction, Vec3::from_array(light.color.to_array()) * light.intensity))
                }
                _ => None,
            })
            .collect()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
