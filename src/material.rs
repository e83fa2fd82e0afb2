use std::collections::BTreeMap;

use glam::{Vec2, Vec3};

use crate::math::Color;

/// Colour of the default mesh material
pub const DEFAULT_MESH_COLOR: u32 = 0xd9dfc8;

/// Uniform name updated with the window size by the resize path
pub const RESOLUTION_UNIFORM: &str = "uResolution";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Color(Color),
}

/// Custom-shaded material; the renderer only reads the `color`/`u_color`
/// uniform when present, everything else is carried for the caller's hooks
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderMaterial {
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl ShaderMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uniform(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.uniforms.insert(name.into(), value);
        self
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    pub fn set_uniform(&mut self, name: impl Into<String>, value: UniformValue) {
        self.uniforms.insert(name.into(), value);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Physically based material; only base colour is shaded
    Standard {
        color: Color,
        roughness: f32,
        metalness: f32,
    },
    Shader(ShaderMaterial),
}

impl Material {
    pub fn standard(color: Color) -> Self {
        Material::Standard {
            color,
            roughness: 1.0,
            metalness: 0.0,
        }
    }

    /// Colour fed to the lit pass
    pub fn base_color(&self) -> Color {
        match self {
            Material::Standard { color, .. } => *color,
            Material::Shader(shader) => match shader
                .uniform("u_color")
                .or_else(|| shader.uniform("color"))
            {
                Some(UniformValue::Color(c)) => *c,
                Some(UniformValue::Vec3(v)) => Color::new(v.x, v.y, v.z),
                _ => Color::WHITE,
            },
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::standard(Color::from_hex(DEFAULT_MESH_COLOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_material_color() {
        let material = Material::default();
        assert_eq!(material.base_color(), Color::parse("#d9dfc8").unwrap());
    }

    #[test]
    fn test_shader_base_color_from_uniform() {
        let shader = ShaderMaterial::new().with_uniform("u_color", UniformValue::Vec3(Vec3::new(0.1, 0.2, 0.3)));
        assert_eq!(Material::Shader(shader).base_color(), Color::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn test_shader_without_color_is_white() {
        assert_eq!(Material::Shader(ShaderMaterial::new()).base_color(), Color::WHITE);
    }
}
