// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resolved material descriptions.
//!
//! A [`MaterialDescriptor`] is what the host's material resolver hands back and
//! what the renderer compiles into a shader. Its [`content_hash`] is the
//! identity used by the shader cache, so every field that changes the rendered
//! result must be fed into it.
//!
//! [`content_hash`]: MaterialDescriptor::content_hash

use super::environment::LinearWorkflow;
use super::ids::MaterialHash;
use crate::hash::{ContentHash, ContentHasher};
use glam::{Mat4, Vec3};
use std::collections::BTreeMap;

/// A texture reference used by materials and decals.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSlot {
    /// Host-side texture identifier (file path or embedded name).
    pub source: String,
    /// Blend amount of the texture over the base value, `0.0..=1.0`.
    pub amount: f32,
    /// Whether the texture is enabled.
    pub enabled: bool,
}

impl ContentHash for TextureSlot {
    fn feed(&self, h: &mut ContentHasher) {
        h.write_str(&self.source)
            .write_f32(self.amount)
            .write_bool(self.enabled);
    }
}

/// A physically based material.
#[derive(Debug, Clone, PartialEq)]
pub struct PbrMaterial {
    /// Linear base color.
    pub base_color: Vec3,
    /// Metalness, `0.0..=1.0`.
    pub metallic: f32,
    /// Roughness, `0.0..=1.0`.
    pub roughness: f32,
    /// Emission color (black for none).
    pub emission: Vec3,
    /// Opacity, `1.0` is fully opaque.
    pub opacity: f32,
    /// Index of refraction.
    pub ior: f32,
    /// Optional base color texture.
    pub base_color_texture: Option<TextureSlot>,
    /// Optional bump/normal texture.
    pub bump_texture: Option<TextureSlot>,
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            base_color: Vec3::splat(0.8),
            metallic: 0.0,
            roughness: 0.5,
            emission: Vec3::ZERO,
            opacity: 1.0,
            ior: 1.45,
            base_color_texture: None,
            bump_texture: None,
        }
    }
}

impl ContentHash for PbrMaterial {
    fn feed(&self, h: &mut ContentHasher) {
        h.write_vec3(self.base_color)
            .write_f32(self.metallic)
            .write_f32(self.roughness)
            .write_vec3(self.emission)
            .write_f32(self.opacity)
            .write_f32(self.ior);
        feed_optional(h, self.base_color_texture.as_ref());
        feed_optional(h, self.bump_texture.as_ref());
    }
}

/// A parameter value of a custom material.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Scalar parameter.
    Float(f32),
    /// Color or vector parameter.
    Vec3(Vec3),
    /// Toggle parameter.
    Bool(bool),
    /// Texture parameter.
    Texture(TextureSlot),
}

impl ContentHash for ParamValue {
    fn feed(&self, h: &mut ContentHasher) {
        match self {
            ParamValue::Float(v) => {
                h.write_tag(0).write_f32(*v);
            }
            ParamValue::Vec3(v) => {
                h.write_tag(1).write_vec3(*v);
            }
            ParamValue::Bool(v) => {
                h.write_tag(2).write_bool(*v);
            }
            ParamValue::Texture(t) => {
                h.write_tag(3).write(t);
            }
        }
    }
}

/// A material described by a named shader template and a parameter set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomMaterial {
    /// Name of the shader template.
    pub template: String,
    /// Named parameters; ordered so hashing is deterministic.
    pub params: BTreeMap<String, ParamValue>,
}

impl ContentHash for CustomMaterial {
    fn feed(&self, h: &mut ContentHasher) {
        h.write_str(&self.template);
        h.write_u32(self.params.len() as u32);
        for (name, value) in &self.params {
            h.write_str(name).write(value);
        }
    }
}

/// A mix of two materials.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendMaterial {
    /// First input.
    pub first: Box<MaterialKind>,
    /// Second input.
    pub second: Box<MaterialKind>,
    /// Mix factor, `0.0` is all `first`.
    pub factor: f32,
    /// Optional mask texture driving the factor.
    pub mask: Option<TextureSlot>,
}

impl ContentHash for BlendMaterial {
    fn feed(&self, h: &mut ContentHasher) {
        h.write(self.first.as_ref())
            .write(self.second.as_ref())
            .write_f32(self.factor);
        feed_optional(h, self.mask.as_ref());
    }
}

/// A material carried as renderer-native shader source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NativeMaterial {
    /// Serialized shader graph in the renderer's own format.
    pub source: String,
}

impl ContentHash for NativeMaterial {
    fn feed(&self, h: &mut ContentHasher) {
        h.write_str(&self.source);
    }
}

/// The closed set of material categories the renderer knows how to build.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Physically based material.
    Pbr(PbrMaterial),
    /// Template plus parameters.
    Custom(CustomMaterial),
    /// Mix of two materials.
    Blend(BlendMaterial),
    /// Renderer-native shader graph.
    Native(NativeMaterial),
}

impl MaterialKind {
    /// Short category name, for logging.
    pub fn category(&self) -> &'static str {
        match self {
            MaterialKind::Pbr(_) => "pbr",
            MaterialKind::Custom(_) => "custom",
            MaterialKind::Blend(_) => "blend",
            MaterialKind::Native(_) => "native",
        }
    }
}

impl Default for MaterialKind {
    fn default() -> Self {
        MaterialKind::Pbr(PbrMaterial::default())
    }
}

impl ContentHash for MaterialKind {
    fn feed(&self, h: &mut ContentHasher) {
        match self {
            MaterialKind::Pbr(m) => {
                h.write_tag(0).write(m);
            }
            MaterialKind::Custom(m) => {
                h.write_tag(1).write(m);
            }
            MaterialKind::Blend(m) => {
                h.write_tag(2).write(m);
            }
            MaterialKind::Native(m) => {
                h.write_tag(3).write(m);
            }
        }
    }
}

/// How a decal is projected onto the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecalMapping {
    /// Planar projection.
    Planar,
    /// Cylindrical projection.
    Cylindrical,
    /// Spherical projection.
    Spherical,
    /// Uses the mesh's own texture coordinates.
    UvMapped,
}

/// A texture projected onto an object on top of its material.
#[derive(Debug, Clone, PartialEq)]
pub struct Decal {
    /// The projected texture.
    pub texture: TextureSlot,
    /// Projection type.
    pub mapping: DecalMapping,
    /// Projection transform in object space.
    pub transform: Mat4,
    /// Decal opacity.
    pub opacity: f32,
}

impl ContentHash for Decal {
    fn feed(&self, h: &mut ContentHasher) {
        h.write(&self.texture)
            .write_tag(self.mapping as u8)
            .write_mat4(&self.transform)
            .write_f32(self.opacity);
    }
}

/// A fully resolved material, ready to be compiled into a renderer shader.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDescriptor {
    /// Display name. Not part of the content hash.
    pub name: String,
    /// The material category and its parameters.
    pub kind: MaterialKind,
    /// Decals layered over the material.
    pub decals: Vec<Decal>,
    /// Texture-space transform applied to every texture of the material.
    pub texture_transform: Mat4,
}

impl MaterialDescriptor {
    /// Creates a descriptor without decals and with an identity texture transform.
    pub fn new(name: impl Into<String>, kind: MaterialKind) -> Self {
        Self {
            name: name.into(),
            kind,
            decals: Vec::new(),
            texture_transform: Mat4::IDENTITY,
        }
    }

    /// Computes the render hash of this material under the given gamma settings.
    ///
    /// The name is deliberately left out: two differently named materials that
    /// render the same share one renderer shader.
    pub fn content_hash(&self, workflow: &LinearWorkflow) -> MaterialHash {
        let mut h = ContentHasher::new();
        h.write(&self.kind);
        h.write_u32(self.decals.len() as u32);
        for decal in &self.decals {
            h.write(decal);
        }
        h.write_mat4(&self.texture_transform);
        h.write(workflow);
        h.finish()
    }
}

fn feed_optional<T: ContentHash>(h: &mut ContentHasher, value: Option<&T>) {
    match value {
        Some(v) => {
            h.write_tag(1).write(v);
        }
        None => {
            h.write_tag(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> MaterialDescriptor {
        MaterialDescriptor::new(
            "red",
            MaterialKind::Pbr(PbrMaterial {
                base_color: Vec3::new(1.0, 0.0, 0.0),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn identical_materials_with_different_names_share_a_hash() {
        let workflow = LinearWorkflow::default();
        let mut other = red();
        other.name = "also red".into();
        assert_eq!(red().content_hash(&workflow), other.content_hash(&workflow));
    }

    #[test]
    fn gamma_is_part_of_the_hash() {
        let a = LinearWorkflow::default();
        let b = LinearWorkflow {
            gamma: 1.0,
            ..LinearWorkflow::default()
        };
        assert_ne!(red().content_hash(&a), red().content_hash(&b));
    }

    #[test]
    fn decals_are_part_of_the_hash() {
        let workflow = LinearWorkflow::default();
        let mut decorated = red();
        decorated.decals.push(Decal {
            texture: TextureSlot {
                source: "logo.png".into(),
                amount: 1.0,
                enabled: true,
            },
            mapping: DecalMapping::Planar,
            transform: Mat4::IDENTITY,
            opacity: 1.0,
        });
        assert_ne!(
            red().content_hash(&workflow),
            decorated.content_hash(&workflow)
        );
    }

    #[test]
    fn categories_with_equal_payload_shape_hash_apart() {
        let workflow = LinearWorkflow::default();
        let custom = MaterialDescriptor::new(
            "x",
            MaterialKind::Custom(CustomMaterial {
                template: "glass".into(),
                params: BTreeMap::new(),
            }),
        );
        let native = MaterialDescriptor::new(
            "x",
            MaterialKind::Native(NativeMaterial {
                source: "glass".into(),
            }),
        );
        assert_ne!(
            custom.content_hash(&workflow),
            native.content_hash(&workflow)
        );
    }
}
