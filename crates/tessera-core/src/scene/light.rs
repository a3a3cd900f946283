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

//! Defines light descriptors for the synchronization layer.
//!
//! Lights are keyed by a stable [`LightId`]. Whether a descriptor creates or
//! updates a renderer light is decided at upload time against the persisted
//! id-to-handle map, never here.

use super::environment::EnvironmentDescriptor;
use super::ids::LightId;
use crate::hash::{ContentHash, ContentHasher};
use glam::{Mat4, Vec3};

/// The shape of a light source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Omnidirectional point light at the transform's origin.
    Point,
    /// Cone light along the transform's `-Z` axis.
    Spot {
        /// Half angle of the full-intensity cone, in radians.
        inner_angle: f32,
        /// Half angle at which the light falls off to zero, in radians.
        outer_angle: f32,
    },
    /// Infinitely distant light along the transform's `-Z` axis.
    Directional,
    /// Rectangular area light in the transform's XY plane.
    Rectangular {
        /// Extent along X.
        width: f32,
        /// Extent along Y.
        height: f32,
    },
    /// Tube light along the transform's X axis.
    Linear {
        /// Length of the tube.
        length: f32,
    },
    /// The synthetic environment light. Reserved for [`LightId::BACKGROUND`].
    Background,
}

/// A light as delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct LightDescriptor {
    /// Stable identity.
    pub id: LightId,
    /// Shape and shape-specific parameters.
    pub kind: LightKind,
    /// Linear color.
    pub color: Vec3,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Light-to-world transform.
    pub transform: Mat4,
    /// Whether the light is on.
    pub enabled: bool,
    /// Whether the light casts shadows.
    pub cast_shadows: bool,
}

impl LightDescriptor {
    /// Creates an enabled, shadow-casting light.
    pub fn new(id: LightId, kind: LightKind, color: Vec3, intensity: f32, transform: Mat4) -> Self {
        Self {
            id,
            kind,
            color,
            intensity,
            transform,
            enabled: true,
            cast_shadows: true,
        }
    }

    /// Builds the synthetic background light from the environment record.
    pub fn background(environment: &EnvironmentDescriptor) -> Self {
        Self {
            id: LightId::BACKGROUND,
            kind: LightKind::Background,
            color: Vec3::ONE,
            intensity: environment.skylight_strength,
            transform: Mat4::IDENTITY,
            enabled: environment.skylight_enabled,
            cast_shadows: false,
        }
    }

    /// Render hash of the light's visual parameters.
    pub fn render_hash(&self) -> u32 {
        let mut h = ContentHasher::new();
        h.write(self);
        h.finish().0
    }
}

impl ContentHash for LightKind {
    fn feed(&self, h: &mut ContentHasher) {
        match *self {
            LightKind::Point => {
                h.write_tag(0);
            }
            LightKind::Spot {
                inner_angle,
                outer_angle,
            } => {
                h.write_tag(1).write_f32(inner_angle).write_f32(outer_angle);
            }
            LightKind::Directional => {
                h.write_tag(2);
            }
            LightKind::Rectangular { width, height } => {
                h.write_tag(3).write_f32(width).write_f32(height);
            }
            LightKind::Linear { length } => {
                h.write_tag(4).write_f32(length);
            }
            LightKind::Background => {
                h.write_tag(5);
            }
        }
    }
}

impl ContentHash for LightDescriptor {
    fn feed(&self, h: &mut ContentHasher) {
        h.write(&self.kind)
            .write_vec3(self.color)
            .write_f32(self.intensity)
            .write_mat4(&self.transform)
            .write_bool(self.enabled)
            .write_bool(self.cast_shadows);
    }
}
