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

//! Scene-wide state: gamma, background/environment, ground plane and
//! clipping planes.

use super::ids::{ClippingPlaneId, MaterialId};
use crate::hash::{ContentHash, ContentHasher};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Linear-workflow gamma settings.
///
/// Gamma takes part in every material's render hash, so a change here
/// re-keys every material in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearWorkflow {
    /// Whether textures and colors are linearized before shading.
    pub enabled: bool,
    /// The gamma value used for linearization.
    pub gamma: f32,
}

impl Default for LinearWorkflow {
    fn default() -> Self {
        Self {
            enabled: true,
            gamma: 2.2,
        }
    }
}

impl LinearWorkflow {
    /// The gamma actually applied: `1.0` when the workflow is disabled.
    pub fn effective_gamma(&self) -> f32 {
        if self.enabled {
            self.gamma
        } else {
            1.0
        }
    }
}

impl ContentHash for LinearWorkflow {
    fn feed(&self, h: &mut ContentHasher) {
        h.write_f32(self.effective_gamma());
    }
}

/// An image-based environment map.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentTexture {
    /// Host-side texture identifier.
    pub source: String,
    /// Intensity multiplier.
    pub strength: f32,
    /// Rotation around the up axis, in radians.
    pub rotation: f32,
}

/// How the visible background is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundStyle {
    /// Single color.
    SolidColor(Vec3),
    /// Vertical two-color gradient.
    Gradient {
        /// Color at the top of the view.
        top: Vec3,
        /// Color at the bottom of the view.
        bottom: Vec3,
    },
    /// The background texture is visible to the camera.
    Environment,
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        BackgroundStyle::SolidColor(Vec3::splat(0.1))
    }
}

/// The single background/environment record of the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentDescriptor {
    /// What the camera sees behind the scene.
    pub background: BackgroundStyle,
    /// Texture seen by the camera when the style is
    /// [`BackgroundStyle::Environment`].
    pub background_texture: Option<EnvironmentTexture>,
    /// Texture used for reflections.
    pub reflection_texture: Option<EnvironmentTexture>,
    /// Texture used for sky lighting.
    pub skylight_texture: Option<EnvironmentTexture>,
    /// Whether the environment lights the scene.
    pub skylight_enabled: bool,
    /// Strength of the sky lighting.
    pub skylight_strength: f32,
}

impl Default for EnvironmentDescriptor {
    fn default() -> Self {
        Self {
            background: BackgroundStyle::default(),
            background_texture: None,
            reflection_texture: None,
            skylight_texture: None,
            skylight_enabled: true,
            skylight_strength: 1.0,
        }
    }
}

/// An infinite ground plane under the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundPlane {
    /// Whether the ground plane is rendered.
    pub enabled: bool,
    /// Height of the plane along the world up axis.
    pub altitude: f32,
    /// Only catch shadows, stay otherwise invisible.
    pub shadow_only: bool,
    /// Material of the plane; `None` uses the renderer default.
    pub material: Option<MaterialId>,
}

impl Default for GroundPlane {
    fn default() -> Self {
        Self {
            enabled: false,
            altitude: 0.0,
            shadow_only: false,
            material: None,
        }
    }
}

/// A user clipping plane cutting away geometry on its positive side.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippingPlane {
    /// Stable identity.
    pub id: ClippingPlaneId,
    /// A point on the plane.
    pub point: Vec3,
    /// Plane normal.
    pub normal: Vec3,
    /// Whether the plane currently clips.
    pub enabled: bool,
}

impl ClippingPlane {
    /// Returns the plane as `(normal, distance)` with a normalized normal.
    pub fn equation(&self) -> (Vec3, f32) {
        let n = self.normal.normalize_or_zero();
        (n, -n.dot(self.point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_workflow_uses_unit_gamma() {
        let wf = LinearWorkflow {
            enabled: false,
            gamma: 2.2,
        };
        assert_eq!(wf.effective_gamma(), 1.0);
        assert_eq!(LinearWorkflow::default().effective_gamma(), 2.2);
    }

    #[test]
    fn clipping_plane_equation_is_normalized() {
        let plane = ClippingPlane {
            id: ClippingPlaneId::new(),
            point: Vec3::new(0.0, 0.0, 2.0),
            normal: Vec3::new(0.0, 0.0, 5.0),
            enabled: true,
        };
        let (n, d) = plane.equation();
        assert_eq!(n, Vec3::Z);
        assert_eq!(d, -2.0);
    }
}
