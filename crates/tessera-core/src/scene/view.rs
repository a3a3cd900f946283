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

//! Camera/view descriptors.

use glam::{Mat4, Vec3};

/// Camera projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection.
    Perspective {
        /// Vertical field of view, in radians.
        fov_y: f32,
        /// Near clip distance.
        near: f32,
        /// Far clip distance.
        far: f32,
    },
    /// Parallel (orthographic) projection.
    Parallel {
        /// Height of the view frustum in world units.
        height: f32,
        /// Near clip distance.
        near: f32,
        /// Far clip distance.
        far: f32,
    },
}

/// The host viewport's camera at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewDescriptor {
    /// Camera position.
    pub eye: Vec3,
    /// Viewing direction.
    pub direction: Vec3,
    /// Camera up vector.
    pub up: Vec3,
    /// Projection parameters.
    pub projection: Projection,
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
}

impl ViewDescriptor {
    /// Width over height; `1.0` for an empty viewport.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Right-handed world-to-camera matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.eye, self.direction, self.up)
    }

    /// Right-handed projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        let aspect = self.aspect_ratio();
        match self.projection {
            Projection::Perspective { fov_y, near, far } => {
                Mat4::perspective_rh(fov_y, aspect, near, far)
            }
            Projection::Parallel { height, near, far } => {
                let half_h = height * 0.5;
                let half_w = half_h * aspect;
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, near, far)
            }
        }
    }
}

impl Default for ViewDescriptor {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, -10.0, 5.0),
            direction: Vec3::new(0.0, 1.0, -0.5).normalize(),
            up: Vec3::Z,
            projection: Projection::Perspective {
                fov_y: 50.0_f32.to_radians(),
                near: 0.1,
                far: 1000.0,
            },
            width: 1280,
            height: 720,
        }
    }
}
