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

//! Placed object instances.

use super::ids::{MaterialId, MeshId, ObjectId};
use glam::Mat4;

/// One placed instance of a mesh.
///
/// Many instances may reference the same [`MeshId`]; the renderer object
/// handle is per instance while the mesh buffers are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInstanceDescriptor {
    /// Identity of the instance.
    pub id: ObjectId,
    /// The mesh this instance draws.
    pub mesh: MeshId,
    /// Object-to-world transform.
    pub transform: Mat4,
    /// The host material assigned to the instance.
    pub material: MaterialId,
    /// Whether the instance is visible.
    pub visible: bool,
    /// Whether the instance casts shadows.
    pub cast_shadows: bool,
}

impl ObjectInstanceDescriptor {
    /// Creates a visible, shadow-casting instance.
    pub fn new(id: ObjectId, mesh: MeshId, transform: Mat4, material: MaterialId) -> Self {
        Self {
            id,
            mesh,
            transform,
            material,
            visible: true,
            cast_shadows: true,
        }
    }
}
