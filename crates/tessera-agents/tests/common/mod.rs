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

//! Fixtures shared by the change database integration tests.

#![allow(dead_code)]

use glam::{Mat4, Vec3};
use std::sync::Arc;
use tessera_agents::ChangeDatabase;
use tessera_core::scene::{
    Face, MaterialDescriptor, MaterialId, MaterialKind, MeshDescriptor, MeshGuid, MeshId,
    ObjectId, ObjectInstanceDescriptor, PbrMaterial,
};
use tessera_core::SyncConfig;
use tessera_infra::{init_test_logging, RecordingScene, StaticMaterialResolver};
use uuid::Uuid;

pub struct Fixture {
    pub db: Arc<ChangeDatabase>,
    pub materials: Arc<StaticMaterialResolver>,
    pub scene: RecordingScene,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::sequential())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        init_test_logging();
        let materials = Arc::new(StaticMaterialResolver::new());
        let db = Arc::new(ChangeDatabase::new(config, materials.clone()));
        Self {
            db,
            materials,
            scene: RecordingScene::new(),
        }
    }

    /// Registers a material with the resolver and returns its id.
    pub fn material(&self, material: MaterialDescriptor) -> MaterialId {
        let id = MaterialId::new();
        self.materials.insert(id, material);
        id
    }
}

pub fn mesh_id(n: u128) -> MeshId {
    MeshId::new(MeshGuid(Uuid::from_u128(n)), 0)
}

/// A unit quad: 4 vertices, 2 triangles.
pub fn quad(id: MeshId) -> MeshDescriptor {
    MeshDescriptor::new(
        id,
        vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
        vec![Face::Triangle([0, 1, 2]), Face::Triangle([0, 2, 3])],
    )
}

pub fn instance(id: u32, mesh: MeshId, material: MaterialId) -> ObjectInstanceDescriptor {
    ObjectInstanceDescriptor::new(ObjectId(id), mesh, Mat4::IDENTITY, material)
}

pub fn pbr(name: &str, roughness: f32) -> MaterialDescriptor {
    MaterialDescriptor::new(
        name,
        MaterialKind::Pbr(PbrMaterial {
            roughness,
            ..PbrMaterial::default()
        }),
    )
}
