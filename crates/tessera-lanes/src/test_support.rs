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

//! Shared fixtures for the lane unit tests.

use crate::context::{EventSink, UploadContext};
use crate::upload_lane::UploadLane;
use glam::{Mat4, Vec3};
use tessera_core::error::UploadError;
use tessera_core::lane::LaneOutcome;
use tessera_core::renderer::RenderScene;
use tessera_core::scene::{
    Face, MaterialDescriptor, MaterialId, MaterialKind, MeshDescriptor, MeshGuid, MeshHandle,
    MeshId, ObjectHandle, ObjectId, ObjectInstanceDescriptor, PbrMaterial,
};
use tessera_core::sync::CancellationToken;
use tessera_core::SyncConfig;
use tessera_data::SyncStores;
use tessera_infra::RecordingScene;
use uuid::Uuid;

pub(crate) struct Harness {
    pub scene: RecordingScene,
    pub stores: SyncStores,
    pub cancel: CancellationToken,
    pub config: SyncConfig,
    pub events: EventSink,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::sequential())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            scene: RecordingScene::new(),
            stores: SyncStores::new(&config),
            cancel: CancellationToken::new(),
            config,
            events: EventSink::new(),
        }
    }

    pub fn ctx(&self) -> UploadContext<'_> {
        UploadContext {
            scene: &self.scene,
            stores: &self.stores,
            cancel: &self.cancel,
            config: &self.config,
            pool: None,
            events: &self.events,
        }
    }

    /// Creates a renderer mesh and object directly and commits their handles,
    /// as a previous drain would have.
    pub fn seed_object(&self, object: ObjectId, mesh: MeshId) -> (MeshHandle, ObjectHandle) {
        let mesh_handle = self.seed_mesh(mesh);
        let handle = self
            .scene
            .create_object(object, mesh_handle, &Mat4::IDENTITY, None)
            .expect("seed object");
        self.stores.objects.commit_object(object, handle);
        self.scene.clear_calls();
        (mesh_handle, handle)
    }

    /// Creates a renderer mesh directly, reusing a committed handle.
    pub fn seed_mesh(&self, mesh: MeshId) -> MeshHandle {
        if let Some(handle) = self.stores.objects.mesh_handle(mesh) {
            return handle;
        }
        let handle = self.scene.create_mesh(mesh).expect("seed mesh");
        self.stores.objects.commit_mesh(mesh, handle);
        self.scene.clear_calls();
        handle
    }

    /// Starts a drain and runs one lane.
    pub fn run(&self, lane: &dyn UploadLane) -> Result<LaneOutcome, UploadError> {
        self.stores.begin_drain();
        lane.execute(&self.ctx())
    }
}

pub(crate) fn mesh_id(n: u128) -> MeshId {
    MeshId::new(MeshGuid(Uuid::from_u128(n)), 0)
}

pub(crate) fn quad(id: MeshId) -> MeshDescriptor {
    MeshDescriptor::new(
        id,
        vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
        vec![Face::Triangle([0, 1, 2]), Face::Triangle([0, 2, 3])],
    )
}

pub(crate) fn instance(id: u32, mesh: MeshId) -> ObjectInstanceDescriptor {
    ObjectInstanceDescriptor::new(
        ObjectId(id),
        mesh,
        Mat4::IDENTITY,
        MaterialId(Uuid::from_u128(u128::from(id))),
    )
}

pub(crate) fn pbr(name: &str, roughness: f32) -> MaterialDescriptor {
    MaterialDescriptor::new(
        name,
        MaterialKind::Pbr(PbrMaterial {
            roughness,
            ..PbrMaterial::default()
        }),
    )
}
