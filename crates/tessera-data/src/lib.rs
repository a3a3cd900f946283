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

//! # Tessera Data
//!
//! The change-tracking stores and relation tables of the synchronizer.
//!
//! Each store buffers one domain of host diffs and owns the persistent
//! identity maps of that domain. All of them are internally synchronized
//! (`&self` everywhere), so notifications and drains can run on different
//! threads.

#![warn(missing_docs)]

pub mod camera_store;
pub mod diff_buffer;
pub mod environment_store;
pub mod light_store;
pub mod object_shader_index;
pub mod object_store;
pub mod settings_store;
pub mod shader_cache;

pub use camera_store::CameraStore;
pub use diff_buffer::{DiffBuffer, DirtyFlag};
pub use environment_store::EnvironmentStore;
pub use light_store::{LightChange, LightPartition, LightStore};
pub use object_shader_index::ObjectShaderIndex;
pub use object_store::{MeshBatch, ObjectBatch, ObjectStore, Stamped};
pub use settings_store::{
    ClippingPlaneStore, GammaStore, GroundPlaneRecord, GroundPlaneStore, Tracked,
};
pub use shader_cache::{PendingShader, ShaderCache, ShaderReassignment};

use tessera_core::SyncConfig;

/// Every store of the change database, owned together.
#[derive(Debug)]
pub struct SyncStores {
    /// `MaterialHash → ShaderHandle`.
    pub shaders: ShaderCache,
    /// Hash ↔ mesh ↔ object relations.
    pub shader_index: ObjectShaderIndex,
    /// Objects, meshes and dynamic transforms.
    pub objects: ObjectStore,
    /// Lights, including the background light.
    pub lights: LightStore,
    /// The background/environment record.
    pub environment: EnvironmentStore,
    /// The latest camera view.
    pub camera: CameraStore,
    /// Linear-workflow gamma.
    pub gamma: GammaStore,
    /// The ground plane.
    pub ground_plane: GroundPlaneStore,
    /// User clipping planes.
    pub clipping_planes: ClippingPlaneStore,
}

impl SyncStores {
    /// Creates empty stores for the given configuration.
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            shaders: ShaderCache::new(),
            shader_index: ObjectShaderIndex::new(),
            objects: ObjectStore::new(config.effective_min_vertices()),
            lights: LightStore::new(),
            environment: EnvironmentStore::new(),
            camera: CameraStore::new(),
            gamma: GammaStore::new(config.linear_workflow),
            ground_plane: GroundPlaneStore::new(),
            clipping_planes: ClippingPlaneStore::new(),
        }
    }

    /// Returns `true` if any store has diffs waiting or in flight.
    pub fn has_pending(&self) -> bool {
        self.gamma.has_pending()
            || self.environment.has_pending()
            || self.camera.has_pending()
            || self.clipping_planes.has_pending()
            || self.shaders.has_pending()
            || self.objects.has_pending()
            || self.lights.has_pending()
            || self.ground_plane.has_pending()
    }

    /// Moves every store's pending diffs in flight.
    pub fn begin_drain(&self) {
        self.gamma.begin_drain();
        self.environment.begin_drain();
        self.camera.begin_drain();
        self.clipping_planes.begin_drain();
        self.shaders.begin_drain();
        self.objects.begin_drain();
        self.lights.begin_drain();
        self.ground_plane.begin_drain();
    }

    /// Clears every per-cycle buffer after a complete drain. Identity maps
    /// are kept.
    pub fn reset(&self) {
        self.gamma.reset();
        self.environment.reset();
        self.camera.reset();
        self.clipping_planes.reset();
        self.shaders.reset();
        self.objects.reset();
        self.lights.reset();
        self.ground_plane.reset();
    }

    /// Gives every in-flight buffer back to the next cycle.
    pub fn rollback(&self) {
        self.gamma.rollback();
        self.environment.rollback();
        self.camera.rollback();
        self.clipping_planes.rollback();
        self.shaders.rollback();
        self.objects.rollback();
        self.lights.rollback();
        self.ground_plane.rollback();
    }

    /// Forgets every renderer handle and buffered diff. Used on teardown.
    pub fn clear(&self) {
        self.shaders.clear();
        self.shader_index.clear();
        self.objects.clear();
        self.lights.clear();
    }
}
