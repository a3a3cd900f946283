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

use crate::lane::UploadStep;
use crate::scene::ids::{
    LightHandle, LightId, MaterialHash, MeshHandle, MeshId, ObjectHandle, ObjectId, ShaderHandle,
};

/// Notifications emitted by a drain, published once the drain has finished.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A shader was built and committed for a material hash.
    ShaderBuilt {
        /// The material hash.
        hash: MaterialHash,
        /// The new renderer handle.
        handle: ShaderHandle,
    },
    /// A shader lost its last object and was retired.
    ShaderRetired {
        /// The material hash.
        hash: MaterialHash,
        /// The retired handle.
        handle: ShaderHandle,
    },
    /// Mesh buffers were uploaded.
    MeshUploaded {
        /// The mesh.
        mesh: MeshId,
        /// Its renderer handle.
        handle: MeshHandle,
    },
    /// A renderer object was created for the first time.
    ObjectCreated {
        /// The object.
        object: ObjectId,
        /// Its renderer handle.
        handle: ObjectHandle,
    },
    /// A light was created.
    LightAdded {
        /// The light.
        light: LightId,
        /// Its renderer handle.
        handle: LightHandle,
    },
    /// An existing light was updated.
    LightUpdated {
        /// The light.
        light: LightId,
    },
    /// A light was hidden after a delete notification.
    LightHidden {
        /// The light.
        light: LightId,
    },
    /// The camera view was applied.
    ViewChanged,
    /// The background/environment was applied.
    EnvironmentChanged,
    /// A drain finished and its buffers were reset.
    DrainCompleted {
        /// Number of renderer mutations issued.
        applied: usize,
    },
    /// A drain stopped on cancellation; its buffers were kept for a retry.
    DrainCancelled {
        /// The step that observed the cancellation.
        step: UploadStep,
    },
}
