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

use crate::error::RenderSceneError;
use crate::scene::{
    ClippingPlane, EnvironmentDescriptor, GroundPlane, LightDescriptor, LightHandle,
    LinearWorkflow, MaterialDescriptor, MaterialHash, MaterialId, MeshBuffers, MeshHandle, MeshId,
    ObjectHandle, ObjectId, ShaderHandle, ViewDescriptor,
};
use glam::Mat4;

/// The renderer's persistent scene, seen through coarse create/update/tag
/// operations on native handles.
///
/// Implementations must be internally synchronized: the mesh and object lanes
/// call into the scene from worker threads.
pub trait RenderScene: Send + Sync {
    /// Compiles a material into a renderer shader. May be slow. The caller
    /// guarantees it is never invoked twice for the same hash.
    fn build_shader(
        &self,
        hash: MaterialHash,
        material: &MaterialDescriptor,
    ) -> Result<ShaderHandle, RenderSceneError>;

    /// Allocates an empty renderer mesh for a sub-mesh.
    fn create_mesh(&self, mesh: MeshId) -> Result<MeshHandle, RenderSceneError>;

    /// Replaces the geometry buffers of a renderer mesh.
    fn upload_mesh_buffers(
        &self,
        handle: MeshHandle,
        buffers: &MeshBuffers,
    ) -> Result<(), RenderSceneError>;

    /// Creates a renderer object over an existing mesh.
    ///
    /// `shader` is `None` when the object's material is not known yet; the
    /// renderer then uses its default shader.
    fn create_object(
        &self,
        object: ObjectId,
        mesh: MeshHandle,
        transform: &Mat4,
        shader: Option<ShaderHandle>,
    ) -> Result<ObjectHandle, RenderSceneError>;

    /// Overwrites an object's transform.
    fn set_object_transform(
        &self,
        handle: ObjectHandle,
        transform: &Mat4,
    ) -> Result<(), RenderSceneError>;

    /// Points an object at a different mesh.
    fn set_object_mesh(&self, handle: ObjectHandle, mesh: MeshHandle)
        -> Result<(), RenderSceneError>;

    /// Overwrites an object's shader.
    fn set_object_shader(
        &self,
        handle: ObjectHandle,
        shader: ShaderHandle,
    ) -> Result<(), RenderSceneError>;

    /// Shows or hides an object. Hiding never frees the object's mesh.
    fn set_object_visibility(
        &self,
        handle: ObjectHandle,
        visible: bool,
    ) -> Result<(), RenderSceneError>;

    /// Creates a renderer light.
    fn create_light(&self, light: &LightDescriptor) -> Result<LightHandle, RenderSceneError>;

    /// Overwrites an existing renderer light.
    fn update_light(
        &self,
        handle: LightHandle,
        light: &LightDescriptor,
    ) -> Result<(), RenderSceneError>;

    /// Shows or hides a light.
    fn set_light_visibility(
        &self,
        handle: LightHandle,
        visible: bool,
    ) -> Result<(), RenderSceneError>;

    /// Applies a camera view.
    fn set_view(&self, view: &ViewDescriptor) -> Result<(), RenderSceneError>;

    /// Applies the background/environment record.
    fn set_environment(&self, environment: &EnvironmentDescriptor)
        -> Result<(), RenderSceneError>;

    /// Applies the ground plane.
    fn set_ground_plane(
        &self,
        plane: &GroundPlane,
        shader: Option<ShaderHandle>,
    ) -> Result<(), RenderSceneError>;

    /// Replaces the full set of active clipping planes.
    fn set_clipping_planes(&self, planes: &[ClippingPlane]) -> Result<(), RenderSceneError>;

    /// Applies gamma settings.
    fn set_linear_workflow(&self, workflow: &LinearWorkflow) -> Result<(), RenderSceneError>;

    /// Releases every renderer-side resource. Called once, on teardown.
    fn release_resources(&self);
}

/// Host-side material resolution.
pub trait MaterialResolver: Send + Sync {
    /// Resolves a host material under the given gamma settings.
    ///
    /// Returns `None` for an unknown material; the object then keeps the
    /// renderer's default shader.
    fn resolve_material(
        &self,
        material: MaterialId,
        workflow: &LinearWorkflow,
    ) -> Option<MaterialDescriptor>;
}
