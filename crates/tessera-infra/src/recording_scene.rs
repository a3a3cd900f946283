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

//! An in-memory [`RenderScene`] that records every mutation.
//!
//! It behaves like a renderer that never draws: handles are allocated from a
//! counter, state is kept in plain maps, and every call is appended to a log
//! that tests can inspect. Failure and cancellation hooks let tests drive the
//! error paths of a drain.

use glam::Mat4;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tessera_core::error::RenderSceneError;
use tessera_core::renderer::RenderScene;
use tessera_core::scene::{
    ClippingPlane, EnvironmentDescriptor, GroundPlane, LightDescriptor, LightHandle, LightId,
    LinearWorkflow, MaterialDescriptor, MaterialHash, MeshBuffers, MeshHandle, MeshId,
    ObjectHandle, ObjectId, ShaderHandle, ViewDescriptor,
};
use tessera_core::sync::CancellationToken;

/// One renderer call, as recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCall {
    /// `build_shader`
    BuildShader(MaterialHash),
    /// `create_mesh`
    CreateMesh(MeshId),
    /// `upload_mesh_buffers`
    UploadMeshBuffers(MeshHandle),
    /// `create_object`
    CreateObject(ObjectId),
    /// `set_object_transform`
    SetObjectTransform(ObjectHandle),
    /// `set_object_mesh`
    SetObjectMesh(ObjectHandle, MeshHandle),
    /// `set_object_shader`
    SetObjectShader(ObjectHandle, ShaderHandle),
    /// `set_object_visibility`
    SetObjectVisibility(ObjectHandle, bool),
    /// `create_light`
    CreateLight(LightId),
    /// `update_light`
    UpdateLight(LightHandle),
    /// `set_light_visibility`
    SetLightVisibility(LightHandle, bool),
    /// `set_view`
    SetView,
    /// `set_environment`
    SetEnvironment,
    /// `set_ground_plane`
    SetGroundPlane,
    /// `set_clipping_planes`, with the number of planes.
    SetClippingPlanes(usize),
    /// `set_linear_workflow`
    SetLinearWorkflow,
    /// `release_resources`
    ReleaseResources,
}

/// A renderer object as the recording scene sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedObject {
    /// The host object it was created for.
    pub object: ObjectId,
    /// The mesh it draws.
    pub mesh: MeshHandle,
    /// Its latest transform.
    pub transform: Mat4,
    /// Its shader; `None` is the renderer default.
    pub shader: Option<ShaderHandle>,
    /// Whether it is visible.
    pub visible: bool,
}

/// A renderer mesh as the recording scene sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMesh {
    /// The sub-mesh it was created for.
    pub mesh: MeshId,
    /// The last uploaded buffers.
    pub buffers: Option<MeshBuffers>,
    /// How many times buffers were uploaded.
    pub uploads: usize,
}

/// A renderer light as the recording scene sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLight {
    /// The latest descriptor.
    pub light: LightDescriptor,
    /// Whether it is visible.
    pub visible: bool,
}

#[derive(Debug, Default)]
struct SceneState {
    next_handle: u64,
    shaders: HashMap<ShaderHandle, MaterialHash>,
    builds: HashMap<MaterialHash, usize>,
    meshes: HashMap<MeshHandle, RecordedMesh>,
    objects: HashMap<ObjectHandle, RecordedObject>,
    lights: HashMap<LightHandle, RecordedLight>,
    view: Option<ViewDescriptor>,
    environment: Option<EnvironmentDescriptor>,
    ground_plane: Option<(GroundPlane, Option<ShaderHandle>)>,
    clipping_planes: Vec<ClippingPlane>,
    linear_workflow: Option<LinearWorkflow>,
    calls: Vec<SceneCall>,
    released: bool,
}

impl SceneState {
    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn ensure_live(&self) -> Result<(), RenderSceneError> {
        if self.released {
            Err(RenderSceneError::Backend("scene resources were released".into()))
        } else {
            Ok(())
        }
    }

    fn object_mut(&mut self, handle: ObjectHandle) -> Result<&mut RecordedObject, RenderSceneError> {
        self.objects
            .get_mut(&handle)
            .ok_or_else(|| RenderSceneError::ObjectUpdate(format!("unknown {handle}")))
    }
}

#[derive(Debug, Default)]
struct Hooks {
    failing_shaders: HashSet<MaterialHash>,
    failing_meshes: HashSet<MeshId>,
    // (uploads left before cancelling, token)
    cancel_after_uploads: Option<(usize, CancellationToken)>,
}

/// An in-memory renderer scene recording every call.
#[derive(Debug, Default)]
pub struct RecordingScene {
    state: Mutex<SceneState>,
    hooks: Mutex<Hooks>,
}

impl RecordingScene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Hooks ---

    /// Makes every `build_shader` for `hash` fail until cleared.
    pub fn fail_shader_build(&self, hash: MaterialHash) {
        self.hooks.lock().failing_shaders.insert(hash);
    }

    /// Makes every buffer upload for `mesh` fail until cleared.
    pub fn fail_mesh_upload(&self, mesh: MeshId) {
        self.hooks.lock().failing_meshes.insert(mesh);
    }

    /// Cancels `token` right after the `count`-th buffer upload from now.
    pub fn cancel_after_mesh_uploads(&self, count: usize, token: CancellationToken) {
        self.hooks.lock().cancel_after_uploads = Some((count, token));
    }

    /// Removes every failure and cancellation hook.
    pub fn clear_hooks(&self) {
        *self.hooks.lock() = Hooks::default();
    }

    // --- Inspection ---

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<SceneCall> {
        self.state.lock().calls.clone()
    }

    /// Forgets the call log, keeping the scene state.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of `build_shader` calls that succeeded for `hash`.
    pub fn build_count(&self, hash: MaterialHash) -> usize {
        self.state.lock().builds.get(&hash).copied().unwrap_or(0)
    }

    /// Number of shaders built.
    pub fn shader_count(&self) -> usize {
        self.state.lock().shaders.len()
    }

    /// The material hash a shader was built for.
    pub fn shader_hash(&self, handle: ShaderHandle) -> Option<MaterialHash> {
        self.state.lock().shaders.get(&handle).copied()
    }

    /// Number of meshes created.
    pub fn mesh_count(&self) -> usize {
        self.state.lock().meshes.len()
    }

    /// A created mesh.
    pub fn mesh(&self, handle: MeshHandle) -> Option<RecordedMesh> {
        self.state.lock().meshes.get(&handle).cloned()
    }

    /// Number of objects created.
    pub fn object_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// A created object.
    pub fn object(&self, handle: ObjectHandle) -> Option<RecordedObject> {
        self.state.lock().objects.get(&handle).cloned()
    }

    /// Objects currently visible.
    pub fn visible_objects(&self) -> usize {
        self.state
            .lock()
            .objects
            .values()
            .filter(|o| o.visible)
            .count()
    }

    /// Number of lights created.
    pub fn light_count(&self) -> usize {
        self.state.lock().lights.len()
    }

    /// A created light.
    pub fn light(&self, handle: LightHandle) -> Option<RecordedLight> {
        self.state.lock().lights.get(&handle).cloned()
    }

    /// The last view applied.
    pub fn view(&self) -> Option<ViewDescriptor> {
        self.state.lock().view
    }

    /// The last environment applied.
    pub fn environment(&self) -> Option<EnvironmentDescriptor> {
        self.state.lock().environment.clone()
    }

    /// The last ground plane applied, with its shader.
    pub fn ground_plane(&self) -> Option<(GroundPlane, Option<ShaderHandle>)> {
        self.state.lock().ground_plane.clone()
    }

    /// The clipping planes last applied.
    pub fn clipping_planes(&self) -> Vec<ClippingPlane> {
        self.state.lock().clipping_planes.clone()
    }

    /// The gamma settings last applied.
    pub fn linear_workflow(&self) -> Option<LinearWorkflow> {
        self.state.lock().linear_workflow
    }

    /// Returns `true` once `release_resources` has run.
    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    fn after_mesh_upload(&self) {
        let mut hooks = self.hooks.lock();
        let fire = match hooks.cancel_after_uploads.as_mut() {
            Some((left, _)) => {
                *left = left.saturating_sub(1);
                *left == 0
            }
            None => false,
        };
        if fire {
            if let Some((_, token)) = hooks.cancel_after_uploads.take() {
                log::debug!("RecordingScene: cancelling after mesh upload.");
                token.cancel();
            }
        }
    }
}

impl RenderScene for RecordingScene {
    fn build_shader(
        &self,
        hash: MaterialHash,
        material: &MaterialDescriptor,
    ) -> Result<ShaderHandle, RenderSceneError> {
        if self.hooks.lock().failing_shaders.contains(&hash) {
            return Err(RenderSceneError::ShaderBuild(format!(
                "'{}' ({}) rejected",
                material.name,
                material.kind.category()
            )));
        }
        let mut state = self.state.lock();
        state.ensure_live()?;
        let handle = ShaderHandle(state.next());
        state.shaders.insert(handle, hash);
        *state.builds.entry(hash).or_insert(0) += 1;
        state.calls.push(SceneCall::BuildShader(hash));
        Ok(handle)
    }

    fn create_mesh(&self, mesh: MeshId) -> Result<MeshHandle, RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        let handle = MeshHandle(state.next());
        state.meshes.insert(
            handle,
            RecordedMesh {
                mesh,
                buffers: None,
                uploads: 0,
            },
        );
        state.calls.push(SceneCall::CreateMesh(mesh));
        Ok(handle)
    }

    fn upload_mesh_buffers(
        &self,
        handle: MeshHandle,
        buffers: &MeshBuffers,
    ) -> Result<(), RenderSceneError> {
        {
            let mut state = self.state.lock();
            state.ensure_live()?;
            let mesh_id = state
                .meshes
                .get(&handle)
                .map(|m| m.mesh)
                .ok_or_else(|| RenderSceneError::MeshUpload(format!("unknown {handle}")))?;
            if self.hooks.lock().failing_meshes.contains(&mesh_id) {
                return Err(RenderSceneError::MeshUpload(format!(
                    "buffers for {mesh_id} rejected"
                )));
            }
            if let Some(mesh) = state.meshes.get_mut(&handle) {
                mesh.buffers = Some(buffers.clone());
                mesh.uploads += 1;
            }
            state.calls.push(SceneCall::UploadMeshBuffers(handle));
        }
        self.after_mesh_upload();
        Ok(())
    }

    fn create_object(
        &self,
        object: ObjectId,
        mesh: MeshHandle,
        transform: &Mat4,
        shader: Option<ShaderHandle>,
    ) -> Result<ObjectHandle, RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        if !state.meshes.contains_key(&mesh) {
            return Err(RenderSceneError::ObjectUpdate(format!(
                "{object} references unknown {mesh}"
            )));
        }
        let handle = ObjectHandle(state.next());
        state.objects.insert(
            handle,
            RecordedObject {
                object,
                mesh,
                transform: *transform,
                shader,
                visible: true,
            },
        );
        state.calls.push(SceneCall::CreateObject(object));
        Ok(handle)
    }

    fn set_object_transform(
        &self,
        handle: ObjectHandle,
        transform: &Mat4,
    ) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.object_mut(handle)?.transform = *transform;
        state.calls.push(SceneCall::SetObjectTransform(handle));
        Ok(())
    }

    fn set_object_mesh(
        &self,
        handle: ObjectHandle,
        mesh: MeshHandle,
    ) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.object_mut(handle)?.mesh = mesh;
        state.calls.push(SceneCall::SetObjectMesh(handle, mesh));
        Ok(())
    }

    fn set_object_shader(
        &self,
        handle: ObjectHandle,
        shader: ShaderHandle,
    ) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.object_mut(handle)?.shader = Some(shader);
        state.calls.push(SceneCall::SetObjectShader(handle, shader));
        Ok(())
    }

    fn set_object_visibility(
        &self,
        handle: ObjectHandle,
        visible: bool,
    ) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.object_mut(handle)?.visible = visible;
        state.calls.push(SceneCall::SetObjectVisibility(handle, visible));
        Ok(())
    }

    fn create_light(&self, light: &LightDescriptor) -> Result<LightHandle, RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        let handle = LightHandle(state.next());
        state.lights.insert(
            handle,
            RecordedLight {
                light: light.clone(),
                visible: light.enabled,
            },
        );
        state.calls.push(SceneCall::CreateLight(light.id));
        Ok(handle)
    }

    fn update_light(
        &self,
        handle: LightHandle,
        light: &LightDescriptor,
    ) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        let recorded = state
            .lights
            .get_mut(&handle)
            .ok_or_else(|| RenderSceneError::LightUpload(format!("unknown {handle}")))?;
        recorded.light = light.clone();
        state.calls.push(SceneCall::UpdateLight(handle));
        Ok(())
    }

    fn set_light_visibility(
        &self,
        handle: LightHandle,
        visible: bool,
    ) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        let recorded = state
            .lights
            .get_mut(&handle)
            .ok_or_else(|| RenderSceneError::LightUpload(format!("unknown {handle}")))?;
        recorded.visible = visible;
        state.calls.push(SceneCall::SetLightVisibility(handle, visible));
        Ok(())
    }

    fn set_view(&self, view: &ViewDescriptor) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.view = Some(*view);
        state.calls.push(SceneCall::SetView);
        Ok(())
    }

    fn set_environment(
        &self,
        environment: &EnvironmentDescriptor,
    ) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.environment = Some(environment.clone());
        state.calls.push(SceneCall::SetEnvironment);
        Ok(())
    }

    fn set_ground_plane(
        &self,
        plane: &GroundPlane,
        shader: Option<ShaderHandle>,
    ) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.ground_plane = Some((plane.clone(), shader));
        state.calls.push(SceneCall::SetGroundPlane);
        Ok(())
    }

    fn set_clipping_planes(&self, planes: &[ClippingPlane]) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.clipping_planes = planes.to_vec();
        state.calls.push(SceneCall::SetClippingPlanes(planes.len()));
        Ok(())
    }

    fn set_linear_workflow(&self, workflow: &LinearWorkflow) -> Result<(), RenderSceneError> {
        let mut state = self.state.lock();
        state.ensure_live()?;
        state.linear_workflow = Some(*workflow);
        state.calls.push(SceneCall::SetLinearWorkflow);
        Ok(())
    }

    fn release_resources(&self) {
        let mut state = self.state.lock();
        log::info!(
            "RecordingScene: releasing {} shaders, {} meshes, {} objects, {} lights.",
            state.shaders.len(),
            state.meshes.len(),
            state.objects.len(),
            state.lights.len()
        );
        state.shaders.clear();
        state.meshes.clear();
        state.objects.clear();
        state.lights.clear();
        state.released = true;
        state.calls.push(SceneCall::ReleaseResources);
    }
}
