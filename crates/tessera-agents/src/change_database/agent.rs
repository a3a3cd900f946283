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

//! The change database: routes host notifications into the stores and
//! drains them into a renderer scene in dependency order.

use super::outcome::{DrainOutcome, DrainStats};
use glam::Mat4;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_core::error::UploadError;
use tessera_core::event::{EventBus, SyncEvent};
use tessera_core::lane::{Lane, LaneOutcome, UploadStep};
use tessera_core::renderer::{MaterialResolver, RenderScene};
use tessera_core::scene::{
    ClippingPlane, ClippingPlaneId, EnvironmentDescriptor, GroundPlane, LightDescriptor,
    LightHandle, LightId, LinearWorkflow, MaterialHash, MaterialId, MeshDescriptor, MeshGuid,
    MeshHandle, MeshId, ObjectHandle, ObjectId, ObjectInstanceDescriptor, ShaderHandle,
    ViewDescriptor,
};
use tessera_core::sync::{CancellationToken, UploadLock};
use tessera_core::SyncConfig;
use tessera_data::{ShaderReassignment, SyncStores};
use tessera_lanes::{standard_lanes, EventSink, UploadContext, UploadLane};

/// Collapses host scene diffs into the minimal set of renderer mutations.
///
/// Every `apply_*` method takes `&self` and may run on any thread, including
/// while a drain is in progress: notifications land on the pending side of
/// the stores and are picked up by the next drain. Drains and teardown are
/// serialized by the upload lock.
pub struct ChangeDatabase {
    stores: SyncStores,
    resolver: Arc<dyn MaterialResolver>,
    config: SyncConfig,
    pool: Option<rayon::ThreadPool>,
    lanes: Vec<Box<dyn UploadLane>>,
    events: EventBus<SyncEvent>,
    upload_lock: UploadLock,
    torn_down: AtomicBool,
}

impl fmt::Debug for ChangeDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeDatabase")
            .field("config", &self.config)
            .field("lanes", &self.lanes.len())
            .field("torn_down", &self.is_torn_down())
            .finish_non_exhaustive()
    }
}

fn build_pool(worker_threads: usize) -> Option<rayon::ThreadPool> {
    if worker_threads == 0 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(worker_threads)
        .thread_name(|i| format!("tessera-upload-{i}"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            log::warn!(
                "Could not build a {worker_threads}-thread upload pool ({e}); using the global pool."
            );
            None
        }
    }
}

impl ChangeDatabase {
    /// Creates an empty database.
    ///
    /// When [`SyncConfig::background_light`] is set, the synthetic background
    /// light is queued right away so the first drain uploads it.
    pub fn new(config: SyncConfig, resolver: Arc<dyn MaterialResolver>) -> Self {
        let stores = SyncStores::new(&config);
        if config.background_light {
            stores
                .lights
                .ensure_background_light(&stores.environment.current());
        }
        log::info!(
            "ChangeDatabase created (parallel mesh upload: {}, worker threads: {}).",
            config.parallel_mesh_upload,
            config.worker_threads
        );
        Self {
            stores,
            resolver,
            pool: build_pool(config.worker_threads),
            lanes: standard_lanes(),
            events: EventBus::new(),
            upload_lock: UploadLock::new(),
            torn_down: AtomicBool::new(false),
            config,
        }
    }

    /// The configuration this database was built with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Direct access to the stores, for inspection.
    pub fn stores(&self) -> &SyncStores {
        &self.stores
    }

    // --- Notifications ---

    /// Queues mesh deletions, by host geometry, then mesh additions.
    ///
    /// Degenerate meshes are logged and dropped.
    pub fn apply_mesh_changes(&self, deleted: &[MeshGuid], added: Vec<MeshDescriptor>) {
        for guid in deleted {
            self.stores.objects.delete_mesh(*guid);
        }
        for mesh in added {
            self.stores.objects.add_mesh(mesh);
        }
    }

    /// Queues object deletions, then additions and updates.
    ///
    /// The material of every added or changed object is resolved right away:
    /// its shader build is queued and the object-shader relation updated.
    pub fn apply_object_instance_changes(
        &self,
        deleted: &[ObjectId],
        added_or_changed: Vec<ObjectInstanceDescriptor>,
    ) {
        for object in deleted {
            self.stores.objects.delete_object(*object);
        }
        for descriptor in added_or_changed {
            let (object, mesh, material) = (descriptor.id, descriptor.mesh, descriptor.material);
            self.stores.objects.add_or_update_object(descriptor);
            self.assign_material(object, mesh, material);
        }
    }

    /// Changes the material of existing objects.
    ///
    /// Unknown objects are skipped.
    pub fn apply_material_changes(&self, changes: &[(ObjectId, MaterialId)]) {
        for (object, material) in changes {
            let Some(mesh) = self.stores.objects.set_material(*object, *material) else {
                log::warn!("Material change for unknown {object}; ignoring it.");
                continue;
            };
            self.assign_material(*object, mesh, *material);
        }
    }

    /// Queues light deletions, then additions and updates.
    pub fn apply_light_changes(&self, deleted: &[LightId], added_or_changed: Vec<LightDescriptor>) {
        for light in deleted {
            self.stores.lights.delete_light(*light);
        }
        for light in added_or_changed {
            self.stores.lights.add_light(light);
        }
    }

    /// Records the latest camera view. Only the last view before a drain is
    /// uploaded.
    pub fn apply_camera_change(&self, view: ViewDescriptor) {
        self.stores.camera.set_view(view);
    }

    /// Updates the background/environment record.
    ///
    /// Applying the current record again queues nothing.
    pub fn apply_environment_change(&self, environment: EnvironmentDescriptor) {
        let changed = self.stores.environment.apply(environment.clone());
        if changed && self.config.background_light {
            self.stores.lights.ensure_background_light(&environment);
        }
    }

    /// Updates the ground plane and queues the shader of its material.
    pub fn apply_ground_plane_change(&self, plane: GroundPlane) {
        let hash = plane.material.and_then(|material| {
            let workflow = self.stores.gamma.current();
            match self.resolver.resolve_material(material, &workflow) {
                Some(resolved) => {
                    let hash = resolved.content_hash(&workflow);
                    self.stores.shaders.enqueue_new(hash, resolved);
                    Some(hash)
                }
                None => {
                    log::debug!(
                        "Ground plane material {material:?} is unknown; using the default."
                    );
                    None
                }
            }
        });
        self.stores.ground_plane.set(plane, hash);
    }

    /// Removes and adds or updates clipping planes.
    pub fn apply_clipping_plane_changes(
        &self,
        deleted: &[ClippingPlaneId],
        added_or_changed: Vec<ClippingPlane>,
    ) {
        for id in deleted {
            self.stores.clipping_planes.remove(*id);
        }
        for plane in added_or_changed {
            self.stores.clipping_planes.upsert(plane);
        }
    }

    /// Queues transform-only updates of objects already in the renderer.
    pub fn apply_dynamic_transforms(&self, transforms: &[(ObjectId, Mat4)]) {
        for (object, transform) in transforms {
            self.stores.objects.update_transform(*object, *transform);
        }
    }

    /// Changes the gamma settings.
    ///
    /// Gamma is part of every material's content hash, so every known object
    /// material and the ground plane material are resolved again.
    pub fn apply_linear_workflow_change(&self, workflow: LinearWorkflow) {
        if !self.stores.gamma.set(workflow) {
            return;
        }
        let materials = self.stores.objects.object_materials();
        log::debug!(
            "Linear workflow changed; re-resolving {} object materials.",
            materials.len()
        );
        for (object, material) in materials {
            if let Some(mesh) = self.stores.objects.mesh_of_object(object) {
                self.assign_material(object, mesh, material);
            }
        }
        let ground = self.stores.ground_plane.current();
        if ground.plane.material.is_some() {
            self.apply_ground_plane_change(ground.plane);
        }
    }

    /// Resolves `material` for `object` and updates the shader relations.
    fn assign_material(&self, object: ObjectId, mesh: MeshId, material: MaterialId) {
        let stores = &self.stores;
        let workflow = stores.gamma.current();
        let Some(resolved) = self.resolver.resolve_material(material, &workflow) else {
            log::debug!(
                "Material {material:?} of {object} is unknown; it keeps its current shader."
            );
            if let Some(old) = stores.shader_index.remove_object(object) {
                stores.shaders.enqueue_reassignment(ShaderReassignment {
                    object,
                    old,
                    new: MaterialHash::NO_PREVIOUS,
                });
            }
            return;
        };
        let hash = resolved.content_hash(&workflow);
        // The relation is recorded before the build is queued so a superseded
        // build is only dropped once no relation can still need it.
        let old = stores.shader_index.assign(hash, mesh, object);
        stores.shaders.enqueue_new(hash, resolved);
        // First assignments are applied when the object is created.
        if !old.is_no_previous() && old != hash {
            stores.shaders.cancel_pending_build(old, || {
                stores.shader_index.is_unused(old)
                    && stores.ground_plane.current().material_hash != Some(old)
            });
            stores.shaders.enqueue_reassignment(ShaderReassignment {
                object,
                old,
                new: hash,
            });
        }
    }

    // --- Drain ---

    /// Returns `true` if any diff is waiting to be uploaded.
    pub fn has_pending_changes(&self) -> bool {
        self.stores.has_pending()
    }

    /// Applies every buffered diff to `scene`, step by step in
    /// [`UploadStep::ORDER`].
    ///
    /// On success the per-cycle buffers are reset. On cancellation or error
    /// they are rolled back, so the next drain retries the same diffs;
    /// renderer handles committed before the interruption are kept.
    /// Events are published once the drain is over.
    pub fn drain_and_upload(
        &self,
        scene: &dyn RenderScene,
        cancel: &CancellationToken,
    ) -> Result<DrainOutcome, UploadError> {
        let _guard = self.upload_lock.acquire();
        if self.is_torn_down() {
            return Err(UploadError::TornDown);
        }
        if !self.stores.has_pending() {
            log::trace!("Nothing to drain.");
            return Ok(DrainOutcome::Completed(DrainStats::default()));
        }

        self.stores.begin_drain();
        let sink = EventSink::new();
        let ctx = UploadContext {
            scene,
            stores: &self.stores,
            cancel,
            config: &self.config,
            pool: self.pool.as_ref(),
            events: &sink,
        };

        let mut stats = DrainStats::default();
        for lane in &self.lanes {
            let step = lane.step();
            let outcome = if cancel.is_cancelled() {
                log::info!("Drain cancelled before the {step} step.");
                Ok(LaneOutcome::Cancelled)
            } else {
                lane.execute(&ctx)
            };
            match outcome {
                Ok(LaneOutcome::Completed { applied }) => {
                    log::debug!("{} lane applied {applied} changes.", lane.strategy_name());
                    stats.record(step, applied);
                }
                Ok(LaneOutcome::Cancelled) => {
                    self.stores.rollback();
                    self.publish(&sink, SyncEvent::DrainCancelled { step });
                    return Ok(DrainOutcome::Cancelled { step });
                }
                Err(e) => {
                    log::error!("Drain failed during the {step} step: {e}");
                    self.stores.rollback();
                    self.events.publish_all(sink.take());
                    return Err(e);
                }
            }
        }

        self.stores.reset();
        log::debug!("Drain completed with {} renderer changes.", stats.applied());
        self.publish(
            &sink,
            SyncEvent::DrainCompleted {
                applied: stats.applied(),
            },
        );
        Ok(DrainOutcome::Completed(stats))
    }

    fn publish(&self, sink: &EventSink, last: SyncEvent) {
        let mut events = sink.take();
        events.push(last);
        self.events.publish_all(events);
    }

    /// Releases every renderer resource and forgets every handle.
    ///
    /// Waits for a running drain to finish first. Later drains fail with
    /// [`UploadError::TornDown`].
    pub fn teardown(&self, scene: &dyn RenderScene) {
        let _guard = self.upload_lock.acquire();
        if self.torn_down.swap(true, Ordering::SeqCst) {
            log::debug!("ChangeDatabase already torn down.");
            return;
        }
        log::info!(
            "Tearing down: releasing {} shaders, {} meshes, {} objects.",
            self.stores.shaders.len(),
            self.stores.objects.mesh_count(),
            self.stores.objects.object_count()
        );
        scene.release_resources();
        self.stores.clear();
    }

    /// Returns `true` once [`teardown`](Self::teardown) has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// A receiver for the events published after each drain.
    pub fn subscribe(&self) -> flume::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    // --- Lookups ---

    /// The material hash currently used by `object`.
    pub fn find_hash_for_object(&self, object: ObjectId) -> Option<MaterialHash> {
        self.stores.shader_index.find_hash_for_object(object)
    }

    /// The material hash most recently recorded for `mesh`.
    pub fn find_hash_for_mesh(&self, mesh: MeshId) -> Option<MaterialHash> {
        self.stores.shader_index.find_hash_for_mesh(mesh)
    }

    /// The committed shader for `hash`.
    pub fn shader_for_hash(&self, hash: MaterialHash) -> Option<ShaderHandle> {
        self.stores.shaders.get(hash)
    }

    /// Returns `true` if the shader of `hash` exists and is retired.
    pub fn is_shader_retired(&self, hash: MaterialHash) -> bool {
        self.stores
            .shaders
            .get(hash)
            .is_some_and(|handle| self.stores.shaders.is_retired(handle))
    }

    /// The renderer handle of `object`.
    pub fn object_handle(&self, object: ObjectId) -> Option<ObjectHandle> {
        self.stores.objects.object_handle(object)
    }

    /// The renderer handle of `mesh`.
    pub fn mesh_handle(&self, mesh: MeshId) -> Option<MeshHandle> {
        self.stores.objects.mesh_handle(mesh)
    }

    /// The mesh `object` draws.
    pub fn mesh_of_object(&self, object: ObjectId) -> Option<MeshId> {
        self.stores.objects.mesh_of_object(object)
    }

    /// The renderer handle of `light`.
    pub fn light_handle(&self, light: LightId) -> Option<LightHandle> {
        self.stores.lights.handle(light)
    }

    /// Number of background-light entries, pending or committed. Never more
    /// than one.
    pub fn background_light_count(&self) -> usize {
        self.stores.lights.background_light_count()
    }

    /// Returns `true` if an environment change is waiting for a drain.
    pub fn environment_dirty(&self) -> bool {
        self.stores.environment.is_dirty()
    }

    /// The step order of a drain.
    pub fn upload_order(&self) -> Vec<UploadStep> {
        self.lanes.iter().map(|lane| lane.step()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::scene::{MaterialDescriptor, MaterialKind, PbrMaterial};

    struct NoMaterials;

    impl MaterialResolver for NoMaterials {
        fn resolve_material(
            &self,
            _material: MaterialId,
            _workflow: &LinearWorkflow,
        ) -> Option<MaterialDescriptor> {
            None
        }
    }

    struct OneMaterial(MaterialDescriptor);

    impl MaterialResolver for OneMaterial {
        fn resolve_material(
            &self,
            _material: MaterialId,
            _workflow: &LinearWorkflow,
        ) -> Option<MaterialDescriptor> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn new_database_queues_the_background_light() {
        let db = ChangeDatabase::new(SyncConfig::sequential(), Arc::new(NoMaterials));
        assert_eq!(db.background_light_count(), 1);
        assert!(db.has_pending_changes());
    }

    #[test]
    fn background_light_can_be_disabled() {
        let config = SyncConfig {
            background_light: false,
            ..SyncConfig::sequential()
        };
        let db = ChangeDatabase::new(config, Arc::new(NoMaterials));
        assert_eq!(db.background_light_count(), 0);
        assert!(!db.has_pending_changes());
    }

    #[test]
    fn upload_order_is_fixed() {
        let db = ChangeDatabase::new(SyncConfig::sequential(), Arc::new(NoMaterials));
        assert_eq!(db.upload_order(), UploadStep::ORDER.to_vec());
    }

    #[test]
    fn material_change_for_unknown_object_is_ignored() {
        let material = MaterialDescriptor::new("m", MaterialKind::Pbr(PbrMaterial::default()));
        let db = ChangeDatabase::new(SyncConfig::sequential(), Arc::new(OneMaterial(material)));
        db.apply_material_changes(&[(ObjectId(7), MaterialId::new())]);
        assert_eq!(db.find_hash_for_object(ObjectId(7)), None);
        assert!(db.stores().shaders.pending_builds().is_empty());
    }

    #[test]
    fn zero_worker_threads_uses_the_global_pool() {
        assert!(build_pool(0).is_none());
        assert_eq!(build_pool(2).map(|p| p.current_num_threads()), Some(2));
    }
}
