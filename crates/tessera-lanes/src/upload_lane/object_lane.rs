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

//! Object additions, updates and deletions.
//!
//! Deletions are independent of each other and fan out over the worker pool.
//! Upserts replay sequentially in apply order, after every mesh of the cycle
//! has been committed.

use super::{cancelled, retire_if_unused, UploadLane};
use crate::context::UploadContext;
use rayon::prelude::*;
use std::collections::BTreeSet;
use tessera_core::error::{RenderSceneError, UploadError};
use tessera_core::event::SyncEvent;
use tessera_core::lane::{Lane, LaneOutcome, UploadStep};
use tessera_core::scene::{MaterialHash, ObjectId, ObjectInstanceDescriptor, ShaderHandle};
use tessera_data::Stamped;

enum Deletion {
    Cancelled,
    Applied {
        hidden: bool,
        released: Option<MaterialHash>,
    },
}

/// Creates, updates and hides renderer objects.
#[derive(Debug, Default)]
pub struct ObjectLane;

impl ObjectLane {
    /// Creates a new `ObjectLane`.
    pub fn new() -> Self {
        Self
    }

    fn delete(
        ctx: &UploadContext<'_>,
        deletion: &Stamped<ObjectId>,
    ) -> Result<Deletion, UploadError> {
        if ctx.is_cancelled() {
            return Ok(Deletion::Cancelled);
        }
        let stores = ctx.stores;
        let object = deletion.item;
        let mut hidden = false;
        if let Some(handle) = stores.objects.object_handle(object) {
            if !stores.objects.is_hidden(object) {
                ctx.scene
                    .set_object_visibility(handle, false)
                    .map_err(|source| UploadError::ObjectUpdateFailed { object, source })?;
                stores.objects.set_hidden(object, true);
                hidden = true;
            }
        }
        let released = if stores.objects.forget_object(object, deletion.seq) {
            stores.shader_index.remove_object(object)
        } else {
            None
        };
        Ok(Deletion::Applied { hidden, released })
    }

    /// The committed shader of the object's current material, un-retired.
    fn shader_of(ctx: &UploadContext<'_>, object: ObjectId) -> Option<ShaderHandle> {
        let hash = ctx.stores.shader_index.find_hash_for_object(object)?;
        let shader = ctx.stores.shaders.get(hash)?;
        ctx.stores.shaders.unretire(shader);
        Some(shader)
    }

    /// Applies one upsert. Returns the number of renderer mutations.
    ///
    /// A transform-only update queued after the upsert replaces its transform.
    fn upsert(
        ctx: &UploadContext<'_>,
        upsert: &Stamped<ObjectInstanceDescriptor>,
    ) -> Result<usize, UploadError> {
        let objects = &ctx.stores.objects;
        let descriptor = &upsert.item;
        let object = descriptor.id;
        let transform = objects
            .transform_after(object, upsert.seq)
            .unwrap_or(descriptor.transform);
        let to_error =
            |source: RenderSceneError| UploadError::ObjectUpdateFailed { object, source };

        let Some(mesh_handle) = objects.mesh_handle(descriptor.mesh) else {
            log::warn!(
                "{object} references {} which has no renderer mesh; skipping it.",
                descriptor.mesh
            );
            return Ok(0);
        };
        let shader = Self::shader_of(ctx, object);

        let mut applied = 0;
        match objects.object_handle(object) {
            Some(handle) => {
                ctx.scene
                    .set_object_transform(handle, &transform)
                    .map_err(to_error)?;
                ctx.scene
                    .set_object_mesh(handle, mesh_handle)
                    .map_err(to_error)?;
                applied += 2;
                if let Some(shader) = shader {
                    ctx.scene
                        .set_object_shader(handle, shader)
                        .map_err(to_error)?;
                    applied += 1;
                }
                if descriptor.visible == objects.is_hidden(object) {
                    ctx.scene
                        .set_object_visibility(handle, descriptor.visible)
                        .map_err(to_error)?;
                    objects.set_hidden(object, !descriptor.visible);
                    applied += 1;
                }
            }
            None => {
                let handle = ctx
                    .scene
                    .create_object(object, mesh_handle, &transform, shader)
                    .map_err(to_error)?;
                objects.commit_object(object, handle);
                ctx.emit(SyncEvent::ObjectCreated { object, handle });
                applied += 1;
                if !descriptor.visible {
                    ctx.scene
                        .set_object_visibility(handle, false)
                        .map_err(to_error)?;
                    objects.set_hidden(object, true);
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }
}

impl Lane for ObjectLane {
    fn strategy_name(&self) -> &'static str {
        "Objects"
    }

    fn step(&self) -> UploadStep {
        UploadStep::Objects
    }
}

impl UploadLane for ObjectLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let batch = ctx.stores.objects.object_batch();
        let mut applied = 0;

        let results: Vec<Result<Deletion, UploadError>> = ctx.install(|| {
            batch
                .deletions
                .par_iter()
                .map(|deletion| Self::delete(ctx, deletion))
                .collect()
        });
        let mut released = BTreeSet::new();
        let mut interrupted = false;
        for result in results {
            match result? {
                Deletion::Cancelled => interrupted = true,
                Deletion::Applied { hidden, released: hash } => {
                    applied += usize::from(hidden);
                    released.extend(hash);
                }
            }
        }
        for hash in released {
            retire_if_unused(ctx, hash);
        }
        if interrupted {
            log::info!("Drain cancelled during the {} step.", self.step());
            return Ok(LaneOutcome::Cancelled);
        }

        for upsert in &batch.upserts {
            if cancelled(ctx, self.step()) {
                return Ok(LaneOutcome::Cancelled);
            }
            applied += Self::upsert(ctx, upsert)?;
        }

        log::debug!(
            "Objects: {} upserts replayed, {} deletions applied.",
            batch.upserts.len(),
            batch.deletions.len()
        );
        Ok(LaneOutcome::completed(applied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{instance, mesh_id, Harness};
    use glam::{Mat4, Vec3};
    use tessera_core::scene::ObjectHandle;
    use tessera_infra::SceneCall;

    fn created_handle(harness: &Harness, object: ObjectId) -> ObjectHandle {
        harness
            .stores
            .objects
            .object_handle(object)
            .expect("object handle")
    }

    #[test]
    fn new_object_is_created_with_its_material_shader() {
        let harness = Harness::new();
        let mesh = mesh_id(1);
        let hash = MaterialHash(9);
        harness.seed_mesh(mesh);
        harness.stores.shaders.commit(hash, ShaderHandle(40));
        harness.stores.shader_index.record(hash, mesh, ObjectId(1));
        harness.stores.objects.add_or_update_object(instance(1, mesh));

        assert_eq!(harness.run(&ObjectLane), Ok(LaneOutcome::completed(1)));
        let handle = created_handle(&harness, ObjectId(1));
        let recorded = harness.scene.object(handle).expect("recorded object");
        assert_eq!(recorded.shader, Some(ShaderHandle(40)));
        assert!(recorded.visible);
        assert_eq!(
            harness.events.take(),
            vec![SyncEvent::ObjectCreated {
                object: ObjectId(1),
                handle,
            }]
        );
    }

    #[test]
    fn invisible_object_is_created_hidden() {
        let harness = Harness::new();
        let mesh = mesh_id(1);
        harness.seed_mesh(mesh);
        let mut descriptor = instance(1, mesh);
        descriptor.visible = false;
        harness.stores.objects.add_or_update_object(descriptor);

        harness.run(&ObjectLane).expect("objects");
        let handle = created_handle(&harness, ObjectId(1));
        assert!(!harness.scene.object(handle).expect("object").visible);
        assert!(harness.stores.objects.is_hidden(ObjectId(1)));
    }

    #[test]
    fn update_overwrites_an_existing_object() {
        let harness = Harness::new();
        let mesh = mesh_id(1);
        let (mesh_handle, handle) = harness.seed_object(ObjectId(1), mesh);
        harness.stores.objects.add_or_update_object(instance(1, mesh));

        assert_eq!(harness.run(&ObjectLane), Ok(LaneOutcome::completed(2)));
        assert_eq!(
            harness.scene.calls(),
            vec![
                SceneCall::SetObjectTransform(handle),
                SceneCall::SetObjectMesh(handle, mesh_handle),
            ]
        );
        assert_eq!(harness.scene.object_count(), 1);
    }

    #[test]
    fn later_transform_update_survives_the_upsert() {
        let harness = Harness::new();
        let mesh = mesh_id(1);
        let (_, existing) = harness.seed_object(ObjectId(1), mesh);
        let moved = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let stale = Mat4::from_translation(Vec3::Y);
        harness.stores.objects.add_or_update_object(instance(1, mesh));
        harness.stores.objects.update_transform(ObjectId(1), moved);
        harness.stores.objects.update_transform(ObjectId(3), stale);
        harness.stores.objects.add_or_update_object(instance(3, mesh));

        harness.run(&ObjectLane).expect("objects");
        let updated = harness.scene.object(existing).expect("updated object");
        assert_eq!(updated.transform, moved);
        let created = created_handle(&harness, ObjectId(3));
        let created = harness.scene.object(created).expect("created object");
        assert_eq!(created.transform, Mat4::IDENTITY);
    }

    #[test]
    fn object_without_a_mesh_handle_is_skipped() {
        let harness = Harness::new();
        harness
            .stores
            .objects
            .add_or_update_object(instance(1, mesh_id(1)));

        assert_eq!(harness.run(&ObjectLane), Ok(LaneOutcome::completed(0)));
        assert!(harness.stores.objects.object_handle(ObjectId(1)).is_none());
    }

    #[test]
    fn deletion_hides_the_object_and_retires_its_shader() {
        let harness = Harness::new();
        let mesh = mesh_id(1);
        let hash = MaterialHash(3);
        harness.stores.objects.add_or_update_object(instance(1, mesh));
        harness.stores.begin_drain();
        harness.stores.reset();
        let (_, handle) = harness.seed_object(ObjectId(1), mesh);
        harness.stores.shaders.commit(hash, ShaderHandle(30));
        harness.stores.shader_index.record(hash, mesh, ObjectId(1));

        harness.stores.objects.delete_object(ObjectId(1));
        assert_eq!(harness.run(&ObjectLane), Ok(LaneOutcome::completed(1)));
        assert_eq!(
            harness.scene.calls(),
            vec![SceneCall::SetObjectVisibility(handle, false)]
        );
        assert_eq!(harness.stores.objects.mesh_of_object(ObjectId(1)), None);
        assert_eq!(harness.stores.shader_index.find_hash_for_object(ObjectId(1)), None);
        assert!(harness.stores.shaders.is_retired(ShaderHandle(30)));
        assert_eq!(
            harness.events.take(),
            vec![SyncEvent::ShaderRetired {
                hash,
                handle: ShaderHandle(30),
            }]
        );
    }

    #[test]
    fn deleting_one_instance_keeps_the_shared_mesh() {
        let harness = Harness::new();
        let mesh = mesh_id(1);
        let (mesh_handle, first) = harness.seed_object(ObjectId(1), mesh);
        let (_, second) = harness.seed_object(ObjectId(2), mesh);

        harness.stores.objects.delete_object(ObjectId(1));
        harness.run(&ObjectLane).expect("objects");
        assert!(!harness.scene.object(first).expect("first").visible);
        assert!(harness.scene.object(second).expect("second").visible);
        assert!(harness.scene.mesh(mesh_handle).is_some());
    }

    #[test]
    fn delete_then_re_add_in_one_cycle_only_upserts() {
        let harness = Harness::new();
        let mesh = mesh_id(1);
        let (_, handle) = harness.seed_object(ObjectId(1), mesh);
        harness.stores.objects.delete_object(ObjectId(1));
        harness.stores.objects.add_or_update_object(instance(1, mesh));

        harness.run(&ObjectLane).expect("objects");
        assert!(!harness
            .scene
            .calls()
            .contains(&SceneCall::SetObjectVisibility(handle, false)));
        assert!(harness.scene.object(handle).expect("object").visible);
        assert_eq!(harness.stores.objects.mesh_of_object(ObjectId(1)), Some(mesh));
    }

    #[test]
    fn re_added_object_reuses_its_hidden_handle() {
        let harness = Harness::new();
        let mesh = mesh_id(1);
        let (_, handle) = harness.seed_object(ObjectId(1), mesh);
        harness.stores.objects.delete_object(ObjectId(1));
        harness.run(&ObjectLane).expect("delete");
        harness.stores.reset();

        harness.stores.objects.add_or_update_object(instance(1, mesh));
        harness.run(&ObjectLane).expect("re-add");
        assert_eq!(created_handle(&harness, ObjectId(1)), handle);
        assert!(harness.scene.object(handle).expect("object").visible);
        assert_eq!(harness.scene.object_count(), 1);
    }

    #[test]
    fn cancelled_before_deletions_applies_nothing() {
        let harness = Harness::new();
        let (_, handle) = harness.seed_object(ObjectId(1), mesh_id(1));
        harness.stores.objects.delete_object(ObjectId(1));
        harness.cancel.cancel();

        assert_eq!(harness.run(&ObjectLane), Ok(LaneOutcome::Cancelled));
        assert!(harness.scene.object(handle).expect("object").visible);
    }
}
