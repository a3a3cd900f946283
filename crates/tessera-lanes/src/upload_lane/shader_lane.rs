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

//! Shader builds and shader reassignment on existing objects.

use super::{cancelled, retire_if_unused, UploadLane};
use crate::context::UploadContext;
use std::collections::BTreeSet;
use tessera_core::error::UploadError;
use tessera_core::event::SyncEvent;
use tessera_core::lane::{Lane, LaneOutcome, UploadStep};

/// Builds one shader per new material hash.
///
/// Builds run sequentially: renderers commonly compile shaders on a single
/// context, and the batch is small next to mesh uploads.
#[derive(Debug, Default)]
pub struct ShaderLane;

impl ShaderLane {
    /// Creates a new `ShaderLane`.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for ShaderLane {
    fn strategy_name(&self) -> &'static str {
        "Shaders"
    }

    fn step(&self) -> UploadStep {
        UploadStep::Shaders
    }
}

impl UploadLane for ShaderLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let cache = &ctx.stores.shaders;
        let builds = cache.in_flight_builds();
        let mut applied = 0;
        for pending in builds.iter() {
            if cancelled(ctx, self.step()) {
                return Ok(LaneOutcome::Cancelled);
            }
            // Committed by an earlier, interrupted attempt.
            if cache.has(pending.hash) {
                continue;
            }
            let handle = ctx
                .scene
                .build_shader(pending.hash, &pending.material)
                .map_err(|source| {
                    log::error!(
                        "Shader build failed for '{}' ({}): {source}",
                        pending.material.name,
                        pending.hash
                    );
                    UploadError::ShaderBuildFailed {
                        hash: pending.hash,
                        source,
                    }
                })?;
            cache.commit(pending.hash, handle);
            log::debug!(
                "Built {handle} for '{}' ({}).",
                pending.material.name,
                pending.hash
            );
            ctx.emit(SyncEvent::ShaderBuilt {
                hash: pending.hash,
                handle,
            });
            applied += 1;
        }
        Ok(LaneOutcome::completed(applied))
    }
}

/// Points existing renderer objects at the shader of their new material,
/// then retires shaders that lost their last object.
#[derive(Debug, Default)]
pub struct ObjectShaderLane;

impl ObjectShaderLane {
    /// Creates a new `ObjectShaderLane`.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for ObjectShaderLane {
    fn strategy_name(&self) -> &'static str {
        "ObjectShaders"
    }

    fn step(&self) -> UploadStep {
        UploadStep::ObjectShaders
    }
}

impl UploadLane for ObjectShaderLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let stores = ctx.stores;
        let reassignments = stores.shaders.in_flight_reassignments();
        let mut applied = 0;
        let mut released = BTreeSet::new();

        for reassignment in reassignments.iter() {
            if cancelled(ctx, self.step()) {
                return Ok(LaneOutcome::Cancelled);
            }
            released.insert(reassignment.old);

            let Some(handle) = stores.objects.object_handle(reassignment.object) else {
                continue;
            };
            // Objects created in this drain already got their current shader.
            if ctx.events.created(reassignment.object) {
                continue;
            }
            // A later reassignment of the same object wins.
            if stores.shader_index.find_hash_for_object(reassignment.object)
                != Some(reassignment.new)
            {
                continue;
            }
            let Some(shader) = stores.shaders.get(reassignment.new) else {
                log::warn!(
                    "No shader for material {} of {}; keeping its current shader.",
                    reassignment.new,
                    reassignment.object
                );
                continue;
            };
            ctx.scene
                .set_object_shader(handle, shader)
                .map_err(|source| UploadError::ObjectUpdateFailed {
                    object: reassignment.object,
                    source,
                })?;
            stores.shaders.unretire(shader);
            applied += 1;
        }

        for hash in released {
            retire_if_unused(ctx, hash);
        }
        Ok(LaneOutcome::completed(applied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mesh_id, pbr, Harness};
    use tessera_core::error::RenderSceneError;
    use tessera_core::scene::{MaterialHash, ObjectId, ShaderHandle};
    use tessera_data::ShaderReassignment;
    use tessera_infra::SceneCall;

    #[test]
    fn builds_each_queued_hash_once() {
        let harness = Harness::new();
        let hash = MaterialHash(1);
        assert!(harness.stores.shaders.enqueue_new(hash, pbr("steel", 0.2)));
        assert!(!harness.stores.shaders.enqueue_new(hash, pbr("steel", 0.2)));

        assert_eq!(harness.run(&ShaderLane), Ok(LaneOutcome::completed(1)));
        assert_eq!(harness.scene.build_count(hash), 1);
        assert!(harness.stores.shaders.has(hash));
        let events = harness.events.take();
        assert!(matches!(
            events.as_slice(),
            [SyncEvent::ShaderBuilt { hash: h, .. }] if *h == hash
        ));
    }

    #[test]
    fn failed_build_reports_the_hash_and_keeps_earlier_commits() {
        let harness = Harness::new();
        let good = MaterialHash(1);
        let bad = MaterialHash(2);
        harness.stores.shaders.enqueue_new(good, pbr("good", 0.1));
        harness.stores.shaders.enqueue_new(bad, pbr("bad", 0.9));
        harness.scene.fail_shader_build(bad);

        let err = harness.run(&ShaderLane).unwrap_err();
        assert!(matches!(
            err,
            UploadError::ShaderBuildFailed {
                hash,
                source: RenderSceneError::ShaderBuild(_),
            } if hash == bad
        ));
        assert!(harness.stores.shaders.has(good));
        assert!(!harness.stores.shaders.has(bad));

        // Retry after rollback builds only the missing shader.
        harness.stores.rollback();
        harness.scene.clear_hooks();
        assert_eq!(harness.run(&ShaderLane), Ok(LaneOutcome::completed(1)));
        assert_eq!(harness.scene.build_count(good), 1);
        assert_eq!(harness.scene.build_count(bad), 1);
    }

    #[test]
    fn reassignment_switches_shader_and_retires_the_old_one() {
        let harness = Harness::new();
        let (old, new) = (MaterialHash(1), MaterialHash(2));
        let object = ObjectId(1);
        let mesh = mesh_id(1);
        let (_, handle) = harness.seed_object(object, mesh);
        harness.stores.shaders.commit(old, ShaderHandle(100));
        harness.stores.shaders.commit(new, ShaderHandle(200));
        harness.stores.shader_index.record(old, mesh, object);
        assert!(harness.stores.shader_index.replace(old, new, mesh, object));
        harness
            .stores
            .shaders
            .enqueue_reassignment(ShaderReassignment { object, old, new });

        assert_eq!(harness.run(&ObjectShaderLane), Ok(LaneOutcome::completed(1)));
        assert_eq!(
            harness.scene.calls(),
            vec![SceneCall::SetObjectShader(handle, ShaderHandle(200))]
        );
        assert!(harness.stores.shaders.is_retired(ShaderHandle(100)));
        assert!(!harness.stores.shaders.is_retired(ShaderHandle(200)));
    }

    #[test]
    fn object_created_in_this_drain_keeps_its_creation_shader() {
        let harness = Harness::new();
        let (old, new) = (MaterialHash(1), MaterialHash(2));
        let object = ObjectId(1);
        let mesh = mesh_id(1);
        let (_, handle) = harness.seed_object(object, mesh);
        harness.stores.shaders.commit(new, ShaderHandle(200));
        harness.stores.shader_index.record(new, mesh, object);
        harness
            .stores
            .shaders
            .enqueue_reassignment(ShaderReassignment { object, old, new });
        harness.events.push(SyncEvent::ObjectCreated { object, handle });

        assert_eq!(harness.run(&ObjectShaderLane), Ok(LaneOutcome::completed(0)));
        assert!(harness.scene.calls().is_empty());
    }

    #[test]
    fn superseded_reassignment_is_skipped() {
        let harness = Harness::new();
        let (a, b, c) = (MaterialHash(1), MaterialHash(2), MaterialHash(3));
        let object = ObjectId(1);
        let mesh = mesh_id(1);
        let (_, handle) = harness.seed_object(object, mesh);
        for (hash, shader) in [(a, 1), (b, 2), (c, 3)] {
            harness.stores.shaders.commit(hash, ShaderHandle(shader));
        }
        harness.stores.shader_index.record(a, mesh, object);
        harness.stores.shader_index.replace(a, b, mesh, object);
        harness.stores.shader_index.replace(b, c, mesh, object);
        for (old, new) in [(a, b), (b, c)] {
            harness
                .stores
                .shaders
                .enqueue_reassignment(ShaderReassignment { object, old, new });
        }

        assert_eq!(harness.run(&ObjectShaderLane), Ok(LaneOutcome::completed(1)));
        assert_eq!(
            harness.scene.calls(),
            vec![SceneCall::SetObjectShader(handle, ShaderHandle(3))]
        );
        assert!(harness.stores.shaders.is_retired(ShaderHandle(1)));
        assert!(harness.stores.shaders.is_retired(ShaderHandle(2)));
    }

    #[test]
    fn shared_shader_is_not_retired_while_in_use() {
        let harness = Harness::new();
        let (shared, other) = (MaterialHash(1), MaterialHash(2));
        let mesh = mesh_id(1);
        harness.seed_object(ObjectId(1), mesh);
        harness.seed_object(ObjectId(2), mesh);
        harness.stores.shaders.commit(shared, ShaderHandle(1));
        harness.stores.shaders.commit(other, ShaderHandle(2));
        harness.stores.shader_index.record(shared, mesh, ObjectId(1));
        harness.stores.shader_index.record(shared, mesh, ObjectId(2));
        harness.stores.shader_index.replace(shared, other, mesh, ObjectId(1));
        harness.stores.shaders.enqueue_reassignment(ShaderReassignment {
            object: ObjectId(1),
            old: shared,
            new: other,
        });

        harness.run(&ObjectShaderLane).expect("reassignment");
        assert!(!harness.stores.shaders.is_retired(ShaderHandle(1)));
    }
}
