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

use super::{cancelled, UploadLane};
use crate::context::UploadContext;
use tessera_core::error::UploadError;
use tessera_core::lane::{Lane, LaneOutcome, UploadStep};

/// Applies transform-only updates to objects that already exist in the
/// renderer. Updates for objects without a handle are dropped: the object's
/// own upsert carries its transform, and the Objects step reapplies any
/// update sent after that upsert.
#[derive(Debug, Default)]
pub struct DynamicTransformLane;

impl DynamicTransformLane {
    /// Creates a new `DynamicTransformLane`.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for DynamicTransformLane {
    fn strategy_name(&self) -> &'static str {
        "DynamicTransforms"
    }

    fn step(&self) -> UploadStep {
        UploadStep::DynamicTransforms
    }
}

impl UploadLane for DynamicTransformLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let batch = ctx.stores.objects.transform_batch();
        let mut applied = 0;
        for stamped in batch.iter() {
            let (object, transform) = &stamped.item;
            if cancelled(ctx, self.step()) {
                return Ok(LaneOutcome::Cancelled);
            }
            let Some(handle) = ctx.stores.objects.object_handle(*object) else {
                log::trace!("Transform for {object} dropped: not in the renderer yet.");
                continue;
            };
            ctx.scene
                .set_object_transform(handle, transform)
                .map_err(|source| UploadError::ObjectUpdateFailed {
                    object: *object,
                    source,
                })?;
            applied += 1;
        }
        Ok(LaneOutcome::completed(applied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mesh_id, Harness};
    use glam::{Mat4, Vec3};
    use tessera_core::scene::ObjectId;
    use tessera_infra::SceneCall;

    #[test]
    fn transforms_skip_objects_without_handles() {
        let harness = Harness::new();
        let (_, handle) = harness.seed_object(ObjectId(1), mesh_id(1));
        let moved = Mat4::from_translation(Vec3::X);
        harness.stores.objects.update_transform(ObjectId(1), moved);
        harness.stores.objects.update_transform(ObjectId(2), moved);

        assert_eq!(
            harness.run(&DynamicTransformLane),
            Ok(LaneOutcome::completed(1))
        );
        assert_eq!(
            harness.scene.calls(),
            vec![SceneCall::SetObjectTransform(handle)]
        );
    }

    #[test]
    fn cancellation_stops_before_the_first_update() {
        let harness = Harness::new();
        harness.seed_object(ObjectId(1), mesh_id(1));
        harness
            .stores
            .objects
            .update_transform(ObjectId(1), Mat4::IDENTITY);
        harness.cancel.cancel();

        assert_eq!(harness.run(&DynamicTransformLane), Ok(LaneOutcome::Cancelled));
        assert!(harness.scene.calls().is_empty());
    }
}
