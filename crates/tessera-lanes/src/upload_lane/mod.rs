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

//! The upload lanes, one per [`UploadStep`].
//!
//! Every lane reads only the in-flight side of its stores, so notifications
//! keep flowing into the pending side while a drain runs. A lane returns
//! [`LaneOutcome::Cancelled`] as soon as it observes the cancellation token,
//! leaving whatever it has not applied for the retry.

mod light_lane;
mod mesh_lane;
mod object_lane;
mod settings_lanes;
mod shader_lane;
mod transform_lane;

pub use light_lane::LightLane;
pub use mesh_lane::{prepare_mesh, MeshLane};
pub use object_lane::ObjectLane;
pub use settings_lanes::{
    CameraLane, ClippingPlaneLane, EnvironmentLane, GroundPlaneLane, LinearWorkflowLane,
};
pub use shader_lane::{ObjectShaderLane, ShaderLane};
pub use transform_lane::DynamicTransformLane;

use crate::context::UploadContext;
use tessera_core::error::UploadError;
use tessera_core::event::SyncEvent;
use tessera_core::lane::{Lane, LaneOutcome, UploadStep};
use tessera_core::scene::MaterialHash;

/// A lane that drains one category of buffered diffs into the renderer.
pub trait UploadLane: Lane {
    /// Applies the in-flight diffs of this lane's step.
    ///
    /// Renderer failures are returned as [`UploadError`]; the caller rolls
    /// the buffers back. Handles committed before the failure stay committed,
    /// so a retry does not create them twice.
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError>;
}

/// All lanes, in [`UploadStep::ORDER`].
pub fn standard_lanes() -> Vec<Box<dyn UploadLane>> {
    vec![
        Box::new(LinearWorkflowLane::new()),
        Box::new(EnvironmentLane::new()),
        Box::new(DynamicTransformLane::new()),
        Box::new(CameraLane::new()),
        Box::new(ClippingPlaneLane::new()),
        Box::new(ShaderLane::new()),
        Box::new(MeshLane::new()),
        Box::new(LightLane::new()),
        Box::new(ObjectLane::new()),
        Box::new(ObjectShaderLane::new()),
        Box::new(GroundPlaneLane::new()),
    ]
}

/// Retires the shader of `hash` if neither an object nor the ground plane
/// uses it anymore.
///
/// Returns `true` if the shader was newly retired.
pub(crate) fn retire_if_unused(ctx: &UploadContext<'_>, hash: MaterialHash) -> bool {
    if !ctx.config.retire_unused_shaders || hash.is_no_previous() {
        return false;
    }
    let stores = ctx.stores;
    if !stores.shader_index.is_unused(hash) {
        return false;
    }
    // The ground plane is not part of the object-shader index.
    if stores.ground_plane.current().material_hash == Some(hash) {
        log::trace!("Keeping the shader of material {hash}: the ground plane uses it.");
        return false;
    }
    let Some(handle) = stores.shaders.get(hash) else {
        return false;
    };
    if stores.shaders.retire(handle) {
        log::debug!("Retired {handle} for material {hash}: no object uses it anymore.");
        ctx.emit(SyncEvent::ShaderRetired { hash, handle });
        true
    } else {
        false
    }
}

/// Checked between items; logs once per interrupted step.
pub(crate) fn cancelled(ctx: &UploadContext<'_>, step: UploadStep) -> bool {
    if ctx.is_cancelled() {
        log::info!("Drain cancelled during the {step} step.");
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use tessera_core::scene::{GroundPlane, ShaderHandle};

    #[test]
    fn standard_lanes_follow_the_upload_order() {
        let steps: Vec<UploadStep> = standard_lanes().iter().map(|l| l.step()).collect();
        assert_eq!(steps, UploadStep::ORDER.to_vec());
    }

    #[test]
    fn lane_names_are_unique() {
        let lanes = standard_lanes();
        let mut names: Vec<&str> = lanes.iter().map(|l| l.strategy_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), lanes.len());
    }

    #[test]
    fn shader_used_by_the_ground_plane_is_not_retired() {
        let harness = Harness::new();
        let hash = MaterialHash(5);
        harness.stores.shaders.commit(hash, ShaderHandle(9));
        harness.stores.ground_plane.set(GroundPlane::default(), Some(hash));

        assert!(!retire_if_unused(&harness.ctx(), hash));
        assert!(!harness.stores.shaders.is_retired(ShaderHandle(9)));
        assert!(harness.events.is_empty());

        harness.stores.ground_plane.set(GroundPlane::default(), None);
        assert!(retire_if_unused(&harness.ctx(), hash));
        assert!(harness.stores.shaders.is_retired(ShaderHandle(9)));
    }
}
