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

//! Lanes for the single-record stores: gamma, environment, camera, clipping
//! planes and the ground plane. Each one issues at most one renderer call.

use super::UploadLane;
use crate::context::UploadContext;
use tessera_core::error::UploadError;
use tessera_core::event::SyncEvent;
use tessera_core::lane::{Lane, LaneOutcome, UploadStep};

/// Applies a gamma / linear-workflow change.
#[derive(Debug, Default)]
pub struct LinearWorkflowLane;

impl LinearWorkflowLane {
    /// Creates a new `LinearWorkflowLane`.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for LinearWorkflowLane {
    fn strategy_name(&self) -> &'static str {
        "LinearWorkflow"
    }

    fn step(&self) -> UploadStep {
        UploadStep::LinearWorkflow
    }
}

impl UploadLane for LinearWorkflowLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let Some(workflow) = ctx.stores.gamma.in_flight() else {
            return Ok(LaneOutcome::completed(0));
        };
        ctx.scene
            .set_linear_workflow(&workflow)
            .map_err(|e| UploadError::scene(self.step(), e))?;
        log::debug!(
            "Linear workflow applied (enabled: {}, gamma: {}).",
            workflow.enabled,
            workflow.gamma
        );
        Ok(LaneOutcome::completed(1))
    }
}

/// Applies the background/environment record when it is dirty.
#[derive(Debug, Default)]
pub struct EnvironmentLane;

impl EnvironmentLane {
    /// Creates a new `EnvironmentLane`.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for EnvironmentLane {
    fn strategy_name(&self) -> &'static str {
        "Environment"
    }

    fn step(&self) -> UploadStep {
        UploadStep::Environment
    }
}

impl UploadLane for EnvironmentLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let Some(environment) = ctx.stores.environment.in_flight() else {
            return Ok(LaneOutcome::completed(0));
        };
        ctx.scene
            .set_environment(&environment)
            .map_err(|e| UploadError::scene(self.step(), e))?;
        ctx.emit(SyncEvent::EnvironmentChanged);
        Ok(LaneOutcome::completed(1))
    }
}

/// Applies the latest camera view.
#[derive(Debug, Default)]
pub struct CameraLane;

impl CameraLane {
    /// Creates a new `CameraLane`.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for CameraLane {
    fn strategy_name(&self) -> &'static str {
        "Camera"
    }

    fn step(&self) -> UploadStep {
        UploadStep::Camera
    }
}

impl UploadLane for CameraLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let Some(view) = ctx.stores.camera.in_flight() else {
            return Ok(LaneOutcome::completed(0));
        };
        ctx.scene
            .set_view(&view)
            .map_err(|e| UploadError::scene(self.step(), e))?;
        ctx.emit(SyncEvent::ViewChanged);
        Ok(LaneOutcome::completed(1))
    }
}

/// Uploads the full set of enabled clipping planes.
#[derive(Debug, Default)]
pub struct ClippingPlaneLane;

impl ClippingPlaneLane {
    /// Creates a new `ClippingPlaneLane`.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for ClippingPlaneLane {
    fn strategy_name(&self) -> &'static str {
        "ClippingPlanes"
    }

    fn step(&self) -> UploadStep {
        UploadStep::ClippingPlanes
    }
}

impl UploadLane for ClippingPlaneLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let Some(planes) = ctx.stores.clipping_planes.in_flight() else {
            return Ok(LaneOutcome::completed(0));
        };
        ctx.scene
            .set_clipping_planes(&planes)
            .map_err(|e| UploadError::scene(self.step(), e))?;
        log::debug!("{} clipping planes applied.", planes.len());
        Ok(LaneOutcome::completed(1))
    }
}

/// Applies the ground plane with the shader of its material.
///
/// Runs last so a material introduced in the same cycle has been built by
/// the shader lane.
#[derive(Debug, Default)]
pub struct GroundPlaneLane;

impl GroundPlaneLane {
    /// Creates a new `GroundPlaneLane`.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for GroundPlaneLane {
    fn strategy_name(&self) -> &'static str {
        "GroundPlane"
    }

    fn step(&self) -> UploadStep {
        UploadStep::GroundPlane
    }
}

impl UploadLane for GroundPlaneLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let Some(record) = ctx.stores.ground_plane.in_flight() else {
            return Ok(LaneOutcome::completed(0));
        };
        let shader = record.material_hash.and_then(|hash| {
            let shader = ctx.stores.shaders.get(hash);
            match shader {
                Some(shader) => {
                    ctx.stores.shaders.unretire(shader);
                }
                None => {
                    log::warn!("Ground plane material {hash} has no shader; using the default.");
                }
            }
            shader
        });
        ctx.scene
            .set_ground_plane(&record.plane, shader)
            .map_err(|e| UploadError::scene(self.step(), e))?;
        Ok(LaneOutcome::completed(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use glam::Vec3;
    use tessera_core::scene::{
        ClippingPlane, ClippingPlaneId, GroundPlane, LinearWorkflow, MaterialHash, ShaderHandle,
        ViewDescriptor,
    };
    use tessera_infra::SceneCall;

    #[test]
    fn clean_stores_issue_no_calls() {
        let harness = Harness::new();
        for lane in [
            &LinearWorkflowLane as &dyn UploadLane,
            &EnvironmentLane,
            &CameraLane,
            &ClippingPlaneLane,
            &GroundPlaneLane,
        ] {
            assert_eq!(harness.run(lane), Ok(LaneOutcome::completed(0)));
        }
        assert!(harness.scene.calls().is_empty());
    }

    #[test]
    fn camera_lane_applies_the_latest_view() {
        let harness = Harness::new();
        let view = ViewDescriptor {
            eye: Vec3::new(0.0, 2.0, 8.0),
            ..ViewDescriptor::default()
        };
        harness.stores.camera.set_view(ViewDescriptor::default());
        harness.stores.camera.set_view(view);

        assert_eq!(harness.run(&CameraLane), Ok(LaneOutcome::completed(1)));
        assert_eq!(harness.scene.view(), Some(view));
        assert_eq!(harness.events.take(), vec![SyncEvent::ViewChanged]);
    }

    #[test]
    fn gamma_change_reaches_the_renderer() {
        let harness = Harness::new();
        let workflow = LinearWorkflow {
            enabled: false,
            gamma: 2.2,
        };
        harness.stores.gamma.set(workflow);
        harness.run(&LinearWorkflowLane).expect("gamma lane");
        assert_eq!(harness.scene.linear_workflow(), Some(workflow));
    }

    #[test]
    fn clipping_lane_sends_enabled_planes_only() {
        let harness = Harness::new();
        harness.stores.clipping_planes.upsert(ClippingPlane {
            id: ClippingPlaneId::new(),
            point: Vec3::ZERO,
            normal: Vec3::X,
            enabled: true,
        });
        harness.stores.clipping_planes.upsert(ClippingPlane {
            id: ClippingPlaneId::new(),
            point: Vec3::ZERO,
            normal: Vec3::Y,
            enabled: false,
        });
        harness.run(&ClippingPlaneLane).expect("clipping lane");
        assert_eq!(harness.scene.calls(), vec![SceneCall::SetClippingPlanes(1)]);
    }

    #[test]
    fn ground_plane_uses_its_material_shader() {
        let harness = Harness::new();
        let hash = MaterialHash(77);
        harness.stores.shaders.commit(hash, ShaderHandle(5));
        let plane = GroundPlane {
            enabled: true,
            ..GroundPlane::default()
        };
        harness.stores.ground_plane.set(plane.clone(), Some(hash));

        harness.run(&GroundPlaneLane).expect("ground plane lane");
        assert_eq!(
            harness.scene.ground_plane(),
            Some((plane, Some(ShaderHandle(5))))
        );
    }
}
