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

//! # Lane Abstraction
//!
//! The base trait shared by every upload lane.
//!
//! A **Lane** drains one category of buffered diffs into the renderer. The
//! orchestrator runs lanes in the fixed order given by [`UploadStep::ORDER`]:
//!
//! ```text
//! LinearWorkflow → Environment → DynamicTransforms → Camera → ClippingPlanes
//!   → Shaders → Meshes → Lights → Objects → ObjectShaders → GroundPlane
//! ```
//!
//! Shaders and meshes must exist before objects reference them, and the
//! object-shader reassignment runs after objects because it may reference
//! anything uploaded earlier in the same cycle.
//!
//! ## Architecture
//!
//! 1. **`Lane`** (this trait): identity and ordering, shared by all lanes.
//! 2. **`UploadLane: Lane`** (in `tessera-lanes`): adds `execute` over the
//!    stores of the change database.

use std::fmt;

/// One step of the drain sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UploadStep {
    /// Gamma / linear-workflow change.
    LinearWorkflow,
    /// Background and environment textures.
    Environment,
    /// Transform-only updates of existing objects.
    DynamicTransforms,
    /// Latest camera view.
    Camera,
    /// User clipping planes.
    ClippingPlanes,
    /// New or changed shaders.
    Shaders,
    /// Mesh geometry.
    Meshes,
    /// Lights, including the synthetic background light.
    Lights,
    /// Object additions, updates and deletions.
    Objects,
    /// Shader reassignment on existing objects.
    ObjectShaders,
    /// The ground plane.
    GroundPlane,
}

impl UploadStep {
    /// The fixed dependency order of a drain.
    pub const ORDER: [UploadStep; 11] = [
        UploadStep::LinearWorkflow,
        UploadStep::Environment,
        UploadStep::DynamicTransforms,
        UploadStep::Camera,
        UploadStep::ClippingPlanes,
        UploadStep::Shaders,
        UploadStep::Meshes,
        UploadStep::Lights,
        UploadStep::Objects,
        UploadStep::ObjectShaders,
        UploadStep::GroundPlane,
    ];

    /// Position of this step in [`ORDER`](Self::ORDER).
    pub fn position(self) -> usize {
        Self::ORDER
            .iter()
            .position(|s| *s == self)
            .unwrap_or(Self::ORDER.len())
    }
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStep::LinearWorkflow => "LinearWorkflow",
            UploadStep::Environment => "Environment",
            UploadStep::DynamicTransforms => "DynamicTransforms",
            UploadStep::Camera => "Camera",
            UploadStep::ClippingPlanes => "ClippingPlanes",
            UploadStep::Shaders => "Shaders",
            UploadStep::Meshes => "Meshes",
            UploadStep::Lights => "Lights",
            UploadStep::Objects => "Objects",
            UploadStep::ObjectShaders => "ObjectShaders",
            UploadStep::GroundPlane => "GroundPlane",
        };
        write!(f, "{name}")
    }
}

/// How a lane's execution ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneOutcome {
    /// Every buffered entry of the step was applied.
    Completed {
        /// Number of renderer mutations issued.
        applied: usize,
    },
    /// The cancellation token was observed; the step stopped early.
    Cancelled,
}

impl LaneOutcome {
    /// Shorthand for a completed step.
    pub fn completed(applied: usize) -> Self {
        LaneOutcome::Completed { applied }
    }

    /// Returns `true` if the step stopped on cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LaneOutcome::Cancelled)
    }
}

/// Base trait for every upload lane.
pub trait Lane: Send + Sync {
    /// Human-readable name identifying this lane, used for logging.
    fn strategy_name(&self) -> &'static str;

    /// The step this lane performs.
    fn step(&self) -> UploadStep;
}
