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

//! # Tessera Lanes
//!
//! The hot path of a drain: one [`UploadLane`] per
//! [`UploadStep`](tessera_core::UploadStep), each turning the in-flight diffs
//! of its stores into renderer calls.

#![warn(missing_docs)]

pub mod context;
pub mod upload_lane;

#[cfg(test)]
mod test_support;

pub use context::{EventSink, UploadContext};
pub use upload_lane::{
    prepare_mesh, standard_lanes, CameraLane, ClippingPlaneLane, DynamicTransformLane,
    EnvironmentLane, GroundPlaneLane, LightLane, LinearWorkflowLane, MeshLane, ObjectLane,
    ObjectShaderLane, ShaderLane, UploadLane,
};
