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
use tessera_core::error::{RenderSceneError, UploadError};
use tessera_core::event::SyncEvent;
use tessera_core::lane::{Lane, LaneOutcome, UploadStep};

/// Creates, updates and hides renderer lights.
///
/// The add/update split is recomputed from the handle map on every run, so a
/// light created by an interrupted attempt is updated, not created twice, on
/// the retry. Deleted lights are hidden; a later upsert of the same id makes
/// them visible again.
#[derive(Debug, Default)]
pub struct LightLane;

impl LightLane {
    /// Creates a new `LightLane`.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for LightLane {
    fn strategy_name(&self) -> &'static str {
        "Lights"
    }

    fn step(&self) -> UploadStep {
        UploadStep::Lights
    }
}

impl UploadLane for LightLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let lights = &ctx.stores.lights;
        let partition = lights.in_flight_partition();
        let mut applied = 0;

        for light in &partition.to_add {
            if cancelled(ctx, self.step()) {
                return Ok(LaneOutcome::Cancelled);
            }
            let handle = ctx
                .scene
                .create_light(light)
                .map_err(|source| UploadError::LightUploadFailed {
                    light: light.id,
                    source,
                })?;
            lights.commit_light(light.id, handle);
            ctx.emit(SyncEvent::LightAdded {
                light: light.id,
                handle,
            });
            applied += 1;
        }

        for light in &partition.to_update {
            if cancelled(ctx, self.step()) {
                return Ok(LaneOutcome::Cancelled);
            }
            let Some(handle) = lights.handle(light.id) else {
                continue;
            };
            let to_error = |source: RenderSceneError| UploadError::LightUploadFailed {
                light: light.id,
                source,
            };
            ctx.scene.update_light(handle, light).map_err(to_error)?;
            if lights.is_hidden(light.id) {
                ctx.scene
                    .set_light_visibility(handle, true)
                    .map_err(to_error)?;
                lights.set_hidden(light.id, false);
            }
            ctx.emit(SyncEvent::LightUpdated { light: light.id });
            applied += 1;
        }

        for id in &partition.to_hide {
            if cancelled(ctx, self.step()) {
                return Ok(LaneOutcome::Cancelled);
            }
            let Some(handle) = lights.handle(*id) else {
                continue;
            };
            if lights.is_hidden(*id) {
                continue;
            }
            ctx.scene
                .set_light_visibility(handle, false)
                .map_err(|source| UploadError::LightUploadFailed { light: *id, source })?;
            lights.set_hidden(*id, true);
            ctx.emit(SyncEvent::LightHidden { light: *id });
            applied += 1;
        }

        log::debug!(
            "Lights: {} added, {} updated, {} hidden.",
            partition.to_add.len(),
            partition.to_update.len(),
            partition.to_hide.len()
        );
        Ok(LaneOutcome::completed(applied))
    }
}
