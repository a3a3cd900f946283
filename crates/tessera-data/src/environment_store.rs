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

//! The background/environment record.
//!
//! Unlike every other store this is not a queue: the scene has exactly one
//! background, so the store keeps the current record and a dirty flag. Values
//! survive resets; only the flag is cleared.

use crate::diff_buffer::DirtyFlag;
use parking_lot::Mutex;
use tessera_core::scene::{BackgroundStyle, EnvironmentDescriptor, EnvironmentTexture};

#[derive(Debug, Default)]
struct EnvironmentState {
    record: EnvironmentDescriptor,
    flag: DirtyFlag,
}

/// Overwrites `slot` if `value` differs. Returns whether it did.
fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Single mutable environment record with a dirty flag.
#[derive(Debug, Default)]
pub struct EnvironmentStore {
    state: Mutex<EnvironmentState>,
}

impl EnvironmentStore {
    /// Creates a store holding the default environment, not dirty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the visible background style.
    pub fn set_background(&self, style: BackgroundStyle) -> bool {
        self.update(|record| assign(&mut record.background, style))
    }

    /// Sets the texture seen by the camera.
    pub fn set_background_texture(&self, texture: Option<EnvironmentTexture>) -> bool {
        self.update(|record| assign(&mut record.background_texture, texture))
    }

    /// Sets the reflection texture.
    pub fn set_reflection_texture(&self, texture: Option<EnvironmentTexture>) -> bool {
        self.update(|record| assign(&mut record.reflection_texture, texture))
    }

    /// Sets the sky lighting texture.
    pub fn set_skylight_texture(&self, texture: Option<EnvironmentTexture>) -> bool {
        self.update(|record| assign(&mut record.skylight_texture, texture))
    }

    /// Sets whether and how strongly the environment lights the scene.
    pub fn set_skylight(&self, enabled: bool, strength: f32) -> bool {
        self.update(|record| {
            let a = assign(&mut record.skylight_enabled, enabled);
            let b = assign(&mut record.skylight_strength, strength);
            a | b
        })
    }

    /// Compares a full record field by field and stores it in one step.
    ///
    /// Returns `true` if any field changed. Applying the stored record again
    /// leaves the dirty flag as it was. A drain starting concurrently sees
    /// either the old record or the new one, never a mix.
    pub fn apply(&self, environment: EnvironmentDescriptor) -> bool {
        let EnvironmentDescriptor {
            background,
            background_texture,
            reflection_texture,
            skylight_texture,
            skylight_enabled,
            skylight_strength,
        } = environment;

        self.update(|record| {
            let mut changed = assign(&mut record.background, background);
            changed |= assign(&mut record.background_texture, background_texture);
            changed |= assign(&mut record.reflection_texture, reflection_texture);
            changed |= assign(&mut record.skylight_texture, skylight_texture);
            changed |= assign(&mut record.skylight_enabled, skylight_enabled);
            changed |= assign(&mut record.skylight_strength, skylight_strength);
            changed
        })
    }

    fn update(&self, f: impl FnOnce(&mut EnvironmentDescriptor) -> bool) -> bool {
        let mut state = self.state.lock();
        let changed = f(&mut state.record);
        state.flag.mark(changed);
        changed
    }

    /// A copy of the current record.
    pub fn current(&self) -> EnvironmentDescriptor {
        self.state.lock().record.clone()
    }

    /// Returns `true` if the record changed since the last drain started.
    pub fn is_dirty(&self) -> bool {
        self.state.lock().flag.is_dirty()
    }

    /// Returns `true` if an upload is waiting or in flight.
    pub fn has_pending(&self) -> bool {
        self.state.lock().flag.is_pending()
    }

    /// Hands the dirty flag to the drain and returns the record to upload.
    pub fn begin_drain(&self) -> Option<EnvironmentDescriptor> {
        let mut state = self.state.lock();
        state.flag.begin_drain().then(|| state.record.clone())
    }

    /// The record the current drain uploads, if the environment changed.
    pub fn in_flight(&self) -> Option<EnvironmentDescriptor> {
        let state = self.state.lock();
        state.flag.is_in_flight().then(|| state.record.clone())
    }

    /// Clears the drained flag. The record itself is kept.
    pub fn reset(&self) {
        self.state.lock().flag.reset();
    }

    /// Marks the record dirty again after an interrupted drain.
    pub fn rollback(&self) {
        self.state.lock().flag.rollback();
    }
}
