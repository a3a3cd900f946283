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

//! Scene-wide settings that, like the environment, hold one current value
//! plus a dirty flag: gamma, the ground plane and the clipping planes.

use crate::diff_buffer::DirtyFlag;
use parking_lot::Mutex;
use tessera_core::scene::{ClippingPlane, ClippingPlaneId, GroundPlane, LinearWorkflow, MaterialHash};

#[derive(Debug, Default)]
struct TrackedState<T> {
    value: T,
    flag: DirtyFlag,
}

/// One value with the two-phase dirty protocol.
#[derive(Debug, Default)]
pub struct Tracked<T> {
    state: Mutex<TrackedState<T>>,
}

impl<T: Clone + PartialEq> Tracked<T> {
    /// Wraps an initial value, not dirty.
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(TrackedState {
                value,
                flag: DirtyFlag::default(),
            }),
        }
    }

    /// Replaces the value. Returns `true` if it changed.
    pub fn set(&self, value: T) -> bool {
        let mut state = self.state.lock();
        let changed = state.value != value;
        if changed {
            state.value = value;
        }
        state.flag.mark(changed);
        changed
    }

    /// Edits the value in place. `f` reports whether it changed anything.
    pub fn update(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let mut state = self.state.lock();
        let changed = f(&mut state.value);
        state.flag.mark(changed);
        changed
    }

    /// A copy of the current value.
    pub fn get(&self) -> T {
        self.state.lock().value.clone()
    }

    /// Returns `true` if an upload is waiting or in flight.
    pub fn has_pending(&self) -> bool {
        self.state.lock().flag.is_pending()
    }

    /// Returns the value to upload if it changed.
    pub fn begin_drain(&self) -> Option<T> {
        let mut state = self.state.lock();
        state.flag.begin_drain().then(|| state.value.clone())
    }

    /// The value the current drain uploads, if it changed.
    pub fn in_flight(&self) -> Option<T> {
        let state = self.state.lock();
        state.flag.is_in_flight().then(|| state.value.clone())
    }

    /// Clears the drained flag.
    pub fn reset(&self) {
        self.state.lock().flag.reset();
    }

    /// Keeps an interrupted upload for the next cycle.
    pub fn rollback(&self) {
        self.state.lock().flag.rollback();
    }
}

/// The linear-workflow gamma settings.
///
/// Gamma is part of every material hash, so the change database re-resolves
/// all known materials when this changes.
#[derive(Debug)]
pub struct GammaStore {
    workflow: Tracked<LinearWorkflow>,
}

impl GammaStore {
    /// Starts from the configured workflow.
    pub fn new(initial: LinearWorkflow) -> Self {
        Self {
            workflow: Tracked::new(initial),
        }
    }

    /// Replaces the workflow. Returns `true` if it changed.
    pub fn set(&self, workflow: LinearWorkflow) -> bool {
        self.workflow.set(workflow)
    }

    /// The workflow in effect.
    pub fn current(&self) -> LinearWorkflow {
        self.workflow.get()
    }

    /// Returns `true` if an upload is waiting or in flight.
    pub fn has_pending(&self) -> bool {
        self.workflow.has_pending()
    }

    /// Returns the workflow to upload, if it changed.
    pub fn begin_drain(&self) -> Option<LinearWorkflow> {
        self.workflow.begin_drain()
    }

    /// The workflow the current drain uploads.
    pub fn in_flight(&self) -> Option<LinearWorkflow> {
        self.workflow.in_flight()
    }

    /// See [`Tracked::reset`].
    pub fn reset(&self) {
        self.workflow.reset();
    }

    /// See [`Tracked::rollback`].
    pub fn rollback(&self) {
        self.workflow.rollback();
    }
}

impl Default for GammaStore {
    fn default() -> Self {
        Self::new(LinearWorkflow::default())
    }
}

/// The ground plane together with the hash of its resolved material.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroundPlaneRecord {
    /// The plane as sent by the host.
    pub plane: GroundPlane,
    /// Hash of the plane's material, when it has one that resolved.
    pub material_hash: Option<MaterialHash>,
}

/// The ground plane.
#[derive(Debug, Default)]
pub struct GroundPlaneStore {
    record: Tracked<GroundPlaneRecord>,
}

impl GroundPlaneStore {
    /// Creates a store holding a disabled ground plane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the plane. Returns `true` if it changed.
    pub fn set(&self, plane: GroundPlane, material_hash: Option<MaterialHash>) -> bool {
        self.record.set(GroundPlaneRecord {
            plane,
            material_hash,
        })
    }

    /// The current plane.
    pub fn current(&self) -> GroundPlaneRecord {
        self.record.get()
    }

    /// Returns `true` if an upload is waiting or in flight.
    pub fn has_pending(&self) -> bool {
        self.record.has_pending()
    }

    /// Returns the plane to upload, if it changed.
    pub fn begin_drain(&self) -> Option<GroundPlaneRecord> {
        self.record.begin_drain()
    }

    /// The plane the current drain uploads.
    pub fn in_flight(&self) -> Option<GroundPlaneRecord> {
        self.record.in_flight()
    }

    /// See [`Tracked::reset`].
    pub fn reset(&self) {
        self.record.reset();
    }

    /// See [`Tracked::rollback`].
    pub fn rollback(&self) {
        self.record.rollback();
    }
}

/// The user clipping planes, in the order they were first added.
///
/// The renderer takes the full set at once, so any change re-uploads every
/// enabled plane.
#[derive(Debug, Default)]
pub struct ClippingPlaneStore {
    planes: Tracked<Vec<ClippingPlane>>,
}

impl ClippingPlaneStore {
    /// Creates a store without planes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a plane. Returns `true` if anything changed.
    pub fn upsert(&self, plane: ClippingPlane) -> bool {
        self.planes.update(|planes| {
            match planes.iter_mut().find(|p| p.id == plane.id) {
                Some(existing) if *existing == plane => false,
                Some(existing) => {
                    *existing = plane;
                    true
                }
                None => {
                    planes.push(plane);
                    true
                }
            }
        })
    }

    /// Removes a plane. Returns `true` if it existed.
    pub fn remove(&self, id: ClippingPlaneId) -> bool {
        self.planes.update(|planes| {
            let before = planes.len();
            planes.retain(|p| p.id != id);
            planes.len() != before
        })
    }

    /// Every plane, enabled or not.
    pub fn all(&self) -> Vec<ClippingPlane> {
        self.planes.get()
    }

    /// Returns `true` if an upload is waiting or in flight.
    pub fn has_pending(&self) -> bool {
        self.planes.has_pending()
    }

    /// Returns the enabled planes to upload, if anything changed.
    pub fn begin_drain(&self) -> Option<Vec<ClippingPlane>> {
        self.planes
            .begin_drain()
            .map(|planes| planes.into_iter().filter(|p| p.enabled).collect())
    }

    /// The enabled planes the current drain uploads.
    pub fn in_flight(&self) -> Option<Vec<ClippingPlane>> {
        self.planes
            .in_flight()
            .map(|planes| planes.into_iter().filter(|p| p.enabled).collect())
    }

    /// See [`Tracked::reset`].
    pub fn reset(&self) {
        self.planes.reset();
    }

    /// See [`Tracked::rollback`].
    pub fn rollback(&self) {
        self.planes.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tessera_core::scene::MaterialId;

    fn plane(enabled: bool) -> ClippingPlane {
        ClippingPlane {
            id: ClippingPlaneId::new(),
            point: Vec3::ZERO,
            normal: Vec3::Z,
            enabled,
        }
    }

    #[test]
    fn gamma_change_is_tracked() {
        let store = GammaStore::default();
        assert!(!store.set(LinearWorkflow::default()));
        assert!(store.set(LinearWorkflow {
            enabled: true,
            gamma: 1.8
        }));
        assert_eq!(store.begin_drain().map(|w| w.gamma), Some(1.8));
        store.reset();
        assert!(!store.has_pending());
    }

    #[test]
    fn ground_plane_keeps_material_hash() {
        let store = GroundPlaneStore::new();
        let plane = GroundPlane {
            enabled: true,
            material: Some(MaterialId::new()),
            ..GroundPlane::default()
        };
        assert!(store.set(plane.clone(), Some(MaterialHash(4))));
        assert!(!store.set(plane, Some(MaterialHash(4))));
        let drained = store.begin_drain().expect("plane is dirty");
        assert_eq!(drained.material_hash, Some(MaterialHash(4)));
    }

    #[test]
    fn clipping_planes_upload_enabled_set() {
        let store = ClippingPlaneStore::new();
        let on = plane(true);
        let off = plane(false);
        store.upsert(on.clone());
        store.upsert(off.clone());
        assert!(!store.upsert(on.clone()));

        assert_eq!(store.begin_drain(), Some(vec![on.clone()]));
        store.reset();

        assert!(store.remove(on.id));
        assert!(!store.remove(on.id));
        assert_eq!(store.begin_drain(), Some(Vec::new()));
        assert_eq!(store.all(), vec![off]);
    }
}
