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

//! Light buffers keyed by stable light id.
//!
//! A light id moves through `Unknown → Pending-Add → Committed`, then
//! `Pending-Update → Committed` on every later change, and `Hidden` on a
//! delete notification. Hidden lights keep their renderer handle.

use crate::diff_buffer::DiffBuffer;
use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tessera_core::scene::{EnvironmentDescriptor, LightDescriptor, LightHandle, LightId, LightKind};

/// One buffered light diff.
#[derive(Debug, Clone, PartialEq)]
pub enum LightChange {
    /// The light was added or changed.
    Upsert(LightDescriptor),
    /// The light was deleted.
    Delete(LightId),
}

impl LightChange {
    /// The light this diff is about.
    pub fn id(&self) -> LightId {
        match self {
            LightChange::Upsert(light) => light.id,
            LightChange::Delete(id) => *id,
        }
    }
}

/// A batch of light diffs split against the persisted handle map.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LightPartition {
    /// Lights without a renderer handle yet.
    pub to_add: Vec<LightDescriptor>,
    /// Lights that already have one.
    pub to_update: Vec<LightDescriptor>,
    /// Committed lights to hide.
    pub to_hide: Vec<LightId>,
}

#[derive(Debug, Default)]
struct LightRelations {
    handles: HashMap<LightId, LightHandle>,
    hidden: HashSet<LightId>,
}

/// Pending light diffs plus the persisted `LightId → LightHandle` map.
#[derive(Debug, Default)]
pub struct LightStore {
    relations: RwLock<LightRelations>,
    changes: DiffBuffer<LightChange>,
    // Set once the background entry has been queued for the current cycle.
    background_latch: Mutex<bool>,
}

impl LightStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a light addition or update.
    ///
    /// Lights of the [`LightKind::Background`] kind are reserved for the
    /// synthetic background entry and are rejected.
    pub fn add_light(&self, light: LightDescriptor) -> bool {
        if light.kind == LightKind::Background || light.id.is_background() {
            log::warn!(
                "Ignoring host light {:?}: the background light is managed internally.",
                light.id
            );
            return false;
        }
        self.changes.push(LightChange::Upsert(light));
        true
    }

    /// Queues a light deletion.
    pub fn delete_light(&self, id: LightId) {
        if id.is_background() {
            log::warn!("Ignoring deletion of the background light.");
            return;
        }
        self.changes.push(LightChange::Delete(id));
    }

    /// Queues the synthetic background light, at most once per cycle.
    ///
    /// When the entry is already queued this cycle it is refreshed in place
    /// instead of being queued again. Returns `true` if a new entry was
    /// queued.
    pub fn ensure_background_light(&self, environment: &EnvironmentDescriptor) -> bool {
        let mut latch = self.background_latch.lock();
        let light = LightDescriptor::background(environment);
        if *latch {
            self.refresh_background(light);
            return false;
        }
        *latch = true;
        self.changes.push(LightChange::Upsert(light));
        true
    }

    fn refresh_background(&self, light: LightDescriptor) {
        self.changes
            .retain_pending(|c| !matches!(c, LightChange::Upsert(l) if l.id.is_background()));
        self.changes.push(LightChange::Upsert(light));
    }

    /// Number of background-light entries, pending or committed.
    pub fn background_light_count(&self) -> usize {
        let committed = self
            .relations
            .read()
            .handles
            .contains_key(&LightId::BACKGROUND);
        let queued = self
            .changes
            .pending()
            .iter()
            .chain(self.changes.in_flight().iter())
            .any(|c| c.id().is_background());
        usize::from(committed || queued)
    }

    /// Lights of the pending batch without a renderer handle.
    pub fn lights_to_add(&self) -> Vec<LightDescriptor> {
        self.partition(&self.changes.pending()).to_add
    }

    /// Lights of the pending batch that already have a renderer handle.
    pub fn lights_to_update(&self) -> Vec<LightDescriptor> {
        self.partition(&self.changes.pending()).to_update
    }

    /// Splits a batch against the persisted handle map.
    ///
    /// Only the last diff per light id counts. The split is recomputed on
    /// every call because the handle map changes between cycles.
    pub fn partition(&self, batch: &[LightChange]) -> LightPartition {
        let mut last: HashMap<LightId, usize> = HashMap::new();
        for (position, change) in batch.iter().enumerate() {
            last.insert(change.id(), position);
        }
        let mut latest: Vec<(usize, &LightChange)> = last
            .into_values()
            .map(|position| (position, &batch[position]))
            .collect();
        latest.sort_by_key(|(position, _)| *position);

        let relations = self.relations.read();
        let mut partition = LightPartition::default();
        for (_, change) in latest {
            match change {
                LightChange::Upsert(light) if relations.handles.contains_key(&light.id) => {
                    partition.to_update.push(light.clone());
                }
                LightChange::Upsert(light) => partition.to_add.push(light.clone()),
                LightChange::Delete(id) if relations.handles.contains_key(id) => {
                    partition.to_hide.push(*id);
                }
                LightChange::Delete(id) => {
                    log::debug!("Deleted light {id:?} was never uploaded; nothing to hide.");
                }
            }
        }
        partition
    }

    /// The in-flight batch split against the persisted handle map.
    pub fn in_flight_partition(&self) -> LightPartition {
        let batch = self.changes.in_flight();
        self.partition(&batch)
    }

    /// The renderer handle of a light.
    pub fn handle(&self, id: LightId) -> Option<LightHandle> {
        self.relations.read().handles.get(&id).copied()
    }

    /// Records the renderer light created for `id`.
    ///
    /// # Panics
    ///
    /// Panics if the light already has a handle.
    pub fn commit_light(&self, id: LightId, handle: LightHandle) {
        let mut relations = self.relations.write();
        match relations.handles.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(handle);
            }
            Entry::Occupied(existing) => panic!(
                "duplicate renderer light for {id:?}: {} already committed, got {handle}",
                existing.get()
            ),
        }
    }

    /// Tracks the visibility last sent to the renderer.
    pub fn set_hidden(&self, id: LightId, hidden: bool) {
        let mut relations = self.relations.write();
        if hidden {
            relations.hidden.insert(id);
        } else {
            relations.hidden.remove(&id);
        }
    }

    /// Returns `true` if the light was hidden by a delete notification.
    pub fn is_hidden(&self, id: LightId) -> bool {
        self.relations.read().hidden.contains(&id)
    }

    /// Returns `true` if any light diff is waiting or in flight.
    pub fn has_pending(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Moves the pending diffs in flight.
    pub fn begin_drain(&self) -> Arc<Vec<LightChange>> {
        self.changes.begin_drain()
    }

    /// Drops the drained diffs and re-arms the background latch.
    pub fn reset(&self) {
        self.changes.reset();
        *self.background_latch.lock() = false;
    }

    /// Gives the drained diffs back to the next cycle.
    pub fn rollback(&self) {
        self.changes.rollback();
    }

    /// Drops every handle and diff. Used on teardown.
    pub fn clear(&self) {
        *self.relations.write() = LightRelations::default();
        self.changes.clear();
        *self.background_latch.lock() = false;
    }
}
