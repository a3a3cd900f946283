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

//! A content-addressed cache of renderer shaders.
//!
//! Materials are keyed by their [`MaterialHash`], not by host material
//! identity, so structurally identical materials on different objects
//! collapse onto one renderer shader.

use crate::diff_buffer::DiffBuffer;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tessera_core::scene::{MaterialDescriptor, MaterialHash, ObjectId, ShaderHandle};

/// A shader waiting to be built.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingShader {
    /// Content hash of the material.
    pub hash: MaterialHash,
    /// The resolved material the shader is built from.
    pub material: MaterialDescriptor,
}

/// A pending change of the shader used by an existing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderReassignment {
    /// The object being reassigned.
    pub object: ObjectId,
    /// The hash it used before, or [`MaterialHash::NO_PREVIOUS`].
    pub old: MaterialHash,
    /// The hash it uses now.
    pub new: MaterialHash,
}

#[derive(Debug, Default)]
struct CacheState {
    committed: HashMap<MaterialHash, ShaderHandle>,
    retired: HashSet<ShaderHandle>,
    // Hashes pending or in flight. Cleared per cycle, unlike `committed`.
    queued: HashSet<MaterialHash>,
}

/// `MaterialHash → ShaderHandle` with per-cycle build and reassignment queues.
#[derive(Debug, Default)]
pub struct ShaderCache {
    state: RwLock<CacheState>,
    builds: DiffBuffer<PendingShader>,
    reassignments: DiffBuffer<ShaderReassignment>,
}

impl ShaderCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a shader for `hash` has been committed.
    pub fn has(&self, hash: MaterialHash) -> bool {
        self.state.read().committed.contains_key(&hash)
    }

    /// The committed shader for `hash`, if any.
    pub fn get(&self, hash: MaterialHash) -> Option<ShaderHandle> {
        self.state.read().committed.get(&hash).copied()
    }

    /// Queues a shader build unless one is committed or already queued.
    ///
    /// Returns `true` if the build was queued. The check and the insertion
    /// happen under one write lock, so two notifier threads racing on the
    /// same hash queue exactly one build.
    pub fn enqueue_new(&self, hash: MaterialHash, material: MaterialDescriptor) -> bool {
        let mut state = self.state.write();
        if state.committed.contains_key(&hash) || !state.queued.insert(hash) {
            return false;
        }
        log::trace!("Queued shader build for material {hash} ('{}').", material.name);
        // Pushed while `state` is held so a concurrent reset sees the hash.
        self.builds.push(PendingShader { hash, material });
        true
    }

    /// Drops the pending build of `hash` if `unused` confirms nothing
    /// references it any more. In-flight builds are kept.
    ///
    /// `unused` runs under the cache lock, so a concurrent [`enqueue_new`]
    /// of the same hash either sees the build or queues it again.
    ///
    /// [`enqueue_new`]: Self::enqueue_new
    pub fn cancel_pending_build(
        &self,
        hash: MaterialHash,
        unused: impl FnOnce() -> bool,
    ) -> bool {
        let mut state = self.state.write();
        if !state.queued.contains(&hash) || !unused() {
            return false;
        }
        let before = self.builds.pending_len();
        self.builds.retain_pending(|pending| pending.hash != hash);
        if self.builds.pending_len() == before {
            return false;
        }
        state.queued.remove(&hash);
        log::trace!("Dropped the pending shader build for superseded material {hash}.");
        true
    }

    /// Records the shader the renderer built for `hash`.
    ///
    /// # Panics
    ///
    /// Panics if a shader is already committed for `hash`: two handles for one
    /// hash means the dedup guarantee is broken.
    pub fn commit(&self, hash: MaterialHash, handle: ShaderHandle) {
        let mut state = self.state.write();
        match state.committed.entry(hash) {
            Entry::Vacant(slot) => {
                slot.insert(handle);
            }
            Entry::Occupied(existing) => {
                panic!(
                    "duplicate shader handle for material {hash}: {} already committed, got {handle}",
                    existing.get()
                );
            }
        }
    }

    /// Marks a handle as no longer used by new assignments. The renderer keeps
    /// the shader alive; it is only tagged.
    ///
    /// Returns `true` if the handle was not already retired.
    pub fn retire(&self, handle: ShaderHandle) -> bool {
        self.state.write().retired.insert(handle)
    }

    /// Clears the retired tag when a hash gains a user again.
    pub fn unretire(&self, handle: ShaderHandle) -> bool {
        self.state.write().retired.remove(&handle)
    }

    /// Returns `true` if the handle is retired.
    pub fn is_retired(&self, handle: ShaderHandle) -> bool {
        self.state.read().retired.contains(&handle)
    }

    /// Number of committed shaders.
    pub fn len(&self) -> usize {
        self.state.read().committed.len()
    }

    /// Returns `true` if no shader has been committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queues a shader change on an existing object.
    pub fn enqueue_reassignment(&self, reassignment: ShaderReassignment) {
        self.reassignments.push(reassignment);
    }

    /// Builds queued but not yet drained.
    pub fn pending_builds(&self) -> Vec<PendingShader> {
        self.builds.pending()
    }

    /// Reassignments queued but not yet drained.
    pub fn pending_reassignments(&self) -> Vec<ShaderReassignment> {
        self.reassignments.pending()
    }

    /// Returns `true` if any build or reassignment is waiting or in flight.
    pub fn has_pending(&self) -> bool {
        !self.builds.is_empty() || !self.reassignments.is_empty()
    }

    /// Moves both queues in flight.
    pub fn begin_drain(&self) {
        self.builds.begin_drain();
        self.reassignments.begin_drain();
    }

    /// Builds of the current drain.
    pub fn in_flight_builds(&self) -> Arc<Vec<PendingShader>> {
        self.builds.in_flight()
    }

    /// Reassignments of the current drain.
    pub fn in_flight_reassignments(&self) -> Arc<Vec<ShaderReassignment>> {
        self.reassignments.in_flight()
    }

    /// Drops the drained queues. Committed shaders are kept.
    pub fn reset(&self) {
        self.builds.reset();
        self.reassignments.reset();
        self.refresh_queued();
    }

    /// Re-queues the drained entries for the next cycle.
    ///
    /// Builds that were committed before the interruption are dropped: the
    /// cache already has them.
    pub fn rollback(&self) {
        self.builds.rollback();
        self.reassignments.rollback();
        self.refresh_queued();
    }

    /// Forgets every committed and queued shader. Used on teardown.
    pub fn clear(&self) {
        self.builds.clear();
        self.reassignments.clear();
        *self.state.write() = CacheState::default();
    }

    fn refresh_queued(&self) {
        let pending = self.builds.pending();
        let mut state = self.state.write();
        let committed = &state.committed;
        let queued: HashSet<MaterialHash> = pending
            .iter()
            .map(|p| p.hash)
            .filter(|h| !committed.contains_key(h))
            .collect();
        state.queued = queued;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::scene::{MaterialKind, PbrMaterial};

    fn material(name: &str) -> MaterialDescriptor {
        MaterialDescriptor::new(name, MaterialKind::Pbr(PbrMaterial::default()))
    }

    #[test]
    fn cancelled_build_can_be_queued_again() {
        let cache = ShaderCache::new();
        let hash = MaterialHash(7);
        cache.enqueue_new(hash, material("a"));
        assert!(!cache.cancel_pending_build(hash, || false));
        assert!(cache.cancel_pending_build(hash, || true));
        assert!(cache.pending_builds().is_empty());
        assert!(!cache.has_pending());

        assert!(cache.enqueue_new(hash, material("a")));
        assert_eq!(cache.pending_builds().len(), 1);
    }

    #[test]
    fn in_flight_build_is_not_cancelled() {
        let cache = ShaderCache::new();
        let hash = MaterialHash(7);
        cache.enqueue_new(hash, material("a"));
        cache.begin_drain();

        assert!(!cache.cancel_pending_build(hash, || true));
        assert_eq!(cache.in_flight_builds().len(), 1);
        assert!(!cache.enqueue_new(hash, material("a")));
    }

    #[test]
    fn enqueue_is_deduplicated_within_a_cycle() {
        let cache = ShaderCache::new();
        let hash = MaterialHash(42);
        assert!(cache.enqueue_new(hash, material("a")));
        assert!(!cache.enqueue_new(hash, material("b")));
        assert_eq!(cache.pending_builds().len(), 1);
    }

    #[test]
    fn enqueue_is_refused_once_committed() {
        let cache = ShaderCache::new();
        let hash = MaterialHash(1);
        cache.enqueue_new(hash, material("a"));
        cache.begin_drain();
        cache.commit(hash, ShaderHandle(10));
        cache.reset();

        assert!(cache.has(hash));
        assert_eq!(cache.get(hash), Some(ShaderHandle(10)));
        assert!(!cache.enqueue_new(hash, material("a")));
        assert!(!cache.has_pending());
    }

    #[test]
    fn enqueue_during_drain_does_not_duplicate_in_flight_build() {
        let cache = ShaderCache::new();
        let hash = MaterialHash(5);
        cache.enqueue_new(hash, material("a"));
        cache.begin_drain();
        assert!(!cache.enqueue_new(hash, material("a")));
        assert_eq!(cache.in_flight_builds().len(), 1);
    }

    #[test]
    fn rollback_drops_builds_committed_before_interruption() {
        let cache = ShaderCache::new();
        cache.enqueue_new(MaterialHash(1), material("a"));
        cache.enqueue_new(MaterialHash(2), material("b"));
        cache.begin_drain();
        cache.commit(MaterialHash(1), ShaderHandle(1));
        cache.rollback();

        // The committed one is skipped by the shader lane; re-enqueue of the
        // uncommitted one is still deduplicated.
        assert!(!cache.enqueue_new(MaterialHash(2), material("b")));
        assert!(!cache.enqueue_new(MaterialHash(1), material("a")));
        assert_eq!(cache.pending_builds().len(), 2);
    }

    #[test]
    #[should_panic(expected = "duplicate shader handle")]
    fn committing_twice_is_fatal() {
        let cache = ShaderCache::new();
        cache.commit(MaterialHash(7), ShaderHandle(1));
        cache.commit(MaterialHash(7), ShaderHandle(2));
    }

    #[test]
    fn retire_tags_without_removing() {
        let cache = ShaderCache::new();
        cache.commit(MaterialHash(3), ShaderHandle(9));
        assert!(cache.retire(ShaderHandle(9)));
        assert!(!cache.retire(ShaderHandle(9)));
        assert!(cache.is_retired(ShaderHandle(9)));
        assert_eq!(cache.get(MaterialHash(3)), Some(ShaderHandle(9)));

        assert!(cache.unretire(ShaderHandle(9)));
        assert!(!cache.is_retired(ShaderHandle(9)));
    }
}
