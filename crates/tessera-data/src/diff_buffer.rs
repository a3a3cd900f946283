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

//! Two-phase per-cycle buffers.
//!
//! Every buffered diff goes through the same protocol:
//!
//! 1. Notifications append to the *pending* side at any time.
//! 2. [`DiffBuffer::begin_drain`] moves everything pending into an immutable
//!    *in-flight* snapshot that the upload lanes read.
//! 3. [`DiffBuffer::reset`] drops the snapshot after a successful drain, or
//!    [`DiffBuffer::rollback`] puts it back in front of whatever arrived
//!    during the drain, so the next cycle retries it.
//!
//! Notifications never touch the in-flight snapshot, which is how a change
//! arriving mid-drain is neither lost nor observed half-applied.

use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
struct DiffState<T> {
    pending: Vec<T>,
    in_flight: Arc<Vec<T>>,
}

/// A FIFO of diffs with a pending side and an in-flight side.
#[derive(Debug)]
pub struct DiffBuffer<T> {
    state: Mutex<DiffState<T>>,
}

impl<T> Default for DiffBuffer<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(DiffState {
                pending: Vec::new(),
                in_flight: Arc::new(Vec::new()),
            }),
        }
    }
}

impl<T: Clone> DiffBuffer<T> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one diff to the pending side.
    pub fn push(&self, item: T) {
        self.state.lock().pending.push(item);
    }

    /// Appends several diffs, keeping their order.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.state.lock().pending.extend(items);
    }

    /// Moves the pending diffs behind the current in-flight snapshot and
    /// returns the new snapshot.
    pub fn begin_drain(&self) -> Arc<Vec<T>> {
        let mut state = self.state.lock();
        let pending = std::mem::take(&mut state.pending);
        if !pending.is_empty() {
            let mut merged = Vec::with_capacity(state.in_flight.len() + pending.len());
            merged.extend(state.in_flight.iter().cloned());
            merged.extend(pending);
            state.in_flight = Arc::new(merged);
        }
        Arc::clone(&state.in_flight)
    }

    /// The diffs being uploaded by the current drain.
    pub fn in_flight(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.state.lock().in_flight)
    }

    /// Drops the in-flight snapshot. Must only run once its upload has fully
    /// completed; the pending side is left alone.
    pub fn reset(&self) {
        self.state.lock().in_flight = Arc::new(Vec::new());
    }

    /// Re-queues the in-flight snapshot ahead of the diffs that arrived
    /// during the drain.
    pub fn rollback(&self) {
        let mut state = self.state.lock();
        if state.in_flight.is_empty() {
            return;
        }
        let in_flight = std::mem::replace(&mut state.in_flight, Arc::new(Vec::new()));
        let mut restored: Vec<T> = Arc::try_unwrap(in_flight).unwrap_or_else(|arc| (*arc).clone());
        restored.append(&mut state.pending);
        state.pending = restored;
    }

    /// Keeps only the pending diffs matching `keep`. The in-flight snapshot
    /// is never edited.
    pub fn retain_pending(&self, keep: impl FnMut(&T) -> bool) {
        self.state.lock().pending.retain(keep);
    }

    /// A copy of the pending side, oldest first.
    pub fn pending(&self) -> Vec<T> {
        self.state.lock().pending.clone()
    }

    /// Number of pending diffs.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Returns `true` if nothing is pending and nothing is in flight.
    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.pending.is_empty() && state.in_flight.is_empty()
    }

    /// Drops both sides.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.in_flight = Arc::new(Vec::new());
    }
}

/// The two-phase protocol applied to a single "something changed" flag, for
/// stores that hold one current record instead of a queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirtyFlag {
    dirty: bool,
    in_flight: bool,
}

impl DirtyFlag {
    /// ORs a change into the flag.
    pub fn mark(&mut self, changed: bool) {
        self.dirty |= changed;
    }

    /// Returns `true` if a change arrived since the last drain started.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns `true` if a change is waiting or being uploaded.
    pub fn is_pending(&self) -> bool {
        self.dirty || self.in_flight
    }

    /// Returns `true` if the current drain must upload the record.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Hands the dirty state over to the drain.
    pub fn begin_drain(&mut self) -> bool {
        self.in_flight |= self.dirty;
        self.dirty = false;
        self.in_flight
    }

    /// Clears the drained state; a change that arrived mid-drain stays dirty.
    pub fn reset(&mut self) {
        self.in_flight = false;
    }

    /// Gives an interrupted upload back to the next cycle.
    pub fn rollback(&mut self) {
        self.dirty |= self.in_flight;
        self.in_flight = false;
    }
}
