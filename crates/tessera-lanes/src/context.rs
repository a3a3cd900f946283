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

//! What an upload lane gets to work with.

use parking_lot::Mutex;
use tessera_core::event::SyncEvent;
use tessera_core::renderer::RenderScene;
use tessera_core::scene::ObjectId;
use tessera_core::sync::CancellationToken;
use tessera_core::SyncConfig;
use tessera_data::SyncStores;

/// Collects the events of one drain. Lanes push from worker threads; the
/// change database publishes the lot once the drain is over.
#[derive(Debug, Default)]
pub struct EventSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl EventSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event.
    pub fn push(&self, event: SyncEvent) {
        self.events.lock().push(event);
    }

    /// Removes and returns every recorded event, in push order.
    pub fn take(&self) -> Vec<SyncEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Returns `true` if `object` was created by the current drain.
    pub fn created(&self, object: ObjectId) -> bool {
        self.events.lock().iter().any(|event| {
            matches!(event, SyncEvent::ObjectCreated { object: created, .. } if *created == object)
        })
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a lane needs for one step of a drain.
pub struct UploadContext<'a> {
    /// The renderer scene being written to.
    pub scene: &'a dyn RenderScene,
    /// The stores holding the in-flight diffs.
    pub stores: &'a SyncStores,
    /// Polled between items.
    pub cancel: &'a CancellationToken,
    /// Drain tunables.
    pub config: &'a SyncConfig,
    /// Worker pool for the parallel parts of a step. `None` uses rayon's
    /// global pool.
    pub pool: Option<&'a rayon::ThreadPool>,
    /// Where lanes report what they did.
    pub events: &'a EventSink,
}

impl<'a> UploadContext<'a> {
    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Records an event for publication after the drain.
    pub fn emit(&self, event: SyncEvent) {
        self.events.push(event);
    }

    /// Runs `op` inside the configured worker pool.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}
