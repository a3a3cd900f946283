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

use crate::diff_buffer::DirtyFlag;
use parking_lot::Mutex;
use tessera_core::scene::ViewDescriptor;

#[derive(Debug, Default)]
struct CameraState {
    latest: Option<ViewDescriptor>,
    uploaded: Option<ViewDescriptor>,
    in_flight: Option<ViewDescriptor>,
    superseded: usize,
    flag: DirtyFlag,
}

/// Keeps only the latest camera view. Views queued before it are superseded,
/// never merged.
#[derive(Debug, Default)]
pub struct CameraStore {
    state: Mutex<CameraState>,
}

impl CameraStore {
    /// Creates a store with no view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the latest view. Returns `true` if it differs from the view
    /// the renderer last received.
    pub fn set_view(&self, view: ViewDescriptor) -> bool {
        let mut state = self.state.lock();
        if state.flag.is_dirty() {
            state.superseded += 1;
        }
        let changed = state.uploaded != Some(view);
        state.latest = Some(view);
        state.flag.mark(changed);
        changed
    }

    /// The latest view received from the host.
    pub fn latest(&self) -> Option<ViewDescriptor> {
        self.state.lock().latest
    }

    /// Returns `true` if an upload is waiting or in flight.
    pub fn has_pending(&self) -> bool {
        self.state.lock().flag.is_pending()
    }

    /// Returns the view the drain must upload, if any.
    pub fn begin_drain(&self) -> Option<ViewDescriptor> {
        let mut state = self.state.lock();
        if state.flag.begin_drain() {
            if state.superseded > 0 {
                log::trace!("Camera: {} intermediate views superseded.", state.superseded);
                state.superseded = 0;
            }
            state.in_flight = state.latest;
        }
        state.in_flight
    }

    /// The view the current drain uploads.
    pub fn in_flight(&self) -> Option<ViewDescriptor> {
        self.state.lock().in_flight
    }

    /// Records the drained view as uploaded.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if let Some(view) = state.in_flight.take() {
            state.uploaded = Some(view);
        }
        state.flag.reset();
    }

    /// Keeps the latest view queued for the next cycle.
    pub fn rollback(&self) {
        let mut state = self.state.lock();
        state.in_flight = None;
        state.flag.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn view_at(x: f32) -> ViewDescriptor {
        ViewDescriptor {
            eye: Vec3::new(x, 0.0, 5.0),
            ..ViewDescriptor::default()
        }
    }

    #[test]
    fn only_the_latest_view_is_drained() {
        let store = CameraStore::new();
        store.set_view(view_at(1.0));
        store.set_view(view_at(2.0));
        store.set_view(view_at(3.0));
        assert_eq!(store.begin_drain(), Some(view_at(3.0)));
    }

    #[test]
    fn resending_the_uploaded_view_is_not_a_change() {
        let store = CameraStore::new();
        store.set_view(view_at(1.0));
        store.begin_drain();
        store.reset();

        assert!(!store.set_view(view_at(1.0)));
        assert!(!store.has_pending());
        assert_eq!(store.begin_drain(), None);
    }

    #[test]
    fn rollback_keeps_the_view() {
        let store = CameraStore::new();
        store.set_view(view_at(1.0));
        store.begin_drain();
        store.rollback();
        assert!(store.has_pending());
        assert_eq!(store.begin_drain(), Some(view_at(1.0)));
    }
}
