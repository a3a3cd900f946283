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

//! Outbound notifications.
//!
//! Instead of callbacks fired from inside the drain, the change database
//! collects [`SyncEvent`]s while it uploads and publishes them on an
//! [`EventBus`] once the drain is over. Renderer-facing adapters consume the
//! bus at their own pace.

mod bus;
mod sync_event;

pub use self::bus::EventBus;
pub use self::sync_event::SyncEvent;
