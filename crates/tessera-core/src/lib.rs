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

//! # Tessera Core
//!
//! Foundational crate containing the identity types, scene descriptors and
//! collaborator contracts shared by every layer of the scene synchronizer.
//!
//! Nothing in here holds mutable scene state. The stores live in
//! `tessera-data`, the upload lanes in `tessera-lanes`, and the orchestrating
//! `ChangeDatabase` in `tessera-agents`.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod hash;
pub mod lane;
pub mod renderer;
pub mod scene;
pub mod sync;

pub use config::SyncConfig;
pub use error::{ConfigError, RenderSceneError, UploadError};
pub use event::{EventBus, SyncEvent};
pub use lane::{Lane, LaneOutcome, UploadStep};
pub use renderer::{MaterialResolver, RenderScene};
pub use sync::{CancellationToken, UploadLock};
