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

//! Contracts with the two opaque collaborators of the synchronizer.
//!
//! This module defines the 'what': the host resolves materials through a
//! [`MaterialResolver`] and the renderer exposes its persistent scene through
//! a [`RenderScene`]. The 'how' lives in concrete implementations such as the
//! in-memory `RecordingScene` of `tessera-infra`.

pub mod traits;

pub use self::traits::{MaterialResolver, RenderScene};
