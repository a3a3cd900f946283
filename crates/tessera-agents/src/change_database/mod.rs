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

//! Acts as the **[A]gent** for scene synchronization.
//!
//! The [`ChangeDatabase`] owns the stores and the upload lanes. Host
//! notifications go through its `apply_*` methods and land in the stores;
//! [`ChangeDatabase::drain_and_upload`] then runs every lane in
//! [`UploadStep::ORDER`](tessera_core::UploadStep::ORDER) against a renderer
//! scene and commits or rolls back the cycle as a whole.

mod agent;
mod outcome;

pub use agent::ChangeDatabase;
pub use outcome::{DrainOutcome, DrainStats};
