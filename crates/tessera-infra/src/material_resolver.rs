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

use parking_lot::RwLock;
use std::collections::HashMap;
use tessera_core::renderer::MaterialResolver;
use tessera_core::scene::{LinearWorkflow, MaterialDescriptor, MaterialId};

/// A [`MaterialResolver`] backed by a table the host fills up front.
///
/// Gamma does not alter the stored descriptors: it is folded into the
/// material hash by the change database instead.
#[derive(Debug, Default)]
pub struct StaticMaterialResolver {
    materials: RwLock<HashMap<MaterialId, MaterialDescriptor>>,
}

impl StaticMaterialResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a material.
    pub fn insert(&self, id: MaterialId, material: MaterialDescriptor) {
        self.materials.write().insert(id, material);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(self, id: MaterialId, material: MaterialDescriptor) -> Self {
        self.insert(id, material);
        self
    }

    /// Forgets a material.
    pub fn remove(&self, id: MaterialId) -> Option<MaterialDescriptor> {
        self.materials.write().remove(&id)
    }
}

impl MaterialResolver for StaticMaterialResolver {
    fn resolve_material(
        &self,
        material: MaterialId,
        _workflow: &LinearWorkflow,
    ) -> Option<MaterialDescriptor> {
        let resolved = self.materials.read().get(&material).cloned();
        if resolved.is_none() {
            log::debug!("StaticMaterialResolver: unknown material {:?}.", material.0);
        }
        resolved
    }
}
