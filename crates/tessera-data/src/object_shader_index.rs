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

//! Bidirectional relation between material hashes, meshes and objects.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tessera_core::scene::{MaterialHash, MeshId, ObjectId};

#[derive(Debug, Default)]
struct IndexState {
    // Forward maps. Meshes are reference-counted per hash because several
    // objects of the same mesh may share a material.
    meshes_by_hash: HashMap<MaterialHash, HashMap<MeshId, usize>>,
    objects_by_hash: HashMap<MaterialHash, HashSet<ObjectId>>,
    // Reverse maps.
    hash_by_mesh: HashMap<MeshId, MaterialHash>,
    hash_by_object: HashMap<ObjectId, (MaterialHash, MeshId)>,
}

impl IndexState {
    fn detach(&mut self, object: ObjectId) -> Option<(MaterialHash, MeshId)> {
        let (hash, mesh) = self.hash_by_object.remove(&object)?;

        if let Some(objects) = self.objects_by_hash.get_mut(&hash) {
            objects.remove(&object);
            if objects.is_empty() {
                self.objects_by_hash.remove(&hash);
            }
        }
        if let Some(meshes) = self.meshes_by_hash.get_mut(&hash) {
            if let Some(count) = meshes.get_mut(&mesh) {
                *count -= 1;
                if *count == 0 {
                    meshes.remove(&mesh);
                    if self.hash_by_mesh.get(&mesh) == Some(&hash) {
                        self.hash_by_mesh.remove(&mesh);
                    }
                }
            }
            if meshes.is_empty() {
                self.meshes_by_hash.remove(&hash);
            }
        }
        Some((hash, mesh))
    }

    fn attach(&mut self, hash: MaterialHash, mesh: MeshId, object: ObjectId) {
        if self.hash_by_object.get(&object) == Some(&(hash, mesh)) {
            return;
        }
        // An object is never associated with two hashes.
        self.detach(object);

        *self
            .meshes_by_hash
            .entry(hash)
            .or_default()
            .entry(mesh)
            .or_insert(0) += 1;
        self.objects_by_hash.entry(hash).or_default().insert(object);
        self.hash_by_mesh.insert(mesh, hash);
        self.hash_by_object.insert(object, (hash, mesh));
    }

    fn replace(
        &mut self,
        old: MaterialHash,
        new: MaterialHash,
        mesh: MeshId,
        object: ObjectId,
    ) -> bool {
        let current = self.hash_by_object.get(&object).map(|(hash, _)| *hash);
        let matched = if old.is_no_previous() {
            current.is_none()
        } else {
            current == Some(old)
        };
        if !matched {
            log::warn!(
                "{object} uses {:?}, not {old}; replacing the actual relation.",
                current
            );
        }
        self.attach(new, mesh, object);
        matched
    }
}

/// Which [`MaterialHash`] is used by which meshes and objects.
///
/// Every mutation runs under a single write lock, so readers never observe an
/// object attached to two hashes or to none mid-replace.
#[derive(Debug, Default)]
pub struct ObjectShaderIndex {
    state: RwLock<IndexState>,
}

impl ObjectShaderIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `object`, drawing `mesh`, uses `hash`.
    ///
    /// Forward sets are additive; the mesh reverse map is last-write-wins.
    pub fn record(&self, hash: MaterialHash, mesh: MeshId, object: ObjectId) {
        self.state.write().attach(hash, mesh, object);
    }

    /// Moves `object`, drawing `mesh`, from `old` to `new` in one transaction.
    ///
    /// When `old` is [`MaterialHash::NO_PREVIOUS`] the removal is skipped and
    /// the relation is simply recorded. Returns `false` if the object's
    /// actual relation was not `old`; the object ends under `new` either way.
    pub fn replace(
        &self,
        old: MaterialHash,
        new: MaterialHash,
        mesh: MeshId,
        object: ObjectId,
    ) -> bool {
        self.state.write().replace(old, new, mesh, object)
    }

    /// Records `object` under `new`, replacing whatever it used before.
    ///
    /// Returns the hash the object used before, or
    /// [`MaterialHash::NO_PREVIOUS`].
    pub fn assign(&self, new: MaterialHash, mesh: MeshId, object: ObjectId) -> MaterialHash {
        let mut state = self.state.write();
        let previous = state
            .hash_by_object
            .get(&object)
            .map(|(hash, _)| *hash)
            .unwrap_or(MaterialHash::NO_PREVIOUS);
        state.replace(previous, new, mesh, object);
        previous
    }

    /// Drops every relation of `object`. Returns the hash it used.
    pub fn remove_object(&self, object: ObjectId) -> Option<MaterialHash> {
        self.state.write().detach(object).map(|(hash, _)| hash)
    }

    /// The hash currently used by `object`.
    pub fn find_hash_for_object(&self, object: ObjectId) -> Option<MaterialHash> {
        self.state.read().hash_by_object.get(&object).map(|(h, _)| *h)
    }

    /// The hash most recently recorded for `mesh`.
    pub fn find_hash_for_mesh(&self, mesh: MeshId) -> Option<MaterialHash> {
        self.state.read().hash_by_mesh.get(&mesh).copied()
    }

    /// Objects currently using `hash`.
    pub fn objects_using(&self, hash: MaterialHash) -> HashSet<ObjectId> {
        self.state
            .read()
            .objects_by_hash
            .get(&hash)
            .cloned()
            .unwrap_or_default()
    }

    /// Meshes currently drawn with `hash`.
    pub fn meshes_using(&self, hash: MaterialHash) -> HashSet<MeshId> {
        self.state
            .read()
            .meshes_by_hash
            .get(&hash)
            .map(|meshes| meshes.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if no object uses `hash`.
    pub fn is_unused(&self, hash: MaterialHash) -> bool {
        !self.state.read().objects_by_hash.contains_key(&hash)
    }

    /// Every object with a recorded hash.
    pub fn objects(&self) -> Vec<ObjectId> {
        self.state.read().hash_by_object.keys().copied().collect()
    }

    /// Drops every relation.
    pub fn clear(&self) {
        *self.state.write() = IndexState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::scene::MeshGuid;
    use uuid::Uuid;

    fn mesh(n: u128) -> MeshId {
        MeshId::new(MeshGuid(Uuid::from_u128(n)), 0)
    }

    #[test]
    fn record_populates_all_maps() {
        let index = ObjectShaderIndex::new();
        index.record(MaterialHash(1), mesh(1), ObjectId(1));
        index.record(MaterialHash(1), mesh(2), ObjectId(2));

        assert_eq!(index.find_hash_for_object(ObjectId(1)), Some(MaterialHash(1)));
        assert_eq!(index.find_hash_for_mesh(mesh(2)), Some(MaterialHash(1)));
        assert_eq!(index.objects_using(MaterialHash(1)).len(), 2);
        assert_eq!(index.meshes_using(MaterialHash(1)).len(), 2);
    }

    #[test]
    fn replace_moves_the_object_between_hashes() {
        let index = ObjectShaderIndex::new();
        index.record(MaterialHash(1), mesh(1), ObjectId(1));

        assert!(index.replace(MaterialHash(1), MaterialHash(2), mesh(1), ObjectId(1)));
        assert_eq!(index.find_hash_for_object(ObjectId(1)), Some(MaterialHash(2)));
        assert!(!index.objects_using(MaterialHash(1)).contains(&ObjectId(1)));
        assert!(index.is_unused(MaterialHash(1)));
        assert_eq!(index.find_hash_for_mesh(mesh(1)), Some(MaterialHash(2)));
    }

    #[test]
    fn replace_keeps_mesh_relation_while_another_object_still_uses_it() {
        let index = ObjectShaderIndex::new();
        index.record(MaterialHash(1), mesh(1), ObjectId(1));
        index.record(MaterialHash(1), mesh(1), ObjectId(2));

        index.replace(MaterialHash(1), MaterialHash(2), mesh(1), ObjectId(1));
        assert!(index.meshes_using(MaterialHash(1)).contains(&mesh(1)));
        assert!(index.meshes_using(MaterialHash(2)).contains(&mesh(1)));
        assert_eq!(
            index.objects_using(MaterialHash(1)),
            HashSet::from([ObjectId(2)])
        );
    }

    #[test]
    fn replace_from_no_previous_records_the_relation() {
        let index = ObjectShaderIndex::new();
        assert!(index.replace(
            MaterialHash::NO_PREVIOUS,
            MaterialHash(7),
            mesh(1),
            ObjectId(1)
        ));
        assert_eq!(index.find_hash_for_object(ObjectId(1)), Some(MaterialHash(7)));
        assert_eq!(index.find_hash_for_mesh(mesh(1)), Some(MaterialHash(7)));
        assert!(index.objects_using(MaterialHash(7)).contains(&ObjectId(1)));
    }

    #[test]
    fn replace_from_a_stale_hash_still_moves_the_object() {
        let index = ObjectShaderIndex::new();
        index.record(MaterialHash(1), mesh(1), ObjectId(1));

        assert!(!index.replace(
            MaterialHash(5),
            MaterialHash(2),
            mesh(1),
            ObjectId(1)
        ));
        assert_eq!(index.find_hash_for_object(ObjectId(1)), Some(MaterialHash(2)));
        assert!(index.is_unused(MaterialHash(1)));
    }

    #[test]
    fn assign_reports_the_previous_hash() {
        let index = ObjectShaderIndex::new();
        assert_eq!(
            index.assign(MaterialHash(1), mesh(1), ObjectId(1)),
            MaterialHash::NO_PREVIOUS
        );
        assert_eq!(index.assign(MaterialHash(2), mesh(1), ObjectId(1)), MaterialHash(1));
    }

    #[test]
    fn recording_twice_does_not_inflate_mesh_counts() {
        let index = ObjectShaderIndex::new();
        index.record(MaterialHash(1), mesh(1), ObjectId(1));
        index.record(MaterialHash(1), mesh(1), ObjectId(1));
        assert_eq!(index.remove_object(ObjectId(1)), Some(MaterialHash(1)));
        assert!(index.meshes_using(MaterialHash(1)).is_empty());
        assert_eq!(index.find_hash_for_mesh(mesh(1)), None);
    }
}
