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

//! Object and mesh relations, plus the per-cycle object/mesh/transform queues.

use crate::diff_buffer::DiffBuffer;
use glam::Mat4;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_core::scene::{
    MaterialId, MeshDescriptor, MeshGuid, MeshHandle, MeshId, ObjectHandle, ObjectId,
    ObjectInstanceDescriptor,
};

/// A diff tagged with the order in which it was applied.
///
/// Sequence numbers are global to the store, so an upsert and a deletion of
/// the same object can be ordered even though they sit in different queues.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<T> {
    /// Apply order.
    pub seq: u64,
    /// The diff.
    pub item: T,
}

/// The object diffs a drain actually has to apply.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ObjectBatch {
    /// Upserts in apply order. An object may appear several times.
    pub upserts: Vec<Stamped<ObjectInstanceDescriptor>>,
    /// Deletions not superseded by a later upsert.
    pub deletions: Vec<Stamped<ObjectId>>,
}

/// The mesh diffs a drain actually has to apply.
#[derive(Debug, Default, Clone)]
pub struct MeshBatch {
    /// Latest geometry per mesh, in apply order.
    pub additions: Vec<Arc<MeshDescriptor>>,
    /// Host objects whose meshes were deleted and not re-added afterwards.
    pub deletions: Vec<MeshGuid>,
}

#[derive(Debug, Default)]
struct ObjectRelations {
    object_handles: HashMap<ObjectId, ObjectHandle>,
    mesh_handles: HashMap<MeshId, MeshHandle>,
    // (mesh, seq of the upsert that set it)
    mesh_of_object: HashMap<ObjectId, (MeshId, u64)>,
    material_of_object: HashMap<ObjectId, MaterialId>,
    hidden: HashSet<ObjectId>,
}

/// Relation tables `ObjectId → ObjectHandle`, `MeshId → MeshHandle` and
/// `ObjectId → MeshId`, with the queues feeding the mesh, object and
/// dynamic-transform upload steps.
#[derive(Debug)]
pub struct ObjectStore {
    relations: RwLock<ObjectRelations>,
    upserts: DiffBuffer<Stamped<ObjectInstanceDescriptor>>,
    deletions: DiffBuffer<Stamped<ObjectId>>,
    mesh_additions: DiffBuffer<Stamped<Arc<MeshDescriptor>>>,
    mesh_deletions: DiffBuffer<Stamped<MeshGuid>>,
    transforms: DiffBuffer<Stamped<(ObjectId, Mat4)>>,
    sequence: AtomicU64,
    min_vertices: usize,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ObjectStore {
    /// Creates an empty store that rejects meshes under `min_vertices`.
    pub fn new(min_vertices: usize) -> Self {
        Self {
            relations: RwLock::new(ObjectRelations::default()),
            upserts: DiffBuffer::new(),
            deletions: DiffBuffer::new(),
            mesh_additions: DiffBuffer::new(),
            mesh_deletions: DiffBuffer::new(),
            transforms: DiffBuffer::new(),
            sequence: AtomicU64::new(0),
            min_vertices: min_vertices.max(3),
        }
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    // --- Notifications ---

    /// Queues an object addition or update.
    ///
    /// Nothing is deduplicated: every update is replayed in order and the
    /// last one wins, because applying an update overwrites handle fields.
    /// The `ObjectId → MeshId` relation is updated immediately.
    pub fn add_or_update_object(&self, descriptor: ObjectInstanceDescriptor) {
        let seq = self.next_seq();
        {
            let mut relations = self.relations.write();
            relations
                .mesh_of_object
                .insert(descriptor.id, (descriptor.mesh, seq));
            relations
                .material_of_object
                .insert(descriptor.id, descriptor.material);
        }
        self.upserts.push(Stamped {
            seq,
            item: descriptor,
        });
    }

    /// Queues an object deletion. The renderer object is hidden, not
    /// destroyed, when the deletion is uploaded.
    pub fn delete_object(&self, object: ObjectId) {
        let seq = self.next_seq();
        self.deletions.push(Stamped { seq, item: object });
    }

    /// Queues mesh geometry. Returns `false` if the mesh is degenerate; it is
    /// then never uploaded and never gets a relation.
    pub fn add_mesh(&self, mesh: MeshDescriptor) -> bool {
        if mesh.is_degenerate(self.min_vertices) {
            log::warn!(
                "Skipping degenerate mesh {} ({} vertices, {} faces).",
                mesh.id,
                mesh.vertices.len(),
                mesh.faces.len()
            );
            return false;
        }
        let seq = self.next_seq();
        self.mesh_additions.push(Stamped {
            seq,
            item: Arc::new(mesh),
        });
        true
    }

    /// Queues the deletion of every sub-mesh of a host object.
    pub fn delete_mesh(&self, guid: MeshGuid) {
        let seq = self.next_seq();
        self.mesh_deletions.push(Stamped { seq, item: guid });
    }

    /// Queues a transform-only update of an existing object.
    pub fn update_transform(&self, object: ObjectId, transform: Mat4) {
        let seq = self.next_seq();
        self.transforms.push(Stamped {
            seq,
            item: (object, transform),
        });
    }

    // --- Drain protocol ---

    /// Returns `true` if any queue has pending or in-flight diffs.
    pub fn has_pending(&self) -> bool {
        !(self.upserts.is_empty()
            && self.deletions.is_empty()
            && self.mesh_additions.is_empty()
            && self.mesh_deletions.is_empty()
            && self.transforms.is_empty())
    }

    /// Moves every queue in flight.
    pub fn begin_drain(&self) {
        self.upserts.begin_drain();
        self.deletions.begin_drain();
        self.mesh_additions.begin_drain();
        self.mesh_deletions.begin_drain();
        self.transforms.begin_drain();
    }

    /// Drops the drained queues. Relations are kept.
    pub fn reset(&self) {
        self.upserts.reset();
        self.deletions.reset();
        self.mesh_additions.reset();
        self.mesh_deletions.reset();
        self.transforms.reset();
    }

    /// Gives the drained queues back to the next cycle.
    pub fn rollback(&self) {
        self.upserts.rollback();
        self.deletions.rollback();
        self.mesh_additions.rollback();
        self.mesh_deletions.rollback();
        self.transforms.rollback();
    }

    /// The in-flight object diffs, with superseded ones removed.
    ///
    /// An upsert is kept unless a later deletion of the same object exists; a
    /// deletion is kept unless a later upsert exists.
    pub fn object_batch(&self) -> ObjectBatch {
        let upserts = self.upserts.in_flight();
        let deletions = self.deletions.in_flight();
        resolve_object_batch(&upserts, &deletions)
    }

    /// The in-flight mesh diffs, with superseded ones removed.
    pub fn mesh_batch(&self) -> MeshBatch {
        let additions = self.mesh_additions.in_flight();
        let deletions = self.mesh_deletions.in_flight();
        resolve_mesh_batch(&additions, &deletions)
    }

    /// The in-flight transform-only updates, in apply order.
    pub fn transform_batch(&self) -> Arc<Vec<Stamped<(ObjectId, Mat4)>>> {
        self.transforms.in_flight()
    }

    /// The newest in-flight transform of `object` applied after `seq`.
    ///
    /// An upsert replayed by the Objects step must not overwrite a transform
    /// the host sent after it.
    pub fn transform_after(&self, object: ObjectId, seq: u64) -> Option<Mat4> {
        self.transforms
            .in_flight()
            .iter()
            .filter(|stamped| stamped.item.0 == object && stamped.seq > seq)
            .max_by_key(|stamped| stamped.seq)
            .map(|stamped| stamped.item.1)
    }

    /// Upserts queued but not yet drained.
    pub fn pending_upserts(&self) -> Vec<ObjectInstanceDescriptor> {
        self.upserts.pending().into_iter().map(|s| s.item).collect()
    }

    /// Deletions queued but not yet drained.
    pub fn pending_deletions(&self) -> Vec<ObjectId> {
        self.deletions.pending().into_iter().map(|s| s.item).collect()
    }

    /// Meshes queued but not yet drained.
    pub fn pending_meshes(&self) -> Vec<MeshId> {
        self.mesh_additions
            .pending()
            .into_iter()
            .map(|s| s.item.id)
            .collect()
    }

    // --- Relations ---

    /// The renderer handle of an object.
    pub fn object_handle(&self, object: ObjectId) -> Option<ObjectHandle> {
        self.relations.read().object_handles.get(&object).copied()
    }

    /// The renderer handle of a mesh.
    pub fn mesh_handle(&self, mesh: MeshId) -> Option<MeshHandle> {
        self.relations.read().mesh_handles.get(&mesh).copied()
    }

    /// The mesh an object draws.
    pub fn mesh_of_object(&self, object: ObjectId) -> Option<MeshId> {
        self.relations
            .read()
            .mesh_of_object
            .get(&object)
            .map(|(mesh, _)| *mesh)
    }

    /// The host material last assigned to an object.
    pub fn material_of_object(&self, object: ObjectId) -> Option<MaterialId> {
        self.relations.read().material_of_object.get(&object).copied()
    }

    /// Every live object with its host material.
    pub fn object_materials(&self) -> Vec<(ObjectId, MaterialId)> {
        self.relations
            .read()
            .material_of_object
            .iter()
            .map(|(o, m)| (*o, *m))
            .collect()
    }

    /// Records a material assignment made outside an upsert.
    ///
    /// Returns the object's mesh, or `None` if the object is unknown.
    pub fn set_material(&self, object: ObjectId, material: MaterialId) -> Option<MeshId> {
        let mut relations = self.relations.write();
        let mesh = relations.mesh_of_object.get(&object).map(|(m, _)| *m)?;
        relations.material_of_object.insert(object, material);
        Some(mesh)
    }

    /// Live objects drawing any sub-mesh of `guid`, with their handles.
    pub fn objects_of_mesh(&self, guid: MeshGuid) -> Vec<(ObjectId, ObjectHandle)> {
        let relations = self.relations.read();
        relations
            .mesh_of_object
            .iter()
            .filter(|(_, (mesh, _))| mesh.guid == guid)
            .filter_map(|(object, _)| {
                relations
                    .object_handles
                    .get(object)
                    .map(|handle| (*object, *handle))
            })
            .collect()
    }

    /// Every renderer mesh handle created for `guid`.
    pub fn meshes_of(&self, guid: MeshGuid) -> Vec<(MeshId, MeshHandle)> {
        self.relations
            .read()
            .mesh_handles
            .iter()
            .filter(|(mesh, _)| mesh.guid == guid)
            .map(|(m, h)| (*m, *h))
            .collect()
    }

    /// Records the renderer object created for `object`.
    ///
    /// # Panics
    ///
    /// Panics if the object already has a handle.
    pub fn commit_object(&self, object: ObjectId, handle: ObjectHandle) {
        let mut relations = self.relations.write();
        match relations.object_handles.entry(object) {
            Entry::Vacant(slot) => {
                slot.insert(handle);
            }
            Entry::Occupied(existing) => panic!(
                "duplicate renderer object for {object}: {} already committed, got {handle}",
                existing.get()
            ),
        }
    }

    /// Records the renderer mesh created for `mesh`.
    ///
    /// # Panics
    ///
    /// Panics if the mesh already has a handle.
    pub fn commit_mesh(&self, mesh: MeshId, handle: MeshHandle) {
        let mut relations = self.relations.write();
        match relations.mesh_handles.entry(mesh) {
            Entry::Vacant(slot) => {
                slot.insert(handle);
            }
            Entry::Occupied(existing) => panic!(
                "duplicate renderer mesh for {mesh}: {} already committed, got {handle}",
                existing.get()
            ),
        }
    }

    /// Tracks the visibility last sent to the renderer.
    pub fn set_hidden(&self, object: ObjectId, hidden: bool) {
        let mut relations = self.relations.write();
        if hidden {
            relations.hidden.insert(object);
        } else {
            relations.hidden.remove(&object);
        }
    }

    /// Returns `true` if the renderer object was hidden by a deletion.
    pub fn is_hidden(&self, object: ObjectId) -> bool {
        self.relations.read().hidden.contains(&object)
    }

    /// Drops the mesh and material relations of a deleted object, unless an
    /// upsert applied after the deletion has set them again.
    ///
    /// Returns `true` if the relations were dropped. The object handle is
    /// kept so a later re-add reuses it.
    pub fn forget_object(&self, object: ObjectId, deletion_seq: u64) -> bool {
        let mut relations = self.relations.write();
        match relations.mesh_of_object.get(&object) {
            Some((_, set_at)) if *set_at > deletion_seq => false,
            _ => {
                relations.mesh_of_object.remove(&object);
                relations.material_of_object.remove(&object);
                true
            }
        }
    }

    /// Number of renderer objects ever created.
    pub fn object_count(&self) -> usize {
        self.relations.read().object_handles.len()
    }

    /// Number of renderer meshes ever created.
    pub fn mesh_count(&self) -> usize {
        self.relations.read().mesh_handles.len()
    }

    /// Drops every relation and queue. Used on teardown.
    pub fn clear(&self) {
        *self.relations.write() = ObjectRelations::default();
        self.upserts.clear();
        self.deletions.clear();
        self.mesh_additions.clear();
        self.mesh_deletions.clear();
        self.transforms.clear();
    }
}

/// Cancels out object upserts and deletions against their apply order.
pub fn resolve_object_batch(
    upserts: &[Stamped<ObjectInstanceDescriptor>],
    deletions: &[Stamped<ObjectId>],
) -> ObjectBatch {
    let mut last_upsert: HashMap<ObjectId, u64> = HashMap::new();
    for upsert in upserts {
        let seq = last_upsert.entry(upsert.item.id).or_insert(upsert.seq);
        *seq = (*seq).max(upsert.seq);
    }
    let mut last_deletion: HashMap<ObjectId, u64> = HashMap::new();
    for deletion in deletions {
        let seq = last_deletion.entry(deletion.item).or_insert(deletion.seq);
        *seq = (*seq).max(deletion.seq);
    }

    let mut kept_upserts: Vec<_> = upserts
        .iter()
        .filter(|u| {
            last_deletion
                .get(&u.item.id)
                .map_or(true, |deleted_at| *deleted_at < u.seq)
        })
        .cloned()
        .collect();
    kept_upserts.sort_by_key(|u| u.seq);

    let mut seen = HashSet::new();
    let mut kept_deletions: Vec<_> = deletions
        .iter()
        .filter(|d| last_deletion.get(&d.item) == Some(&d.seq))
        .filter(|d| {
            last_upsert
                .get(&d.item)
                .map_or(true, |upserted_at| *upserted_at < d.seq)
        })
        .filter(|d| seen.insert(d.item))
        .cloned()
        .collect();
    kept_deletions.sort_by_key(|d| d.seq);

    ObjectBatch {
        upserts: kept_upserts,
        deletions: kept_deletions,
    }
}

/// Cancels out mesh additions and deletions against their apply order and
/// keeps only the latest geometry per mesh.
pub fn resolve_mesh_batch(
    additions: &[Stamped<Arc<MeshDescriptor>>],
    deletions: &[Stamped<MeshGuid>],
) -> MeshBatch {
    let mut last_deletion: HashMap<MeshGuid, u64> = HashMap::new();
    for deletion in deletions {
        let seq = last_deletion.entry(deletion.item).or_insert(deletion.seq);
        *seq = (*seq).max(deletion.seq);
    }
    let mut last_addition: HashMap<MeshGuid, u64> = HashMap::new();
    let mut latest: HashMap<MeshId, &Stamped<Arc<MeshDescriptor>>> = HashMap::new();
    for addition in additions {
        let guid = addition.item.id.guid;
        let seq = last_addition.entry(guid).or_insert(addition.seq);
        *seq = (*seq).max(addition.seq);

        let deleted_later = last_deletion
            .get(&guid)
            .is_some_and(|deleted_at| *deleted_at > addition.seq);
        if deleted_later {
            continue;
        }
        match latest.entry(addition.item.id) {
            Entry::Vacant(slot) => {
                slot.insert(addition);
            }
            Entry::Occupied(mut slot) => {
                if slot.get().seq < addition.seq {
                    slot.insert(addition);
                }
            }
        }
    }

    let mut kept: Vec<_> = latest.into_values().collect();
    kept.sort_by_key(|a| a.seq);

    let mut deleted: Vec<_> = last_deletion
        .into_iter()
        .filter(|(guid, deleted_at)| {
            last_addition
                .get(guid)
                .map_or(true, |added_at| added_at < deleted_at)
        })
        .collect();
    deleted.sort_by_key(|(_, seq)| *seq);

    MeshBatch {
        additions: kept.into_iter().map(|a| Arc::clone(&a.item)).collect(),
        deletions: deleted.into_iter().map(|(guid, _)| guid).collect(),
    }
}
