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

//! Mesh geometry upload.
//!
//! Renderer mesh handles are created sequentially, since the handle map is
//! shared. Buffer preparation and upload then fan out over the worker pool:
//! each mesh only touches its own handle.

use super::{cancelled, UploadLane};
use crate::context::UploadContext;
use glam::Vec3;
use rayon::prelude::*;
use std::sync::Arc;
use tessera_core::error::UploadError;
use tessera_core::event::SyncEvent;
use tessera_core::lane::{Lane, LaneOutcome, UploadStep};
use tessera_core::scene::{MeshBuffers, MeshDescriptor, MeshHandle};

/// Flattens a mesh into upload buffers, generating smooth vertex normals
/// when the host sent none.
pub fn prepare_mesh(mesh: &MeshDescriptor) -> MeshBuffers {
    let mut buffers = mesh.to_buffers();
    if buffers.normals.is_empty() {
        buffers.normals = smooth_normals(&mesh.vertices, &buffers.indices);
    }
    log::trace!(
        "Prepared {}: {} vertices, {} triangles.",
        mesh.id,
        buffers.vertex_count(),
        buffers.triangle_count()
    );
    buffers
}

/// Area-weighted vertex normals over a triangle list.
fn smooth_normals(vertices: &[Vec3], indices: &[u32]) -> Vec<f32> {
    let mut accumulated = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        // Cross product length is twice the triangle area.
        let face = (vertices[b] - vertices[a]).cross(vertices[c] - vertices[a]);
        accumulated[a] += face;
        accumulated[b] += face;
        accumulated[c] += face;
    }
    let normals: Vec<Vec3> = accumulated
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Z))
        .collect();
    bytemuck::cast_slice::<Vec3, f32>(&normals).to_vec()
}

/// Uploads mesh geometry and hides the objects of deleted meshes.
#[derive(Debug, Default)]
pub struct MeshLane;

impl MeshLane {
    /// Creates a new `MeshLane`.
    pub fn new() -> Self {
        Self
    }

    fn upload(
        ctx: &UploadContext<'_>,
        mesh: &MeshDescriptor,
        handle: MeshHandle,
    ) -> Result<bool, UploadError> {
        if ctx.is_cancelled() {
            return Ok(false);
        }
        let buffers = prepare_mesh(mesh);
        ctx.scene
            .upload_mesh_buffers(handle, &buffers)
            .map_err(|source| UploadError::MeshUploadFailed {
                mesh: mesh.id,
                source,
            })?;
        ctx.emit(SyncEvent::MeshUploaded {
            mesh: mesh.id,
            handle,
        });
        Ok(true)
    }
}

impl Lane for MeshLane {
    fn strategy_name(&self) -> &'static str {
        "Meshes"
    }

    fn step(&self) -> UploadStep {
        UploadStep::Meshes
    }
}

impl UploadLane for MeshLane {
    fn execute(&self, ctx: &UploadContext<'_>) -> Result<LaneOutcome, UploadError> {
        let objects = &ctx.stores.objects;
        let batch = objects.mesh_batch();
        let mut applied = 0;

        // Deleted geometry may still back other objects' meshes, so buffers
        // are kept and only the dependent objects are hidden.
        for guid in &batch.deletions {
            if cancelled(ctx, self.step()) {
                return Ok(LaneOutcome::Cancelled);
            }
            for (object, handle) in objects.objects_of_mesh(*guid) {
                if objects.is_hidden(object) {
                    continue;
                }
                ctx.scene
                    .set_object_visibility(handle, false)
                    .map_err(|source| UploadError::ObjectUpdateFailed { object, source })?;
                objects.set_hidden(object, true);
                applied += 1;
            }
        }

        let mut targets: Vec<(Arc<MeshDescriptor>, MeshHandle)> =
            Vec::with_capacity(batch.additions.len());
        for mesh in &batch.additions {
            if cancelled(ctx, self.step()) {
                return Ok(LaneOutcome::Cancelled);
            }
            let handle = match objects.mesh_handle(mesh.id) {
                Some(handle) => handle,
                None => {
                    let handle = ctx.scene.create_mesh(mesh.id).map_err(|source| {
                        UploadError::MeshUploadFailed {
                            mesh: mesh.id,
                            source,
                        }
                    })?;
                    objects.commit_mesh(mesh.id, handle);
                    handle
                }
            };
            targets.push((Arc::clone(mesh), handle));
        }

        let uploaded = if ctx.config.parallel_mesh_upload && targets.len() > 1 {
            let results: Vec<Result<bool, UploadError>> = ctx.install(|| {
                targets
                    .par_iter()
                    .map(|(mesh, handle)| Self::upload(ctx, mesh, *handle))
                    .collect()
            });
            let mut uploaded = 0;
            let mut skipped = false;
            for result in results {
                if result? {
                    uploaded += 1;
                } else {
                    skipped = true;
                }
            }
            if skipped {
                log::info!("Drain cancelled during the {} step.", self.step());
                return Ok(LaneOutcome::Cancelled);
            }
            uploaded
        } else {
            let mut uploaded = 0;
            for (mesh, handle) in &targets {
                if !Self::upload(ctx, mesh, *handle)? {
                    log::info!("Drain cancelled during the {} step.", self.step());
                    return Ok(LaneOutcome::Cancelled);
                }
                uploaded += 1;
            }
            uploaded
        };

        log::debug!(
            "Uploaded {uploaded} meshes, hid objects of {} deleted meshes.",
            batch.deletions.len()
        );
        Ok(LaneOutcome::completed(applied + uploaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{instance, mesh_id, quad, Harness};
    use tessera_core::scene::{Face, ObjectId};
    use tessera_core::SyncConfig;
    use tessera_infra::SceneCall;

    #[test]
    fn prepare_mesh_generates_normals_when_missing() {
        let buffers = prepare_mesh(&quad(mesh_id(1)));
        assert_eq!(buffers.normals.len(), 12);
        for normal in buffers.normals.chunks_exact(3) {
            assert_eq!(normal, &[0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn prepare_mesh_keeps_host_normals() {
        let mut mesh = quad(mesh_id(1));
        mesh.normals = vec![Vec3::X; 4];
        let buffers = prepare_mesh(&mesh);
        assert_eq!(&buffers.normals[..3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn isolated_vertices_get_a_fallback_normal() {
        let mut mesh = quad(mesh_id(1));
        mesh.vertices.push(Vec3::splat(5.0));
        mesh.faces = vec![Face::Triangle([0, 1, 2])];
        let buffers = prepare_mesh(&mesh);
        assert_eq!(&buffers.normals[12..15], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn uploads_create_one_handle_per_mesh() {
        let harness = Harness::new();
        let id = mesh_id(1);
        harness.stores.objects.add_mesh(quad(id));
        harness.stores.objects.add_mesh(quad(id));

        assert_eq!(harness.run(&MeshLane), Ok(LaneOutcome::completed(1)));
        let handle = harness.stores.objects.mesh_handle(id).expect("mesh handle");
        let recorded = harness.scene.mesh(handle).expect("recorded mesh");
        assert_eq!(recorded.uploads, 1);
        assert_eq!(harness.scene.mesh_count(), 1);
    }

    #[test]
    fn re_added_mesh_reuses_its_handle() {
        let harness = Harness::new();
        let id = mesh_id(1);
        harness.stores.objects.add_mesh(quad(id));
        harness.run(&MeshLane).expect("first upload");
        harness.stores.reset();
        let handle = harness.stores.objects.mesh_handle(id);

        harness.stores.objects.add_mesh(quad(id));
        harness.run(&MeshLane).expect("second upload");
        assert_eq!(harness.stores.objects.mesh_handle(id), handle);
        assert_eq!(harness.scene.mesh_count(), 1);
    }

    #[test]
    fn deleted_mesh_hides_dependents_but_keeps_buffers() {
        let harness = Harness::new();
        let id = mesh_id(1);
        harness.stores.objects.add_or_update_object(instance(1, id));
        let (mesh_handle, object_handle) = harness.seed_object(ObjectId(1), id);
        harness.stores.objects.delete_mesh(id.guid);

        assert_eq!(harness.run(&MeshLane), Ok(LaneOutcome::completed(1)));
        assert_eq!(
            harness.scene.calls(),
            vec![SceneCall::SetObjectVisibility(object_handle, false)]
        );
        assert!(harness.stores.objects.is_hidden(ObjectId(1)));
        assert!(harness.scene.mesh(mesh_handle).is_some());
    }

    #[test]
    fn failed_upload_keeps_the_created_handle() {
        let harness = Harness::new();
        let id = mesh_id(1);
        harness.scene.fail_mesh_upload(id);
        harness.stores.objects.add_mesh(quad(id));

        let err = harness.run(&MeshLane).unwrap_err();
        assert!(matches!(err, UploadError::MeshUploadFailed { mesh, .. } if mesh == id));
        let handle = harness.stores.objects.mesh_handle(id).expect("handle kept");

        harness.stores.rollback();
        harness.scene.clear_hooks();
        harness.run(&MeshLane).expect("retry");
        assert_eq!(harness.stores.objects.mesh_handle(id), Some(handle));
        assert_eq!(harness.scene.mesh_count(), 1);
    }

    #[test]
    fn cancellation_between_uploads_is_reported() {
        let harness = Harness::new();
        for n in 1..=3 {
            harness.stores.objects.add_mesh(quad(mesh_id(n)));
        }
        harness
            .scene
            .cancel_after_mesh_uploads(1, harness.cancel.clone());

        assert_eq!(harness.run(&MeshLane), Ok(LaneOutcome::Cancelled));
        let uploads = harness
            .scene
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SceneCall::UploadMeshBuffers(_)))
            .count();
        assert_eq!(uploads, 1);
    }

    #[test]
    fn parallel_upload_sends_every_mesh() {
        let harness = Harness::with_config(SyncConfig::default());
        for n in 1..=16 {
            harness.stores.objects.add_mesh(quad(mesh_id(n)));
        }
        assert_eq!(harness.run(&MeshLane), Ok(LaneOutcome::completed(16)));
        assert_eq!(harness.scene.mesh_count(), 16);
        assert_eq!(harness.events.len(), 16);
    }
}
