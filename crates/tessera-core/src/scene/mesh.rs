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

//! Host mesh geometry and the flattened buffers handed to the renderer.

use super::ids::MeshId;
use glam::{Vec2, Vec3};

/// A mesh face as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    /// A triangle over three vertex indices.
    Triangle([u32; 3]),
    /// A quad over four vertex indices, split along the `0-2` diagonal.
    Quad([u32; 4]),
}

/// One triangulated sub-mesh of a host object.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescriptor {
    /// Identity of the sub-mesh.
    pub id: MeshId,
    /// Vertex positions in object space.
    pub vertices: Vec<Vec3>,
    /// Faces indexing into `vertices`.
    pub faces: Vec<Face>,
    /// Per-vertex normals. Empty when the host has none.
    pub normals: Vec<Vec3>,
    /// Per-vertex texture coordinate channels.
    pub uvs: Vec<Vec<Vec2>>,
    /// Per-vertex RGBA colors. Empty when the host has none.
    pub colors: Vec<[f32; 4]>,
}

impl MeshDescriptor {
    /// Creates a mesh with positions and faces only.
    pub fn new(id: MeshId, vertices: Vec<Vec3>, faces: Vec<Face>) -> Self {
        Self {
            id,
            vertices,
            faces,
            normals: Vec::new(),
            uvs: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// Returns `true` when the mesh has too few vertices to be worth uploading.
    pub fn is_degenerate(&self, min_vertices: usize) -> bool {
        self.vertices.len() < min_vertices.max(3) || self.faces.is_empty()
    }

    /// Number of triangles after quad splitting.
    pub fn triangle_count(&self) -> usize {
        self.faces
            .iter()
            .map(|f| match f {
                Face::Triangle(_) => 1,
                Face::Quad(_) => 2,
            })
            .sum()
    }

    /// Flattens the descriptor into renderer upload buffers.
    ///
    /// Faces referencing out-of-range vertices are dropped. Normals and colors
    /// whose length does not match the vertex count are omitted; a mismatched
    /// UV channel is left empty so later channels keep their index.
    pub fn to_buffers(&self) -> MeshBuffers {
        let vertex_count = self.vertices.len();
        let in_range = |i: &u32| (*i as usize) < vertex_count;

        let mut indices = Vec::with_capacity(self.triangle_count() * 3);
        for face in &self.faces {
            match face {
                Face::Triangle(tri) => {
                    if tri.iter().all(in_range) {
                        indices.extend_from_slice(tri);
                    }
                }
                Face::Quad(quad) => {
                    if quad.iter().all(in_range) {
                        let [a, b, c, d] = *quad;
                        indices.extend_from_slice(&[a, b, c, a, c, d]);
                    }
                }
            }
        }

        let normals = if self.normals.len() == vertex_count {
            bytemuck::cast_slice::<Vec3, f32>(&self.normals).to_vec()
        } else {
            Vec::new()
        };

        let uvs = self
            .uvs
            .iter()
            .enumerate()
            .map(|(index, channel)| {
                if channel.len() == vertex_count {
                    bytemuck::cast_slice::<Vec2, f32>(channel).to_vec()
                } else {
                    log::warn!(
                        "{}: UV channel {index} has {} entries for {vertex_count} vertices; \
                         uploading it empty.",
                        self.id,
                        channel.len()
                    );
                    Vec::new()
                }
            })
            .collect();

        let colors = if self.colors.len() == vertex_count {
            bytemuck::cast_slice::<[f32; 4], f32>(&self.colors).to_vec()
        } else {
            Vec::new()
        };

        MeshBuffers {
            vertices: bytemuck::cast_slice::<Vec3, f32>(&self.vertices).to_vec(),
            indices,
            normals,
            uvs,
            colors,
        }
    }
}

/// Flat, renderer-ready geometry buffers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshBuffers {
    /// `xyz` triples.
    pub vertices: Vec<f32>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
    /// `xyz` triples, empty if absent.
    pub normals: Vec<f32>,
    /// One `uv` pair list per channel.
    pub uvs: Vec<Vec<f32>>,
    /// `rgba` quadruples, empty if absent.
    pub colors: Vec<f32>,
}

impl MeshBuffers {
    /// Number of vertices in the buffers.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of triangles in the buffers.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ids::MeshGuid;

    fn quad_mesh() -> MeshDescriptor {
        MeshDescriptor::new(
            MeshId::new(MeshGuid::new(), 0),
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![Face::Quad([0, 1, 2, 3])],
        )
    }

    #[test]
    fn quads_split_into_two_triangles() {
        let buffers = quad_mesh().to_buffers();
        assert_eq!(buffers.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(buffers.vertex_count(), 4);
        assert_eq!(buffers.triangle_count(), 2);
    }

    #[test]
    fn out_of_range_faces_are_dropped() {
        let mut mesh = quad_mesh();
        mesh.faces.push(Face::Triangle([0, 1, 9]));
        assert_eq!(mesh.to_buffers().triangle_count(), 2);
    }

    #[test]
    fn mismatched_attribute_channels_are_omitted() {
        let mut mesh = quad_mesh();
        mesh.normals = vec![Vec3::Z; 3];
        mesh.uvs = vec![vec![Vec2::ZERO; 4], vec![Vec2::ONE; 2]];
        mesh.colors = vec![[1.0, 0.0, 0.0, 1.0]; 4];

        let buffers = mesh.to_buffers();
        assert!(buffers.normals.is_empty());
        assert_eq!(buffers.uvs.len(), 2);
        assert_eq!(buffers.uvs[0].len(), 8);
        assert!(buffers.uvs[1].is_empty());
        assert_eq!(buffers.colors.len(), 16);
    }

    #[test]
    fn mismatched_uv_channel_keeps_later_channel_indices() {
        let mut mesh = quad_mesh();
        mesh.uvs = vec![vec![Vec2::ZERO; 1], vec![Vec2::ONE; 4]];

        let buffers = mesh.to_buffers();
        assert_eq!(buffers.uvs.len(), 2);
        assert!(buffers.uvs[0].is_empty());
        assert_eq!(buffers.uvs[1], vec![1.0; 8]);
    }

    #[test]
    fn fewer_than_three_vertices_is_degenerate() {
        let mut mesh = quad_mesh();
        assert!(!mesh.is_degenerate(3));
        mesh.vertices.truncate(2);
        assert!(mesh.is_degenerate(3));
        assert!(mesh.is_degenerate(0));
    }
}
