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

//! Defines the hierarchy of error types for the synchronization layer.
//!
//! Only hard failures live here. Missing relations and degenerate geometry are
//! absorbed and logged where they happen, and cancellation is reported as a
//! drain outcome rather than an error.

use crate::lane::UploadStep;
use crate::scene::ids::{LightId, MaterialHash, MeshId, ObjectId};
use thiserror::Error;

/// A failure reported by the renderer-side collaborator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderSceneError {
    /// The renderer failed to compile a shader.
    #[error("shader build failed: {0}")]
    ShaderBuild(String),
    /// The renderer rejected mesh buffers.
    #[error("mesh upload failed: {0}")]
    MeshUpload(String),
    /// The renderer failed to create or mutate an object.
    #[error("object update failed: {0}")]
    ObjectUpdate(String),
    /// The renderer failed to create or update a light.
    #[error("light upload failed: {0}")]
    LightUpload(String),
    /// Any other backend failure.
    #[error("renderer backend error: {0}")]
    Backend(String),
}

/// A hard failure during `drain_and_upload`.
///
/// When one of these is returned the per-cycle buffers have been rolled back,
/// so the next drain retries the same diffs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UploadError {
    /// A shader could not be built for a material hash.
    #[error("failed to build shader for material {hash}")]
    ShaderBuildFailed {
        /// The material whose shader failed.
        hash: MaterialHash,
        /// The renderer's report.
        #[source]
        source: RenderSceneError,
    },
    /// Mesh buffers could not be uploaded.
    #[error("failed to upload mesh {mesh}")]
    MeshUploadFailed {
        /// The mesh whose upload failed.
        mesh: MeshId,
        /// The renderer's report.
        #[source]
        source: RenderSceneError,
    },
    /// An object could not be created or mutated.
    #[error("failed to update {object}")]
    ObjectUpdateFailed {
        /// The object whose update failed.
        object: ObjectId,
        /// The renderer's report.
        #[source]
        source: RenderSceneError,
    },
    /// A light could not be created or updated.
    #[error("failed to upload light {light:?}")]
    LightUploadFailed {
        /// The light whose upload failed.
        light: LightId,
        /// The renderer's report.
        #[source]
        source: RenderSceneError,
    },
    /// A scene-wide setting (view, environment, gamma...) could not be applied.
    #[error("upload step {step} failed")]
    SceneUpdateFailed {
        /// The step that failed.
        step: UploadStep,
        /// The renderer's report.
        #[source]
        source: RenderSceneError,
    },
    /// The renderer resources were released; no further drains are accepted.
    #[error("the renderer scene has been torn down")]
    TornDown,
}

impl UploadError {
    /// Wraps a renderer failure of a scene-wide step.
    pub fn scene(step: UploadStep, source: RenderSceneError) -> Self {
        UploadError::SceneUpdateFailed { step, source }
    }
}

/// Failure to load a [`SyncConfig`](crate::SyncConfig).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration text is not valid RON or does not match the schema.
    #[error("invalid sync configuration: {0}")]
    Parse(String),
    /// A value is out of its accepted range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn upload_error_exposes_renderer_source() {
        let err = UploadError::ShaderBuildFailed {
            hash: MaterialHash(0xabcd),
            source: RenderSceneError::ShaderBuild("bad node".into()),
        };
        assert_eq!(
            err.to_string(),
            "failed to build shader for material 0x0000abcd"
        );
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("shader build failed: bad node"));
    }

    #[test]
    fn scene_helper_names_the_step() {
        let err = UploadError::scene(
            UploadStep::Camera,
            RenderSceneError::Backend("lost".into()),
        );
        assert_eq!(err.to_string(), "upload step Camera failed");
    }
}
