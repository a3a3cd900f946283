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

//! Tunables of the change database, loadable from RON.

use crate::error::ConfigError;
use crate::scene::LinearWorkflow;
use serde::{Deserialize, Serialize};

/// Configuration of a `ChangeDatabase`.
///
/// Every field has a default, so a RON document only needs to list the
/// values it overrides:
///
/// ```ron
/// (parallel_mesh_upload: false, min_mesh_vertices: 4)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upload mesh buffers on a worker pool. Handle creation stays sequential.
    pub parallel_mesh_upload: bool,
    /// Size of the worker pool; `0` lets rayon pick one thread per core.
    pub worker_threads: usize,
    /// Meshes with fewer vertices than this are skipped as degenerate.
    /// Values under 3 are treated as 3.
    pub min_mesh_vertices: usize,
    /// Maintain the synthetic background light.
    pub background_light: bool,
    /// Retire a shader once its last object moves to another material.
    pub retire_unused_shaders: bool,
    /// Gamma settings in effect before the host sends any.
    pub linear_workflow: LinearWorkflow,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            parallel_mesh_upload: true,
            worker_threads: 0,
            min_mesh_vertices: 3,
            background_light: true,
            retire_unused_shaders: true,
            linear_workflow: LinearWorkflow::default(),
        }
    }
}

impl SyncConfig {
    /// A single-worker configuration that uploads meshes one at a time.
    pub fn sequential() -> Self {
        Self {
            parallel_mesh_upload: false,
            worker_threads: 1,
            ..Self::default()
        }
    }

    /// Parses and validates a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig =
            ron::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the drain cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gamma = self.linear_workflow.gamma;
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "linear_workflow.gamma",
                reason: format!("expected a positive finite gamma, got {gamma}"),
            });
        }
        if self.worker_threads > 1024 {
            return Err(ConfigError::InvalidValue {
                field: "worker_threads",
                reason: format!("{} worker threads is not a sane pool size", self.worker_threads),
            });
        }
        Ok(())
    }

    /// The vertex threshold actually applied.
    pub fn effective_min_vertices(&self) -> usize {
        self.min_mesh_vertices.max(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = SyncConfig::from_ron_str("(parallel_mesh_upload: false, min_mesh_vertices: 4)")
            .expect("valid config");
        assert!(!config.parallel_mesh_upload);
        assert_eq!(config.min_mesh_vertices, 4);
        assert!(config.background_light);
        assert!(config.retire_unused_shaders);
    }

    #[test]
    fn nested_workflow_is_parsed() {
        let config =
            SyncConfig::from_ron_str("(linear_workflow: (enabled: false, gamma: 1.8))")
                .expect("valid config");
        assert!(!config.linear_workflow.enabled);
        assert_eq!(config.linear_workflow.gamma, 1.8);
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = SyncConfig::from_ron_str("(parallel_mesh_upload: maybe)").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn non_positive_gamma_is_rejected() {
        let err = SyncConfig::from_ron_str("(linear_workflow: (enabled: true, gamma: 0.0))")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "linear_workflow.gamma",
                ..
            }
        ));
    }

    #[test]
    fn threshold_never_drops_below_a_triangle() {
        let config = SyncConfig {
            min_mesh_vertices: 1,
            ..SyncConfig::default()
        };
        assert_eq!(config.effective_min_vertices(), 3);
        assert_eq!(SyncConfig::sequential().worker_threads, 1);
    }
}
