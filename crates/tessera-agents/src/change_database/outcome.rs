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

use std::collections::BTreeMap;
use tessera_core::lane::UploadStep;

/// Renderer mutations issued by a complete drain, per step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainStats {
    per_step: BTreeMap<UploadStep, usize>,
}

impl DrainStats {
    pub(crate) fn record(&mut self, step: UploadStep, applied: usize) {
        if applied > 0 {
            *self.per_step.entry(step).or_insert(0) += applied;
        }
    }

    /// Total number of renderer mutations.
    pub fn applied(&self) -> usize {
        self.per_step.values().sum()
    }

    /// Mutations issued by one step.
    pub fn applied_in(&self, step: UploadStep) -> usize {
        self.per_step.get(&step).copied().unwrap_or(0)
    }

    /// Returns `true` if the drain had nothing to do.
    pub fn is_empty(&self) -> bool {
        self.per_step.is_empty()
    }
}

/// How a drain ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every step ran; the per-cycle buffers were reset.
    Completed(DrainStats),
    /// The cancellation token was observed. The buffers were kept, so the
    /// next drain retries the same diffs.
    Cancelled {
        /// The step that observed the cancellation.
        step: UploadStep,
    },
}

impl DrainOutcome {
    /// Returns `true` for [`DrainOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, DrainOutcome::Completed(_))
    }

    /// The stats of a completed drain.
    pub fn stats(&self) -> Option<&DrainStats> {
        match self {
            DrainOutcome::Completed(stats) => Some(stats),
            DrainOutcome::Cancelled { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_sum_per_step() {
        let mut stats = DrainStats::default();
        stats.record(UploadStep::Meshes, 2);
        stats.record(UploadStep::Meshes, 1);
        stats.record(UploadStep::Objects, 4);
        stats.record(UploadStep::Camera, 0);

        assert_eq!(stats.applied(), 7);
        assert_eq!(stats.applied_in(UploadStep::Meshes), 3);
        assert_eq!(stats.applied_in(UploadStep::Camera), 0);
        assert!(!stats.is_empty());
    }

    #[test]
    fn cancelled_outcome_has_no_stats() {
        let outcome = DrainOutcome::Cancelled {
            step: UploadStep::Meshes,
        };
        assert!(!outcome.is_completed());
        assert!(outcome.stats().is_none());
    }
}
