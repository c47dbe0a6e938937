// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Clustering stage
//!
//! Classifies each raw record and appends it to every matching bucket of the
//! clustered store. Records are processed strictly in input order, and the
//! store is rewritten after each record, so a crash after record *k* leaves
//! the buckets consistent through *k*.

use crate::error::{PipelineError, RecordError, RecordFailure};
use crate::oracle::Classifier;
use memeval_core::{Cluster, FailurePolicy, Record};
use memeval_storage::ClusteredStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// What a clustering run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringSummary {
    /// Records classified and persisted (including dropped ones)
    pub processed: usize,
    /// Records that matched no cluster
    pub dropped: usize,
    /// Records whose classification failed and were skipped
    pub failures: Vec<RecordFailure>,
    /// Records appended per cluster during this run
    pub appended: BTreeMap<Cluster, usize>,
}

pub struct ClusteringStage {
    classifier: Arc<dyn Classifier>,
    store: ClusteredStore,
    policy: FailurePolicy,
}

impl ClusteringStage {
    pub fn new(classifier: Arc<dyn Classifier>, store: ClusteredStore) -> Self {
        Self {
            classifier,
            store,
            policy: FailurePolicy::default(),
        }
    }

    /// Set what happens when the classifier fails on a record
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Classify `records` and append each to its clusters' buckets
    pub async fn cluster_dataset(
        &self,
        records: &[Record],
    ) -> Result<ClusteringSummary, PipelineError> {
        let total = records.len();
        let mut summary = ClusteringSummary::default();

        for (index, record) in records.iter().enumerate() {
            info!("Processing entry {}/{}...", index + 1, total);

            let membership = match self
                .classifier
                .classify(&record.tell, &record.question, &record.expected)
                .await
            {
                Ok(membership) => membership,
                Err(source) => match self.policy {
                    FailurePolicy::Abort => {
                        error!("Error processing entry {}: {}", index + 1, source);
                        return Err(PipelineError::Classification { index, source });
                    }
                    FailurePolicy::Skip => {
                        let err = RecordError::from(source);
                        error!("Skipping entry {}: {}", index + 1, err);
                        summary.failures.push(RecordFailure::new(index, &err));
                        continue;
                    }
                },
            };
            debug!("Clustering response for entry {}: {:?}", index + 1, membership);

            let clusters = self.store.append(&membership, record)?;
            summary.processed += 1;
            if clusters.is_empty() {
                debug!("Entry {} matched no cluster, dropped", index + 1);
                summary.dropped += 1;
            }
            for cluster in clusters {
                *summary.appended.entry(cluster).or_default() += 1;
            }
            info!("Successfully processed entry {}/{}.", index + 1, total);
        }

        Ok(summary)
    }
}
