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

//! Harness orchestrator
//!
//! Wires the stores and the three remote capabilities together and runs the
//! stages in order: clustering, then per-cluster evaluation, each followed by
//! an upsert into the results collection.

use crate::backend::{ChatBackend, HttpChatBackend};
use crate::clustering::{ClusteringStage, ClusteringSummary};
use crate::error::PipelineError;
use crate::evaluation::{ClusterOutcome, EvaluationStage};
use crate::llm_client::client_from_config;
use crate::oracle::{Classifier, LlmOracle, Scorer};
use memeval_core::{AggregateResult, Cluster, FailurePolicy, HarnessConfig, Record, StorageConfig};
use memeval_storage::{ClusteredStore, DetailLog, InMemoryBackend, ResultsStore};
use std::sync::Arc;
use tracing::info;

/// The three documents the pipeline reads and writes
#[derive(Clone)]
pub struct HarnessStores {
    pub clustered: ClusteredStore,
    pub details: DetailLog,
    pub results: ResultsStore,
}

impl HarnessStores {
    /// File-backed stores at the configured paths
    pub fn open(config: &StorageConfig) -> Self {
        Self {
            clustered: ClusteredStore::open(&config.clustered_path),
            details: DetailLog::open(&config.detail_path),
            results: ResultsStore::open(&config.results_path),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            clustered: ClusteredStore::new(Arc::new(InMemoryBackend::new())),
            details: DetailLog::new(Arc::new(InMemoryBackend::new())),
            results: ResultsStore::new(Arc::new(InMemoryBackend::new())),
        }
    }
}

pub struct Harness {
    stores: HarnessStores,
    clustering: ClusteringStage,
    evaluation: EvaluationStage,
}

impl Harness {
    pub fn new(
        stores: HarnessStores,
        classifier: Arc<dyn Classifier>,
        scorer: Arc<dyn Scorer>,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        let clustering = ClusteringStage::new(classifier, stores.clustered.clone());
        let evaluation = EvaluationStage::new(backend, scorer, stores.details.clone());
        Self {
            stores,
            clustering,
            evaluation,
        }
    }

    /// Build a harness with file-backed stores and live remote clients
    pub fn from_config(config: &HarnessConfig) -> Result<Self, PipelineError> {
        let llm_client = client_from_config(&config.oracle);
        info!(
            "Using {:?} oracle model {}",
            config.oracle.provider,
            llm_client.model_name()
        );

        let oracle = Arc::new(
            LlmOracle::new(llm_client)
                .with_scoring_params(config.oracle.max_tokens, config.oracle.temperature),
        );
        let backend = Arc::new(HttpChatBackend::from_config(&config.backend)?);

        Ok(Self::new(
            HarnessStores::open(&config.storage),
            oracle.clone(),
            oracle,
            backend,
        )
        .with_failure_policy(config.pipeline.classification_failure))
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.clustering = self.clustering.with_failure_policy(policy);
        self
    }

    pub fn stores(&self) -> &HarnessStores {
        &self.stores
    }

    /// Classify `records` into the clustered store
    pub async fn cluster(&self, records: &[Record]) -> Result<ClusteringSummary, PipelineError> {
        info!(
            "Clustering {} records into {}",
            records.len(),
            self.stores.clustered.location()
        );
        self.clustering.cluster_dataset(records).await
    }

    /// Evaluate every non-empty bucket in taxonomy order and upsert its
    /// aggregate. A non-empty `filter` restricts the run to those clusters.
    pub async fn evaluate_all(
        &self,
        filter: &[Cluster],
    ) -> Result<Vec<ClusterOutcome>, PipelineError> {
        let dataset = self.stores.clustered.load()?;
        let mut outcomes = Vec::new();

        for (cluster, records) in &dataset {
            if records.is_empty() || (!filter.is_empty() && !filter.contains(cluster)) {
                continue;
            }

            let outcome = self.evaluation.evaluate_cluster(*cluster, records).await?;
            self.stores
                .results
                .store_result(*cluster, outcome.aggregate.result)?;
            info!("Stored result for cluster {}", cluster);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// The results collection as currently persisted
    pub fn report(&self) -> Result<Vec<AggregateResult>, PipelineError> {
        Ok(self.stores.results.load()?)
    }
}
