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

//! Memeval Core
//!
//! Shared data model for the memory evaluation harness: test records, the
//! cluster taxonomy, rubric scores and their aggregation, dataset ingestion
//! and harness configuration.

pub mod cluster;
pub mod config;
pub mod dataset;
pub mod record;
pub mod rubric;

pub use cluster::{Cluster, ClusterMembership, UnknownCluster};
pub use config::{
    BackendConfig, ConfigError, FailurePolicy, HarnessConfig, OracleConfig, OracleProvider,
    PipelineConfig, StorageConfig, DEFAULT_BACKEND_URL,
};
pub use dataset::{load_dataset, parse_dataset, DatasetError};
pub use record::Record;
pub use rubric::{
    calculate_average_scores, AggregateResult, AverageScores, EvaluationDetail, RubricScore,
    RUBRIC_MAX, RUBRIC_MIN,
};
