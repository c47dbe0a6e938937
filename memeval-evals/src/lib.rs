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

//! # Memeval Evaluation Pipeline
//!
//! Offline evaluation of a conversational memory backend.
//!
//! ## Stages
//!
//! - **Clustering**: an LLM classifies each tell/question/expected record
//!   into memory-test clusters; records are appended to per-cluster buckets.
//! - **Evaluation**: each bucket is replayed against the backend under test
//!   and every reply is scored by an LLM judge on a four-field rubric.
//! - **Aggregation**: per-cluster rubric averages are upserted into the
//!   results collection.
//!
//! The remote calls sit behind [`Classifier`], [`Scorer`] and
//! [`ChatBackend`], so the stages run unchanged against test doubles.
//!
//! ## Example
//!
//! ```rust,ignore
//! use memeval_core::{load_dataset, HarnessConfig};
//! use memeval_evals::Harness;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HarnessConfig::load(None)?;
//!     let harness = Harness::from_config(&config)?;
//!
//!     let records = load_dataset(&["dataset.json"])?;
//!     harness.cluster(&records).await?;
//!
//!     for outcome in harness.evaluate_all(&[]).await? {
//!         println!("{}: {:?}", outcome.cluster(), outcome.aggregate.result);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod clustering;
pub mod error;
pub mod evaluation;
pub mod harness;
pub mod llm_client;
pub mod oracle;
pub mod reporting;

pub use backend::{BackendCallError, BackendErrorKind, ChatBackend, HttpChatBackend};
pub use clustering::{ClusteringStage, ClusteringSummary};
pub use error::{FailureClass, PipelineError, RecordError, RecordFailure, ValidationError};
pub use evaluation::{ClusterOutcome, EvaluationStage};
pub use harness::{Harness, HarnessStores};
pub use llm_client::{
    client_from_config, AnthropicClient, LLMClient, LLMError, LLMResponse, OpenAIClient,
    StructuredPrompt, TokenUsage,
};
pub use oracle::{Classifier, LlmOracle, OracleError, Scorer};
pub use reporting::render_table;
