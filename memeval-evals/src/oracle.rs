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

//! Classification and scoring oracle
//!
//! Both capabilities are structured-output calls to an LLM judge. The reply
//! must deserialize into the exact typed schema; anything else is an
//! [`OracleError`]. No retries.

use crate::llm_client::{LLMClient, LLMError, StructuredPrompt};
use async_trait::async_trait;
use memeval_core::{Cluster, ClusterMembership, RubricScore, RUBRIC_MAX, RUBRIC_MIN};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle call failed: {0}")]
    Llm(#[from] LLMError),

    #[error("Oracle reply does not match the expected schema: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rubric field {field} out of range [1, 10]: {value}")]
    ScoreOutOfRange { field: &'static str, value: i64 },
}

/// Assigns a record to memory-test clusters
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        tell: &str,
        question: &str,
        expected: &str,
    ) -> Result<ClusterMembership, OracleError>;
}

/// Rates a backend reply against the expected answer
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(
        &self,
        context: &str,
        response: &str,
        expected: &str,
    ) -> Result<RubricScore, OracleError>;
}

/// JSON schema for [`ClusterMembership`]: one required boolean per cluster
pub fn membership_schema() -> serde_json::Value {
    let properties: serde_json::Map<String, serde_json::Value> = Cluster::ALL
        .iter()
        .map(|c| (c.name().to_string(), serde_json::json!({ "type": "boolean" })))
        .collect();
    let required: Vec<&str> = Cluster::ALL.iter().map(|c| c.name()).collect();

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// JSON schema for [`RubricScore`]
pub fn rubric_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "Accuracy": { "type": "integer" },
            "Relevance": { "type": "integer" },
            "Coherence": { "type": "integer" },
            "Fluency": { "type": "integer" },
            "Comments": { "type": "string" }
        },
        "required": ["Accuracy", "Relevance", "Coherence", "Fluency", "Comments"],
        "additionalProperties": false
    })
}

fn classification_instructions() -> String {
    let mut prompt = String::from(
        "You are an expert in evaluating datasets for virtual assistant memory. \
         Classify the input into one or more of the clusters below. For each cluster, \
         answer true if it applies and false otherwise.\n\nClusters:\n",
    );
    for cluster in Cluster::ALL {
        prompt.push_str(&format!("- {}: {}\n", cluster.name(), cluster.description()));
    }
    prompt.push_str("\nReturn a JSON object with one boolean per cluster name.");
    prompt
}

fn scoring_instructions(context: &str, response: &str, expected: &str) -> String {
    let mut prompt = format!(
        r#"You are an evaluator for AI-generated text. Rate the response from {min} to {max} on each criterion:
1. Accuracy: Compared with the expected answer, is the response factually correct?
2. Relevance: Does the response address the query effectively?
3. Coherence: Is the response logically organized and easy to understand?
4. Fluency: Is the language natural and grammatically correct?

"#,
        min = RUBRIC_MIN,
        max = RUBRIC_MAX
    );

    if !context.is_empty() {
        prompt.push_str(&format!("Context: {}\n", context));
    }

    prompt.push_str(&format!(
        r#"Response: {response}
Expected Answer: {expected}

Reply in JSON with integer fields "Accuracy", "Relevance", "Coherence", "Fluency" and a string "Comments" explaining the scores."#,
        response = response,
        expected = expected
    ));
    prompt
}

/// Oracle backed by an LLM-as-judge
pub struct LlmOracle {
    llm_client: Arc<dyn LLMClient>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
}

impl LlmOracle {
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self {
            llm_client,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Sampling settings for scoring calls
    pub fn with_scoring_params(mut self, max_tokens: u32, temperature: f64) -> Self {
        self.max_tokens = Some(max_tokens);
        self.temperature = Some(temperature);
        self
    }

    async fn call(&self, prompt: StructuredPrompt) -> Result<String, OracleError> {
        let response = self.llm_client.evaluate(prompt).await?;
        tracing::debug!(
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Oracle reply: {}",
            response.content
        );
        Ok(response.content)
    }
}

#[async_trait]
impl Classifier for LlmOracle {
    async fn classify(
        &self,
        tell: &str,
        question: &str,
        expected: &str,
    ) -> Result<ClusterMembership, OracleError> {
        let input = format!(
            "### Input:\nTELL: {}\nQUESTION: {}\nEXPECTED: {}",
            tell, question, expected
        );
        let prompt =
            StructuredPrompt::new(classification_instructions(), "memory_clusters", membership_schema())
                .with_user(input);

        let content = self.call(prompt).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl Scorer for LlmOracle {
    async fn score(
        &self,
        context: &str,
        response: &str,
        expected: &str,
    ) -> Result<RubricScore, OracleError> {
        let mut prompt = StructuredPrompt::new(
            scoring_instructions(context, response, expected),
            "rubric_score",
            rubric_schema(),
        );
        if let Some(max_tokens) = self.max_tokens {
            prompt = prompt.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            prompt = prompt.with_temperature(temperature);
        }

        let content = self.call(prompt).await?;
        let score: RubricScore = serde_json::from_str(&content)?;
        if let Some((field, value)) = score.out_of_range() {
            return Err(OracleError::ScoreOutOfRange { field, value });
        }
        Ok(score)
    }
}
