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

//! Evaluation stage
//!
//! Replays one cluster's bucket against the backend under test. Each record
//! runs as an isolated unit:
//!
//! 1. re-inject `tell` into the backend's memory (skipped when empty)
//! 2. ask `question`
//! 3. score the reply against `expected`
//! 4. append the detail entry
//!
//! A failure in steps 1-3 is logged and the record is left out of the
//! aggregate. Store failures abort the stage.

use crate::backend::ChatBackend;
use crate::error::{PipelineError, RecordError, RecordFailure, ValidationError};
use crate::oracle::Scorer;
use memeval_core::{
    calculate_average_scores, AggregateResult, Cluster, EvaluationDetail, Record, RubricScore,
};
use memeval_storage::DetailLog;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of evaluating one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterOutcome {
    pub aggregate: AggregateResult,
    /// Records that contributed to the aggregate
    pub scored: usize,
    pub failures: Vec<RecordFailure>,
}

impl ClusterOutcome {
    pub fn cluster(&self) -> Cluster {
        self.aggregate.name
    }
}

pub struct EvaluationStage {
    backend: Arc<dyn ChatBackend>,
    scorer: Arc<dyn Scorer>,
    details: DetailLog,
}

impl EvaluationStage {
    pub fn new(backend: Arc<dyn ChatBackend>, scorer: Arc<dyn Scorer>, details: DetailLog) -> Self {
        Self {
            backend,
            scorer,
            details,
        }
    }

    /// Evaluate every record of `cluster` in order and aggregate the scores
    pub async fn evaluate_cluster(
        &self,
        cluster: Cluster,
        records: &[Record],
    ) -> Result<ClusterOutcome, PipelineError> {
        let total = records.len();
        info!("Evaluating cluster {} ({} records)", cluster, total);

        let mut scores: Vec<RubricScore> = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match self.evaluate_record(cluster, index, record).await {
                Ok(score) => {
                    self.details.append(
                        cluster,
                        EvaluationDetail {
                            dataset: record.clone(),
                            evaluate: score.clone(),
                        },
                    )?;
                    info!(
                        "Processed record {}/{} in category '{}'",
                        index + 1,
                        total,
                        cluster
                    );
                    scores.push(score);
                }
                Err(err) => {
                    match &err {
                        RecordError::Validation(_) => warn!(
                            "Validation error for record {} in category '{}': {}",
                            index + 1,
                            cluster,
                            err
                        ),
                        RecordError::Backend(source) => error!(
                            kind = ?source.kind(),
                            "Backend failure for record {} in category '{}': {}",
                            index + 1,
                            cluster,
                            err
                        ),
                        RecordError::Oracle(_) => error!(
                            "Scoring failure for record {} in category '{}': {}",
                            index + 1,
                            cluster,
                            err
                        ),
                    }
                    failures.push(RecordFailure::new(index, &err));
                }
            }
        }

        let result = calculate_average_scores(&scores);
        info!(
            "Cluster {}: {} scored, {} failed, averages {:?}",
            cluster,
            scores.len(),
            failures.len(),
            result
        );

        Ok(ClusterOutcome {
            aggregate: AggregateResult::new(cluster, result),
            scored: scores.len(),
            failures,
        })
    }

    async fn evaluate_record(
        &self,
        cluster: Cluster,
        index: usize,
        record: &Record,
    ) -> Result<RubricScore, RecordError> {
        if record.has_tell() {
            self.backend.chat(&record.tell).await?;
        } else {
            info!(
                "Record {} in category '{}' has no tell, skipping replay",
                index + 1,
                cluster
            );
        }

        if record.question.trim().is_empty() {
            return Err(ValidationError::EmptyQuestion.into());
        }

        let reply = self.backend.chat(&record.question).await?;
        if reply.trim().is_empty() {
            return Err(ValidationError::EmptyResponse.into());
        }
        debug!("Backend reply for record {}: {}", index + 1, reply);

        let score = self
            .scorer
            .score(&record.question, &reply, &record.expected)
            .await?;
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendCallError;
    use crate::error::FailureClass;
    use crate::llm_client::LLMError;
    use crate::oracle::OracleError;
    use async_trait::async_trait;
    use memeval_core::AverageScores;
    use memeval_storage::{DocumentBackend, InMemoryBackend, StoreError, StoreResult};
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Answers from a prompt table; unknown prompts fail with a 500
    struct ScriptedBackend {
        replies: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(replies: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                replies: replies
                    .iter()
                    .map(|(p, r)| (p.to_string(), r.to_string()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn chat(&self, prompt: &str) -> Result<String, BackendCallError> {
            self.calls.lock().push(prompt.to_string());
            self.replies
                .get(prompt)
                .cloned()
                .ok_or_else(|| BackendCallError::Status {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                })
        }
    }

    /// Scores by expected answer; unknown answers fail
    struct TableScorer {
        scores: HashMap<String, RubricScore>,
    }

    impl TableScorer {
        fn new(entries: &[(&str, RubricScore)]) -> Arc<Self> {
            Arc::new(Self {
                scores: entries
                    .iter()
                    .map(|(e, s)| (e.to_string(), s.clone()))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl Scorer for TableScorer {
        async fn score(
            &self,
            _context: &str,
            _response: &str,
            expected: &str,
        ) -> Result<RubricScore, OracleError> {
            self.scores
                .get(expected)
                .cloned()
                .ok_or_else(|| OracleError::Llm(LLMError::ApiError("unavailable".to_string())))
        }
    }

    /// Readable but never writable
    struct ReadOnlyBackend;

    impl DocumentBackend for ReadOnlyBackend {
        fn load(&self) -> StoreResult<Option<String>> {
            Ok(None)
        }

        fn persist(&self, _contents: &str) -> StoreResult<()> {
            Err(StoreError::Io {
                path: "evaluation_result_detail.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn location(&self) -> String {
            "<read-only>".to_string()
        }
    }

    fn details() -> DetailLog {
        DetailLog::new(Arc::new(InMemoryBackend::new()))
    }

    #[tokio::test]
    async fn test_backend_failure_is_isolated() {
        let backend = ScriptedBackend::new(&[
            ("t1", "ok"),
            ("q1", "answer one"),
            ("t2", "ok"),
            // q2 is missing: the backend answers 500
            ("t3", "ok"),
            ("q3", "answer three"),
        ]);
        let scorer = TableScorer::new(&[
            ("e1", RubricScore::new(8, 9, 7, 9)),
            ("e2", RubricScore::new(1, 1, 1, 1)),
            ("e3", RubricScore::new(6, 7, 9, 8)),
        ]);
        let log = details();
        let stage = EvaluationStage::new(backend, scorer, log.clone());

        let records = vec![
            Record::new("t1", "q1", "e1"),
            Record::new("t2", "q2", "e2"),
            Record::new("t3", "q3", "e3"),
        ];
        let outcome = stage
            .evaluate_cluster(Cluster::PersonalInformation, &records)
            .await
            .unwrap();

        assert_eq!(outcome.scored, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert_eq!(outcome.failures[0].class, FailureClass::Backend);
        assert_eq!(
            outcome.aggregate.result,
            AverageScores {
                accuracy: 7.0,
                relevance: 8.0,
                coherence: 8.0,
                fluency: 8.5,
            }
        );

        let entries = log.entries(Cluster::PersonalInformation).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].dataset, records[0]);
        assert_eq!(entries[1].dataset, records[2]);
    }

    #[tokio::test]
    async fn test_empty_tell_skips_replay() {
        let backend = ScriptedBackend::new(&[("Where do I live?", "Hanoi")]);
        let scorer = TableScorer::new(&[("Hanoi", RubricScore::new(10, 10, 10, 10))]);
        let stage = EvaluationStage::new(backend.clone(), scorer, details());

        let outcome = stage
            .evaluate_cluster(
                Cluster::LocationsAndPlaces,
                &[Record::new("  ", "Where do I live?", "Hanoi")],
            )
            .await
            .unwrap();

        assert_eq!(outcome.scored, 1);
        assert_eq!(*backend.calls.lock(), vec!["Where do I live?".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_reply_is_validation_failure() {
        let backend = ScriptedBackend::new(&[("t", "ok"), ("q", "   ")]);
        let scorer = TableScorer::new(&[("e", RubricScore::new(5, 5, 5, 5))]);
        let log = details();
        let stage = EvaluationStage::new(backend, scorer, log.clone());

        let outcome = stage
            .evaluate_cluster(Cluster::PlansAndGoals, &[Record::new("t", "q", "e")])
            .await
            .unwrap();

        assert_eq!(outcome.scored, 0);
        assert_eq!(outcome.failures[0].class, FailureClass::Validation);
        assert_eq!(outcome.aggregate.result, AverageScores::default());
        assert!(log.entries(Cluster::PlansAndGoals).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_question_is_validation_failure() {
        let backend = ScriptedBackend::new(&[("t", "ok")]);
        let scorer = TableScorer::new(&[]);
        let stage = EvaluationStage::new(backend.clone(), scorer, details());

        let outcome = stage
            .evaluate_cluster(Cluster::PlansAndGoals, &[Record::new("t", "", "e")])
            .await
            .unwrap();

        assert_eq!(outcome.failures[0].class, FailureClass::Validation);
        assert_eq!(*backend.calls.lock(), vec!["t".to_string()]);
    }

    #[tokio::test]
    async fn test_scoring_failure_writes_no_detail() {
        let backend = ScriptedBackend::new(&[("t", "ok"), ("q", "reply")]);
        let scorer = TableScorer::new(&[]);
        let log = details();
        let stage = EvaluationStage::new(backend, scorer, log.clone());

        let outcome = stage
            .evaluate_cluster(Cluster::HabitsAndPreferences, &[Record::new("t", "q", "e")])
            .await
            .unwrap();

        assert_eq!(outcome.failures[0].class, FailureClass::Oracle);
        assert!(log.entries(Cluster::HabitsAndPreferences).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_bucket_yields_zero_averages() {
        let stage = EvaluationStage::new(ScriptedBackend::new(&[]), TableScorer::new(&[]), details());

        let outcome = stage
            .evaluate_cluster(Cluster::SignificantEvents, &[])
            .await
            .unwrap();

        assert_eq!(outcome.cluster(), Cluster::SignificantEvents);
        assert_eq!(outcome.scored, 0);
        assert_eq!(outcome.aggregate.result, AverageScores::default());
    }

    #[tokio::test]
    async fn test_detail_store_failure_aborts_the_cluster() {
        let backend = ScriptedBackend::new(&[("t1", "ok"), ("q1", "a1"), ("t2", "ok"), ("q2", "a2")]);
        let scorer = TableScorer::new(&[
            ("e1", RubricScore::new(5, 5, 5, 5)),
            ("e2", RubricScore::new(6, 6, 6, 6)),
        ]);
        let stage = EvaluationStage::new(
            backend.clone(),
            scorer,
            DetailLog::new(Arc::new(ReadOnlyBackend)),
        );

        let err = stage
            .evaluate_cluster(
                Cluster::SignificantEvents,
                &[Record::new("t1", "q1", "e1"), Record::new("t2", "q2", "e2")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Store(StoreError::Io { .. })));
        // the second record was never replayed
        assert_eq!(*backend.calls.lock(), vec!["t1".to_string(), "q1".to_string()]);
    }
}
