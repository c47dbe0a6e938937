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

//! Append-only per-category log of scored records

use crate::backend::{DocumentBackend, FileBackend};
use crate::document::JsonDocument;
use crate::error::StoreResult;
use memeval_core::{Cluster, EvaluationDetail};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub type DetailDocument = BTreeMap<Cluster, Vec<EvaluationDetail>>;

#[derive(Clone)]
pub struct DetailLog {
    doc: JsonDocument<DetailDocument>,
}

impl DetailLog {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            doc: JsonDocument::new(backend),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(FileBackend::new(path)))
    }

    pub fn load(&self) -> StoreResult<DetailDocument> {
        self.doc.load()
    }

    /// Append one entry under `category`
    pub fn append(&self, category: Cluster, detail: EvaluationDetail) -> StoreResult<()> {
        self.doc
            .update(|log| log.entry(category).or_default().push(detail))
    }

    pub fn entries(&self, category: Cluster) -> StoreResult<Vec<EvaluationDetail>> {
        Ok(self.load()?.remove(&category).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use memeval_core::{Record, RubricScore};

    #[test]
    fn test_entries_keep_append_order_per_category() {
        let backend = InMemoryBackend::new();
        let log = DetailLog::new(Arc::new(backend.clone()));

        for n in 1..=3 {
            log.append(
                Cluster::SignificantEvents,
                EvaluationDetail {
                    dataset: Record::new("t", format!("q{n}"), "e"),
                    evaluate: RubricScore::new(n, n, n, n),
                },
            )
            .unwrap();
        }
        log.append(
            Cluster::PlansAndGoals,
            EvaluationDetail {
                dataset: Record::new("t", "other", "e"),
                evaluate: RubricScore::new(5, 5, 5, 5),
            },
        )
        .unwrap();

        let questions: Vec<_> = log
            .entries(Cluster::SignificantEvents)
            .unwrap()
            .into_iter()
            .map(|d| d.dataset.question)
            .collect();
        assert_eq!(questions, vec!["q1", "q2", "q3"]);
        assert_eq!(log.entries(Cluster::PlansAndGoals).unwrap().len(), 1);

        let raw: serde_json::Value = serde_json::from_str(&backend.contents().unwrap()).unwrap();
        assert_eq!(raw["Significant_Events"][0]["evaluate"]["Accuracy"], 1);
        assert_eq!(raw["Significant_Events"][2]["dataset"]["question"], "q3");
    }
}
