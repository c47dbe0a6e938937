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

//! Per-cluster aggregate results, one entry per cluster name

use crate::backend::{DocumentBackend, FileBackend};
use crate::document::JsonDocument;
use crate::error::StoreResult;
use memeval_core::{AggregateResult, AverageScores, Cluster};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct ResultsStore {
    doc: JsonDocument<Vec<AggregateResult>>,
}

impl ResultsStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            doc: JsonDocument::new(backend),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(FileBackend::new(path)))
    }

    pub fn load(&self) -> StoreResult<Vec<AggregateResult>> {
        self.doc.load()
    }

    /// Upsert the result for `name`: replace it in place if present,
    /// otherwise append. Other entries keep their order.
    pub fn store_result(&self, name: Cluster, result: AverageScores) -> StoreResult<()> {
        self.doc.update(|results| {
            match results.iter_mut().find(|entry| entry.name == name) {
                Some(entry) => entry.result = result,
                None => results.push(AggregateResult::new(name, result)),
            }
        })
    }
}
