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

//! Clustered dataset: cluster name -> ordered bucket of records

use crate::backend::{DocumentBackend, FileBackend};
use crate::document::JsonDocument;
use crate::error::StoreResult;
use memeval_core::{Cluster, ClusterMembership, Record};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// On-disk shape of the clustered dataset.
///
/// A key exists only once a record has been appended to it.
pub type ClusteredDataset = BTreeMap<Cluster, Vec<Record>>;

/// Store of cluster buckets
#[derive(Clone)]
pub struct ClusteredStore {
    doc: JsonDocument<ClusteredDataset>,
}

impl ClusteredStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            doc: JsonDocument::new(backend),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(FileBackend::new(path)))
    }

    pub fn load(&self) -> StoreResult<ClusteredDataset> {
        self.doc.load()
    }

    pub fn save(&self, dataset: &ClusteredDataset) -> StoreResult<()> {
        self.doc.save(dataset)
    }

    /// Records in one bucket, in insertion order
    pub fn bucket(&self, cluster: Cluster) -> StoreResult<Vec<Record>> {
        Ok(self.load()?.remove(&cluster).unwrap_or_default())
    }

    /// Append `record` to every bucket flagged in `membership`.
    ///
    /// Returns the clusters it was appended to. A membership with no flags
    /// leaves the document untouched.
    pub fn append(
        &self,
        membership: &ClusterMembership,
        record: &Record,
    ) -> StoreResult<Vec<Cluster>> {
        let clusters = membership.clusters();
        if clusters.is_empty() {
            return Ok(clusters);
        }

        self.doc.update(|dataset| {
            for cluster in &clusters {
                dataset.entry(*cluster).or_default().push(record.clone());
            }
        })?;
        Ok(clusters)
    }

    pub fn location(&self) -> String {
        self.doc.location()
    }
}
