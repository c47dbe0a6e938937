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

//! Memeval Storage Layer
//!
//! Three JSON documents hold all harness state:
//!
//! - **Clustered dataset**: `{cluster: [record, ...]}`
//! - **Detail log**: `{cluster: [{dataset, evaluate}, ...]}`
//! - **Results**: `[{name, result}, ...]`
//!
//! Each is a [`JsonDocument`] over a [`DocumentBackend`]; production uses
//! [`FileBackend`], tests use [`InMemoryBackend`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use memeval_storage::ClusteredStore;
//! use memeval_core::{Cluster, ClusterMembership, Record};
//!
//! let store = ClusteredStore::open("clustered_dataset.json");
//! let membership = ClusterMembership::of(&[Cluster::PersonalInformation]);
//! store.append(&membership, &Record::new("I am 30", "How old am I?", "30"))?;
//! ```

pub mod backend;
pub mod clustered;
pub mod detail;
pub mod document;
pub mod error;
pub mod results;

pub use backend::{DocumentBackend, FileBackend, InMemoryBackend};
pub use clustered::{ClusteredDataset, ClusteredStore};
pub use detail::{DetailDocument, DetailLog};
pub use document::JsonDocument;
pub use error::{StoreError, StoreResult};
pub use results::ResultsStore;
