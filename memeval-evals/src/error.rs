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

//! Pipeline error taxonomy
//!
//! [`RecordError`] is a failure confined to one record; the stages log it
//! and move on. [`PipelineError`] stops the stage.

use crate::backend::BackendCallError;
use crate::oracle::OracleError;
use memeval_storage::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Invalid input or output data for a single record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty backend response")]
    EmptyResponse,

    #[error("record has no question")]
    EmptyQuestion,
}

/// A failure isolated to one record
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Backend(#[from] BackendCallError),

    #[error("{0}")]
    Oracle(#[from] OracleError),
}

/// Taxonomy bucket of a [`RecordError`], for logs and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Validation,
    Backend,
    Oracle,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureClass::Validation => "validation",
            FailureClass::Backend => "backend",
            FailureClass::Oracle => "oracle",
        })
    }
}

impl RecordError {
    pub fn class(&self) -> FailureClass {
        match self {
            RecordError::Validation(_) => FailureClass::Validation,
            RecordError::Backend(_) => FailureClass::Backend,
            RecordError::Oracle(_) => FailureClass::Oracle,
        }
    }
}

/// A skipped record, as reported by a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// Position in the stage's input, 0-based
    pub index: usize,
    pub class: FailureClass,
    pub message: String,
}

impl RecordFailure {
    pub fn new(index: usize, error: &RecordError) -> Self {
        Self {
            index,
            class: error.class(),
            message: error.to_string(),
        }
    }
}

/// Errors that abort a stage
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Classification failed for record {index}: {source}")]
    Classification {
        index: usize,
        #[source]
        source: OracleError,
    },

    #[error("Backend client setup failed: {0}")]
    Setup(#[from] BackendCallError),
}
