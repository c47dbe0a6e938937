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

use serde::{Deserialize, Deserializer, Serialize};

/// A single memory test case: a statement to remember, a probe, and the
/// ground-truth answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Statement injected into the backend's memory
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tell: String,

    /// Question probing recall of the statement
    #[serde(default, deserialize_with = "null_as_empty")]
    pub question: String,

    /// Expected answer
    #[serde(default, deserialize_with = "null_as_empty")]
    pub expected: String,
}

impl Record {
    pub fn new(
        tell: impl Into<String>,
        question: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            tell: tell.into(),
            question: question.into(),
            expected: expected.into(),
        }
    }

    /// Whether there is a statement to replay before asking
    pub fn has_tell(&self) -> bool {
        !self.tell.trim().is_empty()
    }
}

/// Empty spreadsheet cells arrive as `null`
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
