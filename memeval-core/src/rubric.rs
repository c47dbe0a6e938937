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

//! Rubric scores and per-cluster aggregation
//!
//! A judge rates each backend reply on four dimensions (1-10). Per-cluster
//! results are the field-wise mean of all scores in the cluster, rounded to
//! two decimal places.

use crate::cluster::Cluster;
use crate::record::Record;
use serde::{Deserialize, Serialize};

/// Lowest score the rubric allows
pub const RUBRIC_MIN: i64 = 1;

/// Highest score the rubric allows
pub const RUBRIC_MAX: i64 = 10;

/// Judge output for one (record, reply) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricScore {
    #[serde(rename = "Accuracy")]
    pub accuracy: i64,
    #[serde(rename = "Relevance")]
    pub relevance: i64,
    #[serde(rename = "Coherence")]
    pub coherence: i64,
    #[serde(rename = "Fluency")]
    pub fluency: i64,
    #[serde(rename = "Comments")]
    pub comments: String,
}

impl RubricScore {
    pub fn new(accuracy: i64, relevance: i64, coherence: i64, fluency: i64) -> Self {
        Self {
            accuracy,
            relevance,
            coherence,
            fluency,
            comments: String::new(),
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    /// Numeric fields paired with their wire names
    pub fn fields(&self) -> [(&'static str, i64); 4] {
        [
            ("Accuracy", self.accuracy),
            ("Relevance", self.relevance),
            ("Coherence", self.coherence),
            ("Fluency", self.fluency),
        ]
    }

    /// First field outside `[RUBRIC_MIN, RUBRIC_MAX]`, if any
    pub fn out_of_range(&self) -> Option<(&'static str, i64)> {
        self.fields()
            .into_iter()
            .find(|(_, value)| !(RUBRIC_MIN..=RUBRIC_MAX).contains(value))
    }
}

/// Mean rubric scores for one cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageScores {
    #[serde(rename = "Accuracy", default)]
    pub accuracy: f64,
    #[serde(rename = "Relevance", default)]
    pub relevance: f64,
    #[serde(rename = "Coherence", default)]
    pub coherence: f64,
    #[serde(rename = "Fluency", default)]
    pub fluency: f64,
}

/// Field-wise mean of `scores`, each rounded to two decimal places.
///
/// An empty slice yields all zeros.
pub fn calculate_average_scores(scores: &[RubricScore]) -> AverageScores {
    if scores.is_empty() {
        return AverageScores::default();
    }

    let mut totals = [0i64; 4];
    for score in scores {
        for (total, (_, value)) in totals.iter_mut().zip(score.fields()) {
            *total += value;
        }
    }

    let count = scores.len() as f64;
    let mean = |total: i64| round2(total as f64 / count);

    AverageScores {
        accuracy: mean(totals[0]),
        relevance: mean(totals[1]),
        coherence: mean(totals[2]),
        fluency: mean(totals[3]),
    }
}

/// Round to two decimal places, ties to even.
///
/// The decision is made on the exact binary value, so 7.125 (exact) becomes
/// 7.12 while 2.675 (stored just below) becomes 2.67.
fn round2(value: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }

    let bits = value.abs().to_bits();
    let biased_exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased_exponent == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased_exponent - 1075)
    };
    if exponent >= 0 {
        // already an integer
        return value;
    }

    let shift = exponent.unsigned_abs();
    if shift > 120 {
        return 0.0_f64.copysign(value);
    }

    // value * 100 == scaled / 2^shift, exactly
    let scaled = u128::from(mantissa) * 100;
    let mut hundredths = scaled >> shift;
    let remainder = scaled & ((1u128 << shift) - 1);
    let half = 1u128 << (shift - 1);
    if remainder > half || (remainder == half && hundredths % 2 == 1) {
        hundredths += 1;
    }

    (hundredths as f64 / 100.0).copysign(value)
}

/// Aggregate entry in the results collection, one per cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub name: Cluster,
    pub result: AverageScores,
}

impl AggregateResult {
    pub fn new(name: Cluster, result: AverageScores) -> Self {
        Self { name, result }
    }
}

/// Detail-log entry: the record and the judge's verdict on the reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDetail {
    pub dataset: Record,
    pub evaluate: RubricScore,
}
