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

//! Plain-text rendering of the results collection

use memeval_core::AggregateResult;
use std::fmt::Write;

const HEADERS: [&str; 4] = ["Accuracy", "Relevance", "Coherence", "Fluency"];

/// Render `results` as an aligned table, one row per cluster, in the order given
pub fn render_table(results: &[AggregateResult]) -> String {
    if results.is_empty() {
        return "No evaluation results\n".to_string();
    }

    let name_width = results
        .iter()
        .map(|r| r.name.name().len())
        .max()
        .unwrap_or(0)
        .max("Cluster".len());

    let mut out = String::new();
    let _ = write!(out, "{:<width$}", "Cluster", width = name_width);
    for header in HEADERS {
        let _ = write!(out, "  {:>9}", header);
    }
    out.push('\n');
    out.push_str(&"-".repeat(name_width + HEADERS.len() * 11));
    out.push('\n');

    for entry in results {
        let r = &entry.result;
        let _ = writeln!(
            out,
            "{:<width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9.2}",
            entry.name.name(),
            r.accuracy,
            r.relevance,
            r.coherence,
            r.fluency,
            width = name_width
        );
    }
    out
}
