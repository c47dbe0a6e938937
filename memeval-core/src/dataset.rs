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

//! Raw dataset ingestion
//!
//! Datasets are exported sheets of tell/question/expected rows. Two JSON
//! shapes are accepted:
//!
//! ```text
//! [ {"tell": "...", "question": "...", "expected": "..."}, ... ]
//! {"tell": [...], "question": [...], "expected": [...]}
//! ```
//!
//! Several files are concatenated in the order given.

use crate::record::Record;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid dataset JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Column length mismatch in {path}: tell={tell}, question={question}, expected={expected}")]
    ColumnLengthMismatch {
        path: PathBuf,
        tell: usize,
        question: usize,
        expected: usize,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDataset {
    Rows(Vec<RawRow>),
    Columns(RawColumns),
}

#[derive(Deserialize)]
struct RawRow {
    #[serde(default)]
    tell: Value,
    #[serde(default)]
    question: Value,
    #[serde(default)]
    expected: Value,
}

#[derive(Deserialize)]
struct RawColumns {
    #[serde(default)]
    tell: Vec<Value>,
    question: Vec<Value>,
    expected: Vec<Value>,
}

/// Spreadsheet cells may be numbers or empty; everything becomes text
fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Parse one dataset document. `path` is only used for error reporting.
pub fn parse_dataset(path: &Path, contents: &str) -> Result<Vec<Record>, DatasetError> {
    let raw: RawDataset = serde_json::from_str(contents).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match raw {
        RawDataset::Rows(rows) => Ok(rows
            .into_iter()
            .map(|row| Record {
                tell: cell_text(row.tell),
                question: cell_text(row.question),
                expected: cell_text(row.expected),
            })
            .collect()),
        RawDataset::Columns(mut columns) => {
            let len = columns.question.len();
            // A sheet without any tell column is allowed
            if columns.tell.is_empty() {
                columns.tell = vec![Value::Null; len];
            }
            if columns.tell.len() != len || columns.expected.len() != len {
                return Err(DatasetError::ColumnLengthMismatch {
                    path: path.to_path_buf(),
                    tell: columns.tell.len(),
                    question: len,
                    expected: columns.expected.len(),
                });
            }
            Ok(columns
                .tell
                .into_iter()
                .zip(columns.question)
                .zip(columns.expected)
                .map(|((tell, question), expected)| Record {
                    tell: cell_text(tell),
                    question: cell_text(question),
                    expected: cell_text(expected),
                })
                .collect())
        }
    }
}

/// Load and concatenate datasets from `paths`, preserving order
pub fn load_dataset<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Record>, DatasetError> {
    let mut records = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut parsed = parse_dataset(path, &contents)?;
        tracing::info!("Loaded {} records from {}", parsed.len(), path.display());
        records.append(&mut parsed);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_rows() {
        let json = r#"[
            {"tell": "My cat is called Miso", "question": "What is my cat called?", "expected": "Miso"},
            {"tell": null, "question": "How old am I?", "expected": 30}
        ]"#;
        let records = parse_dataset(Path::new("rows.json"), json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].expected, "Miso");
        assert_eq!(records[1].tell, "");
        assert_eq!(records[1].expected, "30");
    }

    #[test]
    fn test_parse_columns() {
        let json = r#"{
            "tell": ["I was born in Hue", null],
            "question": ["Where was I born?", "Where do I work?"],
            "expected": ["Hue", "At a bakery"]
        }"#;
        let records = parse_dataset(Path::new("columns.json"), json).unwrap();
        assert_eq!(
            records,
            vec![
                Record::new("I was born in Hue", "Where was I born?", "Hue"),
                Record::new("", "Where do I work?", "At a bakery"),
            ]
        );
    }

    #[test]
    fn test_column_length_mismatch() {
        let json = r#"{"tell": ["a"], "question": ["q1", "q2"], "expected": ["e1", "e2"]}"#;
        let err = parse_dataset(Path::new("bad.json"), json).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::ColumnLengthMismatch { tell: 1, question: 2, expected: 2, .. }
        ));
    }

    #[test]
    fn test_load_concatenates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("sheet1.json");
        let second = dir.path().join("sheet2.json");
        writeln!(
            std::fs::File::create(&first).unwrap(),
            r#"[{{"tell": "t1", "question": "q1", "expected": "e1"}}]"#
        )
        .unwrap();
        writeln!(
            std::fs::File::create(&second).unwrap(),
            r#"{{"tell": ["t2"], "question": ["q2"], "expected": ["e2"]}}"#
        )
        .unwrap();

        let records = load_dataset(&[first, second]).unwrap();
        let questions: Vec<_> = records.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["q1", "q2"]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_dataset(&["/nonexistent/sheet.json"]).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
