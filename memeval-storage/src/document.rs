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

//! Typed JSON document over a [`DocumentBackend`]

use crate::backend::DocumentBackend;
use crate::error::StoreResult;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

/// A JSON document of type `T` with read-modify-write semantics.
///
/// Every update is a full load, mutate and rewrite.
pub struct JsonDocument<T> {
    backend: Arc<dyn DocumentBackend>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonDocument<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _marker: PhantomData,
        }
    }
}

impl<T> JsonDocument<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            _marker: PhantomData,
        }
    }

    /// Load the document. Missing or corrupt content yields `T::default()`.
    pub fn load(&self) -> StoreResult<T> {
        let Some(contents) = self.backend.load()? else {
            return Ok(T::default());
        };
        if contents.trim().is_empty() {
            return Ok(T::default());
        }
        match serde_json::from_str(&contents) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                tracing::warn!(
                    "Corrupt document at {} ({}), starting fresh",
                    self.backend.location(),
                    e
                );
                Ok(T::default())
            }
        }
    }

    /// Overwrite the document
    pub fn save(&self, doc: &T) -> StoreResult<()> {
        let contents = serde_json::to_string_pretty(doc)?;
        self.backend.persist(&contents)
    }

    /// Load, apply `f`, write back, and return what `f` returned
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> StoreResult<R> {
        let mut doc = self.load()?;
        let out = f(&mut doc);
        self.save(&doc)?;
        Ok(out)
    }

    pub fn location(&self) -> String {
        self.backend.location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FileBackend, InMemoryBackend};
    use std::collections::BTreeMap;

    type Doc = BTreeMap<String, Vec<u32>>;

    #[test]
    fn test_missing_document_is_default() {
        let doc: JsonDocument<Doc> = JsonDocument::new(Arc::new(InMemoryBackend::new()));
        assert!(doc.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_document_is_default() {
        let backend = InMemoryBackend::with_contents("{ not json");
        let doc: JsonDocument<Doc> = JsonDocument::new(Arc::new(backend));
        assert!(doc.load().unwrap().is_empty());
    }

    #[test]
    fn test_wrong_root_type_is_default() {
        let backend = InMemoryBackend::with_contents("[1, 2, 3]");
        let doc: JsonDocument<Doc> = JsonDocument::new(Arc::new(backend));
        assert!(doc.load().unwrap().is_empty());
    }

    #[test]
    fn test_non_utf8_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, [0xff, 0xfe, b'{', b'}']).unwrap();

        let doc: JsonDocument<Doc> = JsonDocument::new(Arc::new(FileBackend::new(&path)));
        assert!(doc.load().unwrap().is_empty());

        // the next write replaces the corrupt bytes
        doc.update(|d| d.insert("a".to_string(), vec![1])).unwrap();
        assert_eq!(doc.load().unwrap()["a"], vec![1]);
    }

    #[test]
    fn test_update_persists() {
        let backend = InMemoryBackend::new();
        let doc: JsonDocument<Doc> = JsonDocument::new(Arc::new(backend.clone()));

        let len = doc
            .update(|d| {
                d.entry("a".to_string()).or_default().push(1);
                d.len()
            })
            .unwrap();
        assert_eq!(len, 1);

        doc.update(|d| d.entry("a".to_string()).or_default().push(2))
            .unwrap();
        assert_eq!(doc.load().unwrap()["a"], vec![1, 2]);
        assert!(backend.contents().unwrap().contains("\"a\""));
    }
}
