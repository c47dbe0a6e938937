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

//! Raw document backends
//!
//! A backend knows how to fetch and replace the full text of one document.
//! Documents are always rewritten whole; there is no locking, so two writers
//! on the same backend will lose updates.

use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load/persist capability for a single document
pub trait DocumentBackend: Send + Sync {
    /// Current contents, or `None` if the document does not exist yet
    fn load(&self) -> StoreResult<Option<String>>;

    /// Replace the document with `contents`
    fn persist(&self, contents: &str) -> StoreResult<()>;

    /// Human-readable location for logs
    fn location(&self) -> String;
}

/// Document stored as a file on disk
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentBackend for FileBackend {
    fn load(&self) -> StoreResult<Option<String>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        match String::from_utf8(bytes) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) => {
                tracing::warn!(
                    "Document at {} is not valid UTF-8 ({}), starting fresh",
                    self.path.display(),
                    e.utf8_error()
                );
                Ok(Some(String::new()))
            }
        }
    }

    fn persist(&self, contents: &str) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        std::fs::write(&self.path, contents).map_err(|e| StoreError::io(&self.path, e))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Document held in memory, for tests and dry runs.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    contents: Arc<Mutex<Option<String>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with raw text
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(Some(contents.into()))),
        }
    }

    /// Raw text as last persisted
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl DocumentBackend for InMemoryBackend {
    fn load(&self) -> StoreResult<Option<String>> {
        Ok(self.contents.lock().clone())
    }

    fn persist(&self, contents: &str) -> StoreResult<()> {
        *self.contents.lock() = Some(contents.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_backend_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("absent.json"));
        assert_eq!(backend.load().unwrap(), None);
    }

    #[test]
    fn test_file_backend_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("nested/out/doc.json"));
        backend.persist("{}").unwrap();
        assert_eq!(backend.load().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_backend_unwritable_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be written as a file
        let backend = FileBackend::new(dir.path());
        let err = backend.persist("{}").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_file_backend_invalid_utf8_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, [0xff, 0xfe, b'{', b'}']).unwrap();

        let backend = FileBackend::new(&path);
        assert_eq!(backend.load().unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_file_backend_unreadable_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let err = backend.load().unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_in_memory_clones_share_contents() {
        let backend = InMemoryBackend::new();
        let handle = backend.clone();
        backend.persist("[]").unwrap();
        assert_eq!(handle.contents().as_deref(), Some("[]"));
    }
}
