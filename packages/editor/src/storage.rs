//! Blob storage for assets.
//!
//! An asset persists as a handful of named byte blobs. Where those blobs live is
//! up to the host; the editor only needs to read, write and remove them.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Byte-level read/write access to one asset's blobs
pub trait AssetStorage: Send + Sync {
    /// Read a blob, `None` if it does not exist
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>>;

    /// Create or replace a blob
    fn write(&self, name: &str, contents: &[u8]) -> io::Result<()>;

    /// Remove a blob; removing a missing blob is not an error
    fn remove(&self, name: &str) -> io::Result<()>;
}

/// Blobs stored as files in one directory
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStorage for DirStorage {
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.root.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, name: &str, contents: &[u8]) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.root.join(name), contents)
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        match std::fs::remove_file(self.root.join(name)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-memory storage for testing
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl AssetStorage for MemoryStorage {
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned())
    }

    fn write(&self, name: &str, contents: &[u8]) -> io::Result<()> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), contents.to_vec());
        Ok(())
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::new(dir.path().join("doc"));

        assert_eq!(storage.read("a.txt").unwrap(), None);
        storage.write("a.txt", b"hello").unwrap();
        assert_eq!(storage.read("a.txt").unwrap(), Some(b"hello".to_vec()));

        storage.remove("a.txt").unwrap();
        assert_eq!(storage.read("a.txt").unwrap(), None);

        // Removing twice is fine
        storage.remove("a.txt").unwrap();
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.write("x", b"1").unwrap();
        assert!(storage.contains("x"));
        storage.remove("x").unwrap();
        assert!(!storage.contains("x"));
    }
}
