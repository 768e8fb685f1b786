//! Ciphertext persistence behind the vault.

use std::path::PathBuf;
use std::sync::RwLock;

use crate::{Error, Result};

/// Where the sealed vault blob lives.
///
/// An empty blob means "never initialized"; the vault derives
/// `is_initialized` from this rather than tracking a separate flag.
pub trait VaultStorage: Send + Sync + 'static {
    fn read_ciphertext(&self) -> Result<Vec<u8>>;
    fn write_ciphertext(&self, blob: &[u8]) -> Result<()>;
}

/// In-memory storage for tests.
#[derive(Default)]
pub struct MemoryStorage {
    blob: RwLock<Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VaultStorage for MemoryStorage {
    fn read_ciphertext(&self) -> Result<Vec<u8>> {
        Ok(self
            .blob
            .read()
            .map_err(|_| Error::Storage("storage lock poisoned".into()))?
            .clone())
    }

    fn write_ciphertext(&self, blob: &[u8]) -> Result<()> {
        *self
            .blob
            .write()
            .map_err(|_| Error::Storage("storage lock poisoned".into()))? = blob.to_vec();
        Ok(())
    }
}

/// Single-file storage for production profiles.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VaultStorage for FileStorage {
    fn read_ciphertext(&self) -> Result<Vec<u8>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::Storage(format!(
                "read {} failed: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_ciphertext(&self, blob: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("mkdir {} failed: {e}", parent.display())))?;
        }
        std::fs::write(&self.path, blob)
            .map_err(|e| Error::Storage(format!("write {} failed: {e}", self.path.display())))
    }
}
