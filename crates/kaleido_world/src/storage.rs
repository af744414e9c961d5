//! # Save Storage
//!
//! Where save bytes go. Writes are atomic at file granularity: a reader
//! sees either the previous save or the new one, never a mix.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{WorldError, WorldResult};

/// Persists and retrieves one save buffer.
pub trait Storage {
    /// Replaces the stored save with `bytes`.
    ///
    /// # Errors
    ///
    /// [`WorldError::Storage`] if the backend cannot write.
    fn persist(&mut self, bytes: &[u8]) -> WorldResult<()>;

    /// Returns the stored save.
    ///
    /// # Errors
    ///
    /// [`WorldError::NoSaveFound`] if nothing was persisted yet, or
    /// [`WorldError::Storage`] if the backend cannot read.
    fn retrieve(&self) -> WorldResult<Vec<u8>>;
}

/// A save file on disk.
#[derive(Clone, Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Stores saves at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Save file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_error(&self, source: std::io::Error) -> WorldError {
        WorldError::Storage {
            path: self.path.clone(),
            source,
        }
    }
}

impl Storage for FileStorage {
    fn persist(&mut self, bytes: &[u8]) -> WorldResult<()> {
        let temp = self.temp_path();
        let write = || -> std::io::Result<()> {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        };
        write().map_err(|source| {
            let _ = fs::remove_file(&temp);
            self.io_error(source)
        })?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "save file written");
        Ok(())
    }

    fn retrieve(&self) -> WorldResult<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(WorldError::NoSaveFound),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

/// Keeps the last save in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    saved: Option<Vec<u8>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { saved: None }
    }

    /// Creates a store that already holds `bytes`.
    #[must_use]
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self { saved: Some(bytes) }
    }

    /// The stored buffer, if any.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.saved.as_deref()
    }
}

impl Storage for MemoryStorage {
    fn persist(&mut self, bytes: &[u8]) -> WorldResult<()> {
        let saved = self.saved.get_or_insert_with(Vec::new);
        saved.clear();
        saved.extend_from_slice(bytes);
        Ok(())
    }

    fn retrieve(&self) -> WorldResult<Vec<u8>> {
        self.saved.clone().ok_or(WorldError::NoSaveFound)
    }
}
