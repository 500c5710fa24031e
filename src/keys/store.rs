// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device key storage.
//!
//! The signing key never lives in module-level state. Callers inject a
//! [`KeyStore`] so the host decides where device secrets are persisted and
//! tests can substitute [`MemoryKeyStore`].
//!
//! ## File Layout
//!
//! ```text
//! {root}/
//!   keys/
//!     {entry}        # raw bytes (PKCS#8 PEM for the signing key)
//! ```

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::ConnectError;

/// Errors raised by key store implementations.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid entry name: {0}")]
    InvalidEntry(String),
}

impl From<KeyStoreError> for ConnectError {
    fn from(e: KeyStoreError) -> Self {
        ConnectError::KeyStore(e.to_string())
    }
}

pub type KeyStoreResult<T> = Result<T, KeyStoreError>;

/// Byte storage for device secrets, addressed by entry name.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Read an entry. `Ok(None)` when it does not exist.
    async fn get(&self, entry: &str) -> KeyStoreResult<Option<Vec<u8>>>;

    /// Create or replace an entry.
    async fn put(&self, entry: &str, data: &[u8]) -> KeyStoreResult<()>;

    /// Remove an entry. Removing a missing entry is not an error.
    async fn clear(&self, entry: &str) -> KeyStoreResult<()>;
}

/// In-process key store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self, entry: &str) -> KeyStoreResult<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(entry).cloned())
    }

    async fn put(&self, entry: &str, data: &[u8]) -> KeyStoreResult<()> {
        self.entries
            .write()
            .await
            .insert(entry.to_string(), data.to_vec());
        Ok(())
    }

    async fn clear(&self, entry: &str) -> KeyStoreResult<()> {
        self.entries.write().await.remove(entry);
        Ok(())
    }
}

/// Key store persisting each entry as a file under `{root}/keys/`.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    root: PathBuf,
}

impl FileKeyStore {
    /// Create a store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory containing all entries.
    pub fn keys_dir(&self) -> PathBuf {
        self.root.join("keys")
    }

    /// Path of a single entry.
    pub fn entry_path(&self, entry: &str) -> KeyStoreResult<PathBuf> {
        validate_entry(entry)?;
        Ok(self.keys_dir().join(entry))
    }
}

/// Entry names map directly to file names, so keep them to a safe alphabet.
fn validate_entry(entry: &str) -> KeyStoreResult<()> {
    let valid = !entry.is_empty()
        && !entry.starts_with('.')
        && entry
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(KeyStoreError::InvalidEntry(entry.to_string()))
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn get(&self, entry: &str) -> KeyStoreResult<Option<Vec<u8>>> {
        let path = self.entry_path(entry)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, entry: &str, data: &[u8]) -> KeyStoreResult<()> {
        let path = self.entry_path(entry)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn clear(&self, entry: &str) -> KeyStoreResult<()> {
        let path = self.entry_path(entry)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
