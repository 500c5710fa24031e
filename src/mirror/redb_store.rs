// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded follow-document store backed by redb (pure Rust, ACID).
//!
//! Documents are stored as JSON under a composite `did \0 key` string key.
//! redb transactions are synchronous, so the [`DocumentStore`] impl runs them
//! on tokio's blocking pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{DocumentStore, FollowDocument, MirrorError};

/// Primary table: composite (did, key) → JSON-serialized document.
const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DocumentDbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<DocumentDbError> for MirrorError {
    fn from(e: DocumentDbError) -> Self {
        MirrorError::Store(e.to_string())
    }
}

pub type DocumentDbResult<T> = Result<T, DocumentDbError>;

fn make_key(did: &str, key: &str) -> String {
    format!("{did}\0{key}")
}

// =============================================================================
// RedbDocumentStore
// =============================================================================

/// Follow documents persisted in a single redb file. Clones share the
/// database handle.
#[derive(Clone)]
pub struct RedbDocumentStore {
    db: Arc<Database>,
}

impl RedbDocumentStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DocumentDbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DOCUMENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn get_document(&self, did: &str, key: &str) -> DocumentDbResult<Option<FollowDocument>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS)?;
        match table.get(make_key(did, key).as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_document(
        &self,
        did: &str,
        key: &str,
        document: &FollowDocument,
    ) -> DocumentDbResult<()> {
        let json = serde_json::to_vec(document)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DOCUMENTS)?;
            table.insert(make_key(did, key).as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

fn join_error(e: tokio::task::JoinError) -> MirrorError {
    MirrorError::Store(format!("document task failed: {e}"))
}

#[async_trait]
impl DocumentStore for RedbDocumentStore {
    async fn get(&self, did: &str, key: &str) -> Result<Option<FollowDocument>, MirrorError> {
        let store = self.clone();
        let (did, key) = (did.to_string(), key.to_string());
        let document = tokio::task::spawn_blocking(move || store.get_document(&did, &key))
            .await
            .map_err(join_error)??;
        Ok(document)
    }

    async fn set(
        &self,
        did: &str,
        key: &str,
        document: &FollowDocument,
    ) -> Result<(), MirrorError> {
        let store = self.clone();
        let (did, key, document) = (did.to_string(), key.to_string(), document.clone());
        tokio::task::spawn_blocking(move || store.put_document(&did, &key, &document))
            .await
            .map_err(join_error)??;
        Ok(())
    }
}
