// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Follow-list mirror in a decentralized document store.
//!
//! The mirror keeps a copy of the account's outbound follow links in a
//! per-DID document. The DID comes from an [`IdentityProvider`] that is
//! seeded with a wallet signature; documents are read and written through a
//! [`DocumentStore`].
//!
//! Mirroring is best effort: the graph client logs mirror failures and never
//! returns them from mutations.

pub mod redb_store;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::Chain;
use crate::error::{ConnectError, ConnectResult};
use crate::wallet::WalletProvider;

pub use redb_store::{DocumentDbError, RedbDocumentStore};

/// Document key holding the follow list.
pub const FOLLOW_DOCUMENT_KEY: &str = "cyberConnect";

/// Message the wallet signs to derive the identity secret.
pub const DID_AUTH_MESSAGE: &str = "Allow this account to control your identity";

/// Connection type recorded for follow links.
pub const FOLLOW_CONNECTION_TYPE: &str = "follow";

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Identity provider error: {0}")]
    Identity(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Couldn't find the target address in the given namespace")]
    TargetNotFound,
}

impl From<MirrorError> for ConnectError {
    fn from(e: MirrorError) -> Self {
        ConnectError::Mirror(e.to_string())
    }
}

/// One followed account in the mirror document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundLink {
    pub target: String,
    pub connection_type: String,
    pub namespace: String,
    pub alias: String,
    /// Milliseconds since the Unix epoch, as a decimal string
    pub created_at: String,
}

/// Per-DID follow document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowDocument {
    #[serde(default)]
    pub outbound_link: Vec<OutboundLink>,
}

impl FollowDocument {
    fn position(&self, target: &str, namespace: &str) -> Option<usize> {
        self.outbound_link
            .iter()
            .position(|link| link.target == target && link.namespace == namespace)
    }
}

/// Resolves a blockchain account to a decentralized identifier.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate `account_id` (CAIP-10) with a secret derived from a
    /// wallet signature. Returns the DID.
    async fn authenticate(
        &self,
        account_id: &str,
        auth_secret: &[u8; 32],
    ) -> Result<String, MirrorError>;
}

/// Offline `did:pkh` identities: the DID is the account id itself.
///
/// Suitable for local mirrors where no identity network is reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct PkhIdentityProvider;

#[async_trait]
impl IdentityProvider for PkhIdentityProvider {
    async fn authenticate(
        &self,
        account_id: &str,
        _auth_secret: &[u8; 32],
    ) -> Result<String, MirrorError> {
        if account_id.split(':').any(str::is_empty) {
            return Err(MirrorError::Identity(format!(
                "invalid account id `{account_id}`"
            )));
        }
        Ok(format!("did:pkh:{account_id}"))
    }
}

/// Keyed document storage scoped by DID.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, did: &str, key: &str) -> Result<Option<FollowDocument>, MirrorError>;

    async fn set(&self, did: &str, key: &str, document: &FollowDocument)
        -> Result<(), MirrorError>;
}

/// In-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<(String, String), FollowDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, did: &str, key: &str) -> Result<Option<FollowDocument>, MirrorError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&(did.to_string(), key.to_string())).cloned())
    }

    async fn set(
        &self,
        did: &str,
        key: &str,
        document: &FollowDocument,
    ) -> Result<(), MirrorError> {
        let mut documents = self.documents.write().await;
        documents.insert((did.to_string(), key.to_string()), document.clone());
        Ok(())
    }
}

/// CAIP-10 account id for `address` on `chain`.
///
/// Ethereum defaults to chain reference `1` (mainnet) when none is set.
pub fn account_id(chain: Chain, chain_ref: &str, address: &str) -> String {
    match chain {
        Chain::Eth => {
            let reference = if chain_ref.is_empty() { "1" } else { chain_ref };
            format!("eip155:{reference}:{address}")
        }
        Chain::Solana => format!("solana:{chain_ref}:{address}"),
    }
}

/// Identity secret derived from a wallet signature over [`DID_AUTH_MESSAGE`].
pub fn auth_secret(signature: &str) -> [u8; 32] {
    let text = signature.strip_prefix("0x").unwrap_or(signature);
    Sha256::digest(text.as_bytes()).into()
}

/// Follow-list replication against a DID-scoped document store.
pub struct MirrorStore {
    identity: Arc<dyn IdentityProvider>,
    documents: Arc<dyn DocumentStore>,
    did: RwLock<Option<String>>,
    /// Serializes read-modify-write of the follow document
    write_lock: Mutex<()>,
    /// Held across check, wallet prompt and store of the DID
    auth_lock: Mutex<()>,
}

impl MirrorStore {
    pub fn new(identity: Arc<dyn IdentityProvider>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            identity,
            documents,
            did: RwLock::new(None),
            write_lock: Mutex::new(()),
            auth_lock: Mutex::new(()),
        }
    }

    /// Authenticated DID, if any.
    pub async fn did(&self) -> Option<String> {
        self.did.read().await.clone()
    }

    /// Derive the DID for the wallet account. Cached after the first
    /// success, so the wallet is prompted once.
    pub async fn authenticate(
        &self,
        wallet: &WalletProvider,
        address: &str,
        chain_ref: &str,
    ) -> ConnectResult<String> {
        let _guard = self.auth_lock.lock().await;
        if let Some(did) = self.did().await {
            return Ok(did);
        }

        let signature = wallet.sign_message(DID_AUTH_MESSAGE).await?;
        let secret = auth_secret(&signature);
        let account = account_id(wallet.chain(), chain_ref, address);

        let did = self.identity.authenticate(&account, &secret).await?;
        info!(account = %account, did = %did, "Mirror identity authenticated");

        *self.did.write().await = Some(did.clone());
        Ok(did)
    }

    /// Forget the authenticated DID.
    pub async fn reset(&self) {
        *self.did.write().await = None;
    }

    async fn require_did(&self) -> ConnectResult<String> {
        self.did().await.ok_or(ConnectError::EmptyAuthProvider)
    }

    async fn load(&self, did: &str) -> ConnectResult<FollowDocument> {
        Ok(self
            .documents
            .get(did, FOLLOW_DOCUMENT_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Current outbound links.
    pub async fn outbound_links(&self) -> ConnectResult<Vec<OutboundLink>> {
        let did = self.require_did().await?;
        Ok(self.load(&did).await?.outbound_link)
    }

    /// Record a follow. An existing (target, namespace) link only has its
    /// `createdAt` refreshed.
    pub async fn connect(&self, target: &str, namespace: &str, alias: &str) -> ConnectResult<()> {
        let did = self.require_did().await?;
        let _guard = self.write_lock.lock().await;

        let mut document = self.load(&did).await?;
        let now = Utc::now().timestamp_millis().to_string();

        match document.position(target, namespace) {
            Some(index) => document.outbound_link[index].created_at = now,
            None => document.outbound_link.push(OutboundLink {
                target: target.to_string(),
                connection_type: FOLLOW_CONNECTION_TYPE.to_string(),
                namespace: namespace.to_string(),
                alias: alias.to_string(),
                created_at: now,
            }),
        }

        self.documents
            .set(&did, FOLLOW_DOCUMENT_KEY, &document)
            .await?;
        debug!(target = %target, namespace = %namespace, "Mirrored follow");
        Ok(())
    }

    /// Remove the (target, namespace) link if present.
    pub async fn disconnect(&self, target: &str, namespace: &str) -> ConnectResult<()> {
        let did = self.require_did().await?;
        let _guard = self.write_lock.lock().await;

        let mut document = self.load(&did).await?;
        document
            .outbound_link
            .retain(|link| !(link.target == target && link.namespace == namespace));

        self.documents
            .set(&did, FOLLOW_DOCUMENT_KEY, &document)
            .await?;
        debug!(target = %target, namespace = %namespace, "Mirrored unfollow");
        Ok(())
    }

    /// Update the alias of an existing link.
    pub async fn set_alias(&self, target: &str, namespace: &str, alias: &str) -> ConnectResult<()> {
        let did = self.require_did().await?;
        let _guard = self.write_lock.lock().await;

        let mut document = self.load(&did).await?;
        let index = document
            .position(target, namespace)
            .ok_or(MirrorError::TargetNotFound)?;
        document.outbound_link[index].alias = alias.to_string();

        self.documents
            .set(&did, FOLLOW_DOCUMENT_KEY, &document)
            .await?;
        debug!(target = %target, namespace = %namespace, "Mirrored alias");
        Ok(())
    }
}
