// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Graph mutation client.
//!
//! Every mutation follows the same path:
//!
//! 1. resolve the wallet address (cached until [`GraphClient::logout`])
//! 2. make sure the device signing key is registered
//! 3. build and sign the operation
//! 4. submit it to the backend
//! 5. on `SUCCESS`, mirror the change when a mirror store is configured
//!
//! An `INVALID_SIGNATURE` answer invalidates the session and resolves with
//! [`MutationOutcome::SessionExpired`]; the caller may simply retry.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ConnectError, ConnectResult};
use crate::keys::{KeyStore, MemoryKeyStore, SigningKeyManager};
use crate::mirror::{MirrorStore, OutboundLink};
use crate::operation::{OperationName, OperationSigner};
use crate::session::{AuthorizationSession, MemorySessionCache, SessionCache, SessionState};
use crate::transport::{GraphqlTransport, MutationParams, MutationResult, MutationTransport};
use crate::wallet::WalletProvider;

/// How a mutation call ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Backend accepted the operation.
    Applied,
    /// Backend no longer trusts the signing key. The session was reset and
    /// the next call registers again.
    SessionExpired,
}

/// Builder for [`GraphClient`].
pub struct GraphClientBuilder {
    config: ClientConfig,
    wallet: Option<WalletProvider>,
    transport: Option<Arc<dyn MutationTransport>>,
    key_store: Option<Arc<dyn KeyStore>>,
    session_cache: Option<Arc<dyn SessionCache>>,
    mirror: Option<Arc<MirrorStore>>,
}

impl GraphClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            wallet: None,
            transport: None,
            key_store: None,
            session_cache: None,
            mirror: None,
        }
    }

    pub fn wallet(mut self, wallet: WalletProvider) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Defaults to [`GraphqlTransport`].
    pub fn transport(mut self, transport: Arc<dyn MutationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Defaults to an in-memory store (a new key per process).
    pub fn key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    pub fn session_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.session_cache = Some(cache);
        self
    }

    /// Mirror successful mutations into a document store.
    pub fn mirror(mut self, mirror: MirrorStore) -> Self {
        self.mirror = Some(Arc::new(mirror));
        self
    }

    /// Validate and assemble the client. Performs no network calls.
    pub async fn build(self) -> ConnectResult<GraphClient> {
        let wallet = self.wallet.ok_or(ConnectError::EmptyWalletProvider)?;
        if wallet.chain() != self.config.chain() {
            return Err(ConnectError::UnsupportedChain {
                configured: self.config.chain(),
                provided: wallet.chain(),
            });
        }

        let transport: Arc<dyn MutationTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(GraphqlTransport::new()?),
        };
        let key_store = self.key_store.unwrap_or_else(|| {
            debug!("No key store configured, signing key will not persist");
            Arc::new(MemoryKeyStore::new())
        });
        let cache = self
            .session_cache
            .unwrap_or_else(|| Arc::new(MemorySessionCache::new()));
        cache.init().await;

        let keys = Arc::new(SigningKeyManager::new(key_store));
        let session = AuthorizationSession::new(
            keys.clone(),
            transport.clone(),
            cache,
            self.config.endpoint().graph_api_url,
        );

        info!(
            namespace = %self.config.namespace(),
            env = %self.config.endpoint().name,
            chain = %self.config.chain(),
            mirror = self.mirror.is_some(),
            "Graph client ready"
        );

        Ok(GraphClient {
            signer: OperationSigner::new(keys.clone()),
            config: self.config,
            wallet,
            keys,
            session,
            transport,
            mirror: self.mirror,
            address: RwLock::new(None),
        })
    }
}

/// Signs and submits social graph mutations for one wallet account.
pub struct GraphClient {
    config: ClientConfig,
    wallet: WalletProvider,
    keys: Arc<SigningKeyManager>,
    signer: OperationSigner,
    session: AuthorizationSession,
    transport: Arc<dyn MutationTransport>,
    mirror: Option<Arc<MirrorStore>>,
    address: RwLock<Option<String>>,
}

impl GraphClient {
    pub fn builder(config: ClientConfig) -> GraphClientBuilder {
        GraphClientBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.state().await
    }

    /// Wallet address, asked from the wallet once and then cached.
    pub async fn address(&self) -> ConnectResult<String> {
        if let Some(address) = self.address.read().await.clone() {
            return Ok(address);
        }

        let address = self.wallet.address().await?;
        *self.address.write().await = Some(address.clone());
        Ok(address)
    }

    /// Register the signing key now instead of on the first mutation, and
    /// authenticate the mirror identity when a mirror is configured.
    pub async fn authenticate(&self) -> ConnectResult<()> {
        let address = self.address().await?;
        self.session.authorize(&self.wallet, &address).await?;

        if let Some(mirror) = &self.mirror {
            mirror
                .authenticate(&self.wallet, &address, self.config.chain_ref())
                .await?;
        }
        Ok(())
    }

    /// Follow `target`.
    pub async fn connect(&self, target: &str, alias: &str) -> ConnectResult<MutationOutcome> {
        self.mutate(OperationName::Follow, target, alias).await
    }

    /// Unfollow `target`.
    pub async fn disconnect(&self, target: &str) -> ConnectResult<MutationOutcome> {
        self.mutate(OperationName::Unfollow, target, "").await
    }

    /// Rename a followed `target`.
    pub async fn set_alias(&self, target: &str, alias: &str) -> ConnectResult<MutationOutcome> {
        self.mutate(OperationName::SetAlias, target, alias).await
    }

    async fn mutate(
        &self,
        name: OperationName,
        target: &str,
        alias: &str,
    ) -> ConnectResult<MutationOutcome> {
        let from = self.address().await?;
        self.session.authorize(&self.wallet, &from).await?;

        let operation = self.signer.build_operation(
            name,
            &from,
            target,
            self.config.namespace(),
            self.config.chain(),
            alias,
        );
        let signed = self.signer.sign(&operation).await?;

        let params = MutationParams {
            from_addr: from,
            to_addr: target.to_string(),
            alias: alias.to_string(),
            namespace: self.config.namespace().to_string(),
            signature: signed.signature,
            signing_key: signed.signing_key,
            operation: signed.payload,
            network: self.config.chain(),
            url: self.config.endpoint().graph_api_url.to_string(),
        };

        match self.transport.mutate(name, &params).await? {
            MutationResult::Success => {
                info!(operation = %name, target = %target, "Graph mutation applied");
                self.mirror_mutation(name, &params.from_addr, target, alias)
                    .await;
                Ok(MutationOutcome::Applied)
            }
            MutationResult::InvalidSignature => {
                warn!(
                    operation = %name,
                    target = %target,
                    "Signing key rejected by backend, session reset"
                );
                self.session.invalidate().await;
                Ok(MutationOutcome::SessionExpired)
            }
            MutationResult::Other(reason) => {
                warn!(operation = %name, target = %target, reason = %reason, "Graph mutation rejected");
                Err(ConnectError::MutationRejected(reason))
            }
        }
    }

    /// Replay a successful mutation into the mirror. Failures are logged.
    async fn mirror_mutation(&self, name: OperationName, from: &str, target: &str, alias: &str) {
        let Some(mirror) = &self.mirror else {
            return;
        };

        if let Err(e) = self.apply_to_mirror(mirror, name, from, target, alias).await {
            warn!(
                operation = %name,
                target = %target,
                error = %e,
                "Mirror update failed"
            );
        }
    }

    async fn apply_to_mirror(
        &self,
        mirror: &MirrorStore,
        name: OperationName,
        from: &str,
        target: &str,
        alias: &str,
    ) -> ConnectResult<()> {
        mirror
            .authenticate(&self.wallet, from, self.config.chain_ref())
            .await?;

        let namespace = self.config.namespace();
        match name {
            OperationName::Follow => mirror.connect(target, namespace, alias).await,
            OperationName::Unfollow => mirror.disconnect(target, namespace).await,
            OperationName::SetAlias => mirror.set_alias(target, namespace, alias).await,
        }
    }

    /// Follow list as recorded in the mirror store.
    pub async fn mirrored_followings(&self) -> ConnectResult<Vec<OutboundLink>> {
        let mirror = self
            .mirror
            .as_ref()
            .ok_or_else(|| ConnectError::Config("No mirror store configured".to_string()))?;
        mirror.outbound_links().await
    }

    /// End the session and forget the cached wallet address. The device
    /// signing key is kept.
    pub async fn logout(&self) {
        self.session.teardown().await;
        *self.address.write().await = None;
        if let Some(mirror) = &self.mirror {
            mirror.reset().await;
        }
        info!("Logged out");
    }

    /// Log out and delete the device signing key.
    pub async fn reset_device(&self) -> ConnectResult<()> {
        self.logout().await;
        self.keys.clear().await
    }
}
