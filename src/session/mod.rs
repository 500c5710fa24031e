// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing key registration session.
//!
//! ```text
//! Unauthenticated ──get_public_key──▶ KeyReady ──wallet signs──▶ Registering
//!        ▲                               ▲                          │
//!        │ invalidate / teardown         └──────── failure ─────────┤
//!        │                                                          ▼ SUCCESS
//!        └─────────────────────────────────────────────────── Authorized
//! ```
//!
//! The wallet signs an acknowledgement embedding the device public key; the
//! backend then trusts that key for the wallet address. When the backend
//! later answers `INVALID_SIGNATURE`, the session is invalidated and the next
//! mutation registers again.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::Chain;
use crate::error::{ConnectError, ConnectResult};
use crate::keys::SigningKeyManager;
use crate::transport::{MutationResult, MutationTransport, RegisterKeyParams};
use crate::wallet::WalletProvider;

/// Prefix of the message the wallet signs to register a signing key.
pub const AUTHORIZE_MESSAGE_PREFIX: &str =
    "I authorize CyberConnect from this device using signing key:\n";

/// Acknowledgement text for `public_key`.
pub fn authorization_message(public_key: &str) -> String {
    format!("{AUTHORIZE_MESSAGE_PREFIX}{public_key}")
}

/// Registration recorded after the backend accepted a signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub address: String,
    pub chain: Chain,
    pub signing_key: String,
    pub authorized_at: DateTime<Utc>,
}

/// Host-provided cache for the current registration.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Prepare the cache for use. Called once when the client is built.
    async fn init(&self);

    async fn record(&self, record: SessionRecord);

    async fn current(&self) -> Option<SessionRecord>;

    /// Drop the current record; the cache stays usable.
    async fn clear(&self);

    /// Drop the current record and release the cache (logout).
    async fn teardown(&self);
}

/// In-process [`SessionCache`].
#[derive(Debug, Default)]
pub struct MemorySessionCache {
    record: RwLock<Option<SessionRecord>>,
    active: RwLock<bool>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_active(&self) -> bool {
        *self.active.read().await
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn init(&self) {
        *self.active.write().await = true;
    }

    async fn record(&self, record: SessionRecord) {
        *self.record.write().await = Some(record);
    }

    async fn current(&self) -> Option<SessionRecord> {
        self.record.read().await.clone()
    }

    async fn clear(&self) {
        *self.record.write().await = None;
    }

    async fn teardown(&self) {
        *self.record.write().await = None;
        *self.active.write().await = false;
    }
}

/// Registration state of the device signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    KeyReady,
    Registering,
    Authorized { address: String, chain: Chain },
}

/// Drives signing key registration for one wallet account.
pub struct AuthorizationSession {
    keys: Arc<SigningKeyManager>,
    transport: Arc<dyn MutationTransport>,
    cache: Arc<dyn SessionCache>,
    url: String,
    state: RwLock<SessionState>,
    /// Serializes registration so the wallet is prompted once
    flow: Mutex<()>,
}

impl AuthorizationSession {
    pub fn new(
        keys: Arc<SigningKeyManager>,
        transport: Arc<dyn MutationTransport>,
        cache: Arc<dyn SessionCache>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            transport,
            cache,
            url: url.into(),
            state: RwLock::new(SessionState::Unauthenticated),
            flow: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    async fn set_state(&self, state: SessionState) {
        *self.state.write().await = state;
    }

    /// Ensure the device key is registered for `address` on the wallet's
    /// chain. No-op when already authorized for the same account.
    ///
    /// On failure the session is left in [`SessionState::KeyReady`] (or
    /// `Unauthenticated` if no key could be created) and the error is
    /// returned as is; nothing is retried.
    pub async fn authorize(&self, wallet: &WalletProvider, address: &str) -> ConnectResult<()> {
        let _flow = self.flow.lock().await;

        if let SessionState::Authorized {
            address: current,
            chain,
        } = &*self.state.read().await
        {
            if current == address && *chain == wallet.chain() {
                return Ok(());
            }
        }

        self.set_state(SessionState::Unauthenticated).await;

        let result = self.register(wallet, address).await;
        if let Err(e) = &result {
            let mut state = self.state.write().await;
            if *state != SessionState::Unauthenticated {
                *state = SessionState::KeyReady;
            }
            warn!(address = %address, error = %e, "Signing key registration failed");
        }
        result
    }

    async fn register(&self, wallet: &WalletProvider, address: &str) -> ConnectResult<()> {
        let public_key = self.keys.get_public_key().await?;
        self.set_state(SessionState::KeyReady).await;

        let chain = wallet.chain();
        let actual = wallet.address().await?;
        if !same_address(chain, &actual, address) {
            return Err(ConnectError::AddressMismatch {
                expected: address.to_string(),
                actual,
            });
        }

        let message = authorization_message(&public_key);
        let signature = wallet.sign_message(&message).await?;
        self.set_state(SessionState::Registering).await;
        debug!(address = %address, chain = %chain, "Registering signing key");

        let params = RegisterKeyParams {
            address: address.to_string(),
            signature,
            message,
            network: chain,
            url: self.url.clone(),
        };

        match self.transport.register_signing_key(&params).await? {
            MutationResult::Success => {
                self.cache
                    .record(SessionRecord {
                        address: address.to_string(),
                        chain,
                        signing_key: public_key,
                        authorized_at: Utc::now(),
                    })
                    .await;
                self.set_state(SessionState::Authorized {
                    address: address.to_string(),
                    chain,
                })
                .await;
                info!(address = %address, chain = %chain, "Signing key registered");
                Ok(())
            }
            MutationResult::InvalidSignature => Err(ConnectError::RegistrationRejected(
                "INVALID_SIGNATURE".to_string(),
            )),
            MutationResult::Other(reason) => Err(ConnectError::RegistrationRejected(reason)),
        }
    }

    /// Forget the registration after the backend rejected a signature. The
    /// device key is kept; the next `authorize` registers it again.
    pub async fn invalidate(&self) {
        let _flow = self.flow.lock().await;
        self.set_state(SessionState::Unauthenticated).await;
        self.cache.clear().await;
        info!("Session invalidated");
    }

    /// Explicit logout.
    pub async fn teardown(&self) {
        let _flow = self.flow.lock().await;
        self.set_state(SessionState::Unauthenticated).await;
        self.cache.teardown().await;
    }
}

/// Ethereum addresses compare case-insensitively (checksum casing).
fn same_address(chain: Chain, a: &str, b: &str) -> bool {
    match chain {
        Chain::Eth => a.eq_ignore_ascii_case(b),
        Chain::Solana => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::MemoryKeyStore;
    use crate::testing::{FailingKeyStore, FakeEthereumWallet, FakeTransport};

    const URL: &str = "https://graph.test/connect/";

    struct Harness {
        session: Arc<AuthorizationSession>,
        keys: Arc<SigningKeyManager>,
        transport: Arc<FakeTransport>,
        cache: Arc<MemorySessionCache>,
        wallet_impl: FakeEthereumWallet,
        wallet: WalletProvider,
    }

    fn harness() -> Harness {
        let keys = Arc::new(SigningKeyManager::new(Arc::new(MemoryKeyStore::new())));
        let transport = Arc::new(FakeTransport::new());
        let cache = Arc::new(MemorySessionCache::new());
        let session = Arc::new(AuthorizationSession::new(
            keys.clone(),
            transport.clone(),
            cache.clone(),
            URL,
        ));
        let wallet_impl = FakeEthereumWallet::new("0xabc");
        let wallet = WalletProvider::ethereum(wallet_impl.clone());

        Harness {
            session,
            keys,
            transport,
            cache,
            wallet_impl,
            wallet,
        }
    }

    #[tokio::test]
    async fn starts_unauthenticated() {
        let h = harness();
        assert_eq!(h.session.state().await, SessionState::Unauthenticated);
        assert!(!h.keys.has_signing_key().await);
    }

    #[tokio::test]
    async fn successful_registration_authorizes() {
        let h = harness();
        h.session.authorize(&h.wallet, "0xabc").await.unwrap();

        assert_eq!(
            h.session.state().await,
            SessionState::Authorized {
                address: "0xabc".into(),
                chain: Chain::Eth
            }
        );

        let registrations = h.transport.registrations();
        assert_eq!(registrations.len(), 1);
        let public_key = h.keys.get_public_key().await.unwrap();
        assert_eq!(registrations[0].message, authorization_message(&public_key));
        assert_eq!(registrations[0].address, "0xabc");
        assert_eq!(registrations[0].network, Chain::Eth);
        assert_eq!(registrations[0].url, URL);

        let record = h.cache.current().await.unwrap();
        assert_eq!(record.signing_key, public_key);
    }

    #[tokio::test]
    async fn authorized_session_does_not_prompt_again() {
        let h = harness();
        h.session.authorize(&h.wallet, "0xabc").await.unwrap();
        h.session.authorize(&h.wallet, "0xabc").await.unwrap();

        assert_eq!(h.wallet_impl.prompts(), 1);
        assert_eq!(h.transport.registrations().len(), 1);
    }

    #[tokio::test]
    async fn checksum_casing_is_not_a_mismatch() {
        let h = harness();
        h.session.authorize(&h.wallet, "0xABC").await.unwrap();
    }

    #[tokio::test]
    async fn wallet_rejection_leaves_key_ready() {
        let h = harness();
        h.wallet_impl.set_rejecting(true);

        let err = h.session.authorize(&h.wallet, "0xabc").await.unwrap_err();
        assert_eq!(
            err,
            ConnectError::WalletAuth("User rejected the signature request".into())
        );
        assert_eq!(h.session.state().await, SessionState::KeyReady);
        assert!(h.transport.registrations().is_empty());
        assert!(h.cache.current().await.is_none());
    }

    #[tokio::test]
    async fn refused_registration_is_typed() {
        let h = harness();
        h.transport
            .push_registration_result(MutationResult::Other("BANNED".into()));

        let err = h.session.authorize(&h.wallet, "0xabc").await.unwrap_err();
        assert_eq!(err, ConnectError::RegistrationRejected("BANNED".into()));
        assert_eq!(h.session.state().await, SessionState::KeyReady);
    }

    #[tokio::test]
    async fn transport_failure_is_typed() {
        let h = harness();
        h.transport.push_registration_error("connection reset");

        let err = h.session.authorize(&h.wallet, "0xabc").await.unwrap_err();
        assert!(matches!(err, ConnectError::Transport(msg) if msg.contains("connection reset")));
        assert_eq!(h.session.state().await, SessionState::KeyReady);
    }

    #[tokio::test]
    async fn switched_wallet_account_is_a_mismatch() {
        let h = harness();
        h.wallet_impl.set_address("0x999");

        let err = h.session.authorize(&h.wallet, "0xabc").await.unwrap_err();
        assert_eq!(
            err,
            ConnectError::AddressMismatch {
                expected: "0xabc".into(),
                actual: "0x999".into()
            }
        );
        assert_eq!(h.wallet_impl.prompts(), 0);
    }

    #[tokio::test]
    async fn invalidate_forces_reregistration_with_same_key() {
        let h = harness();
        h.session.authorize(&h.wallet, "0xabc").await.unwrap();
        let key = h.keys.get_public_key().await.unwrap();

        h.session.invalidate().await;
        assert_eq!(h.session.state().await, SessionState::Unauthenticated);
        assert!(h.cache.current().await.is_none());

        h.session.authorize(&h.wallet, "0xabc").await.unwrap();
        assert_eq!(h.transport.registrations().len(), 2);
        assert_eq!(h.keys.get_public_key().await.unwrap(), key);
    }

    #[tokio::test]
    async fn teardown_releases_cache() {
        let h = harness();
        h.cache.init().await;
        h.session.authorize(&h.wallet, "0xabc").await.unwrap();

        h.session.teardown().await;
        assert_eq!(h.session.state().await, SessionState::Unauthenticated);
        assert!(!h.cache.is_active().await);
        assert!(h.cache.current().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_authorize_prompts_once() {
        let h = harness();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = h.session.clone();
                let wallet = h.wallet.clone();
                tokio::spawn(async move { session.authorize(&wallet, "0xabc").await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(h.wallet_impl.prompts(), 1);
        assert_eq!(h.transport.registrations().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_key_store_leaves_session_unauthenticated() {
        let h = harness();
        let session = AuthorizationSession::new(
            Arc::new(SigningKeyManager::new(Arc::new(FailingKeyStore))),
            h.transport.clone(),
            h.cache.clone(),
            URL,
        );

        let result = session.authorize(&h.wallet, "0xabc").await;

        assert!(matches!(result, Err(ConnectError::KeyStore(_))));
        assert_eq!(session.state().await, SessionState::Unauthenticated);
        assert_eq!(h.wallet_impl.prompts(), 0);
        assert!(h.transport.registrations().is_empty());
    }
}
