// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::keys::store::{KeyStore, KeyStoreResult, MemoryKeyStore};
use crate::mirror::{DocumentStore, FollowDocument, IdentityProvider, MirrorError};
use crate::operation::OperationName;
use crate::transport::{
    MutationParams, MutationResult, MutationTransport, RegisterKeyParams, TransportError,
};
use crate::wallet::{EthereumSigner, SolanaSigner, WalletError};

// =============================================================================
// Key store
// =============================================================================

/// Memory key store that counts writes.
#[derive(Debug, Default)]
pub struct CountingKeyStore {
    inner: MemoryKeyStore,
    puts: AtomicUsize,
}

impl CountingKeyStore {
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyStore for CountingKeyStore {
    async fn get(&self, entry: &str) -> KeyStoreResult<Option<Vec<u8>>> {
        self.inner.get(entry).await
    }

    async fn put(&self, entry: &str, data: &[u8]) -> KeyStoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(entry, data).await
    }

    async fn clear(&self, entry: &str) -> KeyStoreResult<()> {
        self.inner.clear(entry).await
    }
}

/// Memory key store that, once armed, deletes the entry right after the next
/// read that finds it.
#[derive(Debug, Default)]
pub struct VanishingKeyStore {
    inner: CountingKeyStore,
    armed: AtomicBool,
}

impl VanishingKeyStore {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn puts(&self) -> usize {
        self.inner.puts()
    }
}

#[async_trait]
impl KeyStore for VanishingKeyStore {
    async fn get(&self, entry: &str) -> KeyStoreResult<Option<Vec<u8>>> {
        let data = self.inner.get(entry).await?;
        if data.is_some() && self.armed.swap(false, Ordering::SeqCst) {
            self.inner.clear(entry).await?;
        }
        Ok(data)
    }

    async fn put(&self, entry: &str, data: &[u8]) -> KeyStoreResult<()> {
        self.inner.put(entry, data).await
    }

    async fn clear(&self, entry: &str) -> KeyStoreResult<()> {
        self.inner.clear(entry).await
    }
}

/// Key store whose every call fails with an I/O error.
#[derive(Debug, Default)]
pub struct FailingKeyStore;

#[async_trait]
impl KeyStore for FailingKeyStore {
    async fn get(&self, _entry: &str) -> KeyStoreResult<Option<Vec<u8>>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "keychain locked").into())
    }

    async fn put(&self, _entry: &str, _data: &[u8]) -> KeyStoreResult<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "keychain locked").into())
    }

    async fn clear(&self, _entry: &str) -> KeyStoreResult<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "keychain locked").into())
    }
}

// =============================================================================
// Wallets
// =============================================================================

#[derive(Debug)]
struct EthereumWalletState {
    address: Mutex<String>,
    rejecting: AtomicBool,
    prompts: AtomicUsize,
}

/// Scriptable Ethereum wallet. Clones share state.
#[derive(Debug, Clone)]
pub struct FakeEthereumWallet {
    state: Arc<EthereumWalletState>,
}

impl FakeEthereumWallet {
    pub fn new(address: &str) -> Self {
        Self {
            state: Arc::new(EthereumWalletState {
                address: Mutex::new(address.to_string()),
                rejecting: AtomicBool::new(false),
                prompts: AtomicUsize::new(0),
            }),
        }
    }

    pub fn rejecting(self) -> Self {
        self.set_rejecting(true);
        self
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.state.rejecting.store(rejecting, Ordering::SeqCst);
    }

    pub fn set_address(&self, address: &str) {
        *self.state.address.lock().unwrap() = address.to_string();
    }

    /// Number of signature prompts answered (accepted or rejected).
    pub fn prompts(&self) -> usize {
        self.state.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EthereumSigner for FakeEthereumWallet {
    async fn address(&self) -> Result<String, WalletError> {
        Ok(self.state.address.lock().unwrap().clone())
    }

    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        self.state.prompts.fetch_add(1, Ordering::SeqCst);
        if self.state.rejecting.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected);
        }
        Ok(alloy::hex::encode_prefixed(Sha256::digest(message.as_bytes())))
    }
}

/// Solana wallet with a fixed public key and 64-byte fake signatures.
#[derive(Debug, Clone)]
pub struct FakeSolanaWallet {
    public_key: [u8; 32],
}

impl FakeSolanaWallet {
    pub fn new(public_key: [u8; 32]) -> Self {
        Self { public_key }
    }
}

#[async_trait]
impl SolanaSigner for FakeSolanaWallet {
    async fn public_key(&self) -> Result<Vec<u8>, WalletError> {
        Ok(self.public_key.to_vec())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, WalletError> {
        let digest = Sha256::digest(message);
        Ok([digest.as_slice(), digest.as_slice()].concat())
    }
}

// =============================================================================
// Transport
// =============================================================================

type Scripted = Result<MutationResult, String>;

/// Records calls and answers from a script, `SUCCESS` once the script runs
/// out.
#[derive(Debug, Default)]
pub struct FakeTransport {
    mutations: Mutex<Vec<(OperationName, MutationParams)>>,
    registrations: Mutex<Vec<RegisterKeyParams>>,
    mutation_script: Mutex<VecDeque<Scripted>>,
    registration_script: Mutex<VecDeque<Scripted>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_mutation_result(&self, result: MutationResult) {
        self.mutation_script.lock().unwrap().push_back(Ok(result));
    }

    pub fn push_mutation_error(&self, message: &str) {
        self.mutation_script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn push_registration_result(&self, result: MutationResult) {
        self.registration_script.lock().unwrap().push_back(Ok(result));
    }

    pub fn push_registration_error(&self, message: &str) {
        self.registration_script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn mutations(&self) -> Vec<(OperationName, MutationParams)> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> Vec<RegisterKeyParams> {
        self.registrations.lock().unwrap().clone()
    }

    fn next(script: &Mutex<VecDeque<Scripted>>) -> Result<MutationResult, TransportError> {
        match script.lock().unwrap().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(TransportError::Request(message)),
            None => Ok(MutationResult::Success),
        }
    }
}

#[async_trait]
impl MutationTransport for FakeTransport {
    async fn mutate(
        &self,
        operation: OperationName,
        params: &MutationParams,
    ) -> Result<MutationResult, TransportError> {
        self.mutations
            .lock()
            .unwrap()
            .push((operation, params.clone()));
        Self::next(&self.mutation_script)
    }

    async fn register_signing_key(
        &self,
        params: &RegisterKeyParams,
    ) -> Result<MutationResult, TransportError> {
        self.registrations.lock().unwrap().push(params.clone());
        Self::next(&self.registration_script)
    }
}

// =============================================================================
// Mirror
// =============================================================================

/// Identity provider answering `did:test:<account id>`.
#[derive(Debug, Default)]
pub struct FakeIdentityProvider {
    accounts: Mutex<Vec<String>>,
}

impl FakeIdentityProvider {
    pub fn accounts(&self) -> Vec<String> {
        self.accounts.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn authenticate(
        &self,
        account_id: &str,
        _auth_secret: &[u8; 32],
    ) -> Result<String, MirrorError> {
        self.accounts.lock().unwrap().push(account_id.to_string());
        Ok(format!("did:test:{account_id}"))
    }
}

/// Document store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingDocumentStore;

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn get(&self, _did: &str, _key: &str) -> Result<Option<FollowDocument>, MirrorError> {
        Err(MirrorError::Store("node unreachable".into()))
    }

    async fn set(
        &self,
        _did: &str,
        _key: &str,
        _document: &FollowDocument,
    ) -> Result<(), MirrorError> {
        Err(MirrorError::Store("node unreachable".into()))
    }
}
