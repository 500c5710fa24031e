// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device signing key lifecycle.
//!
//! The key pair is secp256k1 ECDSA, stored as PKCS#8 PEM in the injected
//! [`KeyStore`]. The public key is advertised as base64 of the SEC1
//! uncompressed point; signatures are base64 of the 64-byte `r || s` form.
//!
//! Creating a key ([`SigningKeyManager::get_public_key`]) and using it
//! ([`SigningKeyManager::sign_with_signing_key`]) are separate so that
//! signing fails closed instead of minting an unregistered key.

use std::sync::Arc;

use base64ct::{Base64, Encoding};
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::rand_core::OsRng;
use k256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::store::{KeyStore, KeyStoreResult};
use crate::error::{ConnectError, ConnectResult};

/// Key store entry holding the device signing key.
pub const SIGNING_KEY_ENTRY: &str = "signing_key";

/// Owns the device-local signing key pair.
pub struct SigningKeyManager {
    store: Arc<dyn KeyStore>,
    /// Held across check-then-generate so racing callers share one key.
    generation: Mutex<()>,
}

impl SigningKeyManager {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            generation: Mutex::new(()),
        }
    }

    /// Load the stored key. Unparseable contents count as no key.
    async fn load(&self) -> KeyStoreResult<Option<SigningKey>> {
        let Some(bytes) = self.store.get(SIGNING_KEY_ENTRY).await? else {
            return Ok(None);
        };

        match decode_signing_key(&bytes) {
            Ok(key) => Ok(Some(key)),
            Err(e) => {
                warn!(error = %e, "Stored signing key is unreadable, ignoring it");
                Ok(None)
            }
        }
    }

    /// True iff a key pair exists and is readable from the store.
    pub async fn has_signing_key(&self) -> bool {
        match self.load().await {
            Ok(key) => key.is_some(),
            Err(e) => {
                warn!(error = %e, "Failed to read signing key from key store");
                false
            }
        }
    }

    /// Return the public key, generating and persisting a key pair first if
    /// none exists.
    pub async fn get_public_key(&self) -> ConnectResult<String> {
        if let Some(key) = self.load().await? {
            return Ok(encode_public_key(key.verifying_key()));
        }

        let _guard = self.generation.lock().await;

        // Another caller may have generated while we waited
        if let Some(key) = self.load().await? {
            return Ok(encode_public_key(key.verifying_key()));
        }

        let key = SigningKey::random(&mut OsRng);
        let pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| ConnectError::KeyStore(format!("Failed to encode signing key: {e}")))?;
        self.store.put(SIGNING_KEY_ENTRY, pem.as_bytes()).await?;

        let public_key = encode_public_key(key.verifying_key());
        info!(signing_key = %public_key, "Generated device signing key");
        Ok(public_key)
    }

    /// Sign `message` with the device key.
    ///
    /// Fails with [`ConnectError::KeyUnavailable`] when no key exists; never
    /// generates one.
    pub async fn sign_with_signing_key(&self, message: &[u8]) -> ConnectResult<String> {
        let (signature, _) = self.sign_with_public_key(message).await?;
        Ok(signature)
    }

    /// Sign `message` and return `(signature, public_key)` taken from a
    /// single load of the device key.
    ///
    /// Fails with [`ConnectError::KeyUnavailable`] when no key exists; never
    /// generates one.
    pub async fn sign_with_public_key(&self, message: &[u8]) -> ConnectResult<(String, String)> {
        let key = self.load().await?.ok_or(ConnectError::KeyUnavailable)?;
        let signature: Signature = key.sign(message);
        Ok((
            Base64::encode_string(&signature.to_bytes()),
            encode_public_key(key.verifying_key()),
        ))
    }

    /// Remove the device key. The next `get_public_key` generates a new one.
    pub async fn clear(&self) -> ConnectResult<()> {
        let _guard = self.generation.lock().await;
        self.store.clear(SIGNING_KEY_ENTRY).await?;
        info!("Cleared device signing key");
        Ok(())
    }
}

fn decode_signing_key(bytes: &[u8]) -> Result<SigningKey, String> {
    let pem = std::str::from_utf8(bytes).map_err(|e| format!("Invalid UTF-8: {e}"))?;
    SigningKey::from_pkcs8_pem(pem).map_err(|e| format!("Invalid PKCS#8 key: {e}"))
}

fn encode_public_key(key: &VerifyingKey) -> String {
    Base64::encode_string(key.to_encoded_point(false).as_bytes())
}

/// Check a signature produced by [`SigningKeyManager::sign_with_signing_key`].
///
/// Returns `false` for malformed keys or signatures as well as mismatches.
pub fn verify_signature(public_key: &str, message: &[u8], signature: &str) -> bool {
    let Ok(key_bytes) = Base64::decode_vec(public_key) else {
        return false;
    };
    let Ok(sig_bytes) = Base64::decode_vec(signature) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_sec1_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}
