// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum wallet capability and a local PEM-backed signer.
//!
//! Browser wallets implement [`EthereumSigner`] through their own bridge.
//! [`LocalEthereumSigner`] covers headless use: it loads a secp256k1 key
//! from PEM (SEC1 or PKCS#8) and signs with EIP-191 `personal_sign`.

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use k256::SecretKey;

use super::WalletError;

/// Signer shape exposed by Ethereum wallets.
#[async_trait]
pub trait EthereumSigner: Send + Sync {
    /// Checksummed 0x address of the signer.
    async fn address(&self) -> Result<String, WalletError>;

    /// EIP-191 personal signature over `message`, 0x-prefixed hex.
    async fn sign_message(&self, message: &str) -> Result<String, WalletError>;
}

/// Ethereum signer holding its private key in process.
#[derive(Debug, Clone)]
pub struct LocalEthereumSigner {
    signer: PrivateKeySigner,
}

impl LocalEthereumSigner {
    /// Create a signer from PEM-encoded private key bytes.
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, WalletError> {
        let secret_key = parse_pem_secret_key(pem_bytes)?;
        Self::from_slice(&secret_key.to_bytes())
    }

    /// Create a signer from a raw 32-byte private key.
    pub fn from_slice(key_bytes: &[u8]) -> Result<Self, WalletError> {
        let signer = PrivateKeySigner::from_slice(key_bytes)
            .map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        Ok(Self { signer })
    }
}

#[async_trait]
impl EthereumSigner for LocalEthereumSigner {
    async fn address(&self) -> Result<String, WalletError> {
        Ok(self.signer.address().to_string())
    }

    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| WalletError::Provider(e.to_string()))?;
        Ok(alloy::hex::encode_prefixed(signature.as_bytes()))
    }
}

/// Parse a PEM private key, accepting SEC1 (`EC PRIVATE KEY`) and PKCS#8.
fn parse_pem_secret_key(pem_bytes: &[u8]) -> Result<SecretKey, WalletError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| WalletError::InvalidKey(format!("Invalid UTF-8: {e}")))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| WalletError::InvalidKey(format!("Invalid PEM: {e}")))?;

    SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| {
            use k256::pkcs8::DecodePrivateKey;
            SecretKey::from_pkcs8_der(pem.contents())
        })
        .map_err(|e| WalletError::InvalidKey(format!("Invalid key format: {e}")))
}
