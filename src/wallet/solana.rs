// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana wallet capability.

use async_trait::async_trait;

use super::WalletError;

/// Signer shape exposed by Solana wallets (Phantom-style adapters).
#[async_trait]
pub trait SolanaSigner: Send + Sync {
    /// Raw 32-byte ed25519 public key. [`WalletError::NotConnected`] when
    /// the wallet has not been connected yet.
    async fn public_key(&self) -> Result<Vec<u8>, WalletError>;

    /// Raw 64-byte ed25519 signature over `message`.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, WalletError>;
}

pub(crate) fn encode_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}
