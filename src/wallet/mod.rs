// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet capabilities.
//!
//! The host application supplies a wallet for one chain. Ethereum and
//! Solana signers expose different shapes (hex vs raw signatures, address
//! vs public key); [`WalletProvider`] normalizes both into `address()` and
//! `sign_message()` returning text.

pub mod ethereum;
pub mod solana;

use std::fmt;
use std::sync::Arc;

use crate::config::Chain;
use crate::error::{ConnectError, ConnectResult};

pub use ethereum::{EthereumSigner, LocalEthereumSigner};
pub use solana::SolanaSigner;

/// Errors reported by wallet signers.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("User rejected the signature request")]
    Rejected,

    #[error("Invalid wallet key: {0}")]
    InvalidKey(String),

    #[error("{0}")]
    Provider(String),
}

impl From<WalletError> for ConnectError {
    fn from(e: WalletError) -> Self {
        ConnectError::WalletAuth(e.to_string())
    }
}

/// A connected wallet for exactly one chain.
#[derive(Clone)]
pub enum WalletProvider {
    Ethereum(Arc<dyn EthereumSigner>),
    Solana(Arc<dyn SolanaSigner>),
}

impl WalletProvider {
    pub fn ethereum(signer: impl EthereumSigner + 'static) -> Self {
        WalletProvider::Ethereum(Arc::new(signer))
    }

    pub fn solana(signer: impl SolanaSigner + 'static) -> Self {
        WalletProvider::Solana(Arc::new(signer))
    }

    /// Chain this wallet signs for.
    pub fn chain(&self) -> Chain {
        match self {
            WalletProvider::Ethereum(_) => Chain::Eth,
            WalletProvider::Solana(_) => Chain::Solana,
        }
    }

    /// Account address: the signer address on Ethereum, the base58 public
    /// key on Solana.
    pub async fn address(&self) -> ConnectResult<String> {
        match self {
            WalletProvider::Ethereum(signer) => Ok(signer.address().await?),
            WalletProvider::Solana(signer) => {
                let public_key = signer.public_key().await?;
                Ok(solana::encode_base58(&public_key))
            }
        }
    }

    /// Ask the wallet to sign `message`.
    ///
    /// Ethereum signatures are returned as 0x-prefixed hex, Solana
    /// signatures as base58.
    pub async fn sign_message(&self, message: &str) -> ConnectResult<String> {
        match self {
            WalletProvider::Ethereum(signer) => Ok(signer.sign_message(message).await?),
            WalletProvider::Solana(signer) => {
                let signature = signer.sign_message(message.as_bytes()).await?;
                Ok(solana::encode_base58(&signature))
            }
        }
    }
}

impl fmt::Debug for WalletProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WalletProvider").field(&self.chain()).finish()
    }
}
