// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client error taxonomy.
//!
//! Every public entry point resolves normally or fails with exactly one
//! [`ConnectError`] describing the first failure encountered. Mirror-store
//! failures during mutations are the one exception: they are logged, never
//! returned.

use crate::config::Chain;

/// Result type for client operations.
pub type ConnectResult<T> = Result<T, ConnectError>;

/// Errors surfaced by the graph client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("Namespace can not be empty")]
    EmptyNamespace,

    #[error("Wallet provider can not be empty")]
    EmptyWalletProvider,

    #[error("Could not find auth provider")]
    EmptyAuthProvider,

    #[error("No signing key exists on this device")]
    KeyUnavailable,

    #[error("Wallet authorization failed: {0}")]
    WalletAuth(String),

    #[error("Wallet address changed: expected {expected}, wallet reports {actual}")]
    AddressMismatch { expected: String, actual: String },

    #[error("Wallet for {provided} can not be used with a {configured} client")]
    UnsupportedChain { configured: Chain, provided: Chain },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Signing key registration rejected: {0}")]
    RegistrationRejected(String),

    #[error("Mutation rejected: {0}")]
    MutationRejected(String),

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Mirror store error: {0}")]
    Mirror(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConnectError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectError::EmptyNamespace => "empty_namespace",
            ConnectError::EmptyWalletProvider => "empty_wallet_provider",
            ConnectError::EmptyAuthProvider => "empty_auth_provider",
            ConnectError::KeyUnavailable => "key_unavailable",
            ConnectError::WalletAuth(_) => "wallet_auth_error",
            ConnectError::AddressMismatch { .. } => "address_mismatch",
            ConnectError::UnsupportedChain { .. } => "unsupported_chain",
            ConnectError::Transport(_) => "transport_error",
            ConnectError::RegistrationRejected(_) => "registration_rejected",
            ConnectError::MutationRejected(_) => "mutation_rejected",
            ConnectError::KeyStore(_) => "key_store_error",
            ConnectError::Serialization(_) => "serialization_error",
            ConnectError::Mirror(_) => "mirror_error",
            ConnectError::Config(_) => "config_error",
        }
    }

    /// Whether the error was raised before anything left the device.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ConnectError::EmptyNamespace
                | ConnectError::EmptyWalletProvider
                | ConnectError::UnsupportedChain { .. }
                | ConnectError::Config(_)
        )
    }
}
