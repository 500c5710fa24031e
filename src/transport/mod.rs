// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Backend transport boundary.
//!
//! The graph backend exposes three mutations (follow, unfollow, setAlias)
//! and a signing key registration call. Each returns a result discriminant:
//! `SUCCESS`, `INVALID_SIGNATURE`, or any other string naming the failure.

pub mod graphql;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Chain;
use crate::error::ConnectError;
use crate::operation::OperationName;

pub use graphql::GraphqlTransport;

/// Result discriminant returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationResult {
    Success,
    InvalidSignature,
    Other(String),
}

impl MutationResult {
    pub fn from_discriminant(raw: &str) -> Self {
        match raw {
            "SUCCESS" => MutationResult::Success,
            "INVALID_SIGNATURE" => MutationResult::InvalidSignature,
            other => MutationResult::Other(other.to_string()),
        }
    }
}

/// Variables for a follow / unfollow / setAlias mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationParams {
    pub from_addr: String,
    pub to_addr: String,
    pub alias: String,
    pub namespace: String,
    pub signature: String,
    pub signing_key: String,
    /// Serialized operation exactly as signed
    pub operation: String,
    pub network: Chain,
    #[serde(skip)]
    pub url: String,
}

/// Variables for signing key registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterKeyParams {
    pub address: String,
    /// Wallet signature over `message`
    pub signature: String,
    /// Acknowledgement text embedding the signing public key
    pub message: String,
    pub network: Chain,
    #[serde(skip)]
    pub url: String,
}

/// Transport failures, distinct from application-level rejections.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<TransportError> for ConnectError {
    fn from(e: TransportError) -> Self {
        ConnectError::Transport(e.to_string())
    }
}

/// Backend calls used by the client.
#[async_trait]
pub trait MutationTransport: Send + Sync {
    /// Submit a signed graph mutation.
    async fn mutate(
        &self,
        operation: OperationName,
        params: &MutationParams,
    ) -> Result<MutationResult, TransportError>;

    /// Associate the signing key embedded in `params.message` with the
    /// wallet address.
    async fn register_signing_key(
        &self,
        params: &RegisterKeyParams,
    ) -> Result<MutationResult, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_parse() {
        assert_eq!(
            MutationResult::from_discriminant("SUCCESS"),
            MutationResult::Success
        );
        assert_eq!(
            MutationResult::from_discriminant("INVALID_SIGNATURE"),
            MutationResult::InvalidSignature
        );
        assert_eq!(
            MutationResult::from_discriminant("ALREADY_DONE"),
            MutationResult::Other("ALREADY_DONE".into())
        );
    }

    #[test]
    fn mutation_variables_are_camel_case_without_url() {
        let params = MutationParams {
            from_addr: "0xabc".into(),
            to_addr: "0xdef".into(),
            alias: "".into(),
            namespace: "app1".into(),
            signature: "sig".into(),
            signing_key: "key".into(),
            operation: "{}".into(),
            network: Chain::Eth,
            url: "https://example.com/graphql".into(),
        };

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["fromAddr"], "0xabc");
        assert_eq!(value["toAddr"], "0xdef");
        assert_eq!(value["signingKey"], "key");
        assert_eq!(value["network"], "ETH");
        assert!(value.get("url").is_none());
    }

    #[test]
    fn transport_error_maps_to_connect_error() {
        let err: ConnectError = TransportError::Request("timeout".into()).into();
        assert_eq!(err, ConnectError::Transport("request failed: timeout".into()));
    }
}
