// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical graph operations and their signatures.
//!
//! The backend recomputes the exact bytes of [`serialize`] to verify the
//! signature, so the encoding is compact JSON with a fixed field order:
//!
//! ```text
//! {"name":…,"from":…,"to":…,"namespace":…,"network":…,"alias":…,"timestamp":…}
//! ```

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Chain;
use crate::error::{ConnectError, ConnectResult};
use crate::keys::SigningKeyManager;

/// Kind of graph mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationName {
    #[serde(rename = "follow")]
    Follow,
    #[serde(rename = "unfollow")]
    Unfollow,
    #[serde(rename = "setAlias")]
    SetAlias,
}

impl OperationName {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationName::Follow => "follow",
            OperationName::Unfollow => "unfollow",
            OperationName::SetAlias => "setAlias",
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single graph mutation as signed by the device key.
///
/// Field order is part of the wire format; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub name: OperationName,
    pub from: String,
    pub to: String,
    pub namespace: String,
    pub network: Chain,
    pub alias: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Signature over a serialized operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedOperation {
    /// Exact payload that was signed
    pub payload: String,
    /// Base64 ECDSA signature over `payload`
    pub signature: String,
    /// Base64 public key of the signing key
    pub signing_key: String,
}

/// Deterministic encoding of an operation.
pub fn serialize(operation: &Operation) -> ConnectResult<String> {
    serde_json::to_string(operation)
        .map_err(|e| ConnectError::Serialization(format!("Failed to serialize operation: {e}")))
}

/// Builds and signs operations with the device key.
pub struct OperationSigner {
    keys: Arc<SigningKeyManager>,
    last_timestamp: AtomicI64,
}

impl OperationSigner {
    pub fn new(keys: Arc<SigningKeyManager>) -> Self {
        Self {
            keys,
            last_timestamp: AtomicI64::new(0),
        }
    }

    /// Build an operation stamped with the current time.
    ///
    /// Timestamps strictly increase across calls on the same signer, even
    /// when the wall clock does not. `to` is not validated.
    pub fn build_operation(
        &self,
        name: OperationName,
        from: &str,
        to: &str,
        namespace: &str,
        network: Chain,
        alias: &str,
    ) -> Operation {
        Operation {
            name,
            from: from.to_string(),
            to: to.to_string(),
            namespace: namespace.to_string(),
            network,
            alias: alias.to_string(),
            timestamp: self.next_timestamp(Utc::now().timestamp_millis()),
        }
    }

    fn next_timestamp(&self, now: i64) -> i64 {
        let mut last = self.last_timestamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_timestamp.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    /// Serialize and sign. The returned signing key is the one that produced
    /// the signature. Propagates [`ConnectError::KeyUnavailable`].
    pub async fn sign(&self, operation: &Operation) -> ConnectResult<SignedOperation> {
        let payload = serialize(operation)?;
        let (signature, signing_key) = self.keys.sign_with_public_key(payload.as_bytes()).await?;

        Ok(SignedOperation {
            payload,
            signature,
            signing_key,
        })
    }
}
