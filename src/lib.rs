// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Graph Client - signing-key authorized social graph mutations
//!
//! A wallet account registers a device-local secp256k1 signing key with the
//! graph backend once; every follow, unfollow and alias change is then
//! signed by that key instead of prompting the wallet.
//!
//! ## Modules
//!
//! - `client` - Graph mutation client and builder
//! - `config` - Namespace, environment and chain configuration
//! - `error` - Client error taxonomy
//! - `keys` - Device signing key and key stores
//! - `logging` - Tracing subscriber setup for binaries
//! - `mirror` - Follow-list mirror in a DID-scoped document store (redb)
//! - `operation` - Canonical operation payloads and signing
//! - `session` - Signing key registration session
//! - `transport` - GraphQL backend transport
//! - `wallet` - Ethereum and Solana wallet capabilities

pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod mirror;
pub mod operation;
pub mod session;
pub mod transport;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{GraphClient, GraphClientBuilder, MutationOutcome};
pub use config::{Chain, ClientConfig, Env};
pub use error::{ConnectError, ConnectResult};
