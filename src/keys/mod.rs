// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device signing key management.

pub mod manager;
pub mod store;

pub use manager::{verify_signature, SigningKeyManager, SIGNING_KEY_ENTRY};
pub use store::{FileKeyStore, KeyStore, KeyStoreError, MemoryKeyStore};
