// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Configuration
//!
//! Construction-time configuration for the graph client, plus the
//! environment variable names used by the `graph-client` binary.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `GRAPH_NAMESPACE` | Social graph namespace (per consuming app) | Required |
//! | `GRAPH_ENV` | Endpoint set (`production` or `staging`) | `production` |
//! | `GRAPH_CHAIN` | Wallet chain (`eth` or `solana`) | `eth` |
//! | `GRAPH_CHAIN_REF` | Chain-specific network id (e.g. `1`, `mainnet-beta`) | empty |
//! | `KEY_STORE_DIR` | Directory holding the device signing key | `.graph-client` |
//! | `WALLET_KEY_PATH` | PEM file with the local Ethereum wallet key | Required for the CLI |
//! | `MIRROR_DB_PATH` | redb file for the mirror document store | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConnectError;

/// Environment variable name for the graph namespace.
pub const NAMESPACE_ENV: &str = "GRAPH_NAMESPACE";

/// Environment variable name for the endpoint set.
pub const ENV_ENV: &str = "GRAPH_ENV";

/// Environment variable name for the wallet chain.
pub const CHAIN_ENV: &str = "GRAPH_CHAIN";

/// Environment variable name for the chain-specific network id.
pub const CHAIN_REF_ENV: &str = "GRAPH_CHAIN_REF";

/// Environment variable name for the device key store directory.
pub const KEY_STORE_DIR_ENV: &str = "KEY_STORE_DIR";

/// Default key store directory (relative to the working directory).
pub const DEFAULT_KEY_STORE_DIR: &str = ".graph-client";

/// Environment variable name for the local wallet PEM key.
pub const WALLET_KEY_PATH_ENV: &str = "WALLET_KEY_PATH";

/// Environment variable name for the mirror redb file.
///
/// When unset the mirror strategy is disabled.
pub const MIRROR_DB_PATH_ENV: &str = "MIRROR_DB_PATH";

/// Environment variable name for the log format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Blockchain the wallet lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Chain {
    #[default]
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "SOLANA")]
    Solana,
}

impl Chain {
    /// Wire name used in operations and GraphQL variables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Eth => "ETH",
            Chain::Solana => "SOLANA",
        }
    }

    /// Parse a chain name (case-insensitive).
    pub fn parse(raw: &str) -> Option<Chain> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "eth" | "ethereum" => Some(Chain::Eth),
            "sol" | "solana" => Some(Chain::Solana),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment environment selecting an [`Endpoint`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Env {
    #[default]
    Production,
    Staging,
}

impl Env {
    /// Parse an environment name (case-insensitive).
    pub fn parse(raw: &str) -> Option<Env> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Env::Production),
            "staging" | "stg" => Some(Env::Staging),
            _ => None,
        }
    }

    /// Endpoint set for this environment.
    pub fn endpoint(&self) -> &'static Endpoint {
        match self {
            Env::Production => &PRODUCTION,
            Env::Staging => &STAGING,
        }
    }
}

/// Backend endpoints for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Display name
    pub name: &'static str,
    /// GraphQL API used for registration and mutations
    pub graph_api_url: &'static str,
}

/// Production endpoints.
pub const PRODUCTION: Endpoint = Endpoint {
    name: "production",
    graph_api_url: "https://api.cybertino.io/connect/",
};

/// Staging endpoints.
pub const STAGING: Endpoint = Endpoint {
    name: "staging",
    graph_api_url: "https://api.stg.cybertino.io/connect/",
};

/// Validated client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    namespace: String,
    env: Env,
    chain: Chain,
    chain_ref: String,
}

impl ClientConfig {
    /// Create a configuration for the given namespace with default
    /// environment (production) and chain (ETH).
    ///
    /// Fails with [`ConnectError::EmptyNamespace`] when `namespace` is blank.
    pub fn new(namespace: impl Into<String>) -> Result<Self, ConnectError> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(ConnectError::EmptyNamespace);
        }

        Ok(Self {
            namespace,
            env: Env::default(),
            chain: Chain::default(),
            chain_ref: String::new(),
        })
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn with_chain(mut self, chain: Chain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_chain_ref(mut self, chain_ref: impl Into<String>) -> Self {
        self.chain_ref = chain_ref.into();
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConnectError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConnectError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace = lookup(NAMESPACE_ENV).unwrap_or_default();

        let env = match lookup(ENV_ENV) {
            Some(raw) if !raw.trim().is_empty() => Env::parse(&raw)
                .ok_or_else(|| ConnectError::Config(format!("unknown {ENV_ENV} `{raw}`")))?,
            _ => Env::default(),
        };

        let chain = match lookup(CHAIN_ENV) {
            Some(raw) if !raw.trim().is_empty() => Chain::parse(&raw)
                .ok_or_else(|| ConnectError::Config(format!("unknown {CHAIN_ENV} `{raw}`")))?,
            _ => Chain::default(),
        };

        let chain_ref = lookup(CHAIN_REF_ENV).unwrap_or_default();

        Ok(Self::new(namespace)?
            .with_env(env)
            .with_chain(chain)
            .with_chain_ref(chain_ref.trim()))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn env(&self) -> Env {
        self.env
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn chain_ref(&self) -> &str {
        &self.chain_ref
    }

    /// Endpoint set selected by [`Env`].
    pub fn endpoint(&self) -> &'static Endpoint {
        self.env.endpoint()
    }
}

/// Read an environment variable with a fallback.
pub fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
