// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! GraphQL-over-HTTPS transport for the graph backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{MutationParams, MutationResult, MutationTransport, RegisterKeyParams, TransportError};
use crate::operation::OperationName;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const CONNECT_MUTATION: &str = r#"mutation connect($fromAddr: String!, $toAddr: String!, $alias: String, $namespace: String, $signature: String!, $signingKey: String!, $operation: String!, $network: String!) {
  connect(fromAddr: $fromAddr, toAddr: $toAddr, alias: $alias, namespace: $namespace, signature: $signature, signingKey: $signingKey, operation: $operation, network: $network) {
    result
  }
}"#;

const DISCONNECT_MUTATION: &str = r#"mutation disconnect($fromAddr: String!, $toAddr: String!, $alias: String, $namespace: String, $signature: String!, $signingKey: String!, $operation: String!, $network: String!) {
  disconnect(fromAddr: $fromAddr, toAddr: $toAddr, alias: $alias, namespace: $namespace, signature: $signature, signingKey: $signingKey, operation: $operation, network: $network) {
    result
  }
}"#;

const SET_ALIAS_MUTATION: &str = r#"mutation setAlias($fromAddr: String!, $toAddr: String!, $alias: String, $namespace: String, $signature: String!, $signingKey: String!, $operation: String!, $network: String!) {
  alias: setAlias(fromAddr: $fromAddr, toAddr: $toAddr, alias: $alias, namespace: $namespace, signature: $signature, signingKey: $signingKey, operation: $operation, network: $network) {
    result
  }
}"#;

const REGISTER_KEY_MUTATION: &str = r#"mutation registerSigningKey($address: String!, $message: String!, $signature: String!, $network: String) {
  registerSigningKey(address: $address, message: $message, signature: $signature, network: $network) {
    result
  }
}"#;

/// GraphQL document and response field for a mutation.
fn mutation_document(operation: OperationName) -> (&'static str, &'static str) {
    match operation {
        OperationName::Follow => (CONNECT_MUTATION, "connect"),
        OperationName::Unfollow => (DISCONNECT_MUTATION, "disconnect"),
        OperationName::SetAlias => (SET_ALIAS_MUTATION, "alias"),
    }
}

/// HTTP GraphQL client for the graph backend.
#[derive(Debug, Clone)]
pub struct GraphqlTransport {
    http: Client,
}

impl GraphqlTransport {
    /// Create a transport with the default request timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    async fn execute<V: Serialize>(
        &self,
        url: &str,
        query: &str,
        variables: &V,
        field: &str,
    ) -> Result<MutationResult, TransportError> {
        let url = url::Url::parse(url)
            .map_err(|e| TransportError::Request(format!("invalid endpoint `{url}`: {e}")))?;

        let payload = json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Request(format!(
                "HTTP {} from graph API",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        let result = parse_result(&body, field)?;
        debug!(field = %field, result = ?result, "Graph API responded");
        Ok(result)
    }
}

/// Extract `data.{field}.result` from a GraphQL response body.
fn parse_result(body: &Value, field: &str) -> Result<MutationResult, TransportError> {
    if let Some(result) = body
        .pointer(&format!("/data/{field}/result"))
        .and_then(Value::as_str)
    {
        return Ok(MutationResult::from_discriminant(result));
    }

    if let Some(message) = body
        .pointer("/errors/0/message")
        .and_then(Value::as_str)
    {
        return Err(TransportError::Graphql(message.to_string()));
    }

    Err(TransportError::InvalidResponse(format!(
        "missing data.{field}.result in response"
    )))
}

#[async_trait]
impl MutationTransport for GraphqlTransport {
    async fn mutate(
        &self,
        operation: OperationName,
        params: &MutationParams,
    ) -> Result<MutationResult, TransportError> {
        let (query, field) = mutation_document(operation);
        self.execute(&params.url, query, params, field).await
    }

    async fn register_signing_key(
        &self,
        params: &RegisterKeyParams,
    ) -> Result<MutationResult, TransportError> {
        self.execute(
            &params.url,
            REGISTER_KEY_MUTATION,
            params,
            "registerSigningKey",
        )
        .await
    }
}
