//! GraphQL POST client.

use crate::interceptor::AuthInterceptor;
use crate::{GraphqlError, GraphqlResult};
use nhost_auth::AccessTokenProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// A GraphQL request envelope.
#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<serde_json::Value>,
}

/// An error reported in-band by the GraphQL server.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlResponseError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}

/// A GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphqlResponseError>>,
}

impl GraphqlResponse {
    /// Whether the server reported any in-band errors.
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// GraphQL client with automatic bearer authentication.
#[derive(Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: String,
    interceptor: AuthInterceptor,
}

impl GraphqlClient {
    /// Create a client for the given endpoint.
    ///
    /// `endpoint` is the full GraphQL URL, e.g.
    /// `https://myapp.nhost.run/v1/graphql`.
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        provider: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            interceptor: AuthInterceptor::new(provider),
        }
    }

    /// Execute a query or mutation.
    ///
    /// In-band GraphQL errors are returned inside the response envelope;
    /// only transport-level failures surface as `Err`.
    pub async fn execute(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> GraphqlResult<GraphqlResponse> {
        debug!(endpoint = %self.endpoint, "Executing GraphQL request");

        let request = self
            .http
            .post(&self.endpoint)
            .json(&GraphqlRequest { query, variables });

        let response = self
            .interceptor
            .apply(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "GraphQL request failed");
            return Err(GraphqlError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let envelope: GraphqlResponse = response.json().await.map_err(classify)?;
        if let Some(errors) = envelope.errors.as_ref() {
            for error in errors {
                warn!(message = %error.message, "GraphQL error in response");
            }
        }
        Ok(envelope)
    }
}

fn classify(e: reqwest::Error) -> GraphqlError {
    if e.is_timeout() {
        GraphqlError::Timeout
    } else if e.is_decode() {
        GraphqlError::Malformed(e.to_string())
    } else {
        GraphqlError::Network(e.to_string())
    }
}
