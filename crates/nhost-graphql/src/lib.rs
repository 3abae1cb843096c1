//! Authenticated GraphQL transport for an NHost backend.
//!
//! Every outgoing request asks the auth client for the current access token
//! and, when one is held, attaches it as a bearer header. Requests are never
//! blocked on a pending refresh: a signed-out or mid-refresh client simply
//! sends the request unauthenticated.

mod client;
mod interceptor;

pub use client::{GraphqlClient, GraphqlResponse, GraphqlResponseError};
pub use interceptor::AuthInterceptor;

use thiserror::Error;

/// Transport-level GraphQL failure.
///
/// Errors reported in-band by the GraphQL server are not failures at this
/// level; they come back inside [`GraphqlResponse::errors`].
#[derive(Error, Debug)]
pub enum GraphqlError {
    /// Non-success HTTP status from the endpoint
    #[error("GraphQL endpoint returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Network-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request timeout
    #[error("GraphQL request timed out")]
    Timeout,

    /// Response body was not a GraphQL response
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Result type alias using GraphqlError.
pub type GraphqlResult<T> = Result<T, GraphqlError>;
