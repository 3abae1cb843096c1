//! File storage operations against an NHost backend.
//!
//! Uploads, deletions, and URL resolution for the NHost Storage service.
//! Requests are authenticated with the current access token when one is
//! held; public-bucket operations work unauthenticated.

mod client;
mod models;

pub use client::FilesClient;
pub use models::{FileUploadResponse, PresignedUrl, PresignedUrlParams};

use thiserror::Error;

/// Error type for file storage operations.
#[derive(Error, Debug)]
pub enum FilesError {
    /// Non-success response from the storage service
    #[error("Storage service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// Network-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request timeout
    #[error("Storage request timed out")]
    Timeout,

    /// Response body did not match the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Invalid request input (bad MIME type, empty file name)
    #[error("Invalid upload input: {0}")]
    Input(String),
}

/// Result type alias using FilesError.
pub type FilesResult<T> = Result<T, FilesError>;
