//! Storage service client.

use crate::models::PresignedUrlResponse;
use crate::{FileUploadResponse, FilesError, FilesResult, PresignedUrl, PresignedUrlParams};
use nhost_auth::AccessTokenProvider;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use tracing::{debug, warn};

/// Client for the NHost Storage service.
#[derive(Clone)]
pub struct FilesClient {
    http: reqwest::Client,
    base_url: String,
    provider: Arc<dyn AccessTokenProvider>,
}

impl FilesClient {
    /// Create a new client.
    ///
    /// `base_url` is the NHost instance root, e.g. `https://myapp.nhost.run`.
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        provider: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            provider,
        }
    }

    fn files_url(&self, suffix: &str) -> String {
        format!("{}/v1/files{}", self.base_url, suffix)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.provider.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn api_error(response: reqwest::Response) -> FilesError {
        let status = response.status();
        let message = response.text().await.unwrap_or_default();
        warn!(status = %status, "Storage request failed");
        FilesError::Api {
            status: status.as_u16(),
            message,
        }
    }

    /// Upload a file.
    ///
    /// The bucket defaults to `"default"` when `bucket_id` is empty.
    pub async fn upload(
        &self,
        file: Vec<u8>,
        name: &str,
        bucket_id: &str,
        mime_type: Option<&str>,
    ) -> FilesResult<FileUploadResponse> {
        if name.is_empty() {
            return Err(FilesError::Input("file name must not be empty".to_string()));
        }

        let bucket_id = if bucket_id.is_empty() {
            "default"
        } else {
            bucket_id
        };

        let mut part = Part::bytes(file).file_name(name.to_string());
        if let Some(mime) = mime_type {
            part = part
                .mime_str(mime)
                .map_err(|e| FilesError::Input(format!("invalid MIME type: {}", e)))?;
        }

        let form = Form::new()
            .text("bucket-id", bucket_id.to_string())
            .part("file[]", part);

        debug!(name = %name, bucket_id = %bucket_id, "Uploading file");

        let response = self
            .authorize(self.http.post(self.files_url("")).multipart(form))
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let uploaded: FileUploadResponse = response.json().await.map_err(classify)?;
        debug!(file_id = %uploaded.id, "File uploaded");
        Ok(uploaded)
    }

    /// Delete a file.
    pub async fn delete(&self, file_id: &str) -> FilesResult<()> {
        debug!(file_id = %file_id, "Deleting file");

        let response = self
            .authorize(self.http.delete(self.files_url(&format!("/{}", file_id))))
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(())
    }

    /// Request a presigned URL, optionally with image transformations.
    pub async fn presigned_url(&self, params: &PresignedUrlParams) -> FilesResult<PresignedUrl> {
        let url = self.files_url(&format!("/{}/presignedUrl", params.file_id));
        debug!(file_id = %params.file_id, "Requesting presigned URL");

        let response = self
            .authorize(self.http.get(&url).query(&params.query_pairs()))
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let envelope: PresignedUrlResponse = response.json().await.map_err(classify)?;
        Ok(envelope.presigned_url)
    }

    /// Public URL for a file in a public-read bucket.
    pub fn public_url(&self, file_id: &str) -> String {
        format!("{}/v1/storage/files/{}", self.base_url, file_id)
    }
}

fn classify(e: reqwest::Error) -> FilesError {
    if e.is_timeout() {
        FilesError::Timeout
    } else if e.is_decode() {
        FilesError::Malformed(e.to_string())
    } else {
        FilesError::Network(e.to_string())
    }
}
