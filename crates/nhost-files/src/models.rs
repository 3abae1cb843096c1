//! Wire models for the storage service.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Metadata returned after a successful upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: Option<i64>,
    pub bucket_id: String,
    #[serde(default)]
    pub etag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_uploaded: bool,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub uploaded_by_user_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

/// A presigned URL with its expiration time.
#[derive(Debug, Clone, Deserialize)]
pub struct PresignedUrl {
    pub url: String,
    /// Unix timestamp in seconds
    pub expiration: i64,
}

/// Envelope around the presigned URL payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PresignedUrlResponse {
    pub presigned_url: PresignedUrl,
}

/// Parameters for requesting a presigned URL.
///
/// The optional fields are server-side image transformations.
#[derive(Debug, Clone, Default)]
pub struct PresignedUrlParams {
    pub file_id: String,
    pub quality: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub blur: Option<u32>,
}

impl PresignedUrlParams {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            ..Default::default()
        }
    }

    /// Query pairs for the transformation parameters that are set.
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(quality) = self.quality {
            pairs.push(("quality", quality.to_string()));
        }
        if let Some(width) = self.width {
            pairs.push(("width", width.to_string()));
        }
        if let Some(height) = self.height {
            pairs.push(("height", height.to_string()));
        }
        if let Some(blur) = self.blur {
            pairs.push(("blur", blur.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_deserializes_from_camel_case() {
        let json = r#"{
            "id": "file-1",
            "name": "photo.jpg",
            "size": 2048,
            "bucketId": "default",
            "etag": "\"abc123\"",
            "createdAt": "2025-01-15T10:00:00Z",
            "updatedAt": "2025-01-15T10:00:00Z",
            "isUploaded": true,
            "mimeType": "image/jpeg"
        }"#;

        let response: FileUploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id, "file-1");
        assert_eq!(response.bucket_id, "default");
        assert_eq!(response.size, Some(2048));
        assert!(response.is_uploaded);
        assert!(response.uploaded_by_user_id.is_none());
    }

    #[test]
    fn presigned_envelope_deserializes() {
        let json = r#"{
            "presignedUrl": {"url": "https://cdn.example.com/f/file-1?sig=x", "expiration": 1736935200}
        }"#;

        let response: PresignedUrlResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.presigned_url.expiration, 1736935200);
    }

    #[test]
    fn query_pairs_only_include_set_transformations() {
        let mut params = PresignedUrlParams::new("file-1");
        assert!(params.query_pairs().is_empty());

        params.width = Some(640);
        params.blur = Some(5);
        assert_eq!(
            params.query_pairs(),
            vec![("width", "640".to_string()), ("blur", "5".to_string())]
        );
    }
}
