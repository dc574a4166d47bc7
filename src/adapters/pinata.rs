//! Pinata pinning API adapter.
//!
//! Images go through `pinFileToIPFS` as multipart uploads; metadata goes
//! through `pinJSONToIPFS`. Both answer with `{"IpfsHash": "<cid>", ...}`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Blob, Publisher, Tags};
use crate::domain::ContentRef;
use crate::error::PublishError;

/// Default Pinata API base URL
pub const DEFAULT_API_URL: &str = "https://api.pinata.cloud";

/// Pinata API client
pub struct PinataPublisher {
    /// JWT used as bearer token
    jwt: String,
    /// API base URL (overridable for tests)
    api_url: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Pin metadata wrapper understood by both endpoints
#[derive(Debug, Serialize)]
struct PinataMetadata<'a> {
    name: &'a str,
    keyvalues: &'a Tags,
}

/// Body of a `pinJSONToIPFS` request
#[derive(Debug, Serialize)]
struct PinJsonRequest<'a> {
    #[serde(rename = "pinataMetadata")]
    metadata: PinataMetadata<'a>,
    #[serde(rename = "pinataContent")]
    content: &'a serde_json::Value,
}

/// Successful pin response
#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

impl PinataPublisher {
    /// Create a new Pinata client against the public API
    pub fn new(jwt: impl Into<String>) -> Self {
        Self::with_api_url(jwt, DEFAULT_API_URL)
    }

    /// Create a Pinata client against a custom base URL
    pub fn with_api_url(jwt: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            jwt: jwt.into(),
            api_url: api_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build endpoint URL
    fn endpoint(&self, path: &str) -> String {
        format!("{}/pinning/{}", self.api_url.trim_end_matches('/'), path)
    }

    /// Turn a raw response into a content reference, normalizing every failure
    async fn read_pin_response(response: Response) -> Result<ContentRef, PublishError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let body = response.text().await?;

        if status == StatusCode::PAYMENT_REQUIRED || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PublishError::QuotaExhausted {
                status: status.as_u16(),
                body,
            });
        }

        if !status.is_success() {
            return Err(PublishError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if !content_type.starts_with("application/json") {
            return Err(PublishError::UnexpectedContentType {
                status: status.as_u16(),
                content_type,
                body,
            });
        }

        let parsed: PinResponse = serde_json::from_str(&body)
            .map_err(|e| PublishError::MalformedResponse(format!("{}: {}", e, body)))?;

        match parsed.ipfs_hash {
            Some(hash) if !hash.trim().is_empty() => Ok(ContentRef::from_cid(hash.trim())),
            _ => Err(PublishError::MalformedResponse(format!(
                "missing IpfsHash: {}",
                body
            ))),
        }
    }
}

#[async_trait]
impl Publisher for PinataPublisher {
    fn name(&self) -> &str {
        "pinata"
    }

    async fn publish_blob(
        &self,
        blob: Blob,
        display_name: &str,
        tags: &Tags,
    ) -> Result<ContentRef, PublishError> {
        let url = self.endpoint("pinFileToIPFS");
        debug!(%url, display_name, bytes = blob.bytes.len(), "Pinning file");

        let metadata = serde_json::to_string(&PinataMetadata {
            name: display_name,
            keyvalues: tags,
        })?;

        // Build multipart form
        let file_part = Part::bytes(blob.bytes)
            .file_name(blob.file_name)
            .mime_str(&blob.mime)?;

        let form = Form::new()
            .part("file", file_part)
            .text("pinataMetadata", metadata);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await?;

        Self::read_pin_response(response).await
    }

    async fn publish_document(
        &self,
        document: &serde_json::Value,
        display_name: &str,
        tags: &Tags,
    ) -> Result<ContentRef, PublishError> {
        let url = self.endpoint("pinJSONToIPFS");
        debug!(%url, display_name, "Pinning JSON");

        let request = PinJsonRequest {
            metadata: PinataMetadata {
                name: display_name,
                keyvalues: tags,
            },
            content: document,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.jwt)
            .json(&request)
            .send()
            .await?;

        Self::read_pin_response(response).await
    }
}
