//! Adapter interfaces for content-addressable stores.
//!
//! The pipeline only needs two operations: pin a binary blob and pin a JSON
//! document. Each returns an opaque [`ContentRef`].

pub mod pinata;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::ContentRef;
use crate::error::PublishError;

// Re-export the Pinata adapter
pub use pinata::PinataPublisher;

/// Key/value annotations forwarded to the store for its own indexing
pub type Tags = BTreeMap<String, String>;

/// A blob to pin
#[derive(Debug, Clone)]
pub struct Blob {
    /// Raw bytes
    pub bytes: Vec<u8>,

    /// File name presented to the store
    pub file_name: String,

    /// MIME type of the bytes
    pub mime: String,
}

/// Trait for content-addressable publishers
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Human-readable publisher name
    fn name(&self) -> &str;

    /// Pin a binary blob
    async fn publish_blob(
        &self,
        blob: Blob,
        display_name: &str,
        tags: &Tags,
    ) -> Result<ContentRef, PublishError>;

    /// Pin a structured document
    async fn publish_document(
        &self,
        document: &serde_json::Value,
        display_name: &str,
        tags: &Tags,
    ) -> Result<ContentRef, PublishError>;
}

/// Build the tag set attached to every pin
pub fn pin_tags(project: &str, id: &str, kind: &str) -> Tags {
    [("project", project), ("id", id), ("kind", kind)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Guess a MIME type from a file extension
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_tags() {
        let tags = pin_tags("onyxai-nft", "7", "image");
        assert_eq!(tags.get("project").map(String::as_str), Some("onyxai-nft"));
        assert_eq!(tags.get("id").map(String::as_str), Some("7"));
        assert_eq!(tags.get("kind").map(String::as_str), Some("image"));
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("PNG"), "image/png");
        assert_eq!(mime_for_extension("bin"), "application/octet-stream");
    }
}
