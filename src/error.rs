//! Error taxonomy for the publication pipeline.
//!
//! Only skippable input problems are recovered per asset (see
//! [`crate::core::resolver::SkipReason`]). Everything here is fatal to a run.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::AssetId;

/// Failure reading or writing a local document
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed document {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Cache entry for {id} already exists in {namespace}")]
    AlreadyCached { namespace: &'static str, id: AssetId },
}

impl StorageError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn malformed(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Failure talking to the content-addressable store
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Payment required or quota exhausted ({status}): {body}")]
    QuotaExhausted { status: u16, body: String },

    #[error("Unexpected content type '{content_type}' ({status}): {body}")]
    UnexpectedContentType {
        status: u16,
        content_type: String,
        body: String,
    },

    #[error("Publish failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed publish response: {0}")]
    MalformedResponse(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Fatal error that aborts a whole run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Publishing {stage} for asset {id} failed: {source}")]
    Transport {
        id: AssetId,
        stage: &'static str,
        #[source]
        source: PublishError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("No payload files matching '{pattern}' in {}", .dir.display())]
    NoPayloads { dir: PathBuf, pattern: String },

    #[error("Another run holds the lock at {}", .path.display())]
    Locked { path: PathBuf },
}
