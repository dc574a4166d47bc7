//! Asset discovery.
//!
//! Lists payload files, derives each asset id from its file name, and pairs it
//! with the draft descriptor of the same id. Anything that cannot be paired is
//! skipped and reported, never fatal.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::{AssetId, DraftDescriptor};
use crate::error::{PipelineError, StorageError};

/// Extension of draft descriptor files
pub const DESCRIPTOR_EXTENSION: &str = "json";

/// A payload paired with its draft
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub id: AssetId,
    pub payload_path: PathBuf,
    pub draft: DraftDescriptor,
}

impl ResolvedAsset {
    /// File name of the payload, as presented to the store
    pub fn payload_file_name(&self) -> String {
        self.payload_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Why a payload file was left out of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// File stem is not a numeric id
    MalformedIdentifier,

    /// No `<id>.json` next to the payload
    MissingDescriptor { expected: PathBuf },

    /// An earlier payload already resolved to the same id
    DuplicateIdentifier { first: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedIdentifier => write!(f, "filename is not a numeric id"),
            Self::MissingDescriptor { expected } => {
                write!(f, "no matching draft at {}", expected.display())
            }
            Self::DuplicateIdentifier { first } => {
                write!(f, "same id as {}", first)
            }
        }
    }
}

/// A payload file excluded from processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAsset {
    pub file_name: String,
    pub reason: SkipReason,
}

/// Result of resolving the input directories
#[derive(Debug, Clone, Default)]
pub struct ResolvedAssets {
    /// Assets to process, in file name order
    pub assets: Vec<ResolvedAsset>,

    /// Files that were skipped, in file name order
    pub skipped: Vec<SkippedAsset>,
}

/// Discovers assets and their companion drafts
#[derive(Debug, Clone)]
pub struct AssetResolver {
    payload_dir: PathBuf,
    descriptor_dir: PathBuf,
    pattern: Pattern,
}

impl AssetResolver {
    /// Create a resolver selecting payloads by a file-name glob such as `*.png`
    pub fn new(
        payload_dir: impl Into<PathBuf>,
        descriptor_dir: impl Into<PathBuf>,
        payload_glob: &str,
    ) -> Result<Self, glob::PatternError> {
        Ok(Self {
            payload_dir: payload_dir.into(),
            descriptor_dir: descriptor_dir.into(),
            pattern: Pattern::new(payload_glob)?,
        })
    }

    pub fn payload_dir(&self) -> &Path {
        &self.payload_dir
    }

    /// Path where the draft for `id` is expected
    pub fn descriptor_path(&self, id: &AssetId) -> PathBuf {
        self.descriptor_dir
            .join(format!("{}.{}", id, DESCRIPTOR_EXTENSION))
    }

    /// List matching payload file names, sorted lexicographically.
    ///
    /// Names that are not valid UTF-8 are returned lossily and never parse as
    /// an id.
    pub async fn payload_files(&self) -> Result<Vec<String>, StorageError> {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };

        let mut entries = fs::read_dir(&self.payload_dir)
            .await
            .map_err(|e| StorageError::io(&self.payload_dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&self.payload_dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StorageError::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if self.pattern.matches_with(&name, options) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Resolve every payload to an asset or a skip.
    ///
    /// Fails when no payload files match at all, or when a draft exists but
    /// cannot be read or parsed.
    pub async fn resolve(&self) -> Result<ResolvedAssets, PipelineError> {
        let files = self.payload_files().await?;

        if files.is_empty() {
            return Err(PipelineError::NoPayloads {
                dir: self.payload_dir.clone(),
                pattern: self.pattern.as_str().to_string(),
            });
        }

        let mut resolved = ResolvedAssets::default();
        let mut seen: HashMap<AssetId, String> = HashMap::new();

        for file_name in files {
            let Some(id) = AssetId::from_filename(&file_name) else {
                warn!(file = %file_name, "Skipping (filename not numeric ID)");
                resolved.skipped.push(SkippedAsset {
                    file_name,
                    reason: SkipReason::MalformedIdentifier,
                });
                continue;
            };

            if let Some(first) = seen.get(&id) {
                warn!(file = %file_name, first = %first, "Skipping (duplicate ID)");
                resolved.skipped.push(SkippedAsset {
                    file_name,
                    reason: SkipReason::DuplicateIdentifier {
                        first: first.clone(),
                    },
                });
                continue;
            }
            seen.insert(id.clone(), file_name.clone());

            let draft_path = self.descriptor_path(&id);
            if !fs::try_exists(&draft_path)
                .await
                .map_err(|e| StorageError::io(&draft_path, e))?
            {
                warn!(file = %file_name, draft = %draft_path.display(), "Skipping (no matching draft)");
                resolved.skipped.push(SkippedAsset {
                    file_name,
                    reason: SkipReason::MissingDescriptor {
                        expected: draft_path,
                    },
                });
                continue;
            }

            let draft = DraftDescriptor::load(&draft_path).await?;
            debug!(%id, file = %file_name, "Resolved asset");

            resolved.assets.push(ResolvedAsset {
                id,
                payload_path: self.payload_dir.join(&file_name),
                draft,
            });
        }

        Ok(resolved)
    }
}
