//! Per-asset progress and the documents a run produces.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::asset::{AssetId, ContentRef};

/// Progress of a single asset through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    /// Nothing published yet
    Pending,

    /// Image pinned, reference cached
    ImagePublished,

    /// Metadata pinned, reference cached
    MetadataPublished,

    /// Added to the run outputs
    Recorded,
}

impl AssetState {
    /// Short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ImagePublished => "image published",
            Self::MetadataPublished => "metadata published",
            Self::Recorded => "recorded",
        }
    }
}

/// Outcome for one fully published asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResult {
    pub id: AssetId,
    #[serde(rename = "imageURI")]
    pub image_uri: ContentRef,
    #[serde(rename = "tokenURI")]
    pub token_uri: ContentRef,
}

/// Aggregated outputs of a run, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutputs {
    results: Vec<AssetResult>,
}

impl RunOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished asset
    pub fn record(&mut self, result: AssetResult) {
        self.results.push(result);
    }

    /// Full results, in processing order
    pub fn results(&self) -> &[AssetResult] {
        &self.results
    }

    /// `id -> tokenURI` view, in processing order
    pub fn token_uri_map(&self) -> TokenUriMap<'_> {
        TokenUriMap(&self.results)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Serializes as a JSON object keyed by asset id, keeping insertion order
#[derive(Debug, Clone, Copy)]
pub struct TokenUriMap<'a>(&'a [AssetResult]);

impl Serialize for TokenUriMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in self.0 {
            map.serialize_entry(&result.id, &result.token_uri)?;
        }
        map.end()
    }
}
