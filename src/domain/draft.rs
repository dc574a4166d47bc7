//! Draft descriptors written by the generation stage.
//!
//! A draft sits next to each image as `<id>.json`:
//!
//! ```json
//! {
//!   "tokenId": 1712345678901,
//!   "prompt": "cybernetic lion spirit, sci-fi concept art, ...",
//!   "attributes": [{ "trait_type": "Subject", "value": "cybernetic lion spirit" }]
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StorageError;

/// A single `{trait_type, value}` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trait {
    pub trait_type: String,
    pub value: String,
}

impl Trait {
    pub fn new(trait_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.into(),
            value: value.into(),
        }
    }
}

/// Draft description of an asset, produced upstream and read-only here
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DraftDescriptor {
    /// Generation identifier; written as a number by the generator
    #[serde(
        rename = "tokenId",
        alias = "id",
        default,
        deserialize_with = "deserialize_generation_id"
    )]
    pub id: Option<String>,

    /// Prompt the image was generated from
    #[serde(default)]
    pub prompt: Option<String>,

    /// Ordered traits describing the asset
    #[serde(default)]
    pub attributes: Vec<Trait>,
}

impl DraftDescriptor {
    /// Parse a draft from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load and validate a draft from disk
    pub async fn load(path: &Path) -> Result<Self, StorageError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;

        Self::from_json(&content).map_err(|e| StorageError::malformed(path, e))
    }
}

/// Accepts the generation id as either a JSON string or a JSON integer
fn deserialize_generation_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.trait_type, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generator_output() {
        let json = r#"{
            "tokenId": 1712345678901,
            "prompt": "neon desert monument",
            "attributes": [
                { "trait_type": "Subject", "value": "neon desert monument" },
                { "trait_type": "Mood", "value": "calm" }
            ]
        }"#;

        let draft = DraftDescriptor::from_json(json).unwrap();
        assert_eq!(draft.id.as_deref(), Some("1712345678901"));
        assert_eq!(draft.prompt.as_deref(), Some("neon desert monument"));
        assert_eq!(draft.attributes.len(), 2);
        assert_eq!(draft.attributes[1], Trait::new("Mood", "calm"));
    }

    #[test]
    fn test_string_id_alias() {
        let draft = DraftDescriptor::from_json(r#"{ "id": "42" }"#).unwrap();
        assert_eq!(draft.id.as_deref(), Some("42"));
        assert!(draft.prompt.is_none());
        assert!(draft.attributes.is_empty());
    }

    #[test]
    fn test_rejects_malformed_attributes() {
        assert!(DraftDescriptor::from_json(r#"{ "attributes": "Subject" }"#).is_err());
        assert!(DraftDescriptor::from_json(r#"{ "attributes": [{ "value": "x" }] }"#).is_err());
        assert!(DraftDescriptor::from_json("[]").is_err());
    }

    #[tokio::test]
    async fn test_load_reports_path_on_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("9.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = DraftDescriptor::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("9.json"));
    }
}
