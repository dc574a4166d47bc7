//! Final token metadata and the collection-level fields that shape it.

use serde::{Deserialize, Serialize};

use super::asset::ContentRef;
use super::draft::Trait;

/// Metadata document published for each token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    pub image: ContentRef,
    pub attributes: Vec<Trait>,
}

/// Collection-wide settings applied to every asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    /// Token name prefix, rendered as `"<name> #<id>"`
    pub name: String,

    /// Description shared by every token
    pub description: String,

    /// Prefix for pin display names (`<prefix>-Image-<id>`)
    pub display_prefix: String,

    /// Value of the `project` tag attached to every pin
    pub project_tag: String,

    /// Trait type of the network/collection label entry
    pub network_trait_type: String,

    /// Value of the network/collection label entry
    pub network_label: String,

    /// Add the draft prompt as a `Prompt` trait before the derived entries
    pub include_prompt_trait: bool,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            name: "OnyxAI".to_string(),
            description: "AI-generated NFT collection minted on Sepolia. \
                          Generated and uploaded via automation."
                .to_string(),
            display_prefix: "OnyxAI".to_string(),
            project_tag: "onyxai-nft".to_string(),
            network_trait_type: "Network".to_string(),
            network_label: "Sepolia Testnet".to_string(),
            include_prompt_trait: false,
        }
    }
}
