//! Final metadata assembly.
//!
//! Pure: the same draft, image reference and collection settings always give
//! the same document. Never cached, since drafts and label wording may change
//! between runs while the pinned image stays the same.

use crate::domain::{AssetId, CollectionSettings, ContentRef, DraftDescriptor, TokenMetadata, Trait};

/// Trait type of the generation id entry
pub const GENERATION_ID_TRAIT: &str = "Generation ID";

/// Trait type of the optional prompt entry
pub const PROMPT_TRAIT: &str = "Prompt";

/// Build the metadata document for one asset.
///
/// Attributes are the draft's own, in order, then the optional prompt entry,
/// then the generation id, then the network label.
pub fn assemble(
    id: &AssetId,
    draft: &DraftDescriptor,
    image: &ContentRef,
    collection: &CollectionSettings,
) -> TokenMetadata {
    let mut attributes = draft.attributes.clone();

    if collection.include_prompt_trait {
        if let Some(prompt) = draft.prompt.as_deref().filter(|p| !p.is_empty()) {
            attributes.push(Trait::new(PROMPT_TRAIT, prompt));
        }
    }

    let generation_id = draft.id.as_deref().unwrap_or(id.as_str());
    attributes.push(Trait::new(GENERATION_ID_TRAIT, generation_id));
    attributes.push(Trait::new(
        &collection.network_trait_type,
        &collection.network_label,
    ));

    TokenMetadata {
        name: format!("{} #{}", collection.name, id),
        description: collection.description.clone(),
        image: image.clone(),
        attributes,
    }
}
