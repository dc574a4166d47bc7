//! Domain types for the publication pipeline.
//!
//! This module contains the core data structures:
//! - Asset: identifiers and content references
//! - Draft: descriptors written by the generation stage
//! - Metadata: final token metadata and collection settings
//! - Outcome: per-asset state and run outputs

pub mod asset;
pub mod draft;
pub mod metadata;
pub mod outcome;

// Re-export commonly used types
pub use asset::{AssetId, ContentRef};
pub use draft::{DraftDescriptor, Trait};
pub use metadata::{CollectionSettings, TokenMetadata};
pub use outcome::{AssetResult, AssetState, RunOutputs};
