//! assetpin - Resumable IPFS publication pipeline for generated assets
//!
//! Pins each generated image to IPFS, assembles token metadata pointing at
//! the pinned image, pins that metadata, and records the resulting token
//! URIs for the minting step.
//!
//! # Architecture
//!
//! Progress is kept in two durable caches (image references and metadata
//! references), rewritten atomically after every successful pin:
//! - An asset is never pinned twice, across any number of restarts
//! - Any failure aborts the run; rerunning resumes at the first uncached step
//! - Run outputs are only written once every asset is recorded
//!
//! # Modules
//!
//! - `adapters`: Content-addressable stores (Pinata)
//! - `core`: Pipeline logic (Cache, Resolver, Assembler, Orchestrator, Writer)
//! - `domain`: Data structures (AssetId, DraftDescriptor, TokenMetadata)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Pin everything under output/images that has a draft in output/drafts
//! PINATA_JWT=... assetpin upload
//!
//! # See what is already pinned
//! assetpin status
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use adapters::{PinataPublisher, Publisher};
pub use self::core::{AssetResolver, CacheStore, Orchestrator, ResultWriter, RunReport};
pub use domain::{AssetId, ContentRef, DraftDescriptor, TokenMetadata};
pub use error::{PipelineError, PublishError, StorageError};
