//! Core pipeline logic.
//!
//! This module contains:
//! - Cache: durable per-namespace upload caches
//! - Resolver: payload discovery and draft pairing
//! - Assembler: final metadata construction
//! - Writer: run output documents
//! - Orchestrator: the per-asset publish state machine

pub mod assembler;
pub mod cache;
pub mod orchestrator;
pub mod resolver;
pub mod writer;

// Re-export commonly used types
pub use assembler::assemble;
pub use cache::{CacheStore, Namespace, RunLock};
pub use orchestrator::{plan, AssetStatus, Orchestrator, RunReport};
pub use resolver::{AssetResolver, ResolvedAsset, ResolvedAssets, SkipReason, SkippedAsset};
pub use writer::ResultWriter;
