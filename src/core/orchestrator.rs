//! Main orchestrator for the publication pipeline.
//!
//! Drives every resolved asset through
//! `Pending -> ImagePublished -> MetadataPublished -> Recorded`, consulting
//! the upload caches before each publish and persisting each new reference
//! before moving on. The first fatal error ends the run and the result writer
//! is never called, so a rerun picks up from the first uncached step.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{mime_for_extension, pin_tags, Blob, Publisher};
use crate::domain::{AssetResult, AssetState, CollectionSettings, ContentRef, RunOutputs};
use crate::error::{PipelineError, PublishError, StorageError};

use super::assembler::assemble;
use super::cache::{CacheStore, Namespace};
use super::resolver::{AssetResolver, ResolvedAsset, SkippedAsset};
use super::writer::ResultWriter;

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Unique identifier for this run (logging only)
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Outputs handed to the result writer
    pub outputs: RunOutputs,

    /// Payload files left out of the run
    pub skipped: Vec<SkippedAsset>,

    pub images_published: usize,
    pub images_reused: usize,
    pub metadata_published: usize,
    pub metadata_reused: usize,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            started_at: now,
            completed_at: now,
            outputs: RunOutputs::new(),
            skipped: Vec::new(),
            images_published: 0,
            images_reused: 0,
            metadata_published: 0,
            metadata_reused: 0,
        }
    }

    /// Wall-clock time from start to completion
    pub fn duration(&self) -> Duration {
        self.completed_at - self.started_at
    }

    /// Number of publish calls made during the run
    pub fn publish_calls(&self) -> usize {
        self.images_published + self.metadata_published
    }
}

/// Cached progress of one asset, derived without network access
#[derive(Debug, Clone)]
pub struct AssetStatus {
    pub asset: ResolvedAsset,
    pub state: AssetState,
    pub image: Option<ContentRef>,
    pub token: Option<ContentRef>,
}

/// Main pipeline orchestrator
pub struct Orchestrator {
    /// Content-addressable store
    publisher: Arc<dyn Publisher>,

    /// Collection-level metadata fields
    collection: CollectionSettings,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(publisher: Arc<dyn Publisher>, collection: CollectionSettings) -> Self {
        Self {
            publisher,
            collection,
        }
    }

    /// Publish every resolved asset and write the run outputs.
    ///
    /// The caller owns `cache` and should hold the run lock for its
    /// directory.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn run(
        &self,
        resolver: &AssetResolver,
        cache: &mut CacheStore,
        writer: &ResultWriter,
    ) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        info!(
            publisher = self.publisher.name(),
            images = %resolver.payload_dir().display(),
            "Starting upload run"
        );

        let mut report = RunReport::new(run_id);

        let resolved = match resolver.resolve().await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(error = %e, "Run failed");
                return Err(e);
            }
        };
        report.skipped = resolved.skipped;

        for asset in &resolved.assets {
            if let Err(e) = self.process_asset(asset, cache, &mut report).await {
                error!(id = %asset.id, error = %e, "Run failed");
                return Err(e);
            }
        }

        if let Err(e) = writer.write(&report.outputs).await {
            error!(error = %e, "Run failed");
            return Err(e.into());
        }
        report.completed_at = Utc::now();

        info!(
            recorded = report.outputs.len(),
            duration_ms = report.duration().num_milliseconds(),
            skipped = report.skipped.len(),
            images_published = report.images_published,
            images_reused = report.images_reused,
            metadata_published = report.metadata_published,
            metadata_reused = report.metadata_reused,
            "Run completed successfully"
        );
        if !report.skipped.is_empty() {
            warn!(count = report.skipped.len(), "Some payload files were skipped");
        }

        Ok(report)
    }

    /// Take one asset from `Pending` to `Recorded`
    async fn process_asset(
        &self,
        asset: &ResolvedAsset,
        cache: &mut CacheStore,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let image_uri = self.ensure_image(asset, cache, report).await?;
        debug!(id = %asset.id, state = AssetState::ImagePublished.label(), %image_uri);

        let token_uri = self.ensure_metadata(asset, &image_uri, cache, report).await?;
        debug!(id = %asset.id, state = AssetState::MetadataPublished.label(), %token_uri);

        report.outputs.record(AssetResult {
            id: asset.id.clone(),
            image_uri,
            token_uri,
        });
        debug!(id = %asset.id, state = AssetState::Recorded.label());

        Ok(())
    }

    /// `Pending -> ImagePublished`
    async fn ensure_image(
        &self,
        asset: &ResolvedAsset,
        cache: &mut CacheStore,
        report: &mut RunReport,
    ) -> Result<ContentRef, PipelineError> {
        if let Some(cached) = cache.get(Namespace::Images, &asset.id) {
            info!(id = %asset.id, image_uri = %cached, "Skipping image (already uploaded)");
            report.images_reused += 1;
            return Ok(cached.clone());
        }

        let file_name = asset.payload_file_name();
        info!(id = %asset.id, file = %file_name, "Uploading new image");

        let bytes = tokio::fs::read(&asset.payload_path)
            .await
            .map_err(|e| StorageError::io(&asset.payload_path, e))?;
        let ext = asset
            .payload_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let blob = Blob {
            bytes,
            mime: mime_for_extension(ext).to_string(),
            file_name,
        };

        let display_name = format!("{}-Image-{}", self.collection.display_prefix, asset.id);
        let tags = pin_tags(&self.collection.project_tag, asset.id.as_str(), "image");

        let image_uri = self
            .publisher
            .publish_blob(blob, &display_name, &tags)
            .await
            .map_err(|source| transport(asset, "image", source))?;

        cache
            .put(Namespace::Images, asset.id.clone(), image_uri.clone())
            .await?;
        report.images_published += 1;
        info!(id = %asset.id, %image_uri, "Image uploaded");

        Ok(image_uri)
    }

    /// `ImagePublished -> MetadataPublished`
    async fn ensure_metadata(
        &self,
        asset: &ResolvedAsset,
        image_uri: &ContentRef,
        cache: &mut CacheStore,
        report: &mut RunReport,
    ) -> Result<ContentRef, PipelineError> {
        // Always rebuilt, even when the published reference is reused
        let metadata = assemble(&asset.id, &asset.draft, image_uri, &self.collection);

        if let Some(cached) = cache.get(Namespace::Metadata, &asset.id) {
            info!(id = %asset.id, token_uri = %cached, "Skipping metadata (already uploaded)");
            report.metadata_reused += 1;
            return Ok(cached.clone());
        }

        info!(id = %asset.id, "Uploading new metadata");
        let document = serde_json::to_value(&metadata)
            .map_err(|e| transport(asset, "metadata", PublishError::Encode(e)))?;

        let display_name = format!("{}-Metadata-{}", self.collection.display_prefix, asset.id);
        let tags = pin_tags(&self.collection.project_tag, asset.id.as_str(), "metadata");

        let token_uri = self
            .publisher
            .publish_document(&document, &display_name, &tags)
            .await
            .map_err(|source| transport(asset, "metadata", source))?;

        cache
            .put(Namespace::Metadata, asset.id.clone(), token_uri.clone())
            .await?;
        report.metadata_published += 1;
        info!(id = %asset.id, %token_uri, "Metadata uploaded");

        Ok(token_uri)
    }
}

/// Derive each asset's state from the caches without publishing anything
pub async fn plan(
    resolver: &AssetResolver,
    cache: &CacheStore,
) -> Result<(Vec<AssetStatus>, Vec<SkippedAsset>), PipelineError> {
    let resolved = resolver.resolve().await?;

    let statuses = resolved
        .assets
        .into_iter()
        .map(|asset| {
            let image = cache.get(Namespace::Images, &asset.id).cloned();
            let token = cache.get(Namespace::Metadata, &asset.id).cloned();
            let state = match (&image, &token) {
                (Some(_), Some(_)) => AssetState::MetadataPublished,
                (Some(_), None) => AssetState::ImagePublished,
                _ => AssetState::Pending,
            };
            AssetStatus {
                asset,
                state,
                image,
                token,
            }
        })
        .collect();

    Ok((statuses, resolved.skipped))
}

fn transport(asset: &ResolvedAsset, stage: &'static str, source: PublishError) -> PipelineError {
    PipelineError::Transport {
        id: asset.id.clone(),
        stage,
        source,
    }
}
