//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use assetpin::adapters::{Blob, Publisher, Tags};
use assetpin::core::{AssetResolver, CacheStore, ResultWriter};
use assetpin::domain::{CollectionSettings, ContentRef};
use assetpin::{Orchestrator, PublishError};

/// One publish call seen by the recording publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: String,
    pub id: String,
    pub display_name: String,
}

/// In-memory publisher that records calls and can be told to fail
#[derive(Default)]
pub struct RecordingPublisher {
    calls: Mutex<Vec<Call>>,
    fail_on: Mutex<Option<(String, String)>>,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the publish of `kind` ("image" or "metadata") for asset `id`
    pub fn fail_on(&self, kind: &str, id: &str) {
        *self.fail_on.lock().unwrap() = Some((kind.to_string(), id.to_string()));
    }

    pub fn clear_failure(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, display_name: &str, tags: &Tags) -> Result<Call, PublishError> {
        let call = Call {
            kind: tags.get("kind").cloned().unwrap_or_default(),
            id: tags.get("id").cloned().unwrap_or_default(),
            display_name: display_name.to_string(),
        };

        if let Some((kind, id)) = self.fail_on.lock().unwrap().as_ref() {
            if *kind == call.kind && *id == call.id {
                return Err(PublishError::Http {
                    status: 500,
                    body: "simulated outage".to_string(),
                });
            }
        }

        self.calls.lock().unwrap().push(call.clone());
        Ok(call)
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish_blob(
        &self,
        blob: Blob,
        display_name: &str,
        tags: &Tags,
    ) -> Result<ContentRef, PublishError> {
        let call = self.record(display_name, tags)?;
        Ok(ContentRef::from_cid(&format!(
            "img-{}-{}",
            call.id,
            blob.bytes.len()
        )))
    }

    async fn publish_document(
        &self,
        document: &serde_json::Value,
        display_name: &str,
        tags: &Tags,
    ) -> Result<ContentRef, PublishError> {
        let call = self.record(display_name, tags)?;
        let image = document["image"].as_str().unwrap_or_default().to_string();
        Ok(ContentRef::from_cid(&format!(
            "meta-{}-{}",
            call.id,
            image.trim_start_matches("ipfs://")
        )))
    }
}

/// Temporary project with images/, drafts/ and output/
pub struct Project {
    pub temp: TempDir,
    pub images: PathBuf,
    pub drafts: PathBuf,
    pub output: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let images = temp.path().join("images");
        let drafts = temp.path().join("drafts");
        let output = temp.path().join("output");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::create_dir_all(&drafts).unwrap();

        Self {
            temp,
            images,
            drafts,
            output,
        }
    }

    /// Add `<id>.png` with a matching draft
    pub fn add_asset(&self, id: &str) {
        self.add_image(&format!("{}.png", id));
        self.add_draft(id);
    }

    pub fn add_image(&self, file_name: &str) {
        std::fs::write(self.images.join(file_name), format!("png:{}", file_name)).unwrap();
    }

    pub fn add_draft(&self, id: &str) {
        let draft = serde_json::json!({
            "tokenId": id.parse::<u64>().unwrap(),
            "prompt": format!("prompt for {}", id),
            "attributes": [{ "trait_type": "Subject", "value": format!("subject {}", id) }]
        });
        std::fs::write(
            self.drafts.join(format!("{}.json", id)),
            serde_json::to_string_pretty(&draft).unwrap(),
        )
        .unwrap();
    }

    pub fn resolver(&self) -> AssetResolver {
        AssetResolver::new(&self.images, &self.drafts, "*.png").unwrap()
    }

    pub fn writer(&self) -> ResultWriter {
        ResultWriter::new(&self.output)
    }

    pub async fn cache(&self) -> CacheStore {
        CacheStore::load(&self.output).await.unwrap()
    }

    pub fn read(&self, file_name: &str) -> Option<String> {
        std::fs::read_to_string(self.output.join(file_name)).ok()
    }

    /// Run the whole pipeline once, as the CLI would
    pub async fn run(
        &self,
        publisher: Arc<RecordingPublisher>,
    ) -> Result<assetpin::RunReport, assetpin::PipelineError> {
        let orchestrator = Orchestrator::new(publisher, CollectionSettings::default());
        let mut cache = self.cache().await;
        orchestrator
            .run(&self.resolver(), &mut cache, &self.writer())
            .await
    }
}
