//! Run output documents.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use super::cache::StagedWrite;
use crate::domain::RunOutputs;
use crate::error::StorageError;

/// `id -> tokenURI` map consumed by the minting step
pub const TOKEN_URI_MAP_FILE: &str = "tokenUriMap.json";

/// Full per-asset audit trail
pub const UPLOAD_RESULTS_FILE: &str = "uploadResults.json";

/// Writes the run outputs into the output directory
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn token_uri_map_path(&self) -> PathBuf {
        self.output_dir.join(TOKEN_URI_MAP_FILE)
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(UPLOAD_RESULTS_FILE)
    }

    /// Overwrite both output documents.
    ///
    /// Both are staged before either is committed. If the second commit
    /// fails the map is put back, so on error neither document has changed.
    pub async fn write(&self, outputs: &RunOutputs) -> Result<(), StorageError> {
        let map_path = self.token_uri_map_path();
        let results_path = self.results_path();

        let previous_map = read_existing(&map_path).await?;

        let map = StagedWrite::json(&map_path, &outputs.token_uri_map()).await?;
        let results = match StagedWrite::json(&results_path, outputs.results()).await {
            Ok(results) => results,
            Err(e) => {
                map.discard().await;
                return Err(e);
            }
        };

        if let Err(e) = map.commit().await {
            results.discard().await;
            return Err(e);
        }
        if let Err(e) = results.commit().await {
            restore(&map_path, previous_map).await;
            return Err(e);
        }

        info!(
            assets = outputs.len(),
            map = %map_path.display(),
            results = %results_path.display(),
            "Wrote run outputs"
        );

        Ok(())
    }
}

async fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// Put `path` back to `previous`, removing it if it did not exist
async fn restore(path: &Path, previous: Option<Vec<u8>>) {
    let restored = match previous {
        Some(content) => match StagedWrite::bytes(path, &content).await {
            Ok(staged) => staged.commit().await,
            Err(e) => Err(e),
        },
        None => fs::remove_file(path)
            .await
            .map_err(|e| StorageError::io(path, e)),
    };

    if let Err(e) = restored {
        warn!(path = %path.display(), error = %e, "Failed to restore previous output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetId, AssetResult, ContentRef};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_overwrites_previous_outputs() {
        let temp = TempDir::new().unwrap();
        let writer = ResultWriter::new(temp.path());
        std::fs::write(writer.token_uri_map_path(), r#"{"99":"ipfs://stale"}"#).unwrap();

        let mut outputs = RunOutputs::new();
        outputs.record(AssetResult {
            id: AssetId::parse("1").unwrap(),
            image_uri: ContentRef::from_cid("QmImg"),
            token_uri: ContentRef::from_cid("QmMeta"),
        });
        writer.write(&outputs).await.unwrap();

        let map: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(writer.token_uri_map_path()).unwrap())
                .unwrap();
        assert_eq!(map, serde_json::json!({ "1": "ipfs://QmMeta" }));

        let results: Vec<AssetResult> =
            serde_json::from_str(&std::fs::read_to_string(writer.results_path()).unwrap()).unwrap();
        assert_eq!(results, outputs.results());
    }

    #[tokio::test]
    async fn test_empty_run_writes_empty_documents() {
        let temp = TempDir::new().unwrap();
        let writer = ResultWriter::new(temp.path().join("out"));

        writer.write(&RunOutputs::new()).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(writer.token_uri_map_path()).unwrap().trim(),
            "{}"
        );
        assert_eq!(
            std::fs::read_to_string(writer.results_path()).unwrap().trim(),
            "[]"
        );
    }

    fn one_result(id: &str) -> RunOutputs {
        let mut outputs = RunOutputs::new();
        outputs.record(AssetResult {
            id: AssetId::parse(id).unwrap(),
            image_uri: ContentRef::from_cid(&format!("QmImg{}", id)),
            token_uri: ContentRef::from_cid(&format!("QmMeta{}", id)),
        });
        outputs
    }

    #[tokio::test]
    async fn test_unwritable_results_leave_map_unchanged() {
        let temp = TempDir::new().unwrap();
        let writer = ResultWriter::new(temp.path());
        std::fs::write(writer.token_uri_map_path(), "{\"1\":\"ipfs://QmOld\"}\n").unwrap();
        std::fs::create_dir_all(writer.results_path().join("blocked")).unwrap();

        let err = writer.write(&one_result("2")).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));

        assert_eq!(
            std::fs::read_to_string(writer.token_uri_map_path()).unwrap(),
            "{\"1\":\"ipfs://QmOld\"}\n"
        );
        assert!(!temp.path().join(".tokenUriMap.json.tmp").exists());
        assert!(!temp.path().join(".uploadResults.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_unwritable_results_remove_fresh_map() {
        let temp = TempDir::new().unwrap();
        let writer = ResultWriter::new(temp.path());
        std::fs::create_dir_all(writer.results_path().join("blocked")).unwrap();

        assert!(writer.write(&one_result("1")).await.is_err());
        assert!(!writer.token_uri_map_path().exists());
    }

    #[tokio::test]
    async fn test_unreadable_map_changes_nothing() {
        let temp = TempDir::new().unwrap();
        let writer = ResultWriter::new(temp.path());
        std::fs::create_dir_all(writer.token_uri_map_path()).unwrap();

        assert!(writer.write(&one_result("1")).await.is_err());
        assert!(!writer.results_path().exists());
    }
}
