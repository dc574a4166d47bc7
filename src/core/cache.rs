//! Durable upload caches.
//!
//! Two namespaces map asset ids to content references: one for pinned images,
//! one for pinned metadata. Each namespace is a single pretty-printed JSON
//! object on disk and is rewritten in full, atomically, on every insert. That
//! rewrite is the only resumption record: an entry present on disk means the
//! upload happened and must not be repeated.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::domain::{AssetId, ContentRef};
use crate::error::{PipelineError, StorageError};

/// File name of the image-reference namespace
pub const IMAGE_CACHE_FILE: &str = "imageUploadCache.json";

/// File name of the metadata-reference namespace
pub const METADATA_CACHE_FILE: &str = "metadataUploadCache.json";

/// File name of the run lock
pub const LOCK_FILE: &str = ".assetpin.lock";

/// The two independent cache namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Images,
    Metadata,
}

impl Namespace {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Images => IMAGE_CACHE_FILE,
            Self::Metadata => METADATA_CACHE_FILE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Metadata => "metadata",
        }
    }
}

type Entries = BTreeMap<AssetId, ContentRef>;

/// In-memory view of both namespaces, written through to disk
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    images: Entries,
    metadata: Entries,
}

impl CacheStore {
    /// Load both namespaces from `dir`.
    ///
    /// A missing document yields an empty namespace; it is created on the
    /// first insert.
    pub async fn load(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        let images = load_namespace(&dir.join(IMAGE_CACHE_FILE)).await?;
        let metadata = load_namespace(&dir.join(METADATA_CACHE_FILE)).await?;

        debug!(
            dir = %dir.display(),
            images = images.len(),
            metadata = metadata.len(),
            "Loaded upload caches"
        );

        Ok(Self {
            dir,
            images,
            metadata,
        })
    }

    /// Path of a namespace document
    pub fn path(&self, namespace: Namespace) -> PathBuf {
        self.dir.join(namespace.file_name())
    }

    /// Look up a cached reference
    pub fn get(&self, namespace: Namespace, id: &AssetId) -> Option<&ContentRef> {
        self.entries(namespace).get(id)
    }

    /// Insert a new reference and persist the namespace before returning.
    ///
    /// Existing entries are never replaced.
    pub async fn put(
        &mut self,
        namespace: Namespace,
        id: AssetId,
        content_ref: ContentRef,
    ) -> Result<(), StorageError> {
        if self.entries(namespace).contains_key(&id) {
            return Err(StorageError::AlreadyCached {
                namespace: namespace.as_str(),
                id,
            });
        }

        let path = self.path(namespace);
        let mut updated = self.entries(namespace).clone();
        updated.insert(id, content_ref);

        // Memory only changes once the document is durable
        write_json_atomic(&path, &updated).await?;
        *self.entries_mut(namespace) = updated;

        Ok(())
    }

    /// All entries of a namespace, ordered by id
    pub fn entries(&self, namespace: Namespace) -> &BTreeMap<AssetId, ContentRef> {
        match namespace {
            Namespace::Images => &self.images,
            Namespace::Metadata => &self.metadata,
        }
    }

    pub fn len(&self, namespace: Namespace) -> usize {
        self.entries(namespace).len()
    }

    fn entries_mut(&mut self, namespace: Namespace) -> &mut Entries {
        match namespace {
            Namespace::Images => &mut self.images,
            Namespace::Metadata => &mut self.metadata,
        }
    }
}

async fn load_namespace(path: &Path) -> Result<Entries, StorageError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    serde_json::from_str(&content).map_err(|e| StorageError::malformed(path, e))
}

/// Replace `path` with the pretty-printed JSON of `value`.
///
/// Writes a hidden sibling temp file, syncs it, then renames it over the
/// target, so readers see either the old or the new document.
pub async fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), StorageError> {
    StagedWrite::json(path, value).await?.commit().await
}

/// A synced temp file waiting to be renamed over its target.
///
/// Staging never touches the target, so several documents can be staged
/// before any of them is committed.
#[derive(Debug)]
pub struct StagedWrite {
    temp: PathBuf,
    target: PathBuf,
}

impl StagedWrite {
    /// Stage the pretty-printed JSON of `value` for `path`
    pub async fn json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<Self, StorageError> {
        let mut content =
            serde_json::to_string_pretty(value).map_err(|source| StorageError::Serialize {
                path: path.to_path_buf(),
                source,
            })?;
        content.push('\n');
        Self::bytes(path, content.as_bytes()).await
    }

    /// Stage raw `content` for `path`
    pub async fn bytes(path: &Path, content: &[u8]) -> Result<Self, StorageError> {
        let parent = parent_dir(path);
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io(parent, e))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = parent.join(format!(".{}.tmp", file_name));

        let mut file = fs::File::create(&temp)
            .await
            .map_err(|e| StorageError::io(&temp, e))?;
        file.write_all(content)
            .await
            .map_err(|e| StorageError::io(&temp, e))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::io(&temp, e))?;

        Ok(Self {
            temp,
            target: path.to_path_buf(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the temp file over the target and sync the directory entry
    pub async fn commit(self) -> Result<(), StorageError> {
        if let Err(e) = fs::rename(&self.temp, &self.target).await {
            let _ = fs::remove_file(&self.temp).await;
            return Err(StorageError::io(&self.target, e));
        }
        sync_dir(parent_dir(&self.target)).await
    }

    /// Drop the temp file without touching the target
    pub async fn discard(self) {
        if let Err(e) = fs::remove_file(&self.temp).await {
            debug!(temp = %self.temp.display(), error = %e, "Failed to remove temp file");
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<(), StorageError> {
    let handle = fs::File::open(dir)
        .await
        .map_err(|e| StorageError::io(dir, e))?;
    handle
        .sync_all()
        .await
        .map_err(|e| StorageError::io(dir, e))
}

// Directory handles cannot be synced here; the rename is as durable as it gets
#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<(), StorageError> {
    Ok(())
}

/// Exclusive advisory lock held for the duration of a run.
///
/// Released when dropped.
#[derive(Debug)]
pub struct RunLock {
    _file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock in `dir` without blocking
    pub fn acquire(dir: &Path) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;

        if file.try_lock_exclusive().is_err() {
            return Err(PipelineError::Locked { path });
        }

        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
