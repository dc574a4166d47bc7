//! Configuration for assetpin.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (PINATA_JWT, PINATA_API_URL, ASSETPIN_OUTPUT_DIR)
//! 2. Config file (.assetpin/config.yaml)
//! 3. Defaults (./output/images, ./output/drafts, ./output)
//!
//! Config file discovery:
//! - Searches current directory and parents for .assetpin/config.yaml
//! - Paths in config file are relative to the project root (parent of .assetpin/)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::pinata::DEFAULT_API_URL;
use crate::domain::CollectionSettings;

/// Default IPFS gateway used to render https links
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud/ipfs/";

const DEFAULT_IMAGES_SUBDIR: &str = "images";
const DEFAULT_DRAFTS_SUBDIR: &str = "drafts";

/// Default payload selection glob
pub const DEFAULT_PAYLOAD_GLOB: &str = "*.png";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub payload_glob: Option<String>,
    #[serde(default)]
    pub pinata: Option<PinataConfig>,
    #[serde(default)]
    pub collection: Option<CollectionSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Generated images directory
    pub images: Option<String>,
    /// Draft descriptors directory
    pub drafts: Option<String>,
    /// Caches and run outputs directory
    pub output: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinataConfig {
    pub api_url: Option<String>,
    pub gateway_url: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Directory of `<id>.png` payloads
    pub images_dir: PathBuf,
    /// Directory of `<id>.json` drafts
    pub drafts_dir: PathBuf,
    /// Directory of caches and run outputs
    pub output_dir: PathBuf,
    /// Glob selecting payload files
    pub payload_glob: String,
    /// Pinata connection settings
    pub pinata: PinataSettings,
    /// Collection-level metadata fields
    pub collection: CollectionSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Clone)]
pub struct PinataSettings {
    pub api_url: String,
    pub gateway_url: String,
    /// Bearer JWT, only needed when publishing
    pub jwt: Option<String>,
}

impl std::fmt::Debug for PinataSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataSettings")
            .field("api_url", &self.api_url)
            .field("gateway_url", &self.gateway_url)
            .field("jwt", &self.jwt.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ResolvedConfig {
    /// The Pinata JWT, or an error naming the missing variable
    pub fn pinata_jwt(&self) -> Result<&str> {
        self.pinata
            .jwt
            .as_deref()
            .filter(|jwt| !jwt.trim().is_empty())
            .context("Missing PINATA_JWT in environment")
    }

    /// Override directories given on the command line.
    ///
    /// A new output directory also moves images and drafts that were left at
    /// their defaults under it, like `ASSETPIN_OUTPUT_DIR` does.
    pub fn with_overrides(
        mut self,
        images: Option<PathBuf>,
        drafts: Option<PathBuf>,
        output: Option<PathBuf>,
    ) -> Self {
        if let Some(output) = output {
            if self.images_dir == self.output_dir.join(DEFAULT_IMAGES_SUBDIR) {
                self.images_dir = output.join(DEFAULT_IMAGES_SUBDIR);
            }
            if self.drafts_dir == self.output_dir.join(DEFAULT_DRAFTS_SUBDIR) {
                self.drafts_dir = output.join(DEFAULT_DRAFTS_SUBDIR);
            }
            self.output_dir = output;
        }
        if let Some(images) = images {
            self.images_dir = images;
        }
        if let Some(drafts) = drafts {
            self.drafts_dir = drafts;
        }
        self
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".assetpin").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Load configuration starting the file search at `start`, reading
/// environment variables through `env`
pub fn load_config_from<F>(start: &Path, env: F) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config_file = find_config_file(start);

    let (base_dir, file) = match config_file {
        Some(ref config_path) => {
            let config = load_config_file(config_path)?;
            // Project root is the parent of .assetpin/
            let base_dir = config_path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(start)
                .to_path_buf();
            (base_dir, Some(config))
        }
        None => (start.to_path_buf(), None),
    };

    let paths = file.as_ref().map(|c| c.paths.clone()).unwrap_or_default();
    let default_output = "output".to_string();

    let output_dir = match env("ASSETPIN_OUTPUT_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => resolve_path(&base_dir, paths.output.as_ref().unwrap_or(&default_output)),
    };

    let images_dir = match paths.images {
        Some(ref images) => resolve_path(&base_dir, images),
        None => output_dir.join(DEFAULT_IMAGES_SUBDIR),
    };

    let drafts_dir = match paths.drafts {
        Some(ref drafts) => resolve_path(&base_dir, drafts),
        None => output_dir.join(DEFAULT_DRAFTS_SUBDIR),
    };

    let pinata_file = file.as_ref().and_then(|c| c.pinata.clone());
    let pinata = PinataSettings {
        api_url: env("PINATA_API_URL")
            .or_else(|| pinata_file.as_ref().and_then(|p| p.api_url.clone()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        gateway_url: pinata_file
            .as_ref()
            .and_then(|p| p.gateway_url.clone())
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
        jwt: env("PINATA_JWT"),
    };

    let payload_glob = file
        .as_ref()
        .and_then(|c| c.payload_glob.clone())
        .unwrap_or_else(|| DEFAULT_PAYLOAD_GLOB.to_string());

    let collection = file
        .and_then(|c| c.collection)
        .unwrap_or_default();

    Ok(ResolvedConfig {
        images_dir,
        drafts_dir,
        output_dir,
        payload_glob,
        pinata,
        collection,
        config_file,
    })
}

/// Load configuration from the current directory and process environment
pub fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_config_from(&cwd, |key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let config = load_config_from(temp.path(), no_env).unwrap();

        assert_eq!(config.output_dir, temp.path().join("output"));
        assert_eq!(config.images_dir, temp.path().join("output").join("images"));
        assert_eq!(config.drafts_dir, temp.path().join("output").join("drafts"));
        assert_eq!(config.payload_glob, "*.png");
        assert_eq!(config.pinata.api_url, DEFAULT_API_URL);
        assert!(config.config_file.is_none());
        assert!(config.pinata_jwt().is_err());
    }

    #[test]
    fn test_config_file_parsing_and_discovery() {
        let temp = TempDir::new().unwrap();
        let dot_dir = temp.path().join(".assetpin");
        std::fs::create_dir_all(&dot_dir).unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let mut file = std::fs::File::create(dot_dir.join("config.yaml")).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  images: art/png
  output: build
payload_glob: "*.webp"
pinata:
  gateway_url: https://ipfs.example/ipfs/
collection:
  name: Lions
  network_label: Solana Devnet
  include_prompt_trait: true
"#
        )
        .unwrap();

        let config = load_config_from(&nested, no_env).unwrap();
        assert_eq!(config.images_dir, temp.path().join("art/png"));
        assert_eq!(config.output_dir, temp.path().join("build"));
        assert_eq!(config.drafts_dir, temp.path().join("build").join("drafts"));
        assert_eq!(config.payload_glob, "*.webp");
        assert_eq!(config.pinata.gateway_url, "https://ipfs.example/ipfs/");
        assert_eq!(config.collection.name, "Lions");
        assert_eq!(config.collection.network_label, "Solana Devnet");
        assert!(config.collection.include_prompt_trait);
        // Unset collection fields keep their defaults
        assert_eq!(config.collection.network_trait_type, "Network");
    }

    #[test]
    fn test_env_overrides() {
        let temp = TempDir::new().unwrap();
        let env: HashMap<&str, &str> = [
            ("PINATA_JWT", "secret"),
            ("PINATA_API_URL", "http://127.0.0.1:1234"),
            ("ASSETPIN_OUTPUT_DIR", "/tmp/pins"),
        ]
        .into_iter()
        .collect();

        let config =
            load_config_from(temp.path(), |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.pinata_jwt().unwrap(), "secret");
        assert_eq!(config.pinata.api_url, "http://127.0.0.1:1234");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/pins"));
        assert!(!format!("{:?}", config.pinata).contains("secret"));
    }

    #[test]
    fn test_cli_overrides() {
        let temp = TempDir::new().unwrap();
        let config = load_config_from(temp.path(), no_env)
            .unwrap()
            .with_overrides(Some(PathBuf::from("/imgs")), None, None);

        assert_eq!(config.images_dir, PathBuf::from("/imgs"));
        assert_eq!(config.drafts_dir, temp.path().join("output").join("drafts"));
    }

    #[test]
    fn test_output_override_moves_default_dirs() {
        let temp = TempDir::new().unwrap();
        let base = load_config_from(temp.path(), no_env).unwrap();

        let config = base
            .clone()
            .with_overrides(None, None, Some(PathBuf::from("/pins")));
        assert_eq!(config.output_dir, PathBuf::from("/pins"));
        assert_eq!(config.images_dir, PathBuf::from("/pins/images"));
        assert_eq!(config.drafts_dir, PathBuf::from("/pins/drafts"));

        // Same layout as the environment override
        let env_config = load_config_from(temp.path(), |k| {
            (k == "ASSETPIN_OUTPUT_DIR").then(|| "/pins".to_string())
        })
        .unwrap();
        assert_eq!(config.images_dir, env_config.images_dir);
        assert_eq!(config.drafts_dir, env_config.drafts_dir);

        // Explicit directories still win
        let config = base.with_overrides(
            Some(PathBuf::from("/imgs")),
            None,
            Some(PathBuf::from("/pins")),
        );
        assert_eq!(config.images_dir, PathBuf::from("/imgs"));
        assert_eq!(config.drafts_dir, PathBuf::from("/pins/drafts"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/./subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
