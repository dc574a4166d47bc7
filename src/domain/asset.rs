//! Asset identity and content references.
//!
//! An [`AssetId`] ties a payload file, its draft descriptor, and its cache
//! entries together. A [`ContentRef`] is the opaque locator handed back by the
//! content-addressable store.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// URI scheme used for references into IPFS
pub const IPFS_SCHEME: &str = "ipfs://";

/// Canonical asset identifier: a non-empty run of ASCII decimal digits
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    /// Parse an identifier from a bare string.
    ///
    /// Returns `None` for anything other than one or more ASCII digits.
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    /// Derive the identifier from a file name by stripping its extension.
    ///
    /// `"42.png"` and `"42.json"` both yield `42`; `"cat.png"` and
    /// `"4-2.png"` yield `None`.
    pub fn from_filename(file_name: impl AsRef<Path>) -> Option<Self> {
        let stem = file_name.as_ref().file_stem()?.to_str()?;
        Self::parse(stem)
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AssetId {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| format!("invalid asset id '{}'", raw))
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to content stored in the content-addressable store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    /// Wrap an existing reference string
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Build an `ipfs://` reference from a content identifier (CID)
    pub fn from_cid(cid: &str) -> Self {
        Self(format!("{}{}", IPFS_SCHEME, cid))
    }

    /// Borrow the reference as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the reference as an HTTPS URL through a gateway.
    ///
    /// Non-IPFS references are returned unchanged.
    pub fn gateway_url(&self, gateway_base: &str) -> String {
        match self.0.strip_prefix(IPFS_SCHEME) {
            Some(cid) => format!("{}/{}", gateway_base.trim_end_matches('/'), cid),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_numeric_filename() {
        let id = AssetId::from_filename("1712345678901.png").unwrap();
        assert_eq!(id.as_str(), "1712345678901");
        assert_eq!(AssetId::from_filename("7.json"), AssetId::parse("7"));
    }

    #[test]
    fn test_id_rejects_non_digit_stems() {
        assert!(AssetId::from_filename("cat.png").is_none());
        assert!(AssetId::from_filename("12a.png").is_none());
        assert!(AssetId::from_filename("-12.png").is_none());
        assert!(AssetId::from_filename(".png").is_none());
        assert!(AssetId::parse("").is_none());
    }

    #[test]
    fn test_id_keeps_leading_zeros() {
        // "007" and "7" name different files, so they stay distinct
        assert_ne!(AssetId::parse("007"), AssetId::parse("7"));
    }

    #[test]
    fn test_id_deserialization_validates() {
        let id: AssetId = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(id.as_str(), "12");
        assert!(serde_json::from_str::<AssetId>("\"x1\"").is_err());
    }

    #[test]
    fn test_content_ref_from_cid() {
        let r = ContentRef::from_cid("bafyabc");
        assert_eq!(r.as_str(), "ipfs://bafyabc");
        assert_eq!(r, ContentRef::new("ipfs://bafyabc"));
    }

    #[test]
    fn test_gateway_url() {
        let r = ContentRef::from_cid("QmHash");
        assert_eq!(
            r.gateway_url("https://gateway.pinata.cloud/ipfs/"),
            "https://gateway.pinata.cloud/ipfs/QmHash"
        );

        let plain = ContentRef::new("https://example.com/x.json");
        assert_eq!(plain.gateway_url("https://gw/ipfs"), "https://example.com/x.json");
    }
}
