//! Content-addressed cache of parsed documents, keyed by a SHA-256 of the file bytes.

pub mod fs;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as Sha2Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::domain::ParsedDocument;
use crate::metrics::METRICS;

/// SHA-256 of a submission's bytes, used as the cache key.
///
/// Derived from content only: the same file under another name or path
/// produces the same fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint raw bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    /// Fingerprint the contents of a file.
    pub fn of_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::of_bytes(&data))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex().chars().take(12).collect::<String>())
    }
}

impl FromStr for Fingerprint {
    type Err = CacheError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CacheError::InvalidFingerprint(s.to_string()))?;
        if bytes.len() != 32 {
            return Err(CacheError::InvalidFingerprint(s.to_string()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors from document cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid fingerprint hex: {0}")]
    InvalidFingerprint(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Fingerprint-keyed store of parse results.
///
/// Implementations must tolerate concurrent access: different fingerprints
/// never interfere, and concurrent `put`s of the same fingerprint resolve
/// last-writer-wins without corrupting the entry. No eviction is required;
/// a bounded policy can be added behind this trait without touching callers.
pub trait DocumentCache: Send + Sync {
    /// Look up a parse result. A missing entry is `Ok(None)`.
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<ParsedDocument>>;

    /// Store a parse result. Writing the same fingerprint twice is not an error.
    fn put(&self, fingerprint: &Fingerprint, document: &ParsedDocument) -> Result<()>;

    /// Check whether an entry exists without decoding it.
    fn contains(&self, fingerprint: &Fingerprint) -> Result<bool>;

    /// Remove an entry. Returns whether one was present.
    fn remove(&self, fingerprint: &Fingerprint) -> Result<bool>;
}

/// Result of [`get_or_parse`].
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub document: ParsedDocument,
    pub hit: bool,
}

/// Return the cached parse for `fingerprint`, or run `parse` and cache it.
pub fn get_or_parse<C, F>(cache: &C, fingerprint: &Fingerprint, parse: F) -> Result<CacheLookup>
where
    C: DocumentCache + ?Sized,
    F: FnOnce() -> Result<ParsedDocument>,
{
    if let Some(document) = cache.get(fingerprint)? {
        METRICS.inc_cache_hits();
        debug!(fingerprint = %fingerprint, "document cache hit");
        return Ok(CacheLookup { document, hit: true });
    }

    METRICS.inc_cache_misses();
    debug!(fingerprint = %fingerprint, "document cache miss, parsing");
    let document = parse()?;
    cache.put(fingerprint, &document)?;
    Ok(CacheLookup {
        document,
        hit: false,
    })
}
