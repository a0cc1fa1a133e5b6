//! Filesystem-backed [`DocumentCache`](super::DocumentCache).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{DocumentCache, Fingerprint, Result};
use crate::domain::ParsedDocument;

/// On-disk cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: Fingerprint,
    stored_at: DateTime<Utc>,
    document: ParsedDocument,
}

/// Filesystem-backed document cache with git-style 2-char sharding.
///
/// Layout: `<root>/documents/<first 2 hex chars>/<remaining hex chars>.json`
pub struct FsDocumentCache {
    documents_dir: PathBuf,
}

impl FsDocumentCache {
    /// Open a cache rooted at `root`. Creates `root/documents/` if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let documents_dir = root.as_ref().join("documents");
        fs::create_dir_all(&documents_dir)?;
        Ok(Self { documents_dir })
    }

    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        let hex = fingerprint.to_hex();
        self.documents_dir
            .join(&hex[..2])
            .join(format!("{}.json", &hex[2..]))
    }
}

impl DocumentCache for FsDocumentCache {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<ParsedDocument>> {
        let path = self.entry_path(fingerprint);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.fingerprint == *fingerprint => Ok(Some(entry.document)),
            Ok(entry) => {
                warn!(
                    expected = %fingerprint,
                    found = %entry.fingerprint,
                    "cache entry fingerprint mismatch, treating as miss"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(fingerprint = %fingerprint, error = %e, "unreadable cache entry, treating as miss");
                Ok(None)
            }
        }
    }

    fn put(&self, fingerprint: &Fingerprint, document: &ParsedDocument) -> Result<()> {
        let path = self.entry_path(fingerprint);
        let shard_dir = match path.parent() {
            Some(dir) => dir.to_path_buf(),
            None => self.documents_dir.clone(),
        };
        fs::create_dir_all(&shard_dir)?;

        let entry = CacheEntry {
            fingerprint: *fingerprint,
            stored_at: Utc::now(),
            document: document.clone(),
        };
        let data = serde_json::to_vec(&entry)?;

        // Atomic write: temp file in the same directory, then rename over the entry.
        let mut tmp = NamedTempFile::new_in(&shard_dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(fingerprint = %fingerprint, bytes = data.len(), "cached parsed document");
        Ok(())
    }

    fn contains(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self.entry_path(fingerprint).exists())
    }

    fn remove(&self, fingerprint: &Fingerprint) -> Result<bool> {
        match fs::remove_file(self.entry_path(fingerprint)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
