//! Cache of optimized assets, kept across runs
//!
//! Entries are keyed by a caller supplied key and tagged with metadata; a
//! lookup only hits when the stored metadata equals the requested one, so
//! a changed source (new ETag) or a new codec version invalidates it.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, TableError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");
const META: TableDefinition<&str, &str> = TableDefinition::new("meta");

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redb::Error),

    #[error("corrupted cache metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Invalidation tags stored alongside a cached blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    /// Stability identifier of the source (ETag, Last-Modified, ...)
    pub ident: String,
    /// Codec / optimization preset version
    pub version: String,
}

pub trait OptimizationCache: Send + Sync {
    /// `Ok(None)` on a miss, including when metadata does not match.
    fn get(&self, key: &str, meta: &CacheMeta) -> Result<Option<Vec<u8>>, CacheError>;

    fn put(&self, key: &str, meta: &CacheMeta, data: &[u8]) -> Result<(), CacheError>;
}

/// On-disk cache backed by a redb database.
pub struct RedbCache {
    db: Database,
}

impl RedbCache {
    pub fn open(path: &Path) -> Result<RedbCache, CacheError> {
        let db = Database::create(path).map_err(redb::Error::from)?;
        Ok(RedbCache { db })
    }

    fn digest(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }

    fn read(&self, digest: &str) -> Result<Option<(String, Vec<u8>)>, redb::Error> {
        let txn = self.db.begin_read()?;

        let meta_table = match txn.open_table(META) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let blobs_table = match txn.open_table(BLOBS) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let meta = match meta_table.get(digest)? {
            Some(meta) => meta.value().to_string(),
            None => return Ok(None),
        };
        let data = match blobs_table.get(digest)? {
            Some(data) => data.value().to_vec(),
            None => return Ok(None),
        };

        Ok(Some((meta, data)))
    }

    fn write(&self, digest: &str, meta: &str, data: &[u8]) -> Result<(), redb::Error> {
        let txn = self.db.begin_write()?;
        {
            let mut blobs_table = txn.open_table(BLOBS)?;
            blobs_table.insert(digest, data)?;
            let mut meta_table = txn.open_table(META)?;
            meta_table.insert(digest, meta)?;
        }
        txn.commit()?;
        Ok(())
    }
}

impl OptimizationCache for RedbCache {
    fn get(&self, key: &str, meta: &CacheMeta) -> Result<Option<Vec<u8>>, CacheError> {
        let Some((stored_meta, data)) = self.read(&Self::digest(key))? else {
            return Ok(None);
        };

        let stored_meta: CacheMeta = serde_json::from_str(&stored_meta)?;
        if &stored_meta != meta {
            return Ok(None);
        }

        Ok(Some(data))
    }

    fn put(&self, key: &str, meta: &CacheMeta, data: &[u8]) -> Result<(), CacheError> {
        let meta = serde_json::to_string(meta)?;
        self.write(&Self::digest(key), &meta, data)?;
        Ok(())
    }
}
