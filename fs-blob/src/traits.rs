use std::{
    collections::BTreeMap,
    fmt,
    io::{Read, Write},
};

use data_error::Result;
use serde::{Deserialize, Serialize};

/// Opaque identifier assigned to a stored blob by its backend.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct BlobId(pub String);

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata handed to a backend together with the byte stream.
///
/// The content digest is a dedicated field so free-form `extra` entries
/// can never override it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub filename: String,
    /// Lowercase hex digest of the blob's bytes.
    pub digest: String,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BlobMetadata {
    pub fn new(filename: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            digest: digest.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Descriptive record of one stored blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobInfo {
    pub id: BlobId,
    pub filename: String,
    pub length: u64,
    pub digest: String,
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Boundary to a blob-storage backend.
///
/// The ingestion core never inspects storage internals; it only calls
/// these operations. Durability and replication are the backend's
/// concern.
pub trait BlobStore {
    /// Whether a blob with the given content digest is already stored.
    fn exists_by_digest(&self, digest: &str) -> Result<bool>;

    /// Resolve the identifier of the blob with the given digest,
    /// when the backend supports the reverse lookup.
    fn find_id_by_digest(&self, _digest: &str) -> Result<Option<BlobId>> {
        Ok(None)
    }

    /// Consume the byte stream and persist it under a new identifier.
    fn store(
        &mut self,
        source: &mut dyn Read,
        metadata: BlobMetadata,
    ) -> Result<BlobId>;

    /// Stream the stored bytes into the given sink.
    fn fetch_by_id(&self, id: &BlobId, sink: &mut dyn Write) -> Result<()>;

    /// Remove the blob and its record.
    fn delete_by_id(&mut self, id: &BlobId) -> Result<()>;

    /// Whether a blob with the given identifier is stored.
    fn exists_by_id(&self, id: &BlobId) -> Result<bool>;

    /// Look up the descriptive record for an identifier.
    fn info_by_id(&self, id: &BlobId) -> Result<BlobInfo>;
}
