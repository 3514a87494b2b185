use std::collections::BTreeMap;

use data_digest::{compute_digest, DigestRegistry, DEFAULT_WINDOW_SIZE};
use data_error::{IngestError, Result};
use fs_rewind::RewindableFile;

use crate::traits::{BlobId, BlobMetadata, BlobStore};

/// Ingestion checkpoint enforcing at-most-one stored copy per distinct
/// digest.
///
/// For each upload the gate hashes the stream, rewinds it, checks the
/// digest against the backend, and only then stores. Side effects are
/// strictly ordered: no store call is made for a known digest, and no
/// store call is made if hashing failed. The gate itself is stateless
/// between calls; all persistence belongs to the backend.
pub struct DedupGate<'a, S> {
    store: &'a mut S,
    registry: &'a DigestRegistry,
    algorithm: String,
    window_size: usize,
}

impl<'a, S: BlobStore> DedupGate<'a, S> {
    pub fn new(
        store: &'a mut S,
        registry: &'a DigestRegistry,
        algorithm: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            algorithm: algorithm.into(),
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }

    /// Override the hashing window size.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Ingest one upload.
    ///
    /// Expects a freshly opened source positioned at 0; the auto-rewind
    /// policy was chosen by the caller when opening it. Fails with
    /// [`IngestError::DuplicateContent`] when the digest is already known,
    /// in which case the backend's `store` is never invoked. On success
    /// returns the backend identifier together with the computed digest.
    pub fn ingest(
        &mut self,
        mut source: RewindableFile,
        filename: &str,
        extra: BTreeMap<String, serde_json::Value>,
    ) -> Result<(BlobId, String)> {
        // Checkpoint before any bytes are consumed.
        source.mark()?;

        let len = source.len();
        let digest = compute_digest(
            self.registry,
            &mut source,
            len,
            &self.algorithm,
            self.window_size,
        )?;

        // Rewind for the storage pass.
        source.reset()?;

        if self.store.exists_by_digest(&digest)? {
            let existing = self
                .store
                .find_id_by_digest(&digest)?
                .map(|id| id.to_string());
            log::debug!(
                "Rejecting upload of {}: digest {} already stored",
                filename,
                digest
            );
            return Err(IngestError::DuplicateContent { digest, existing });
        }

        let mut metadata = BlobMetadata::new(filename, digest.clone());
        metadata.extra = extra;

        let id = self.store.store(&mut source, metadata)?;
        log::debug!("Ingested {} as {} (digest {})", filename, id, digest);
        Ok((id, digest))
    }
}
