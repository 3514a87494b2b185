use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::{BlobId, BlobInfo, BlobMetadata, BlobStore};
use data_error::{IngestError, Result};

const STORAGE_VERSION: i32 = 1;

/// File name of the JSON index inside the store folder.
pub const INDEX_FILE: &str = "index.json";

/// Folder holding the blob payload files, one per identifier.
pub const BLOBS_FOLDER: &str = "blobs";

/// Filesystem-backed blob store.
///
/// One payload file per blob (named by a v4 UUID) under `blobs/`, plus a
/// versioned JSON index mapping identifiers to their records.
#[derive(Debug)]
pub struct FolderBlobStore {
    label: String,
    root: PathBuf,
    index: FolderIndex,
}

/// The data that is serialized and deserialized to and from the index file.
#[derive(Debug, Serialize, Deserialize)]
struct FolderIndex {
    version: i32,
    entries: BTreeMap<String, BlobRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlobRecord {
    filename: String,
    length: u64,
    digest: String,
    extra: BTreeMap<String, serde_json::Value>,
}

impl FolderBlobStore {
    /// Open (or initialize) a store rooted at `root`,
    /// with a diagnostic label used in error reports.
    pub fn new(label: String, root: &Path) -> Result<Self> {
        fs::create_dir_all(root.join(BLOBS_FOLDER))?;

        let index_path = root.join(INDEX_FILE);
        let index = if index_path.exists() {
            let contents = fs::read_to_string(&index_path)?;
            let index: FolderIndex = serde_json::from_str(&contents)
                .map_err(|e| {
                    IngestError::Storage(label.clone(), e.to_string())
                })?;
            if index.version != STORAGE_VERSION {
                return Err(IngestError::Storage(
                    label,
                    format!(
                        "Unsupported storage version: {}",
                        index.version
                    ),
                ));
            }
            index
        } else {
            FolderIndex {
                version: STORAGE_VERSION,
                entries: BTreeMap::new(),
            }
        };

        Ok(Self {
            label,
            root: PathBuf::from(root),
            index,
        })
    }

    /// Total number of stored blobs.
    pub fn total_count(&self) -> usize {
        self.index.entries.len()
    }

    fn blob_path(&self, id: &BlobId) -> PathBuf {
        self.root.join(BLOBS_FOLDER).join(&id.0)
    }

    fn record(&self, id: &BlobId) -> Result<&BlobRecord> {
        self.index.entries.get(&id.0).ok_or_else(|| {
            IngestError::Storage(
                self.label.clone(),
                format!("ID {} does not exist", id),
            )
        })
    }

    fn write_index(&self) -> Result<()> {
        let file = File::create(self.root.join(INDEX_FILE))?;
        let mut writer = BufWriter::new(file);
        let contents =
            serde_json::to_string_pretty(&self.index).map_err(|e| {
                IngestError::Storage(self.label.clone(), e.to_string())
            })?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

impl BlobStore for FolderBlobStore {
    fn exists_by_digest(&self, digest: &str) -> Result<bool> {
        Ok(self
            .index
            .entries
            .values()
            .any(|record| record.digest == digest))
    }

    fn find_id_by_digest(&self, digest: &str) -> Result<Option<BlobId>> {
        Ok(self
            .index
            .entries
            .iter()
            .find(|(_, record)| record.digest == digest)
            .map(|(id, _)| BlobId(id.clone())))
    }

    fn store(
        &mut self,
        source: &mut dyn Read,
        metadata: BlobMetadata,
    ) -> Result<BlobId> {
        let id = BlobId(Uuid::new_v4().to_string());
        let path = self.blob_path(&id);

        let length = {
            let file = File::create(&path)?;
            let mut writer = BufWriter::new(file);
            match std::io::copy(source, &mut writer) {
                Ok(length) => {
                    writer.flush()?;
                    length
                }
                Err(e) => {
                    // Do not leave a partial payload behind.
                    drop(writer);
                    let _ = fs::remove_file(&path);
                    return Err(e.into());
                }
            }
        };

        log::debug!(
            "Stored blob {} ({} bytes, digest {})",
            id,
            length,
            metadata.digest
        );

        self.index.entries.insert(
            id.0.clone(),
            BlobRecord {
                filename: metadata.filename,
                length,
                digest: metadata.digest,
                extra: metadata.extra,
            },
        );
        self.write_index()?;

        Ok(id)
    }

    fn fetch_by_id(&self, id: &BlobId, sink: &mut dyn Write) -> Result<()> {
        self.record(id)?;

        let mut file = File::open(self.blob_path(id))?;
        std::io::copy(&mut file, sink)?;
        Ok(())
    }

    fn delete_by_id(&mut self, id: &BlobId) -> Result<()> {
        self.record(id)?;

        fs::remove_file(self.blob_path(id))?;
        self.index.entries.remove(&id.0);
        self.write_index()?;

        log::debug!("Deleted blob {}", id);
        Ok(())
    }

    fn exists_by_id(&self, id: &BlobId) -> Result<bool> {
        Ok(self.index.entries.contains_key(&id.0))
    }

    fn info_by_id(&self, id: &BlobId) -> Result<BlobInfo> {
        let record = self.record(id)?;
        Ok(BlobInfo {
            id: id.clone(),
            filename: record.filename.clone(),
            length: record.length,
            digest: record.digest.clone(),
            extra: record.extra.clone(),
        })
    }
}
