use std::{
    collections::BTreeMap,
    fs::File,
    io::{Read, Write},
};

use tempdir::TempDir;

use data_digest::DigestRegistry;
use data_error::{IngestError, Result};
use fs_blob::{
    BlobId, BlobInfo, BlobMetadata, BlobStore, DedupGate, FolderBlobStore,
};
use fs_rewind::RewindableFile;

const HELLO_WORLD_SHA256: &str =
    "a591a6d40bf420404a011733cfb7b190d62c65bf0bcda32b57b277d9ad9f146e";

/// In-memory backend that records every `store` invocation, so tests can
/// assert the gate never stores a known duplicate.
struct CountingStore {
    blobs: BTreeMap<String, (Vec<u8>, BlobMetadata)>,
    store_calls: usize,
    next_id: usize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            blobs: BTreeMap::new(),
            store_calls: 0,
            next_id: 0,
        }
    }
}

impl BlobStore for CountingStore {
    fn exists_by_digest(&self, digest: &str) -> Result<bool> {
        Ok(self
            .blobs
            .values()
            .any(|(_, metadata)| metadata.digest == digest))
    }

    fn find_id_by_digest(&self, digest: &str) -> Result<Option<BlobId>> {
        Ok(self
            .blobs
            .iter()
            .find(|(_, (_, metadata))| metadata.digest == digest)
            .map(|(id, _)| BlobId(id.clone())))
    }

    fn store(
        &mut self,
        source: &mut dyn Read,
        metadata: BlobMetadata,
    ) -> Result<BlobId> {
        self.store_calls += 1;
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;

        let id = format!("blob-{}", self.next_id);
        self.next_id += 1;
        self.blobs.insert(id.clone(), (bytes, metadata));
        Ok(BlobId(id))
    }

    fn fetch_by_id(&self, id: &BlobId, sink: &mut dyn Write) -> Result<()> {
        let (bytes, _) = self.blobs.get(&id.0).ok_or_else(|| {
            IngestError::Storage(
                "CountingStore".to_string(),
                format!("ID {} does not exist", id),
            )
        })?;
        sink.write_all(bytes)?;
        Ok(())
    }

    fn delete_by_id(&mut self, id: &BlobId) -> Result<()> {
        self.blobs.remove(&id.0).ok_or_else(|| {
            IngestError::Storage(
                "CountingStore".to_string(),
                format!("ID {} does not exist", id),
            )
        })?;
        Ok(())
    }

    fn exists_by_id(&self, id: &BlobId) -> Result<bool> {
        Ok(self.blobs.contains_key(&id.0))
    }

    fn info_by_id(&self, id: &BlobId) -> Result<BlobInfo> {
        let (bytes, metadata) = self.blobs.get(&id.0).ok_or_else(|| {
            IngestError::Storage(
                "CountingStore".to_string(),
                format!("ID {} does not exist", id),
            )
        })?;
        Ok(BlobInfo {
            id: id.clone(),
            filename: metadata.filename.clone(),
            length: bytes.len() as u64,
            digest: metadata.digest.clone(),
            extra: metadata.extra.clone(),
        })
    }
}

fn create_upload(dir: &TempDir, name: &str, content: &[u8]) -> RewindableFile {
    let path = dir.path().join(name);
    let mut file = File::create(&path).expect("Failed to create test file");
    file.write_all(content).expect("Failed to write test file");
    drop(file);
    RewindableFile::open(&path).expect("Failed to open upload")
}

#[test]
fn ingest_stores_stream_with_digest_metadata() {
    let temp_dir =
        TempDir::new("tmp").expect("Failed to create temporary directory");
    let mut store = CountingStore::new();
    let registry = DigestRegistry::default();

    let upload = create_upload(&temp_dir, "hello.txt", b"Hello World");
    let (id, digest) = DedupGate::new(&mut store, &registry, "SHA-256")
        .ingest(upload, "hello.txt", BTreeMap::new())
        .expect("Failed to ingest upload");

    assert_eq!(digest, HELLO_WORLD_SHA256);
    assert_eq!(store.store_calls, 1);

    // The stored bytes are the full rewound stream, not a suffix.
    let mut fetched = Vec::new();
    store
        .fetch_by_id(&id, &mut fetched)
        .expect("Failed to fetch blob");
    assert_eq!(fetched, b"Hello World");

    let info = store.info_by_id(&id).expect("Failed to look up info");
    assert_eq!(info.digest, HELLO_WORLD_SHA256);
    assert_eq!(info.length, 11);
}

#[test]
fn second_ingest_of_identical_content_is_rejected_before_store() {
    let temp_dir =
        TempDir::new("tmp").expect("Failed to create temporary directory");
    let mut store = CountingStore::new();
    let registry = DigestRegistry::default();

    let first = create_upload(&temp_dir, "a.bin", b"identical content");
    let (first_id, first_digest) =
        DedupGate::new(&mut store, &registry, "SHA-256")
            .ingest(first, "a.bin", BTreeMap::new())
            .expect("Failed to ingest first upload");
    assert_eq!(store.store_calls, 1);

    // Same bytes under a different name: same digest, rejected.
    let second = create_upload(&temp_dir, "b.bin", b"identical content");
    let err = DedupGate::new(&mut store, &registry, "SHA-256")
        .ingest(second, "b.bin", BTreeMap::new())
        .expect_err("duplicate content must be rejected");

    match err {
        IngestError::DuplicateContent { digest, existing } => {
            assert_eq!(digest, first_digest);
            assert_eq!(existing, Some(first_id.to_string()));
        }
        other => panic!("expected DuplicateContent, got {other:?}"),
    }
    // The backend was never asked to store the duplicate.
    assert_eq!(store.store_calls, 1);
}

#[test]
fn distinct_content_is_stored_separately() {
    let temp_dir =
        TempDir::new("tmp").expect("Failed to create temporary directory");
    let mut store = CountingStore::new();
    let registry = DigestRegistry::default();

    let first = create_upload(&temp_dir, "a.txt", b"first");
    let second = create_upload(&temp_dir, "b.txt", b"second");

    let mut gate = DedupGate::new(&mut store, &registry, "SHA-256");
    let (id_a, digest_a) = gate
        .ingest(first, "a.txt", BTreeMap::new())
        .expect("Failed to ingest first upload");
    let (id_b, digest_b) = gate
        .ingest(second, "b.txt", BTreeMap::new())
        .expect("Failed to ingest second upload");

    assert_ne!(id_a, id_b);
    assert_ne!(digest_a, digest_b);
    assert_eq!(store.store_calls, 2);
}

#[test]
fn unsupported_algorithm_fails_without_touching_the_store() {
    let temp_dir =
        TempDir::new("tmp").expect("Failed to create temporary directory");
    let mut store = CountingStore::new();
    let registry = DigestRegistry::default();

    let upload = create_upload(&temp_dir, "c.txt", b"content");
    let err = DedupGate::new(&mut store, &registry, "NON_EXISTENT_ALGO")
        .ingest(upload, "c.txt", BTreeMap::new())
        .expect_err("unknown algorithm must fail");

    assert!(matches!(err, IngestError::UnsupportedAlgorithm(_)));
    assert_eq!(store.store_calls, 0);
}

#[test]
fn zero_window_size_fails_without_touching_the_store() {
    let temp_dir =
        TempDir::new("tmp").expect("Failed to create temporary directory");
    let mut store = CountingStore::new();
    let registry = DigestRegistry::default();

    let upload = create_upload(&temp_dir, "d.txt", b"content");
    let err = DedupGate::new(&mut store, &registry, "SHA-256")
        .with_window_size(0)
        .ingest(upload, "d.txt", BTreeMap::new())
        .expect_err("zero window must fail");

    assert!(matches!(err, IngestError::InvalidArgument(_)));
    assert_eq!(store.store_calls, 0);
}

#[test]
fn io_failure_during_hashing_aborts_before_store() {
    let temp_dir =
        TempDir::new("tmp").expect("Failed to create temporary directory");
    let mut store = CountingStore::new();
    let registry = DigestRegistry::default();

    let path = temp_dir.path().join("shrinking.bin");
    let mut file = File::create(&path).expect("Failed to create test file");
    file.write_all(b"ABCDEFGH")
        .expect("Failed to write test file");
    drop(file);

    let upload = RewindableFile::open(&path).expect("Failed to open upload");

    // Shrink the file behind the open handle so the hashing pass hits
    // end-of-file before the prefetched length is consumed.
    std::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .expect("Failed to reopen test file")
        .set_len(3)
        .expect("Failed to truncate test file");

    let err = DedupGate::new(&mut store, &registry, "SHA-256")
        .ingest(upload, "shrinking.bin", BTreeMap::new())
        .expect_err("truncated source must fail");

    assert!(matches!(err, IngestError::Io(_)));
    // Hashing failed, so the backend was never asked to store anything.
    assert_eq!(store.store_calls, 0);
}

#[test]
fn gate_works_against_the_folder_backend() {
    let upload_dir =
        TempDir::new("tmp").expect("Failed to create temporary directory");
    let store_dir =
        TempDir::new("tmp").expect("Failed to create temporary directory");

    let mut store =
        FolderBlobStore::new("IngestStore".to_string(), store_dir.path())
            .expect("Failed to open blob store");
    let registry = DigestRegistry::default();

    let upload = create_upload(&upload_dir, "hello.txt", b"Hello World");
    let (id, digest) = DedupGate::new(&mut store, &registry, "SHA-256")
        .with_window_size(4)
        .ingest(upload, "hello.txt", BTreeMap::new())
        .expect("Failed to ingest upload");

    assert_eq!(digest, HELLO_WORLD_SHA256);
    assert!(store.exists_by_id(&id).unwrap());

    let mut fetched = Vec::new();
    store
        .fetch_by_id(&id, &mut fetched)
        .expect("Failed to fetch blob");
    assert_eq!(fetched, b"Hello World");

    // Replaying the same content is rejected with the recorded digest.
    let replay = create_upload(&upload_dir, "replay.txt", b"Hello World");
    let err = DedupGate::new(&mut store, &registry, "SHA-256")
        .ingest(replay, "replay.txt", BTreeMap::new())
        .expect_err("duplicate content must be rejected");
    assert!(err.is_duplicate());
    assert_eq!(store.total_count(), 1);
}
