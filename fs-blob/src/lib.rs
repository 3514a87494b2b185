//! # FS Blob
//!
//! `fs-blob` is the storage side of the content-addressable ingestion
//! kernel: the [`BlobStore`] backend boundary, a filesystem reference
//! backend ([`FolderBlobStore`]), and the [`DedupGate`] that orders every
//! upload as hash, existence check, rewind, store.

pub mod folder;
pub mod gate;
pub mod traits;

pub use folder::FolderBlobStore;
pub use gate::DedupGate;
pub use traits::{BlobId, BlobInfo, BlobMetadata, BlobStore};
