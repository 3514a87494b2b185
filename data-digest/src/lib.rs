//! # Data Digest
//!
//! `data-digest` computes deterministic content digests over arbitrarily
//! large byte sources while bounding peak memory. The source is consumed
//! as a sequence of bounded windows ([`ByteWindows`]) folded into a single
//! accumulator, so the resulting digest is independent of the window size.
//!
//! Algorithms are resolved through an explicit [`DigestRegistry`] passed
//! by the caller rather than through any process-wide lookup.

use std::{fs, io::Read, path::Path};

use data_error::{IngestError, Result};

mod registry;
mod windows;

pub use registry::{AccumulatorFactory, DigestAccumulator, DigestRegistry};
pub use windows::{ByteWindow, ByteWindows};

/// Default window size: 128 MiB.
pub const DEFAULT_WINDOW_SIZE: usize = 128 * 1024 * 1024;

/// Computes the digest of `len` bytes from `reader` using the named
/// algorithm, reading at most `window_size` bytes at a time.
///
/// Validation order is fixed: the window size is checked first
/// ([`IngestError::InvalidArgument`]), then the algorithm is resolved
/// ([`IngestError::UnsupportedAlgorithm`] carrying the requested name),
/// and only then does any I/O begin. Every window is fed, in order, into
/// one accumulator; the result is the lowercase hex encoding of the
/// finalized digest.
pub fn compute_digest<R: Read>(
    registry: &DigestRegistry,
    reader: R,
    len: u64,
    algorithm: &str,
    window_size: usize,
) -> Result<String> {
    let windows = ByteWindows::new(reader, len, window_size)?;
    let mut accumulator = registry
        .resolve(algorithm)
        .ok_or_else(|| IngestError::UnsupportedAlgorithm(algorithm.to_owned()))?;

    log::debug!(
        "Computing {} digest over {} bytes (window size {})",
        algorithm,
        len,
        window_size
    );

    for window in windows {
        accumulator.update(&window?.bytes);
    }

    Ok(hex::encode(accumulator.finalize()))
}

/// [`compute_digest`] with the default 128 MiB window.
pub fn compute_digest_default<R: Read>(
    registry: &DigestRegistry,
    reader: R,
    len: u64,
    algorithm: &str,
) -> Result<String> {
    compute_digest(registry, reader, len, algorithm, DEFAULT_WINDOW_SIZE)
}

/// Computes the digest of the file at `file_path`.
///
/// The file handle is scoped to this call and closed on every exit path.
pub fn compute_path_digest<P: AsRef<Path>>(
    registry: &DigestRegistry,
    file_path: P,
    algorithm: &str,
) -> Result<String> {
    log::debug!(
        "Computing {} digest for file: {:?}",
        algorithm,
        file_path.as_ref()
    );

    let file = fs::File::open(file_path)?;
    let len = file.metadata()?.len();
    compute_digest_default(registry, file, len, algorithm)
}
