//! # FS Rewind
//!
//! `fs-rewind` provides [`RewindableFile`], a forward-reading byte source
//! with seek-backed mark/reset support. Unlike buffered mark/reset
//! streams, rewinding is unconditional: no capacity hint is needed because
//! the checkpoint is a seek position, not buffered memory.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use data_error::Result;

/// A file-backed byte source supporting `mark`/`reset` checkpoints and an
/// optional auto-rewind policy.
///
/// The mark position defaults to 0 (start of file) until
/// [`mark`](RewindableFile::mark) is called; it is never auto-cleared.
/// With `auto_rewind` enabled, [`reset`](RewindableFile::reset) performed
/// at or past end-of-file seeks back to offset 0 and the mark is ignored;
/// this priority holds even when a mid-stream mark was set.
///
/// Single-owner: all operations take `&mut self`, so a shared instance
/// requires an external exclusive lock. Distinct instances are fully
/// independent.
pub struct RewindableFile {
    file: File,
    len: u64,
    mark_position: u64,
    auto_rewind: bool,
}

impl RewindableFile {
    /// Wrap an open file, pre-fetching its length once.
    pub fn new(file: File, auto_rewind: bool) -> Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            len,
            mark_position: 0,
            auto_rewind,
        })
    }

    /// Open the file at `path` with auto-rewind disabled.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_policy(path, false)
    }

    /// Open the file at `path` with explicit control over the
    /// auto-rewind policy.
    pub fn open_with_policy<P: AsRef<Path>>(
        path: P,
        auto_rewind: bool,
    ) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        log::debug!(
            "Opened rewindable file {:?} (auto_rewind: {})",
            path.as_ref(),
            auto_rewind
        );
        Self::new(file, auto_rewind)
    }

    /// Total length of the underlying file in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current cursor position.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    /// Record the current cursor position as the reset checkpoint.
    pub fn mark(&mut self) -> Result<()> {
        self.mark_position = self.file.stream_position()?;
        log::trace!("Marked position {}", self.mark_position);
        Ok(())
    }

    /// Seek back to the checkpoint.
    ///
    /// When `auto_rewind` is enabled and the cursor is at or past
    /// end-of-file, this seeks to offset 0 instead of the mark — the
    /// auto-rewind takes priority over an explicit mid-stream mark.
    pub fn reset(&mut self) -> Result<()> {
        if self.auto_rewind {
            let position = self.file.stream_position()?;
            if position >= self.len {
                self.file.seek(SeekFrom::Start(0))?;
                return Ok(());
            }
        }

        self.file.seek(SeekFrom::Start(self.mark_position))?;
        Ok(())
    }
}

impl Read for RewindableFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}
