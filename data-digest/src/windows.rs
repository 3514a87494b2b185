use std::io::Read;

use data_error::{IngestError, Result};

/// One contiguous slice of the source bytes, produced in order.
pub struct ByteWindow {
    /// Offset of the first byte of this window within the source.
    pub offset: u64,
    pub bytes: Vec<u8>,
}

impl ByteWindow {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Lazy, finite, non-restartable sequence of byte windows covering a
/// source exactly once, in order.
///
/// Starting at offset 0, each step yields `min(window_size, len - offset)`
/// bytes and advances by that amount; iteration ends when the offset
/// reaches `len`. Restarting requires rewinding the reader and building a
/// new iterator. The windowing bounds peak memory and has no effect on
/// the logical byte sequence, so any digest folded over the windows is
/// independent of the window size.
pub struct ByteWindows<R> {
    reader: R,
    len: u64,
    window_size: usize,
    offset: u64,
}

impl<R: Read> ByteWindows<R> {
    /// Fails with [`IngestError::InvalidArgument`] on a zero window size,
    /// before any window is produced.
    pub fn new(reader: R, len: u64, window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(IngestError::InvalidArgument(
                "window size must be positive".to_owned(),
            ));
        }

        Ok(Self {
            reader,
            len,
            window_size,
            offset: 0,
        })
    }
}

impl<R: Read> Iterator for ByteWindows<R> {
    type Item = Result<ByteWindow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.len {
            return None;
        }

        let remaining = self.len - self.offset;
        let take = remaining.min(self.window_size as u64) as usize;

        let mut bytes = vec![0; take];
        if let Err(e) = self.reader.read_exact(&mut bytes) {
            // Fuse the iterator so a failed read is not retried.
            self.offset = self.len;
            return Some(Err(e.into()));
        }

        let window = ByteWindow {
            offset: self.offset,
            bytes,
        };
        self.offset += take as u64;
        Some(Ok(window))
    }
}
