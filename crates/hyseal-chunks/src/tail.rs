//! Tail-aware chunking
//!
//! Decryption reads `[ciphertext][tag]` as one stream without knowing its
//! length up front. The reader keeps a window of `chunk_size + tail_len`
//! bytes and only ever releases bytes that are followed by at least
//! `tail_len` more, so the tag is never handed out as ciphertext. Once the
//! source is exhausted the held-back bytes are returned as the tail.
//!
//! ```text
//!   window: [ released to callback ........ | held back (tail_len) ]
//! ```

use std::io::{self, Read};

use crate::{read_full, DEFAULT_CHUNK_SIZE};

/// Chunk driver that withholds the final `tail_len` bytes of its source.
#[derive(Debug)]
pub struct TailAwareReader<R> {
    inner: R,
    chunk_size: usize,
    tail_len: usize,
}

impl<R: Read> TailAwareReader<R> {
    /// Tail-aware chunking with the default 1024-byte window.
    pub fn new(inner: R, tail_len: usize) -> Self {
        Self::with_chunk_size(inner, DEFAULT_CHUNK_SIZE, tail_len)
    }

    /// Tail-aware chunking with an explicit window. A zero window is treated as 1.
    pub fn with_chunk_size(inner: R, chunk_size: usize, tail_len: usize) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(1),
            tail_len,
        }
    }

    /// Feed every chunk to `on_chunk` in stream order, then return the tail.
    ///
    /// Chunks are never empty and are exactly `chunk_size` bytes except the
    /// last. The tail is the last `tail_len` bytes of the stream, or the whole
    /// stream if it was shorter than `tail_len` (in which case no chunk is
    /// produced). Callers that need a full tail must check its length.
    ///
    /// The callback receives a mutable view so it can transform the chunk in
    /// place. An error from the callback or from the source stops iteration
    /// immediately.
    pub fn drive<F, E>(mut self, mut on_chunk: F) -> Result<Vec<u8>, E>
    where
        F: FnMut(&mut [u8]) -> Result<(), E>,
        E: From<io::Error>,
    {
        let mut buf = vec![0u8; self.chunk_size + self.tail_len];
        let mut filled = 0usize;

        loop {
            let (n, eof) = read_full(&mut self.inner, &mut buf[filled..])?;
            filled += n;

            let release = filled.saturating_sub(self.tail_len);
            if release > 0 {
                on_chunk(&mut buf[..release])?;
                buf.copy_within(release..filled, 0);
                filled -= release;
            }

            if eof {
                buf.truncate(filled);
                tracing::trace!(tail_len = buf.len(), "tail-aware reader exhausted");
                return Ok(buf);
            }
        }
    }
}
