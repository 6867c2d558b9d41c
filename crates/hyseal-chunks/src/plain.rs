//! Plain fixed-size chunking
//!
//! Splits a byte stream into windows of `chunk_size` bytes. The last chunk
//! holds the remainder. Used on the encryption side, where the input has no
//! trailing structure to protect.

use std::io::{self, Read};
use std::iter::FusedIterator;

use crate::{read_full, DEFAULT_CHUNK_SIZE};

/// Lazy, finite, non-restartable sequence of chunks read from `R`.
///
/// Iteration ends at the first zero-length read from the source; the source
/// is never read again afterwards. A read error is yielded once and also ends
/// the sequence.
#[derive(Debug)]
pub struct ChunkedReader<R> {
    inner: R,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> ChunkedReader<R> {
    /// Chunk `inner` with the default 1024-byte window.
    pub fn new(inner: R) -> Self {
        Self::with_chunk_size(inner, DEFAULT_CHUNK_SIZE)
    }

    /// Chunk `inner` with an explicit window. A zero window is treated as 1.
    pub fn with_chunk_size(inner: R, chunk_size: usize) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(1),
            done: false,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for ChunkedReader<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut chunk = vec![0u8; self.chunk_size];
        let (filled, eof) = match read_full(&mut self.inner, &mut chunk) {
            Ok(r) => r,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        self.done = eof;

        if filled == 0 {
            return None;
        }
        chunk.truncate(filled);
        Some(Ok(chunk))
    }
}

impl<R: Read> FusedIterator for ChunkedReader<R> {}
