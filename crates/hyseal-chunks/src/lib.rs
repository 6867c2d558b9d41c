//! hyseal-chunks: fixed-window chunking of byte streams
//!
//! # Overview
//! - `plain`: pull-based iterator of fixed-size chunks (encryption side)
//! - `tail`: chunk driver that withholds the last `tail_len` bytes of the
//!   stream and hands them back once the source is exhausted (decryption
//!   side, where the trailing bytes are an authentication tag)
//!
//! Both variants top up short reads so that every chunk except the last is
//! exactly `chunk_size` bytes, and both stop at the first zero-length read.

pub mod plain;
pub mod tail;

pub use plain::ChunkedReader;
pub use tail::TailAwareReader;

use std::io::{self, ErrorKind, Read};

/// Default streaming window in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Read into `buf` until it is full or the source reports end of stream.
///
/// Returns the number of bytes read and whether a zero-length read was seen.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<(usize, bool)> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Ok((filled, true)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok((filled, false))
}
