//! hyseal-crypto: streaming hybrid encryption
//!
//! A random AES session key encrypts the payload in EAX mode, chunk by chunk;
//! the session key itself is wrapped with the recipient's RSA public key
//! (OAEP, SHA-1). Memory use is bounded by the chunk window, not the payload.
//!
//! Container layout:
//! ```text
//! [modulus-size bytes: RSA-OAEP wrapped session key]
//! [16 bytes: EAX nonce]
//! [N bytes: EAX ciphertext]
//! [tag_length bytes: EAX tag]
//! ```
//!
//! There is no magic number or version field: encryptor and decryptor must
//! agree on [`Settings`].

pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod keys;
pub mod session;
pub mod settings;

pub use decrypt::Decryptor;
pub use encrypt::Encryptor;
pub use error::{CryptoError, CryptoResult};
pub use keys::{
    fingerprint, generate_key_pair, save_key_pair, KeySource, RsaKey, DEFAULT_KEY_BITS,
};
pub use session::{generate_session_key, unwrap_session_key, wrap_session_key, SessionKey};
pub use settings::Settings;

pub use hyseal_chunks::DEFAULT_CHUNK_SIZE;

/// Valid AES key sizes in bytes (AES-128, AES-192, AES-256)
pub const AES_KEY_SIZES: [usize; 3] = [16, 24, 32];

/// EAX nonce size (one AES block)
pub const EAX_NONCE_SIZE: usize = 16;

/// Full EAX tag size
pub const MAX_TAG_SIZE: usize = 16;

/// Shortest accepted truncated tag
pub const MIN_TAG_SIZE: usize = 4;

/// Payload accounting for one streaming call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Payload bytes processed (plaintext in, or plaintext out)
    pub bytes: u64,
    /// Chunks processed
    pub chunks: u64,
}

impl StreamStats {
    pub(crate) fn record(&mut self, len: usize) {
        self.bytes += len as u64;
        self.chunks += 1;
    }
}
