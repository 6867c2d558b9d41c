//! Decryption engine
//!
//! ```text
//! ReadKey → UnwrapKey → ReadNonce → StreamDecrypt → VerifyTag → Done
//!    │          │           │                          │
//!    └──────────┴─ UnwrapFailed / MacCheckFailed ──────┘
//! ```
//!
//! The tag sits at the very end of the stream and its position is only known
//! once the source is exhausted, so the payload runs through a
//! [`TailAwareReader`] that withholds the last `tag_length` bytes.

use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use std::io::{ErrorKind, Read, Write};
use tracing::{debug, warn};

use hyseal_chunks::{TailAwareReader, DEFAULT_CHUNK_SIZE};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::KeySource;
use crate::session::{unwrap_session_key, EaxDecryptor};
use crate::settings::Settings;
use crate::StreamStats;

/// Decrypts containers addressed to one RSA key pair.
///
/// Immutable after construction; one instance may serve concurrent calls
/// from several threads, each with its own streams.
#[derive(Clone)]
pub struct Decryptor {
    private: RsaPrivateKey,
    settings: Settings,
    chunk_size: usize,
}

impl Decryptor {
    /// Build a decryptor. Fails with [`CryptoError::KeyLoad`] unless `key`
    /// resolves to a private key.
    pub fn new(key: impl Into<KeySource>, settings: Settings) -> CryptoResult<Self> {
        let private = key.into().load()?.into_private().ok_or_else(|| {
            CryptoError::KeyLoad("decryption requires a private key, got a public key".into())
        })?;
        Ok(Self {
            private,
            settings,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Override the ciphertext window (default 1024 bytes).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Length of the wrapped session key expected at the front of a container.
    pub fn wrapped_key_len(&self) -> usize {
        self.private.size()
    }

    /// Decrypt a complete in-memory container.
    ///
    /// Plaintext is returned only after the tag verifies; on any error
    /// nothing is returned.
    pub fn decrypt(&self, container: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut out = Vec::with_capacity(container.len());
        self.decrypt_stream(container, &mut out)?;
        Ok(out)
    }

    /// Decrypt `input` to `output`, holding at most one chunk plus the tag in
    /// memory.
    ///
    /// **Plaintext is written before it is authenticated.** The tag can only
    /// be checked after the last byte has been read, by which point every
    /// decrypted chunk has already gone to `output`. If this returns
    /// [`CryptoError::MacCheckFailed`] the caller must discard everything
    /// written to `output`. Write to a staging location and promote it only
    /// on `Ok`, or use [`Decryptor::decrypt`] for untrusted input that fits
    /// in memory.
    pub fn decrypt_stream<R: Read, W: Write>(
        &self,
        mut input: R,
        mut output: W,
    ) -> CryptoResult<StreamStats> {
        let mut wrapped = vec![0u8; self.wrapped_key_len()];
        input.read_exact(&mut wrapped).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => CryptoError::UnwrapFailed(format!(
                "container shorter than the {}-byte wrapped session key",
                wrapped.len()
            )),
            _ => CryptoError::Io(e),
        })?;

        let session_key = unwrap_session_key(&self.private, &wrapped)?;

        let mut nonce = vec![0u8; self.settings.nonce_length()];
        input.read_exact(&mut nonce).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => CryptoError::MacCheckFailed,
            _ => CryptoError::Io(e),
        })?;

        let mut cipher = EaxDecryptor::new(&session_key, &nonce)?;
        let mut stats = StreamStats::default();
        let tag_len = self.settings.tag_length();

        let claimed_tag = TailAwareReader::with_chunk_size(input, self.chunk_size, tag_len)
            .drive(|chunk: &mut [u8]| -> CryptoResult<()> {
                cipher.decrypt(chunk);
                output.write_all(chunk)?;
                stats.record(chunk.len());
                Ok(())
            })?;
        output.flush()?;

        if !cipher.verify(&claimed_tag, tag_len) {
            warn!(
                bytes = stats.bytes,
                tag_len = claimed_tag.len(),
                "MAC check failed; discard decrypted output"
            );
            return Err(CryptoError::MacCheckFailed);
        }

        debug!(bytes = stats.bytes, chunks = stats.chunks, "decrypted stream");
        Ok(stats)
    }
}

impl std::fmt::Debug for Decryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decryptor")
            .field("private", &"[REDACTED]")
            .field("settings", &self.settings)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
