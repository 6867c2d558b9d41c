//! Encryption engine
//!
//! Per call: fresh session key → RSA-OAEP wrap → fresh nonce → AES-EAX over
//! fixed-size plaintext chunks → tag. Each ciphertext chunk is written as
//! soon as it is produced.

use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use std::io::{Read, Write};
use tracing::debug;

use hyseal_chunks::{ChunkedReader, DEFAULT_CHUNK_SIZE};

use crate::error::CryptoResult;
use crate::keys::KeySource;
use crate::session::{generate_session_key, wrap_session_key, EaxEncryptor};
use crate::settings::Settings;
use crate::StreamStats;

/// Encrypts payloads for one recipient public key.
///
/// Immutable after construction; one instance may serve concurrent calls
/// from several threads, each with its own streams.
#[derive(Debug, Clone)]
pub struct Encryptor {
    public: RsaPublicKey,
    settings: Settings,
    chunk_size: usize,
}

impl Encryptor {
    /// Build an encryptor from a public key, or from a key pair (only the
    /// public half is kept).
    pub fn new(key: impl Into<KeySource>, settings: Settings) -> CryptoResult<Self> {
        let key = key.into().load()?;
        Ok(Self {
            public: key.public_key(),
            settings,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Override the plaintext window (default 1024 bytes). Does not change
    /// the container format.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Length of the wrapped session key at the front of every container.
    pub fn wrapped_key_len(&self) -> usize {
        self.public.size()
    }

    /// Total container length for a plaintext of `plaintext_len` bytes.
    pub fn container_len(&self, plaintext_len: usize) -> usize {
        self.wrapped_key_len()
            + self.settings.nonce_length()
            + plaintext_len
            + self.settings.tag_length()
    }

    /// Encrypt an in-memory plaintext into a complete container.
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.container_len(plaintext.len()));
        self.encrypt_stream(plaintext, &mut out)?;
        Ok(out)
    }

    /// Encrypt `input` to `output`, holding at most one chunk in memory.
    pub fn encrypt_stream<R: Read, W: Write>(
        &self,
        input: R,
        mut output: W,
    ) -> CryptoResult<StreamStats> {
        let session_key = generate_session_key(self.settings.session_key_length());
        let wrapped = wrap_session_key(&self.public, &session_key)?;
        output.write_all(&wrapped)?;

        let mut nonce = vec![0u8; self.settings.nonce_length()];
        rand::thread_rng().fill_bytes(&mut nonce);
        output.write_all(&nonce)?;

        let mut cipher = EaxEncryptor::new(&session_key, &nonce)?;
        let mut stats = StreamStats::default();

        for chunk in ChunkedReader::with_chunk_size(input, self.chunk_size) {
            let mut chunk = chunk?;
            cipher.encrypt(&mut chunk);
            output.write_all(&chunk)?;
            stats.record(chunk.len());
        }

        let tag = cipher.finish();
        output.write_all(&tag[..self.settings.tag_length()])?;
        output.flush()?;

        debug!(
            bytes = stats.bytes,
            chunks = stats.chunks,
            wrapped_key_len = wrapped.len(),
            "encrypted stream"
        );
        Ok(stats)
    }
}
