//! Container parameters shared by the encryptor and decryptor

use hyseal_core::CryptoConfig;

use crate::error::{CryptoError, CryptoResult};
use crate::{AES_KEY_SIZES, EAX_NONCE_SIZE, MAX_TAG_SIZE, MIN_TAG_SIZE};

/// Symmetric parameters of a container.
///
/// Both sides must use identical settings; the container has no header that
/// would reveal a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    session_key_length: usize,
    nonce_length: usize,
    tag_length: usize,
}

impl Default for Settings {
    /// AES-128 session key, 16-byte nonce, 16-byte tag
    fn default() -> Self {
        Self {
            session_key_length: 16,
            nonce_length: EAX_NONCE_SIZE,
            tag_length: MAX_TAG_SIZE,
        }
    }
}

impl Settings {
    pub fn new(
        session_key_length: usize,
        nonce_length: usize,
        tag_length: usize,
    ) -> CryptoResult<Self> {
        if !AES_KEY_SIZES.contains(&session_key_length) {
            return Err(CryptoError::InvalidSettings(format!(
                "session key length must be one of {AES_KEY_SIZES:?}, got {session_key_length}"
            )));
        }
        if nonce_length != EAX_NONCE_SIZE {
            return Err(CryptoError::InvalidSettings(format!(
                "nonce length must be {EAX_NONCE_SIZE}, got {nonce_length}"
            )));
        }
        if !(MIN_TAG_SIZE..=MAX_TAG_SIZE).contains(&tag_length) {
            return Err(CryptoError::InvalidSettings(format!(
                "tag length must be in {MIN_TAG_SIZE}..={MAX_TAG_SIZE}, got {tag_length}"
            )));
        }
        Ok(Self {
            session_key_length,
            nonce_length,
            tag_length,
        })
    }

    pub const fn session_key_length(&self) -> usize {
        self.session_key_length
    }

    pub const fn nonce_length(&self) -> usize {
        self.nonce_length
    }

    pub const fn tag_length(&self) -> usize {
        self.tag_length
    }
}

impl TryFrom<&CryptoConfig> for Settings {
    type Error = CryptoError;

    fn try_from(config: &CryptoConfig) -> CryptoResult<Self> {
        Self::new(
            config.session_key_length,
            config.nonce_length,
            config.tag_length,
        )
    }
}
