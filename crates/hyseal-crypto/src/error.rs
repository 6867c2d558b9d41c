use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key load failed: {0}")]
    KeyLoad(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("session key wrapping failed: {0}")]
    WrapFailed(String),

    #[error("session key unwrapping failed: {0}")]
    UnwrapFailed(String),

    /// The authentication tag did not verify. Any plaintext already written
    /// by a streaming decryption must be discarded.
    #[error("MAC check failed: ciphertext is corrupted, truncated, or was not produced for this key")]
    MacCheckFailed,

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("key encoding failed: {0}")]
    KeyEncoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
