//! Session keys: generation, RSA-OAEP wrapping, and the streaming AES-EAX
//! cipher they drive
//!
//! The AES variant is picked from the session key length, so a decryptor
//! follows whatever key size the encryptor chose.

use aes::{Aes128, Aes192, Aes256};
use eax::aead::generic_array::GenericArray;
use eax::online::{Decrypt, Eax, Encrypt};
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::{AES_KEY_SIZES, EAX_NONCE_SIZE, MAX_TAG_SIZE};

/// An ephemeral AES session key. Zeroized on drop.
pub struct SessionKey {
    bytes: Vec<u8>,
}

impl SessionKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random session key of `len` bytes.
pub fn generate_session_key(len: usize) -> SessionKey {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    SessionKey::from_bytes(bytes)
}

/// OAEP with SHA-1 for both the label hash and MGF1.
fn oaep() -> Oaep {
    Oaep::new::<Sha1>()
}

/// Wrap (encrypt) a session key for the holder of `public`.
///
/// Output is exactly the modulus size of `public`.
pub fn wrap_session_key(public: &RsaPublicKey, key: &SessionKey) -> CryptoResult<Vec<u8>> {
    public
        .encrypt(&mut rand::thread_rng(), oaep(), key.as_bytes())
        .map_err(|e| CryptoError::WrapFailed(e.to_string()))
}

/// Unwrap (decrypt) a session key with `private`.
///
/// Fails if the OAEP check rejects the input or the recovered key is not a
/// valid AES key length.
pub fn unwrap_session_key(private: &RsaPrivateKey, wrapped: &[u8]) -> CryptoResult<SessionKey> {
    let key = private
        .decrypt_blinded(&mut rand::thread_rng(), oaep(), wrapped)
        .map(SessionKey::from_bytes)
        .map_err(|_| {
            CryptoError::UnwrapFailed("invalid private key or corrupted wrapped key".into())
        })?;

    if !AES_KEY_SIZES.contains(&key.len()) {
        return Err(CryptoError::UnwrapFailed(format!(
            "unwrapped key has unsupported length {} (expected one of {AES_KEY_SIZES:?})",
            key.len()
        )));
    }
    Ok(key)
}

fn check_inputs(key: &SessionKey, nonce: &[u8]) -> CryptoResult<()> {
    if !AES_KEY_SIZES.contains(&key.len()) {
        return Err(CryptoError::InvalidSettings(format!(
            "session key length must be one of {AES_KEY_SIZES:?}, got {}",
            key.len()
        )));
    }
    if nonce.len() != EAX_NONCE_SIZE {
        return Err(CryptoError::InvalidSettings(format!(
            "nonce length must be {EAX_NONCE_SIZE}, got {}",
            nonce.len()
        )));
    }
    Ok(())
}

/// Streaming AES-EAX encryption state.
pub(crate) enum EaxEncryptor {
    Aes128(Eax<Aes128, Encrypt>),
    Aes192(Eax<Aes192, Encrypt>),
    Aes256(Eax<Aes256, Encrypt>),
}

impl EaxEncryptor {
    pub(crate) fn new(key: &SessionKey, nonce: &[u8]) -> CryptoResult<Self> {
        check_inputs(key, nonce)?;
        let k = key.as_bytes();
        let n = GenericArray::from_slice(nonce);
        Ok(match k.len() {
            16 => Self::Aes128(Eax::with_key_and_nonce(GenericArray::from_slice(k), n)),
            24 => Self::Aes192(Eax::with_key_and_nonce(GenericArray::from_slice(k), n)),
            _ => Self::Aes256(Eax::with_key_and_nonce(GenericArray::from_slice(k), n)),
        })
    }

    pub(crate) fn encrypt(&mut self, buf: &mut [u8]) {
        match self {
            Self::Aes128(c) => c.encrypt(buf),
            Self::Aes192(c) => c.encrypt(buf),
            Self::Aes256(c) => c.encrypt(buf),
        }
    }

    /// Full-length tag; callers truncate to the configured tag length.
    pub(crate) fn finish(self) -> [u8; MAX_TAG_SIZE] {
        let tag = match self {
            Self::Aes128(c) => c.finish(),
            Self::Aes192(c) => c.finish(),
            Self::Aes256(c) => c.finish(),
        };
        let mut out = [0u8; MAX_TAG_SIZE];
        out.copy_from_slice(&tag);
        out
    }
}

/// Streaming AES-EAX decryption state.
pub(crate) enum EaxDecryptor {
    Aes128(Eax<Aes128, Decrypt>),
    Aes192(Eax<Aes192, Decrypt>),
    Aes256(Eax<Aes256, Decrypt>),
}

impl EaxDecryptor {
    pub(crate) fn new(key: &SessionKey, nonce: &[u8]) -> CryptoResult<Self> {
        check_inputs(key, nonce)?;
        let k = key.as_bytes();
        let n = GenericArray::from_slice(nonce);
        Ok(match k.len() {
            16 => Self::Aes128(Eax::with_key_and_nonce(GenericArray::from_slice(k), n)),
            24 => Self::Aes192(Eax::with_key_and_nonce(GenericArray::from_slice(k), n)),
            _ => Self::Aes256(Eax::with_key_and_nonce(GenericArray::from_slice(k), n)),
        })
    }

    /// Decrypt in place. The output is unauthenticated until `verify` passes.
    pub(crate) fn decrypt(&mut self, buf: &mut [u8]) {
        match self {
            Self::Aes128(c) => c.decrypt_unauthenticated_hazmat(buf),
            Self::Aes192(c) => c.decrypt_unauthenticated_hazmat(buf),
            Self::Aes256(c) => c.decrypt_unauthenticated_hazmat(buf),
        }
    }

    /// Constant-time check of `claimed` against the first `tag_len` bytes of
    /// the computed tag. A claimed tag of any other length fails.
    pub(crate) fn verify(self, claimed: &[u8], tag_len: usize) -> bool {
        let computed = match &self {
            Self::Aes128(c) => c.tag_clone(),
            Self::Aes192(c) => c.tag_clone(),
            Self::Aes256(c) => c.tag_clone(),
        };
        let tag_len = tag_len.min(computed.len());
        claimed.len() == tag_len && bool::from(computed[..tag_len].ct_eq(claimed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_private_key;
    use rsa::traits::PublicKeyParts;

    #[test]
    fn test_session_key_generation() {
        let k1 = generate_session_key(16);
        let k2 = generate_session_key(16);
        assert_eq!(k1.len(), 16);
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_session_key_debug_is_redacted() {
        let key = SessionKey::from_bytes(vec![0x41; 16]);
        let debug = format!("{key:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("65"));
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let private = test_private_key();
        for len in [16, 24, 32] {
            let key = generate_session_key(len);
            let wrapped = wrap_session_key(&private.to_public_key(), &key).unwrap();
            let unwrapped = unwrap_session_key(private, &wrapped).unwrap();
            assert_eq!(key.as_bytes(), unwrapped.as_bytes());
        }
    }

    #[test]
    fn test_wrapped_key_size_is_modulus_size() {
        let private = test_private_key();
        let key = generate_session_key(16);
        let wrapped = wrap_session_key(&private.to_public_key(), &key).unwrap();
        assert_eq!(wrapped.len(), private.size());
    }

    #[test]
    fn test_unwrap_corrupted_fails() {
        let private = test_private_key();
        let key = generate_session_key(16);
        let mut wrapped = wrap_session_key(&private.to_public_key(), &key).unwrap();
        wrapped[10] ^= 0x01;

        assert!(matches!(
            unwrap_session_key(private, &wrapped),
            Err(CryptoError::UnwrapFailed(_))
        ));
    }

    #[test]
    fn test_unwrap_rejects_non_aes_key_length() {
        let private = test_private_key();
        let odd = SessionKey::from_bytes(vec![7u8; 20]);
        let wrapped = wrap_session_key(&private.to_public_key(), &odd).unwrap();

        assert!(matches!(
            unwrap_session_key(private, &wrapped),
            Err(CryptoError::UnwrapFailed(_))
        ));
    }

    #[test]
    fn test_eax_stream_roundtrip_across_chunks() {
        let key = generate_session_key(32);
        let nonce = [5u8; EAX_NONCE_SIZE];
        let plaintext: Vec<u8> = (0u8..=255).cycle().take(5000).collect();

        let mut enc = EaxEncryptor::new(&key, &nonce).unwrap();
        let mut ciphertext = plaintext.clone();
        for chunk in ciphertext.chunks_mut(777) {
            enc.encrypt(chunk);
        }
        let tag = enc.finish();
        assert_ne!(ciphertext, plaintext);

        // Different chunking on the way back must not matter
        let mut dec = EaxDecryptor::new(&key, &nonce).unwrap();
        let mut recovered = ciphertext.clone();
        for chunk in recovered.chunks_mut(1024) {
            dec.decrypt(chunk);
        }
        assert_eq!(recovered, plaintext);
        assert!(dec.verify(&tag, MAX_TAG_SIZE));
    }

    #[test]
    fn test_eax_truncated_tag_verifies() {
        let key = generate_session_key(16);
        let nonce = [0u8; EAX_NONCE_SIZE];
        let mut data = b"truncated tags".to_vec();

        let mut enc = EaxEncryptor::new(&key, &nonce).unwrap();
        enc.encrypt(&mut data);
        let tag = enc.finish();

        let mut dec = EaxDecryptor::new(&key, &nonce).unwrap();
        dec.decrypt(&mut data);
        assert!(dec.verify(&tag[..8], 8));
    }

    #[test]
    fn test_eax_rejects_wrong_tag_and_short_tag() {
        let key = generate_session_key(16);
        let nonce = [0u8; EAX_NONCE_SIZE];
        let mut data = b"message".to_vec();

        let mut enc = EaxEncryptor::new(&key, &nonce).unwrap();
        enc.encrypt(&mut data);
        let mut tag = enc.finish();

        let mut dec = EaxDecryptor::new(&key, &nonce).unwrap();
        dec.decrypt(&mut data.clone());
        assert!(!dec.verify(&tag[..15], MAX_TAG_SIZE), "short tag must fail");

        tag[0] ^= 0x80;
        let mut dec = EaxDecryptor::new(&key, &nonce).unwrap();
        dec.decrypt(&mut data);
        assert!(!dec.verify(&tag, MAX_TAG_SIZE), "flipped tag must fail");
    }

    #[test]
    fn test_eax_rejects_bad_nonce_length() {
        let key = generate_session_key(16);
        assert!(EaxEncryptor::new(&key, &[0u8; 12]).is_err());
        assert!(EaxDecryptor::new(&key, &[0u8; 24]).is_err());
    }
}
