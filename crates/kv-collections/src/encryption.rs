//! ChaCha20-Poly1305 encryption for collection values.

use crate::{KvError, KvResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use std::fmt;

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Key size for ChaCha20-Poly1305 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// A 256-bit key used to encrypt every value of one collection.
///
/// The key never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Wrap raw key bytes. Fails unless exactly 32 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> KvResult<Self> {
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            KvError::InvalidKey(format!(
                "Invalid key size: expected {}, got {}",
                KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Decode a URL-safe base64 key, with or without `=` padding.
    pub fn from_base64url(encoded: &str) -> KvResult<Self> {
        let trimmed = encoded.trim().trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .map_err(|e| KvError::InvalidKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    /// Encode the key as unpadded URL-safe base64.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    ///
    /// Returns the nonce and the ciphertext with the authentication tag appended.
    pub(crate) fn seal(&self, plaintext: &[u8]) -> KvResult<([u8; NONCE_SIZE], Vec<u8>)> {
        let nonce = generate_nonce();
        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| KvError::Encryption(e.to_string()))?;
        Ok((nonce, ciphertext))
    }

    /// Decrypt a value produced by [`EncryptionKey::seal`].
    pub(crate) fn open(&self, nonce: &[u8], ciphertext: &[u8]) -> KvResult<Vec<u8>> {
        if nonce.len() != NONCE_SIZE {
            return Err(KvError::Encryption(format!(
                "Invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce.len()
            )));
        }

        self.cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| KvError::Encryption("Decryption failed".to_string()))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Generate a random nonce for encryption.
fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let key = EncryptionKey::generate();
        let plaintext = b"{\"access_token\":\"abc\"}";

        let (nonce, ciphertext) = key.seal(plaintext).unwrap();
        assert_ne!(ciphertext.as_slice(), plaintext.as_slice());

        let decrypted = key.open(&nonce, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = EncryptionKey::generate();
        let key2 = EncryptionKey::generate();

        let (nonce, ciphertext) = key1.seal(b"Secret message").unwrap();

        let result = key2.open(&nonce, &ciphertext);
        assert!(matches!(result, Err(KvError::Encryption(_))));
    }

    #[test]
    fn test_fresh_nonce_per_value() {
        let key = EncryptionKey::generate();
        let (nonce1, ct1) = key.seal(b"same").unwrap();
        let (nonce2, ct2) = key.seal(b"same").unwrap();
        assert_ne!(nonce1, nonce2);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_invalid_nonce_size() {
        let key = EncryptionKey::generate();
        let (_, ciphertext) = key.seal(b"Test").unwrap();
        assert!(key.open(&[0u8; 8], &ciphertext).is_err());
    }

    #[test]
    fn test_invalid_key_size() {
        let result = EncryptionKey::from_bytes(&[0u8; 16]);
        assert!(matches!(result, Err(KvError::InvalidKey(_))));
    }

    #[test]
    fn test_base64url_padded_and_unpadded() {
        let key = EncryptionKey::generate();
        let unpadded = key.to_base64url();
        let padded = format!("{}=", unpadded);

        assert_eq!(EncryptionKey::from_base64url(&unpadded).unwrap(), key);
        assert_eq!(EncryptionKey::from_base64url(&padded).unwrap(), key);
    }

    #[test]
    fn test_base64url_rejects_garbage() {
        assert!(EncryptionKey::from_base64url("not base64 !!").is_err());
        // Valid base64 but only 3 bytes
        assert!(EncryptionKey::from_base64url("AAAA").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = EncryptionKey::from_bytes(&[7u8; KEY_SIZE]).unwrap();
        assert_eq!(format!("{:?}", key), "EncryptionKey(..)");
    }
}
