//! AES-256-GCM sealing for stored access tokens.
//!
//! Every token is sealed with its own random 96-bit nonce. The master key is
//! 32 bytes, supplied base64-encoded through configuration, and only ever held
//! in memory.

use crate::error::StoreError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Size of the encryption key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// A sealed token as stored in the database (both fields base64)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedToken {
    pub ciphertext: String,
    pub nonce: String,
}

/// Seals and opens tokens with a fixed master key
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Build a cipher from a base64-encoded 32-byte key.
    pub fn from_base64_key(key_base64: &str) -> Result<Self, StoreError> {
        let key_bytes = BASE64
            .decode(key_base64.trim())
            .map_err(|e| StoreError::Encryption(format!("encryption key is not valid base64: {}", e)))?;

        if key_bytes.len() != KEY_SIZE {
            return Err(StoreError::Encryption(format!(
                "encryption key must be {} bytes (256 bits), got {} bytes",
                KEY_SIZE,
                key_bytes.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| StoreError::Encryption(format!("failed to create cipher: {}", e)))?;

        Ok(Self { cipher })
    }

    /// Encrypt a token under a fresh random nonce
    pub fn seal(&self, plaintext: &str) -> Result<SealedToken, StoreError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| StoreError::Encryption(format!("encryption failed: {}", e)))?;

        Ok(SealedToken {
            ciphertext: BASE64.encode(ciphertext),
            nonce: BASE64.encode(nonce),
        })
    }

    /// Decrypt a sealed token. Fails on a wrong key or any tampering.
    pub fn open(&self, sealed: &SealedToken) -> Result<String, StoreError> {
        let ciphertext = BASE64
            .decode(&sealed.ciphertext)
            .map_err(|e| StoreError::Corrupt(format!("ciphertext is not valid base64: {}", e)))?;
        let nonce = BASE64
            .decode(&sealed.nonce)
            .map_err(|e| StoreError::Corrupt(format!("nonce is not valid base64: {}", e)))?;

        if nonce.len() != NONCE_SIZE {
            return Err(StoreError::Corrupt(format!(
                "invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce.len()
            )));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|_| StoreError::Encryption("decryption failed (wrong key or corrupted data)".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| StoreError::Corrupt("decrypted token is not valid UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher_with(byte: u8) -> TokenCipher {
        TokenCipher::from_base64_key(&BASE64.encode([byte; 32])).unwrap()
    }

    #[test]
    fn test_key_validation() {
        assert!(TokenCipher::from_base64_key(&BASE64.encode([0u8; 32])).is_ok());
        assert!(TokenCipher::from_base64_key(&BASE64.encode([0u8; 16])).is_err());
        assert!(TokenCipher::from_base64_key(&BASE64.encode([0u8; 64])).is_err());
        assert!(TokenCipher::from_base64_key("not-valid-base64!@#$").is_err());
    }

    #[test]
    fn test_seal_open() {
        let cipher = cipher_with(0);
        let sealed = cipher.seal("EAAGm0PX4ZCpsBA-page-token").unwrap();

        assert!(!sealed.ciphertext.contains("page-token"));
        assert_eq!(cipher.open(&sealed).unwrap(), "EAAGm0PX4ZCpsBA-page-token");
    }

    #[test]
    fn test_nonces_are_unique() {
        let cipher = cipher_with(0);

        let a = cipher.seal("same").unwrap();
        let b = cipher.seal("same").unwrap();

        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = cipher_with(0).seal("secret").unwrap();
        assert!(matches!(
            cipher_with(1).open(&sealed),
            Err(StoreError::Encryption(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = cipher_with(0);
        let mut sealed = cipher.seal("secret").unwrap();
        let other = cipher.seal("other").unwrap();
        sealed.nonce = other.nonce;

        assert!(cipher.open(&sealed).is_err());
    }

    #[test]
    fn test_truncated_nonce_is_corrupt() {
        let cipher = cipher_with(0);
        let mut sealed = cipher.seal("secret").unwrap();
        sealed.nonce = BASE64.encode([0u8; 4]);

        assert!(matches!(cipher.open(&sealed), Err(StoreError::Corrupt(_))));
    }
}
