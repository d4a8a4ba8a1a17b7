//! Crypto Adapter
//!
//! Stateless wrapper around XChaCha20-Poly1305. Sealed payloads are laid out
//! as `nonce (24 bytes) || ciphertext || tag`. Decryption failures are never
//! retried.

use crate::error::VaultError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use std::fmt;
use std::str::FromStr;

/// Nonce length for XChaCha20-Poly1305
pub const NONCE_LEN: usize = 24;
/// Authentication tag length
pub const TAG_LEN: usize = 16;
/// Key length in bytes
pub const KEY_LEN: usize = 32;

/// Symmetric decryption key
#[derive(Clone, PartialEq, Eq)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a key from 64 hex characters
    pub fn from_hex(hex_str: &str) -> Result<Self, VaultError> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| VaultError::ConfigError(format!("Invalid key hex: {}", e)))?;
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            VaultError::ConfigError(format!(
                "Invalid key length: expected {} bytes, got {}",
                KEY_LEN,
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Generate a random key
    pub fn generate() -> Self {
        let key = XChaCha20Poly1305::generate_key(&mut OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(key.as_slice());
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(&self.0))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(<redacted>)")
    }
}

impl FromStr for Key {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::from_hex(s)
    }
}

/// Stateless crypto adapter shared by header and body decryption
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptoAdapter;

impl CryptoAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Decrypt a sealed payload
    pub fn decrypt(&self, sealed: &[u8], key: &Key) -> Result<Vec<u8>, VaultError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::DecryptionFailed(format!(
                "ciphertext too short: {} bytes",
                sealed.len()
            )));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        key.cipher()
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| VaultError::DecryptionFailed("authentication tag mismatch".to_string()))
    }

    /// Seal a payload with a fresh random nonce
    pub fn encrypt(&self, plaintext: &[u8], key: &Key) -> Result<Vec<u8>, VaultError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = key
            .cipher()
            .encrypt(&nonce, plaintext)
            .map_err(|_| VaultError::DecryptionFailed("encryption failed".to_string()))?;
        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Seal and base64-encode, producing the envelope form the transport carries
    pub fn seal_envelope(&self, plaintext: &[u8], key: &Key) -> Result<String, VaultError> {
        Ok(STANDARD.encode(self.encrypt(plaintext, key)?))
    }
}

/// Decode a base64 envelope into sealed bytes
pub fn decode_envelope(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded.trim())
}
