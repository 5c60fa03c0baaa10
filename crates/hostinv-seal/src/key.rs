//! Key material and where it comes from.

use hostinv_core::{InventoryError, Result};
use ring::digest::{digest, SHA256};
use std::fmt;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// Passphrase shared with the collector server.
///
/// Static and never rotated; anyone holding the agent binary can open
/// envelopes. Kept for compatibility with existing collectors.
pub const DEFAULT_PASSPHRASE: &[u8] = b"32-char-encryption-key-here";

/// A 256-bit symmetric key
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Wrap raw key bytes
    #[must_use]
    pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Key from a slice that must be exactly 32 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            InventoryError::Encryption(format!(
                "key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// SHA-256 of `passphrase`
    #[must_use]
    pub fn derive(passphrase: &[u8]) -> Self {
        let hash = digest(&SHA256, passphrase);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(hash.as_ref());
        Self(bytes)
    }

    /// Raw key bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Short hex identifier safe to log: the first 8 bytes of SHA-256(key)
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let hash = digest(&SHA256, &self.0);
        hex::encode(&hash.as_ref()[..8])
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncryptionKey")
            .field(&self.fingerprint())
            .finish()
    }
}

/// Source of the envelope key
pub trait KeyProvider: Send + Sync {
    /// Produce the key
    fn key(&self) -> Result<EncryptionKey>;
}

/// Key derived by hashing a passphrase
#[derive(Clone)]
pub struct PassphraseKey {
    passphrase: Vec<u8>,
}

impl PassphraseKey {
    /// Derive from a custom passphrase
    #[must_use]
    pub fn new(passphrase: impl Into<Vec<u8>>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }
}

impl Default for PassphraseKey {
    fn default() -> Self {
        Self::new(DEFAULT_PASSPHRASE)
    }
}

impl fmt::Debug for PassphraseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassphraseKey").finish_non_exhaustive()
    }
}

impl KeyProvider for PassphraseKey {
    fn key(&self) -> Result<EncryptionKey> {
        Ok(EncryptionKey::derive(&self.passphrase))
    }
}

/// Raw bytes supplied by the caller, validated on use
#[derive(Clone)]
pub struct StaticKey(Vec<u8>);

impl StaticKey {
    /// Use `bytes` as the key
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }
}

impl KeyProvider for StaticKey {
    fn key(&self) -> Result<EncryptionKey> {
        EncryptionKey::from_slice(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_key_is_sha256_of_passphrase() {
        let key = PassphraseKey::default().key().unwrap();
        let expected = digest(&SHA256, b"32-char-encryption-key-here");
        assert_eq!(key.as_bytes().as_slice(), expected.as_ref());
    }

    #[test]
    fn wrong_length_is_an_encryption_error() {
        for len in [0, 16, 31, 33, 64] {
            let err = StaticKey::new(vec![7u8; len]).key().unwrap_err();
            assert!(matches!(err, InventoryError::Encryption(_)), "len {len}");
        }
        assert!(StaticKey::new(vec![7u8; 32]).key().is_ok());
    }

    #[test]
    fn debug_does_not_leak_key_bytes() {
        let key = EncryptionKey::new([0xAB; KEY_LEN]);
        let shown = format!("{key:?}");
        assert!(!shown.contains('['));
        assert!(shown.contains(&key.fingerprint()));
        assert_eq!(key.fingerprint().len(), 16);
    }
}
