//! Compress-then-encrypt with AES-256-GCM.

use hostinv_core::{InventoryError, Result};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use std::fmt;
use tracing::debug;

use crate::compress::{compress, decompress};
use crate::envelope::{SecureEnvelope, NONCE_LEN, TAG_LEN};
use crate::key::{EncryptionKey, KeyProvider};

/// Seals and opens report envelopes under one key.
///
/// Every seal draws a fresh nonce from the OS CSPRNG. Associated data is
/// always empty.
pub struct SecureChannel {
    key: LessSafeKey,
    fingerprint: String,
    rng: SystemRandom,
}

impl SecureChannel {
    /// Channel over `key`
    pub fn new(key: &EncryptionKey) -> Result<Self> {
        let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())
            .map_err(|_| InventoryError::Encryption("AES-256-GCM rejected the key".into()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            fingerprint: key.fingerprint(),
            rng: SystemRandom::new(),
        })
    }

    /// Channel over whatever key `provider` yields
    pub fn from_provider(provider: &dyn KeyProvider) -> Result<Self> {
        Self::new(&provider.key()?)
    }

    /// Fingerprint of the channel key, for logs
    #[must_use]
    pub fn key_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Gzip `plaintext` and encrypt it into a new envelope
    pub fn seal(&self, plaintext: &[u8]) -> Result<SecureEnvelope> {
        let compressed = compress(plaintext)?;
        let envelope = self.seal_raw(compressed)?;
        debug!(
            plaintext = plaintext.len(),
            sealed = envelope.len(),
            key = %self.fingerprint,
            "sealed envelope"
        );
        Ok(envelope)
    }

    /// Decrypt, verify and inflate wire bytes
    pub fn open(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.open_envelope(SecureEnvelope::from_bytes(bytes)?)
    }

    /// Decrypt, verify and inflate an envelope
    pub fn open_envelope(&self, envelope: SecureEnvelope) -> Result<Vec<u8>> {
        let SecureEnvelope {
            nonce,
            tag,
            mut ciphertext,
        } = envelope;

        ciphertext.extend_from_slice(&tag);
        let compressed = self
            .key
            .open_in_place(
                Nonce::assume_unique_for_key(nonce),
                Aad::empty(),
                &mut ciphertext,
            )
            .map_err(|_| InventoryError::Authentication)?;

        decompress(compressed)
    }

    /// Encrypt already-framed bytes
    pub(crate) fn seal_raw(&self, mut in_out: Vec<u8>) -> Result<SecureEnvelope> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| InventoryError::Encryption("system RNG unavailable".into()))?;

        let tag = self
            .key
            .seal_in_place_separate_tag(
                Nonce::assume_unique_for_key(nonce),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| InventoryError::Encryption("AES-256-GCM seal failed".into()))?;

        let tag_bytes: &[u8] = tag.as_ref();
        let tag: [u8; TAG_LEN] = tag_bytes
            .try_into()
            .map_err(|_| InventoryError::Encryption("unexpected tag length".into()))?;

        Ok(SecureEnvelope {
            nonce,
            tag,
            ciphertext: in_out,
        })
    }
}

impl fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureChannel")
            .field("key", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// Seal `plaintext` under `key` in one call
pub fn seal(plaintext: &[u8], key: &EncryptionKey) -> Result<SecureEnvelope> {
    SecureChannel::new(key)?.seal(plaintext)
}

/// Open wire bytes under `key` in one call
pub fn open(bytes: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    SecureChannel::new(key)?.open(bytes)
}
