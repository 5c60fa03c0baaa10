//! Envelope wire format: `nonce (12) || tag (16) || ciphertext`.
//!
//! No version header and no length prefix; the ciphertext runs to the end
//! of the buffer.

use hostinv_core::{InventoryError, Result};

/// AES-GCM nonce length
pub const NONCE_LEN: usize = 12;
/// AES-GCM tag length
pub const TAG_LEN: usize = 16;
/// Bytes preceding the ciphertext
pub const HEADER_LEN: usize = NONCE_LEN + TAG_LEN;

/// One sealed report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureEnvelope {
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl SecureEnvelope {
    /// Serialize to the wire format
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split wire bytes into their fixed fields.
    ///
    /// A buffer shorter than the header cannot carry a valid tag and fails
    /// as [`InventoryError::Authentication`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(InventoryError::Authentication);
        }
        let (nonce, rest) = bytes.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        Ok(Self {
            nonce: nonce.try_into().map_err(|_| InventoryError::Authentication)?,
            tag: tag.try_into().map_err(|_| InventoryError::Authentication)?,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Total wire length
    #[must_use]
    pub fn len(&self) -> usize {
        HEADER_LEN + self.ciphertext.len()
    }

    /// Returns true if there is no ciphertext at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }
}
