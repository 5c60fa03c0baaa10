//! Confidential, tamper-evident report envelopes.
//!
//! A report is gzip-compressed, then encrypted with AES-256-GCM under a
//! fresh random nonce. The result is self-contained:
//!
//! ```text
//! offset 0..12   nonce
//! offset 12..28  tag
//! offset 28..N   ciphertext
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use hostinv_seal::{PassphraseKey, SecureChannel};
//!
//! let channel = SecureChannel::from_provider(&PassphraseKey::default())?;
//! let wire = channel.seal(report_json)?.to_bytes();
//! assert_eq!(channel.open(&wire)?, report_json);
//! ```

#![doc(html_root_url = "https://docs.rs/hostinv-seal/0.3.0")]

pub mod channel;
pub mod compress;
pub mod envelope;
pub mod key;

pub use channel::{open, seal, SecureChannel};
pub use envelope::{SecureEnvelope, HEADER_LEN, NONCE_LEN, TAG_LEN};
pub use key::{EncryptionKey, KeyProvider, PassphraseKey, StaticKey, DEFAULT_PASSPHRASE};
