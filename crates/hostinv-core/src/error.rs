use thiserror::Error;

/// Result type alias for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Errors that can occur during an inventory cycle
#[derive(Error, Debug)]
pub enum InventoryError {
    /// No known inventory source exists on this host
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// A data source could not be read
    #[error("collection from {source_name} failed: {reason}")]
    Collection {
        /// Which source failed (registry hive, package manager, catalog)
        source_name: String,
        /// What went wrong
        reason: String,
    },

    /// Sealing was misused (bad key material, RNG failure)
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Envelope tag did not verify, or the envelope is truncated
    #[error("authentication failed: envelope is corrupted or was tampered with")]
    Authentication,

    /// Decrypted payload is not a valid compressed stream
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// Upload endpoint answered with a non-success status
    #[error("upload rejected ({status}): {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the server
        body: String,
    },

    /// Delivery failed before a response was received
    #[error("transport error: {0}")]
    Transport(String),

    /// A subprocess or network call exceeded its time budget
    #[error("{operation} timed out after {seconds} seconds")]
    Timeout {
        /// The operation that timed out
        operation: String,
        /// Budget that was exceeded
        seconds: u64,
    },

    /// The cycle was cancelled by the caller
    #[error("inventory cycle cancelled")]
    Cancelled,

    /// A cycle is already in flight
    #[error("an inventory cycle is already running")]
    Busy,

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid server URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl InventoryError {
    /// Shorthand for a [`InventoryError::Collection`] error
    pub fn collection(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Collection {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if a caller-side retry could succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if the error only costs one source and the cycle may go on
    #[must_use]
    pub const fn degrades_cycle(&self) -> bool {
        matches!(self, Self::Collection { .. })
    }

    /// Returns the HTTP status code if the server rejected the upload
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
