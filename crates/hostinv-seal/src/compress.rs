//! Gzip framing applied before encryption.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use hostinv_core::{InventoryError, Result};
use std::io::{Read, Write};

/// Gzip `data` at the default level
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 4), Compression::default());
    encoder
        .write_all(data)
        .and_then(|()| encoder.finish())
        .map_err(|e| InventoryError::Encryption(format!("compression failed: {e}")))
}

/// Inflate a gzip stream
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| InventoryError::Decompression(e.to_string()))?;
    Ok(out)
}
