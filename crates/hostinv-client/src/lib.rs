//! HTTP delivery of sealed inventory reports.
//!
//! This crate provides the [`UploadClient`] that posts an opaque envelope to
//! the collector, and the [`RetryConfig`] policy callers use to retry it.

#![doc(html_root_url = "https://docs.rs/hostinv-client/0.3.0")]

mod client;
mod config;

pub use client::{upload_endpoint, UploadClient, UploadClientBuilder, UploadReceipt, DEFAULT_TIMEOUT, UPLOAD_PATH};
pub use config::*;
pub use hostinv_core::{InventoryError, Result};
