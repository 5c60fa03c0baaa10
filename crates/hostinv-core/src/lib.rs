//! Core types and error taxonomy for the hostinv inventory agent.
//!
//! This crate provides the foundational types shared by every stage of an
//! inventory cycle:
//!
//! - **Types**: [`SoftwareEntry`], [`SystemFacts`] and the [`Report`] document
//! - **Errors**: the [`InventoryError`] taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use hostinv_core::{Report, SoftwareEntry, SystemFacts};
//!
//! let mut facts = SystemFacts::new();
//! facts.insert(SystemFacts::OS_NAME, "Debian GNU/Linux 12 (bookworm)");
//!
//! let report = Report::build(facts, vec![SoftwareEntry::new("curl")]);
//! let bytes = report.to_json_bytes()?;
//! ```

#![doc(html_root_url = "https://docs.rs/hostinv-core/0.3.0")]

mod error;
pub mod types;

pub use error::{InventoryError, Result};
pub use types::*;
