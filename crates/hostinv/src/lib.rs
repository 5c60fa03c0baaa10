//! Host software inventory agent.
//!
//! Enumerates installed software and basic machine facts, builds one JSON
//! report, seals it with AES-256-GCM and posts it to a collector.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hostinv::{Agent, CancellationToken};
//!
//! #[tokio::main]
//! async fn main() -> hostinv::Result<()> {
//!     let agent = Agent::builder()
//!         .server(Some("http://localhost:8080".into()))
//!         .build()?;
//!
//!     match agent.run_cycle(&CancellationToken::new()).await {
//!         Ok(outcome) => println!("{}", outcome.receipt.body),
//!         Err(failure) => eprintln!("Error: {}\n{}", failure.error, failure.report.unwrap_or_default()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS

#![doc(html_root_url = "https://docs.rs/hostinv/0.3.0")]

mod agent;

pub use agent::{Agent, AgentBuilder, AgentStatus, CycleFailure, CycleOutcome};

// Re-export core types
pub use hostinv_core::*;

pub use hostinv_client::{RetryConfig, UploadClient, UploadClientBuilder, UploadReceipt};
pub use hostinv_collect::{
    collect_report, CollectorOptions, CommandRunner, PlatformCollector, SystemRunner,
};
pub use hostinv_seal::{
    EncryptionKey, KeyProvider, PassphraseKey, SecureChannel, SecureEnvelope, StaticKey,
};

pub use hostinv_client as client;
pub use hostinv_collect as collect;
pub use hostinv_seal as seal;

// Re-export runtime for convenience
pub use tokio;
pub use tokio_util::sync::CancellationToken;
