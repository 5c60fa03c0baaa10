//! # hostinv-cli
//!
//! Command-line front end for the hostinv inventory agent.
//!
//! ## Features
//!
//! - **scan**: collect installed software and machine facts, print the report
//! - **send**: run a full cycle and upload the sealed report, with retries
//! - **open**: decrypt a saved envelope and print the report inside
//! - **Multiple output formats**: Pretty tables, JSON, CSV, YAML

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
