//! # Atelier Common Library
//!
//! Shared code for the Atelier analysis engine:
//! - Error and result types
//! - Configuration file loading and data directory resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
