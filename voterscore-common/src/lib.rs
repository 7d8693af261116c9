//! # Voterscore Common Library
//!
//! Shared code for the voterscore tools including:
//! - Error and result types
//! - Bootstrap configuration file discovery and loading
//! - Voter registry database initialization and row models

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
