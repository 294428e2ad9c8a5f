//! # Mesa Domain
//!
//! Business domain types and models for Mesa.
//!
//! This crate contains:
//! - Tenant records and point-of-sale payload types (catalog, orders,
//!   locations, checkout)
//! - Domain error types and Result definitions
//! - Settings structures for the POS client
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Mesa crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
