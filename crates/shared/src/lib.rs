//! fixchat Shared Types and Utilities
//!
//! This crate contains the domain types and errors shared across the fixchat
//! chat coordinator.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
