//! Shared types for the VAX services
//!
//! Holds the pieces that are not specific to any one service: the common
//! error type, date normalization for survey answers, and data directory
//! resolution.

pub mod config;
pub mod dates;
pub mod error;

pub use error::{Error, Result};
