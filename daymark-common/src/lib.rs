//! # Daymark Common Library
//!
//! Shared code for the Daymark services:
//! - Configuration loading (TOML bootstrap file + environment overrides)
//! - Common error type
//! - Calendar-day window helpers in the reference time zone

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
