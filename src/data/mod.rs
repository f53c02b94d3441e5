//! Data fetching and storage
//!
//! Handles:
//! - The provider trait the engine fetches through
//! - Yahoo Finance API for quotes, chains and daily bars (free)
//! - Local snapshot caching
//! - The earnings event log

pub mod cache;
pub mod earnings;
pub mod provider;
pub mod yahoo;

pub use cache::*;
pub use earnings::*;
pub use provider::*;
pub use yahoo::*;
