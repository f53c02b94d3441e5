//! Core data types for the volatility screener
//!
//! Defines fundamental types:
//! - OptionType: call/put side
//! - OptionQuote / OptionChain: per-expiry strikes with implied volatility
//! - PriceBar: daily OHLCV history
//! - VolError: the error taxonomy shared by every module

pub mod bar;
pub mod error;
pub mod option;
pub mod quote;

pub use bar::*;
pub use error::*;
pub use option::*;
pub use quote::*;
