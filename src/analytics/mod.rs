//! Volatility analytics
//!
//! - Expiration selection for the term-structure window
//! - ATM implied volatility per expiration
//! - Term structure with flat extrapolation
//! - Yang–Zhang realized volatility
//! - Signal composition and screening
//! - Macro backdrop (volatility index and sector trend)

pub mod atm;
pub mod expiration;
pub mod macro_context;
pub mod screen;
pub mod signal;
pub mod term_structure;
pub mod yang_zhang;

pub use atm::*;
pub use expiration::*;
pub use macro_context::*;
pub use screen::*;
pub use signal::*;
pub use term_structure::*;
pub use yang_zhang::*;
