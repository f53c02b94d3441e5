//! # Vol Screener - Implied vs Realized Volatility Signals
//!
//! Screens optionable equities for short-volatility calendar trades by
//! comparing the implied volatility term structure with Yang-Zhang
//! realized volatility.
//!
//! ## Overview
//!
//! For one instrument the pipeline:
//! - selects the expirations that bracket 45 days
//! - extracts the at-the-money implied volatility of each
//! - builds a term structure, linear between knots and flat beyond them
//! - estimates 30-day realized volatility from daily OHLC bars
//! - reports iv30, iv90, the 30-to-90 day slope, iv30/rv30 and volume
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vol_screener::prelude::*;
//!
//! let client = YahooClient::new(YahooConfig::default()).unwrap();
//! let today = chrono::Local::now().date_naive();
//!
//! let engine = VolatilityEngine::default();
//! let report = engine.screen(&client, "AAPL", today, 100).unwrap();
//! println!("{}", report.summary());
//! ```
//!
//! ## What This Does NOT Do
//!
//! - Price options or solve for implied volatility (provider IVs are used as-is)
//! - Place or manage orders
//! - Retry or substitute missing market data

pub mod analytics;
pub mod config;
pub mod core;
pub mod data;
pub mod engine;

/// Prelude with commonly used types
pub mod prelude {
    pub use crate::core::{OptionChain, OptionQuote, OptionType, PriceBar, VolError, VolResult};

    pub use crate::analytics::{
        compose_signal, extract_atm_points, select_expirations, yang_zhang, AtmIvPoint,
        CalendarSpread, MacroConfig, MacroStatus, Recommendation, RealizedParams, ScreenCriteria,
        TermStructure, VolatilitySignal,
    };

    pub use crate::config::AppConfig;

    pub use crate::data::{
        CacheConfig, CachedFetcher, DataCache, EarningsEvent, EarningsStore, EarningsTiming,
        MarketDataProvider, MarketSnapshot, YahooClient, YahooConfig,
    };

    pub use crate::engine::{ScreenReport, VolatilityEngine};
}

pub use crate::core::{VolError, VolResult};
pub use crate::engine::{ScreenReport, VolatilityEngine};
