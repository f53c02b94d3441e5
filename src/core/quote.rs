//! Option quote data
//!
//! Per-strike quotes and the per-expiry chain of calls and puts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use super::option::OptionType;

/// Option market quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Strike price
    pub strike: f64,
    /// Implied volatility as a decimal (0.25 = 25%)
    pub implied_vol: f64,
    /// Bid price
    #[serde(default)]
    pub bid: Option<f64>,
    /// Ask price
    #[serde(default)]
    pub ask: Option<f64>,
    /// Last traded price
    #[serde(default)]
    pub last: Option<f64>,
    /// Trading volume
    #[serde(default)]
    pub volume: Option<u64>,
    /// Open interest
    #[serde(default)]
    pub open_interest: Option<u64>,
    /// Contract symbol (exchange-specific)
    #[serde(default)]
    pub contract_symbol: Option<String>,
}

impl OptionQuote {
    pub fn new(strike: f64, implied_vol: f64) -> Self {
        Self {
            strike,
            implied_vol,
            bid: None,
            ask: None,
            last: None,
            volume: None,
            open_interest: None,
            contract_symbol: None,
        }
    }

    pub fn with_market(mut self, bid: f64, ask: f64) -> Self {
        self.bid = Some(bid);
        self.ask = Some(ask);
        self
    }

    /// Mid price from bid/ask, only when both sides are quoted
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) if b >= 0.0 && a >= b => Some((b + a) / 2.0),
            _ => None,
        }
    }

    /// Distance of the strike from spot
    pub fn distance_to(&self, spot: f64) -> f64 {
        (self.strike - spot).abs()
    }
}

/// Chain of quotes for a single expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    /// Underlying symbol
    pub underlying: String,
    /// Expiry date
    pub expiry: NaiveDate,
    /// Call quotes, ascending by strike when built through the constructors
    pub calls: Vec<OptionQuote>,
    pub puts: Vec<OptionQuote>,
}

impl OptionChain {
    pub fn new(underlying: impl Into<String>, expiry: NaiveDate) -> Self {
        Self {
            underlying: underlying.into(),
            expiry,
            calls: Vec::new(),
            puts: Vec::new(),
        }
    }

    /// Build a chain from unordered quotes, sorting both sides by strike
    pub fn from_quotes(
        underlying: impl Into<String>,
        expiry: NaiveDate,
        mut calls: Vec<OptionQuote>,
        mut puts: Vec<OptionQuote>,
    ) -> Self {
        calls.sort_by(|a, b| a.strike.total_cmp(&b.strike));
        puts.sort_by(|a, b| a.strike.total_cmp(&b.strike));
        Self {
            underlying: underlying.into(),
            expiry,
            calls,
            puts,
        }
    }

    /// Add a call quote
    pub fn add_call(&mut self, quote: OptionQuote) {
        self.calls.push(quote);
        self.calls.sort_by(|a, b| a.strike.total_cmp(&b.strike));
    }

    /// Add a put quote
    pub fn add_put(&mut self, quote: OptionQuote) {
        self.puts.push(quote);
        self.puts.sort_by(|a, b| a.strike.total_cmp(&b.strike));
    }

    pub fn side(&self, option_type: OptionType) -> &[OptionQuote] {
        match option_type {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    /// Both sides carry at least one quote
    pub fn is_two_sided(&self) -> bool {
        !self.calls.is_empty() && !self.puts.is_empty()
    }

    /// Quote on one side whose strike is closest to spot.
    ///
    /// Ties resolve to the lower strike whatever the quote order.
    pub fn nearest(&self, option_type: OptionType, spot: f64) -> Option<&OptionQuote> {
        self.side(option_type).iter().min_by(|a, b| {
            a.distance_to(spot)
                .total_cmp(&b.distance_to(spot))
                .then(a.strike.total_cmp(&b.strike))
        })
    }

    /// Days from `today` to expiry (negative once expired)
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry - today).num_days()
    }

    pub fn total_quotes(&self) -> usize {
        self.calls.len() + self.puts.len()
    }
}
