//! Market data provider abstraction
//!
//! The analytics never fetch anything themselves. A provider supplies the
//! raw inputs and [`MarketSnapshot::capture`] gathers exactly the set one
//! evaluation needs, which can then be cached or replayed offline.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::select_expirations;
use crate::core::{OptionChain, PriceBar, VolError, VolResult};

/// Source of quotes, option chains and daily history.
///
/// Failures are reported as [`VolError::DataUnavailable`] and are fatal for
/// the request; implementations do not retry.
pub trait MarketDataProvider {
    /// All listed option expirations
    fn list_expirations(&self, symbol: &str) -> VolResult<Vec<NaiveDate>>;

    /// Calls and puts for one expiration
    fn fetch_option_chain(&self, symbol: &str, expiry: NaiveDate) -> VolResult<OptionChain>;

    /// Current underlying price
    fn fetch_spot_price(&self, symbol: &str) -> VolResult<f64>;

    /// Daily bars covering the last `lookback_days` calendar days, ascending
    fn fetch_daily_bars(&self, symbol: &str, lookback_days: u32) -> VolResult<Vec<PriceBar>>;
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for &P {
    fn list_expirations(&self, symbol: &str) -> VolResult<Vec<NaiveDate>> {
        (**self).list_expirations(symbol)
    }

    fn fetch_option_chain(&self, symbol: &str, expiry: NaiveDate) -> VolResult<OptionChain> {
        (**self).fetch_option_chain(symbol, expiry)
    }

    fn fetch_spot_price(&self, symbol: &str) -> VolResult<f64> {
        (**self).fetch_spot_price(symbol)
    }

    fn fetch_daily_bars(&self, symbol: &str, lookback_days: u32) -> VolResult<Vec<PriceBar>> {
        (**self).fetch_daily_bars(symbol, lookback_days)
    }
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for Box<P> {
    fn list_expirations(&self, symbol: &str) -> VolResult<Vec<NaiveDate>> {
        (**self).list_expirations(symbol)
    }

    fn fetch_option_chain(&self, symbol: &str, expiry: NaiveDate) -> VolResult<OptionChain> {
        (**self).fetch_option_chain(symbol, expiry)
    }

    fn fetch_spot_price(&self, symbol: &str) -> VolResult<f64> {
        (**self).fetch_spot_price(symbol)
    }

    fn fetch_daily_bars(&self, symbol: &str, lookback_days: u32) -> VolResult<Vec<PriceBar>> {
        (**self).fetch_daily_bars(symbol, lookback_days)
    }
}

/// Everything one evaluation of one instrument needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub spot: f64,
    /// Capture time
    pub as_of: DateTime<Utc>,
    /// Evaluation date the chains were selected for
    pub captured_on: NaiveDate,
    /// Every listed expiration
    pub expirations: Vec<NaiveDate>,
    /// Chains for the selected expirations, ascending by expiry
    pub chains: Vec<OptionChain>,
    /// Daily bars, ascending by date
    pub bars: Vec<PriceBar>,
}

impl MarketSnapshot {
    /// Fetch the expirations, the chains selected for `today`, spot and bars
    pub fn capture<P: MarketDataProvider + ?Sized>(
        provider: &P,
        symbol: &str,
        today: NaiveDate,
        lookback_days: u32,
    ) -> VolResult<Self> {
        let expirations = provider.list_expirations(symbol)?;
        let selected = select_expirations(&expirations, today)?;

        let mut chains = Vec::with_capacity(selected.len());
        for expiry in &selected {
            chains.push(provider.fetch_option_chain(symbol, *expiry)?);
        }

        let spot = provider.fetch_spot_price(symbol)?;
        let bars = provider.fetch_daily_bars(symbol, lookback_days)?;

        tracing::info!(
            "Captured {}: spot {:.2}, {} chains, {} bars",
            symbol,
            spot,
            chains.len(),
            bars.len()
        );

        Ok(Self {
            symbol: symbol.to_string(),
            spot,
            as_of: Utc::now(),
            captured_on: today,
            expirations,
            chains,
            bars,
        })
    }

    /// Chain for one expiration
    pub fn chain_for_expiry(&self, expiry: NaiveDate) -> VolResult<&OptionChain> {
        self.chains
            .iter()
            .find(|c| c.expiry == expiry)
            .ok_or_else(|| {
                VolError::data_unavailable(format!("no chain for {} {}", self.symbol, expiry))
            })
    }

    /// Total number of quotes
    pub fn total_quotes(&self) -> usize {
        self.chains.iter().map(|c| c.total_quotes()).sum()
    }

    /// Write as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> VolResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| VolError::Serialization(e.to_string()))?;
        fs::write(path.as_ref(), json)?;
        tracing::info!("Wrote {} quotes to {:?}", self.total_quotes(), path.as_ref());
        Ok(())
    }

    /// Read a snapshot written by [`MarketSnapshot::save`]
    pub fn load(path: impl AsRef<Path>) -> VolResult<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&json).map_err(|e| VolError::Serialization(e.to_string()))
    }

    /// Date to evaluate on: `today` when given, else the capture date the
    /// chain selection was made for
    pub fn evaluation_date(&self, today: Option<NaiveDate>) -> NaiveDate {
        today.unwrap_or(self.captured_on)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{outage, FixtureFetch, FixtureProvider};
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_capture_fetches_selected_chains_only() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let provider = FixtureProvider::new(today);

        let snapshot = MarketSnapshot::capture(&provider, "TEST", today, 100).unwrap();

        // today dropped, nothing past the 49d expiry
        assert_eq!(provider.chain_fetches.get(), 3);
        assert_eq!(snapshot.expirations.len(), 6);
        assert_eq!(snapshot.chains.len(), 3);
        assert_eq!(snapshot.bars.len(), 60);
        assert_eq!(snapshot.total_quotes(), 18);
        assert_eq!(snapshot.captured_on, today);
        assert!(snapshot.chain_for_expiry(today + Duration::days(49)).is_ok());
        assert!(matches!(
            snapshot.chain_for_expiry(today + Duration::days(140)),
            Err(VolError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_capture_without_far_expiration() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let mut provider = FixtureProvider::new(today);
        provider.expiry_offsets = vec![7, 14];

        assert!(matches!(
            MarketSnapshot::capture(&provider, "TEST", today, 100),
            Err(VolError::NoFarDatedExpiration)
        ));
        assert_eq!(provider.chain_fetches.get(), 0);
    }

    #[test]
    fn test_provider_failures_propagate_unchanged() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();

        for fetch in [
            FixtureFetch::Expirations,
            FixtureFetch::Chain,
            FixtureFetch::Spot,
            FixtureFetch::Bars,
        ] {
            let provider = FixtureProvider::new(today).with_outage(fetch);
            let err = MarketSnapshot::capture(&provider, "TEST", today, 100).unwrap_err();
            assert_eq!(err.to_string(), outage(fetch).to_string());
            if fetch == FixtureFetch::Chain {
                // first chain failure ends the capture, no retry
                assert_eq!(provider.chain_fetches.get(), 1);
            }
        }
    }

    #[test]
    fn test_saved_snapshot_keeps_capture_date() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.json");

        MarketSnapshot::capture(&FixtureProvider::new(today), "TEST", today, 100)
            .unwrap()
            .save(&path)
            .unwrap();
        let loaded = MarketSnapshot::load(&path).unwrap();

        assert_eq!(loaded.captured_on, today);
        assert_eq!(loaded.evaluation_date(None), today);
        let later = today + Duration::days(5);
        assert_eq!(loaded.evaluation_date(Some(later)), later);
    }
}
