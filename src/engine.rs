//! Screening engine
//!
//! Runs the full pipeline for one instrument: expiration selection, ATM
//! extraction, term structure, realized volatility, signal and screen.
//! Each step fails fast with its own error kind; nothing is retried or
//! substituted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::analytics::{
    calendar_setup, compose_signal, expected_move, extract_atm_points, macro_status,
    select_expirations, AtmIvPoint, CalendarSpread, CriteriaChecks, MacroConfig, MacroStatus,
    RealizedParams, Recommendation, ScreenCriteria, TermStructure, VolatilitySignal,
};
use crate::config::AppConfig;
use crate::core::{OptionChain, VolResult};
use crate::data::{MarketDataProvider, MarketSnapshot};

/// Full screening output for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenReport {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub spot: f64,
    pub recommendation: Recommendation,
    pub checks: CriteriaChecks,
    pub signal: VolatilitySignal,
    /// ATM points the term structure was built from
    pub term_points: Vec<AtmIvPoint>,
    /// Front-month straddle as a fraction of spot
    pub expected_move: Option<f64>,
    pub trade_setup: Option<CalendarSpread>,
    #[serde(default)]
    pub next_earnings: Option<NaiveDate>,
    #[serde(default)]
    pub macro_status: Option<MacroStatus>,
}

fn mark(pass: bool) -> &'static str {
    if pass {
        "✅"
    } else {
        "❌"
    }
}

/// Share volume in compact form ("3.2M")
pub fn format_volume(volume: f64) -> String {
    if volume >= 1e9 {
        format!("{:.1}B", volume / 1e9)
    } else if volume >= 1e6 {
        format!("{:.1}M", volume / 1e6)
    } else if volume >= 1e3 {
        format!("{:.1}K", volume / 1e3)
    } else {
        format!("{:.0}", volume)
    }
}

impl ScreenReport {
    pub fn with_next_earnings(mut self, date: Option<NaiveDate>) -> Self {
        self.next_earnings = date;
        self
    }

    pub fn with_macro_status(mut self, status: Option<MacroStatus>) -> Self {
        self.macro_status = status;
        self
    }

    /// Human-oriented summary with display strings
    pub fn summary(&self) -> serde_json::Value {
        let recommendation = match self.recommendation {
            Recommendation::Recommended => format!("✅ {}", self.recommendation.label()),
            Recommendation::Consider => format!("⚠️ {}", self.recommendation.label()),
            Recommendation::Avoid => format!("❌ {}", self.recommendation.label()),
        };

        let mut summary = json!({
            "Ticker": self.symbol,
            "Recommendation": recommendation,
            "Predictor Variables": {
                "Slope": format!("{:.4} {}", self.signal.slope, mark(self.checks.slope)),
                "IV/RV": format!("{:.2} {}", self.signal.iv_rv_ratio, mark(self.checks.iv_rv_ratio)),
                "Volume": format!("{} {}", format_volume(self.signal.average_volume), mark(self.checks.volume)),
            },
            "Expected Move": self
                .expected_move
                .map(|m| format!("{:.1}%", m * 100.0))
                .unwrap_or_else(|| "n/a".to_string()),
        });

        if let Some(setup) = &self.trade_setup {
            summary["Strike Selection"] = json!(format!("{:.1}", setup.strike));
            summary["Trade Setup"] = json!({
                "Short Leg": setup.short_leg.describe(),
                "Long Leg": setup.long_leg.describe(),
                "Entry Debit": format!("${:.2}", setup.entry_debit),
            });
        }
        if let Some(date) = self.next_earnings {
            summary["Next Earnings"] = json!(date.to_string());
        }
        if let Some(status) = &self.macro_status {
            summary["Macro Status"] = json!(status.describe());
        }
        summary
    }
}

/// Stateless pipeline; one instance can serve any number of instruments
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatilityEngine {
    criteria: ScreenCriteria,
    realized: RealizedParams,
}

impl VolatilityEngine {
    pub fn new(criteria: ScreenCriteria, realized: RealizedParams) -> Self {
        Self { criteria, realized }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.screen, config.realized)
    }

    /// Chains for the term-structure window, front first
    fn selected_chains(&self, snapshot: &MarketSnapshot, today: NaiveDate) -> VolResult<Vec<OptionChain>> {
        select_expirations(&snapshot.expirations, today)?
            .into_iter()
            .map(|expiry| snapshot.chain_for_expiry(expiry).cloned())
            .collect()
    }

    /// ATM points and the term structure through them
    pub fn term_structure(
        &self,
        snapshot: &MarketSnapshot,
        today: NaiveDate,
    ) -> VolResult<(Vec<AtmIvPoint>, TermStructure)> {
        let chains = self.selected_chains(snapshot, today)?;
        let points = extract_atm_points(&chains, snapshot.spot, today)?;
        let term = TermStructure::from_points(&points)?;
        Ok((points, term))
    }

    /// Signal only
    pub fn signal(&self, snapshot: &MarketSnapshot, today: NaiveDate) -> VolResult<VolatilitySignal> {
        let (_, term) = self.term_structure(snapshot, today)?;
        compose_signal(&term, &snapshot.bars, self.realized)
    }

    /// Signal, verdict and trade setup from an already fetched snapshot
    pub fn evaluate(&self, snapshot: &MarketSnapshot, today: NaiveDate) -> VolResult<ScreenReport> {
        let chains = self.selected_chains(snapshot, today)?;
        let points = extract_atm_points(&chains, snapshot.spot, today)?;
        let term = TermStructure::from_points(&points)?;
        let signal = compose_signal(&term, &snapshot.bars, self.realized)?;
        let (recommendation, checks) = self.criteria.recommend(&signal);

        let front = chains.iter().find(|c| c.is_two_sided());
        let report = ScreenReport {
            symbol: snapshot.symbol.clone(),
            as_of: today,
            spot: snapshot.spot,
            recommendation,
            checks,
            signal,
            term_points: points,
            expected_move: front.and_then(|c| expected_move(c, snapshot.spot)),
            trade_setup: calendar_setup(&chains, snapshot.spot),
            next_earnings: None,
            macro_status: None,
        };

        tracing::info!(
            "{}: {:?} (slope {:.5}, iv/rv {:.2}, volume {})",
            report.symbol,
            report.recommendation,
            report.signal.slope,
            report.signal.iv_rv_ratio,
            format_volume(report.signal.average_volume)
        );
        Ok(report)
    }

    /// Fetch through `provider` and evaluate
    pub fn screen<P: MarketDataProvider + ?Sized>(
        &self,
        provider: &P,
        symbol: &str,
        today: NaiveDate,
        lookback_days: u32,
    ) -> VolResult<ScreenReport> {
        let snapshot = MarketSnapshot::capture(provider, symbol, today, lookback_days)?;
        self.evaluate(&snapshot, today)
    }
}

/// Fetch both backdrop symbols through `provider`
pub fn fetch_macro_status<P: MarketDataProvider + ?Sized>(
    provider: &P,
    config: &MacroConfig,
) -> VolResult<MacroStatus> {
    let volatility_bars = provider.fetch_daily_bars(&config.volatility_symbol, config.lookback_days)?;
    let sector_bars = provider.fetch_daily_bars(&config.sector_symbol, config.lookback_days)?;
    macro_status(config, &volatility_bars, &sector_bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VolError;
    use crate::data::provider::fixtures::{outage, FixtureFetch, FixtureProvider};
    use approx::assert_relative_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn test_screen_fixture_end_to_end() {
        let provider = FixtureProvider::new(today());
        let engine = VolatilityEngine::default();

        let report = engine.screen(&provider, "TEST", today(), 100).unwrap();

        // knots at 7, 21, 49 days on iv = 0.50 - 0.002 * dte
        assert_eq!(report.term_points.len(), 3);
        assert_relative_eq!(report.signal.iv30, 0.44, epsilon = 1e-12);
        assert_relative_eq!(report.signal.iv90, 0.402, epsilon = 1e-12);
        assert!(report.signal.slope < 0.0);
        assert!(report.signal.rv30 > 0.0);
        assert_relative_eq!(report.signal.average_volume, 2_500_000.0, epsilon = 1e-6);

        // spot 100.4 is nearest the 100 strike
        let setup = report.trade_setup.as_ref().unwrap();
        assert_eq!(setup.strike, 100.0);
        assert_eq!(setup.short_leg.expiry, today() + chrono::Duration::days(7));
        assert_eq!(setup.long_leg.expiry, today() + chrono::Duration::days(49));
        assert!(setup.entry_debit > 0.0);
        assert!(report.expected_move.unwrap() > 0.0);
    }

    #[test]
    fn test_signal_matches_evaluate() {
        let provider = FixtureProvider::new(today());
        let snapshot = MarketSnapshot::capture(&provider, "TEST", today(), 100).unwrap();
        let engine = VolatilityEngine::default();

        let signal = engine.signal(&snapshot, today()).unwrap();
        let report = engine.evaluate(&snapshot, today()).unwrap();
        assert_eq!(signal, report.signal);
    }

    #[test]
    fn test_missing_chain_is_data_unavailable() {
        let provider = FixtureProvider::new(today());
        let mut snapshot = MarketSnapshot::capture(&provider, "TEST", today(), 100).unwrap();
        snapshot.chains.pop();

        assert!(matches!(
            VolatilityEngine::default().evaluate(&snapshot, today()),
            Err(VolError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_short_history_fails() {
        let mut provider = FixtureProvider::new(today());
        provider.bar_count = 25;

        assert!(matches!(
            VolatilityEngine::default().screen(&provider, "TEST", today(), 100),
            Err(VolError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn test_summary_shape() {
        let provider = FixtureProvider::new(today());
        let report = VolatilityEngine::default()
            .screen(&provider, "TEST", today(), 100)
            .unwrap()
            .with_next_earnings(NaiveDate::from_ymd_opt(2025, 4, 24));

        let summary = report.summary();
        assert_eq!(summary["Ticker"], "TEST");
        assert!(summary["Predictor Variables"]["Volume"]
            .as_str()
            .unwrap()
            .starts_with("2.5M"));
        assert_eq!(summary["Strike Selection"], "100.0");
        assert_eq!(summary["Next Earnings"], "2025-04-24");
    }

    #[test]
    fn test_saved_snapshot_replays_on_capture_day() {
        let provider = FixtureProvider::new(today());
        let snapshot = MarketSnapshot::capture(&provider, "TEST", today(), 100).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.json");
        snapshot.save(&path).unwrap();
        let loaded = MarketSnapshot::load(&path).unwrap();

        let engine = VolatilityEngine::default();
        let live = engine.evaluate(&snapshot, today()).unwrap();
        let replayed = engine.evaluate(&loaded, loaded.evaluation_date(None)).unwrap();
        assert_eq!(replayed.as_of, today());
        let days = |r: &ScreenReport| -> Vec<u32> {
            r.term_points.iter().map(|p| p.days_to_expiration).collect()
        };
        assert_eq!(days(&replayed), days(&live));
        assert_eq!(replayed.recommendation, live.recommendation);
        assert_relative_eq!(replayed.signal.iv30, live.signal.iv30, epsilon = 1e-12);
    }

    #[test]
    fn test_provider_error_reaches_caller_unchanged() {
        let provider = FixtureProvider::new(today()).with_outage(FixtureFetch::Spot);
        let err = VolatilityEngine::default()
            .screen(&provider, "TEST", today(), 100)
            .unwrap_err();

        assert!(matches!(err, VolError::DataUnavailable(_)));
        assert_eq!(err.to_string(), outage(FixtureFetch::Spot).to_string());
    }

    #[test]
    fn test_macro_status_in_summary() {
        let provider = FixtureProvider::new(today());
        let status = fetch_macro_status(&provider, &MacroConfig::default()).unwrap();
        // alternating fixture closes: index flat, moving averages equal
        assert_eq!(status.describe(), "❌ VIX flat, XLK neutral");

        let report = VolatilityEngine::default()
            .screen(&provider, "TEST", today(), 100)
            .unwrap()
            .with_macro_status(Some(status));
        assert_eq!(report.summary()["Macro Status"], "❌ VIX flat, XLK neutral");

        let outage_provider = FixtureProvider::new(today()).with_outage(FixtureFetch::Bars);
        assert!(fetch_macro_status(&outage_provider, &MacroConfig::default()).is_err());
    }

    #[test]
    fn test_format_volume() {
        assert_eq!(format_volume(3_210_000.0), "3.2M");
        assert_eq!(format_volume(950.0), "950");
        assert_eq!(format_volume(12_500.0), "12.5K");
    }
}
