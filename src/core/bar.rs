//! Daily OHLCV price bars

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{VolError, VolResult};

/// A single trading day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Reject prices that cannot go through a logarithm
    pub fn validate(&self) -> VolResult<()> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(VolError::InvalidPriceData {
                    date: self.date,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Same bar with every price multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
            ..*self
        }
    }
}

/// Mean volume over the trailing `window` bars
pub fn average_volume(bars: &[PriceBar], window: usize) -> VolResult<f64> {
    if window == 0 {
        return Err(VolError::invalid_input("volume window must be positive"));
    }
    if bars.len() < window {
        return Err(VolError::InsufficientHistory {
            required: window,
            available: bars.len(),
        });
    }

    let total: f64 = bars[bars.len() - window..]
        .iter()
        .map(|b| b.volume as f64)
        .sum();
    Ok(total / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(n as i64)
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        assert!(PriceBar::new(day(0), 100.0, 101.0, 99.0, 100.0, 10).validate().is_ok());

        let bad = PriceBar::new(day(0), 100.0, 101.0, 0.0, 100.0, 10);
        match bad.validate() {
            Err(VolError::InvalidPriceData { field, .. }) => assert_eq!(field, "low"),
            other => panic!("unexpected: {:?}", other),
        }

        let nan = PriceBar::new(day(0), f64::NAN, 101.0, 99.0, 100.0, 10);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_average_volume_trailing_window() {
        let bars: Vec<PriceBar> = (0..40)
            .map(|i| PriceBar::new(day(i), 1.0, 1.0, 1.0, 1.0, if i < 10 { 0 } else { 300 }))
            .collect();

        assert!((average_volume(&bars, 30).unwrap() - 300.0).abs() < 1e-12);
        assert!(matches!(
            average_volume(&bars[..29], 30),
            Err(VolError::InsufficientHistory { required: 30, available: 29 })
        ));
    }
}
