//! Yang–Zhang realized volatility
//!
//! Combines the overnight (close-to-open) variance, the close-to-close
//! variance and the Rogers–Satchell intraday term over a trailing window of
//! daily bars, then annualizes.
//!
//! For each day t with a previous bar:
//! - `log_ho = ln(H/O)`, `log_lo = ln(L/O)`, `log_co = ln(C/O)`
//! - `log_oc = ln(O_t / C_{t-1})`, `log_cc = ln(C_t / C_{t-1})`
//! - `rs = log_ho (log_ho - log_co) + log_lo (log_lo - log_co)`
//!
//! Over W days: `σ² = Σlog_oc²/(W-1) + k Σlog_cc²/(W-1) + (1-k) Σrs/(W-1)`
//! with `k = 0.34 / (1.34 + (W+1)/(W-1))`.

use chrono::NaiveDate;

use crate::core::{PriceBar, VolError, VolResult};

/// Trailing window in trading days
pub const DEFAULT_WINDOW: usize = 30;

/// Trading days per year used for annualization
pub const TRADING_PERIODS: f64 = 252.0;

/// Per-day log terms, defined from the second bar on
#[derive(Debug, Clone, Copy)]
struct DailyTerms {
    overnight_sq: f64,
    close_to_close_sq: f64,
    rogers_satchell: f64,
}

impl DailyTerms {
    fn from_bars(prev: &PriceBar, bar: &PriceBar) -> Self {
        let log_ho = (bar.high / bar.open).ln();
        let log_lo = (bar.low / bar.open).ln();
        let log_co = (bar.close / bar.open).ln();
        let log_oc = (bar.open / prev.close).ln();
        let log_cc = (bar.close / prev.close).ln();

        Self {
            overnight_sq: log_oc * log_oc,
            close_to_close_sq: log_cc * log_cc,
            rogers_satchell: log_ho * (log_ho - log_co) + log_lo * (log_lo - log_co),
        }
    }
}

/// Weight on the close-to-close component for a window of `window` days
pub fn yang_zhang_k(window: usize) -> f64 {
    let w = window as f64;
    0.34 / (1.34 + (w + 1.0) / (w - 1.0))
}

fn validate(bars: &[PriceBar], window: usize, trading_periods: f64) -> VolResult<()> {
    if window < 2 {
        return Err(VolError::invalid_input(format!("window must be at least 2, got {}", window)));
    }
    if !(trading_periods.is_finite() && trading_periods > 0.0) {
        return Err(VolError::invalid_input(format!(
            "trading periods must be positive, got {}",
            trading_periods
        )));
    }
    if bars.len() < window + 1 {
        return Err(VolError::InsufficientHistory {
            required: window + 1,
            available: bars.len(),
        });
    }
    for bar in bars {
        bar.validate()?;
    }
    if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(VolError::invalid_input(format!(
            "bars out of order: {} follows {}",
            pair[1].date, pair[0].date
        )));
    }
    Ok(())
}

/// Annualized Yang–Zhang volatility for every day with a full window.
///
/// The first entry is dated at bar `window` (the first bar has no previous
/// close); earlier days are omitted rather than zero-filled.
pub fn yang_zhang_series(
    bars: &[PriceBar],
    window: usize,
    trading_periods: f64,
) -> VolResult<Vec<(NaiveDate, f64)>> {
    validate(bars, window, trading_periods)?;

    let terms: Vec<DailyTerms> = bars
        .windows(2)
        .map(|w| DailyTerms::from_bars(&w[0], &w[1]))
        .collect();

    let k = yang_zhang_k(window);
    let norm = 1.0 / (window as f64 - 1.0);
    let annualize = trading_periods.sqrt();

    let mut series = Vec::with_capacity(terms.len() + 1 - window);
    for end in window..=terms.len() {
        let slice = &terms[end - window..end];
        let open_vol = slice.iter().map(|t| t.overnight_sq).sum::<f64>() * norm;
        let close_vol = slice.iter().map(|t| t.close_to_close_sq).sum::<f64>() * norm;
        let window_rs = slice.iter().map(|t| t.rogers_satchell).sum::<f64>() * norm;

        let variance = open_vol + k * close_vol + (1.0 - k) * window_rs;
        let date = bars[end].date;
        if !variance.is_finite() || variance < 0.0 {
            return Err(VolError::numerical(format!(
                "Yang-Zhang variance {} on {} is not a valid variance",
                variance, date
            )));
        }

        series.push((date, variance.sqrt() * annualize));
    }

    Ok(series)
}

/// Latest annualized Yang–Zhang volatility
pub fn yang_zhang(bars: &[PriceBar], window: usize, trading_periods: f64) -> VolResult<f64> {
    let series = yang_zhang_series(bars, window, trading_periods)?;
    let (date, vol) = series
        .last()
        .copied()
        .ok_or(VolError::InsufficientHistory {
            required: window + 1,
            available: bars.len(),
        })?;

    tracing::debug!("Yang-Zhang vol {:.4} as of {} (window {})", vol, date, window);
    Ok(vol)
}
