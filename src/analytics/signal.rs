//! Signal composition
//!
//! Combines the implied term structure with realized volatility and volume.

use serde::{Deserialize, Serialize};

use super::term_structure::TermStructure;
use super::yang_zhang::{yang_zhang, DEFAULT_WINDOW, TRADING_PERIODS};
use crate::core::{average_volume, PriceBar, VolError, VolResult};

/// Near term point in days
pub const NEAR_TERM_DAYS: f64 = 30.0;

/// Far term point in days
pub const FAR_TERM_DAYS: f64 = 90.0;

/// Trailing bars used for the average-volume filter
pub const VOLUME_WINDOW: usize = 30;

/// Derived volatility signals for one instrument at one evaluation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilitySignal {
    pub iv30: f64,
    pub iv90: f64,
    /// IV change per day between the 30 and 90 day points
    pub slope: f64,
    pub rv30: f64,
    pub iv_rv_ratio: f64,
    pub average_volume: f64,
}

/// Parameters of the realized side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealizedParams {
    pub window: usize,
    pub trading_periods: f64,
}

impl Default for RealizedParams {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            trading_periods: TRADING_PERIODS,
        }
    }
}

/// Compose the signal from a term structure and daily bars
pub fn compose_signal(
    term: &TermStructure,
    bars: &[PriceBar],
    params: RealizedParams,
) -> VolResult<VolatilitySignal> {
    let iv30 = term.iv_at(NEAR_TERM_DAYS);
    let iv90 = term.iv_at(FAR_TERM_DAYS);
    let slope = (iv90 - iv30) / (FAR_TERM_DAYS - NEAR_TERM_DAYS);

    let rv30 = yang_zhang(bars, params.window, params.trading_periods)?;
    if rv30 == 0.0 {
        return Err(VolError::ZeroRealizedVolatility);
    }

    let signal = VolatilitySignal {
        iv30,
        iv90,
        slope,
        rv30,
        iv_rv_ratio: iv30 / rv30,
        average_volume: average_volume(bars, VOLUME_WINDOW)?,
    };

    tracing::debug!(
        "iv30={:.4} iv90={:.4} slope={:.6} rv30={:.4} ratio={:.3}",
        signal.iv30,
        signal.iv90,
        signal.slope,
        signal.rv30,
        signal.iv_rv_ratio
    );
    Ok(signal)
}
