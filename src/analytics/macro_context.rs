//! Macro backdrop
//!
//! Direction of the volatility index and of a sector ETF, read from their
//! daily closes. Shown next to the screen result; it does not feed the
//! recommendation.

use serde::{Deserialize, Serialize};

use crate::core::{PriceBar, VolError, VolResult};

/// Symbols and lookbacks for the backdrop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroConfig {
    pub enabled: bool,
    pub volatility_symbol: String,
    pub sector_symbol: String,
    /// Calendar days of history to request for both symbols
    pub lookback_days: u32,
    /// Bars back for the volatility index change
    pub momentum_period: usize,
    /// Relative change inside which the index counts as flat
    pub flat_band: f64,
    pub fast_period: usize,
    pub slow_period: usize,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volatility_symbol: "^VIX".to_string(),
            sector_symbol: "XLK".to_string(),
            lookback_days: 90,
            momentum_period: 5,
            flat_band: 0.10,
            fast_period: 10,
            slow_period: 30,
        }
    }
}

impl MacroConfig {
    pub fn validate(&self) -> VolResult<()> {
        if self.momentum_period == 0 {
            return Err(VolError::config("macro_context.momentum_period must be positive"));
        }
        if self.fast_period == 0 || self.fast_period >= self.slow_period {
            return Err(VolError::config(
                "macro_context.fast_period must be positive and below slow_period",
            ));
        }
        if self.flat_band.is_nan() || self.flat_band < 0.0 {
            return Err(VolError::config("macro_context.flat_band must be non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityTrend {
    Falling,
    Flat,
    Rising,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorTrend {
    Bullish,
    Neutral,
    Bearish,
}

impl VolatilityTrend {
    pub fn label(&self) -> &'static str {
        match self {
            VolatilityTrend::Falling => "falling",
            VolatilityTrend::Flat => "flat",
            VolatilityTrend::Rising => "rising",
        }
    }
}

impl SectorTrend {
    pub fn label(&self) -> &'static str {
        match self {
            SectorTrend::Bullish => "bullish",
            SectorTrend::Neutral => "neutral",
            SectorTrend::Bearish => "bearish",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroStatus {
    pub volatility_symbol: String,
    pub volatility: VolatilityTrend,
    /// Relative change of the index over the momentum period
    pub volatility_change: f64,
    pub sector_symbol: String,
    pub sector: SectorTrend,
}

impl MacroStatus {
    /// Calm or easing volatility with the sector in an uptrend
    pub fn favorable(&self) -> bool {
        self.volatility != VolatilityTrend::Rising && self.sector == SectorTrend::Bullish
    }

    /// Display form, e.g. "✅ VIX flat, XLK bullish"
    pub fn describe(&self) -> String {
        format!(
            "{} {} {}, {} {}",
            if self.favorable() { "✅" } else { "❌" },
            self.volatility_symbol.trim_start_matches('^'),
            self.volatility.label(),
            self.sector_symbol,
            self.sector.label()
        )
    }
}

fn closes(bars: &[PriceBar], required: usize) -> VolResult<Vec<f64>> {
    if bars.len() < required {
        return Err(VolError::InsufficientHistory {
            required,
            available: bars.len(),
        });
    }
    bars.iter()
        .map(|b| b.validate().map(|_| b.close))
        .collect()
}

fn sma(closes: &[f64], period: usize) -> f64 {
    closes[closes.len() - period..].iter().sum::<f64>() / period as f64
}

/// Index direction from its change over the last `period` bars
pub fn volatility_trend(
    bars: &[PriceBar],
    period: usize,
    flat_band: f64,
) -> VolResult<(VolatilityTrend, f64)> {
    if period == 0 {
        return Err(VolError::invalid_input("momentum period must be positive"));
    }
    let closes = closes(bars, period + 1)?;
    let last = closes[closes.len() - 1];
    let base = closes[closes.len() - 1 - period];
    let change = last / base - 1.0;

    let trend = if change > flat_band {
        VolatilityTrend::Rising
    } else if change < -flat_band {
        VolatilityTrend::Falling
    } else {
        VolatilityTrend::Flat
    };
    Ok((trend, change))
}

/// Sector direction from a fast/slow moving-average crossover
pub fn sector_trend(bars: &[PriceBar], fast: usize, slow: usize) -> VolResult<SectorTrend> {
    if fast == 0 || fast >= slow {
        return Err(VolError::invalid_input(format!(
            "fast period {} must be positive and below slow period {}",
            fast, slow
        )));
    }
    let closes = closes(bars, slow)?;
    let fast_ma = sma(&closes, fast);
    let slow_ma = sma(&closes, slow);

    Ok(if fast_ma > slow_ma {
        SectorTrend::Bullish
    } else if fast_ma < slow_ma {
        SectorTrend::Bearish
    } else {
        SectorTrend::Neutral
    })
}

/// Backdrop from already fetched daily bars of both symbols
pub fn macro_status(
    config: &MacroConfig,
    volatility_bars: &[PriceBar],
    sector_bars: &[PriceBar],
) -> VolResult<MacroStatus> {
    let (volatility, volatility_change) =
        volatility_trend(volatility_bars, config.momentum_period, config.flat_band)?;
    let sector = sector_trend(sector_bars, config.fast_period, config.slow_period)?;

    tracing::debug!(
        "{} {} ({:+.1}%), {} {}",
        config.volatility_symbol,
        volatility.label(),
        volatility_change * 100.0,
        config.sector_symbol,
        sector.label()
    );

    Ok(MacroStatus {
        volatility_symbol: config.volatility_symbol.clone(),
        volatility,
        volatility_change,
        sector_symbol: config.sector_symbol.clone(),
        sector,
    })
}
