//! Trade screening
//!
//! Turns a [`VolatilitySignal`] into a recommendation for a short-volatility
//! calendar spread, and prices the setup from the front chains.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::signal::VolatilitySignal;
use crate::core::{OptionChain, OptionType};

/// Minimum days between the short and long calendar legs
pub const MIN_CALENDAR_GAP_DAYS: i64 = 28;

/// Thresholds a favorable setup must meet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenCriteria {
    /// Minimum 30-day average share volume
    pub min_average_volume: f64,
    /// Minimum iv30 / rv30
    pub min_iv_rv_ratio: f64,
    /// Maximum term-structure slope (inverted curve)
    pub max_slope: f64,
}

impl Default for ScreenCriteria {
    fn default() -> Self {
        Self {
            min_average_volume: 1_500_000.0,
            min_iv_rv_ratio: 1.25,
            max_slope: -0.00406,
        }
    }
}

/// Per-criterion pass flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaChecks {
    pub volume: bool,
    pub iv_rv_ratio: bool,
    pub slope: bool,
}

impl CriteriaChecks {
    pub fn all(&self) -> bool {
        self.volume && self.iv_rv_ratio && self.slope
    }
}

/// Screening verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Recommended,
    Consider,
    Avoid,
}

impl Recommendation {
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::Recommended => "All Conditions Pass",
            Recommendation::Consider => "Consider",
            Recommendation::Avoid => "Avoid",
        }
    }
}

impl ScreenCriteria {
    pub fn check(&self, signal: &VolatilitySignal) -> CriteriaChecks {
        CriteriaChecks {
            volume: signal.average_volume >= self.min_average_volume,
            iv_rv_ratio: signal.iv_rv_ratio >= self.min_iv_rv_ratio,
            slope: signal.slope <= self.max_slope,
        }
    }

    /// All three pass: recommended. Slope plus exactly one other: consider.
    pub fn recommend(&self, signal: &VolatilitySignal) -> (Recommendation, CriteriaChecks) {
        let checks = self.check(signal);
        let verdict = if checks.all() {
            Recommendation::Recommended
        } else if checks.slope && (checks.volume != checks.iv_rv_ratio) {
            Recommendation::Consider
        } else {
            Recommendation::Avoid
        };
        (verdict, checks)
    }
}

/// Expected move implied by the ATM straddle, as a fraction of spot
pub fn expected_move(chain: &OptionChain, spot: f64) -> Option<f64> {
    if spot <= 0.0 {
        return None;
    }
    let call = chain.nearest(OptionType::Call, spot)?.mid()?;
    let put = chain.nearest(OptionType::Put, spot)?.mid()?;
    Some((call + put) / spot)
}

/// One option leg of a spread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    pub expiry: NaiveDate,
    pub strike: f64,
    pub option_type: OptionType,
    pub mid: f64,
}

impl OptionLeg {
    /// Leg label, e.g. "195C [Jun 28]"
    pub fn describe(&self) -> String {
        format!(
            "{}{} [{}]",
            self.strike,
            self.option_type.letter(),
            self.expiry.format("%b %d")
        )
    }
}

/// Long calendar: sell the front-month ATM call, buy a later one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSpread {
    pub strike: f64,
    pub short_leg: OptionLeg,
    pub long_leg: OptionLeg,
    /// Long mid minus short mid
    pub entry_debit: f64,
}

/// Build the calendar from chains sorted by expiry, front chain first
pub fn calendar_setup(chains: &[OptionChain], spot: f64) -> Option<CalendarSpread> {
    let front = chains.iter().find(|c| !c.calls.is_empty())?;
    let short = front.nearest(OptionType::Call, spot)?;
    let strike = short.strike;

    let later: Vec<&OptionChain> = chains
        .iter()
        .filter(|c| c.expiry > front.expiry && !c.calls.is_empty())
        .collect();
    let back = later
        .iter()
        .find(|c| (c.expiry - front.expiry).num_days() >= MIN_CALENDAR_GAP_DAYS)
        .or_else(|| later.last())?;

    // same strike on the back month, falling back to its nearest listed one
    let long = back
        .calls
        .iter()
        .find(|q| q.strike == strike)
        .or_else(|| back.nearest(OptionType::Call, strike))?;

    let short_leg = OptionLeg {
        expiry: front.expiry,
        strike,
        option_type: OptionType::Call,
        mid: short.mid()?,
    };
    let long_leg = OptionLeg {
        expiry: back.expiry,
        strike: long.strike,
        option_type: OptionType::Call,
        mid: long.mid()?,
    };

    Some(CalendarSpread {
        strike,
        entry_debit: long_leg.mid - short_leg.mid,
        short_leg,
        long_leg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionQuote;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn signal(volume: f64, ratio: f64, slope: f64) -> VolatilitySignal {
        VolatilitySignal {
            iv30: 0.3,
            iv90: 0.3 + slope * 60.0,
            slope,
            rv30: 0.3 / ratio,
            iv_rv_ratio: ratio,
            average_volume: volume,
        }
    }

    #[test]
    fn test_recommendation_matrix() {
        let c = ScreenCriteria::default();

        assert_eq!(c.recommend(&signal(3.2e6, 1.42, -0.005)).0, Recommendation::Recommended);
        assert_eq!(c.recommend(&signal(3.2e6, 1.0, -0.005)).0, Recommendation::Consider);
        assert_eq!(c.recommend(&signal(1.0e5, 1.42, -0.005)).0, Recommendation::Consider);
        assert_eq!(c.recommend(&signal(1.0e5, 1.0, -0.005)).0, Recommendation::Avoid);
        assert_eq!(c.recommend(&signal(3.2e6, 1.42, 0.001)).0, Recommendation::Avoid);

        let (_, checks) = c.recommend(&signal(3.2e6, 1.0, 0.001));
        assert!(checks.volume && !checks.iv_rv_ratio && !checks.slope);
    }

    fn chain(expiry: NaiveDate, strikes: &[(f64, f64, f64)]) -> OptionChain {
        let calls = strikes
            .iter()
            .map(|&(k, bid, ask)| OptionQuote::new(k, 0.3).with_market(bid, ask))
            .collect();
        let puts = strikes
            .iter()
            .map(|&(k, bid, ask)| OptionQuote::new(k, 0.3).with_market(bid * 0.9, ask * 0.9))
            .collect();
        OptionChain::from_quotes("AAPL", expiry, calls, puts)
    }

    #[test]
    fn test_expected_move_from_straddle() {
        let front = chain(
            NaiveDate::from_ymd_opt(2025, 6, 28).unwrap(),
            &[(190.0, 7.0, 7.4), (195.0, 5.0, 5.4), (200.0, 3.0, 3.2)],
        );
        // call mid 5.2, put mid 4.68
        let em = expected_move(&front, 196.0).unwrap();
        assert_relative_eq!(em, (5.2 + 4.68) / 196.0, epsilon = 1e-12);

        let mut unquoted = front.clone();
        unquoted.puts.iter_mut().for_each(|q| q.bid = None);
        assert!(expected_move(&unquoted, 196.0).is_none());
    }

    #[test]
    fn test_calendar_picks_first_back_month_past_gap() {
        let front_date = NaiveDate::from_ymd_opt(2025, 6, 27).unwrap();
        let chains = vec![
            chain(front_date, &[(195.0, 5.0, 5.4)]),
            chain(front_date + Duration::days(7), &[(195.0, 6.0, 6.4)]),
            chain(front_date + Duration::days(35), &[(195.0, 7.2, 7.6)]),
            chain(front_date + Duration::days(84), &[(195.0, 9.0, 9.4)]),
        ];

        let spread = calendar_setup(&chains, 195.5).unwrap();
        assert_eq!(spread.strike, 195.0);
        assert_eq!(spread.long_leg.expiry, front_date + Duration::days(35));
        assert_relative_eq!(spread.entry_debit, 7.4 - 5.2, epsilon = 1e-12);
        assert_eq!(spread.short_leg.describe(), "195C [Jun 27]");
    }

    #[test]
    fn test_calendar_needs_two_expiries() {
        let chains = vec![chain(NaiveDate::from_ymd_opt(2025, 6, 27).unwrap(), &[(195.0, 5.0, 5.4)])];
        assert!(calendar_setup(&chains, 195.0).is_none());
    }
}
