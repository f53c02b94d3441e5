//! At-the-money implied volatility per expiration

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{OptionChain, OptionType, VolError, VolResult};

/// ATM implied volatility for one expiration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmIvPoint {
    pub expiry: NaiveDate,
    pub days_to_expiration: u32,
    /// Mean of the ATM call and ATM put implied volatility
    pub implied_vol: f64,
    pub call_strike: f64,
    pub put_strike: f64,
}

/// ATM point for a single chain, `None` when either side is empty
pub fn atm_point(chain: &OptionChain, spot: f64, today: NaiveDate) -> Option<AtmIvPoint> {
    let call = chain.nearest(OptionType::Call, spot)?;
    let put = chain.nearest(OptionType::Put, spot)?;

    let dte = chain.days_to_expiry(today);
    if dte < 0 {
        tracing::warn!("Skipping {} expiry {}: already expired", chain.underlying, chain.expiry);
        return None;
    }

    Some(AtmIvPoint {
        expiry: chain.expiry,
        days_to_expiration: dte as u32,
        implied_vol: (call.implied_vol + put.implied_vol) / 2.0,
        call_strike: call.strike,
        put_strike: put.strike,
    })
}

/// Extract one ATM point per usable chain, in chain order.
///
/// Chains missing either side are skipped; if none survive the result is
/// `NoAtmVolatility`.
pub fn extract_atm_points<'a>(
    chains: impl IntoIterator<Item = &'a OptionChain>,
    spot: f64,
    today: NaiveDate,
) -> VolResult<Vec<AtmIvPoint>> {
    if !(spot.is_finite() && spot > 0.0) {
        return Err(VolError::invalid_input(format!("spot price must be positive, got {}", spot)));
    }

    let points: Vec<AtmIvPoint> = chains
        .into_iter()
        .filter_map(|chain| {
            let point = atm_point(chain, spot, today);
            if point.is_none() && !chain.is_two_sided() {
                tracing::debug!("No two-sided chain for {} {}", chain.underlying, chain.expiry);
            }
            point
        })
        .collect();

    if points.is_empty() {
        return Err(VolError::NoAtmVolatility);
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionQuote;
    use approx::assert_relative_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn chain(days: i64, calls: &[(f64, f64)], puts: &[(f64, f64)]) -> OptionChain {
        OptionChain::from_quotes(
            "TEST",
            today() + chrono::Duration::days(days),
            calls.iter().map(|&(k, iv)| OptionQuote::new(k, iv)).collect(),
            puts.iter().map(|&(k, iv)| OptionQuote::new(k, iv)).collect(),
        )
    }

    #[test]
    fn test_equidistant_strikes_take_lower() {
        let c = chain(30, &[(95.0, 0.30), (105.0, 0.32)], &[(95.0, 0.31), (105.0, 0.29)]);
        let points = extract_atm_points(&[c], 100.0, today()).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].call_strike, 95.0);
        assert_eq!(points[0].put_strike, 95.0);
        assert_relative_eq!(points[0].implied_vol, 0.305, epsilon = 1e-12);
        assert_eq!(points[0].days_to_expiration, 30);
    }

    #[test]
    fn test_tie_ignores_quote_order_of_loaded_chain() {
        let json = r#"{
            "underlying": "TEST",
            "expiry": "2025-04-02",
            "calls": [{"strike": 105.0, "implied_vol": 0.32}, {"strike": 95.0, "implied_vol": 0.30}],
            "puts": [{"strike": 105.0, "implied_vol": 0.29}, {"strike": 95.0, "implied_vol": 0.31}]
        }"#;
        let loaded: OptionChain = serde_json::from_str(json).unwrap();
        let points = extract_atm_points(&[loaded], 100.0, today()).unwrap();

        assert_eq!(points[0].call_strike, 95.0);
        assert_eq!(points[0].put_strike, 95.0);
        assert_relative_eq!(points[0].implied_vol, 0.305, epsilon = 1e-12);
    }

    #[test]
    fn test_call_and_put_selected_independently() {
        let c = chain(10, &[(98.0, 0.20), (103.0, 0.40)], &[(90.0, 0.50), (101.0, 0.30)]);
        let point = atm_point(&c, 100.0, today()).unwrap();

        assert_eq!(point.call_strike, 98.0);
        assert_eq!(point.put_strike, 101.0);
        assert_relative_eq!(point.implied_vol, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_one_sided_chain_skipped() {
        let chains = vec![
            chain(7, &[(100.0, 0.2)], &[]),
            chain(14, &[(100.0, 0.3)], &[(100.0, 0.5)]),
        ];
        let points = extract_atm_points(&chains, 100.0, today()).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].days_to_expiration, 14);
        assert_relative_eq!(points[0].implied_vol, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_no_atm_volatility() {
        let chains = vec![chain(7, &[], &[(100.0, 0.2)]), chain(50, &[], &[])];
        assert!(matches!(
            extract_atm_points(&chains, 100.0, today()),
            Err(VolError::NoAtmVolatility)
        ));
    }

    #[test]
    fn test_expired_chain_skipped() {
        let chains = vec![
            chain(-1, &[(100.0, 0.2)], &[(100.0, 0.2)]),
            chain(0, &[(100.0, 0.3)], &[(100.0, 0.3)]),
        ];
        let points = extract_atm_points(&chains, 100.0, today()).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].days_to_expiration, 0);
    }
}
