//! Implied volatility term structure
//!
//! Piecewise-linear in days to expiration between knots, flat outside the
//! observed range. Linear extrapolation is never applied: far-out queries
//! return the last observed value.

use serde::Serialize;

use super::atm::AtmIvPoint;
use crate::core::{VolError, VolResult};

/// Continuous DTE -> IV function built from ATM points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermStructure {
    /// Days to expiration, strictly increasing
    days: Vec<f64>,
    /// Implied volatility at each knot
    vols: Vec<f64>,
}

impl TermStructure {
    /// Build from (days, iv) pairs in any order.
    ///
    /// Pairs sharing a day count are averaged into one knot.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> VolResult<Self> {
        if pairs.is_empty() {
            return Err(VolError::NoAtmVolatility);
        }
        if let Some((d, v)) = pairs.iter().find(|(d, v)| !d.is_finite() || !v.is_finite()) {
            return Err(VolError::numerical(format!("non-finite knot ({}, {})", d, v)));
        }

        let mut sorted = pairs.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut days: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut vols: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut run_len = 0usize;

        for (d, v) in sorted {
            if days.last() == Some(&d) {
                // running mean over the duplicate run
                run_len += 1;
                if let Some(mean) = vols.last_mut() {
                    *mean += (v - *mean) / run_len as f64;
                }
            } else {
                days.push(d);
                vols.push(v);
                run_len = 1;
            }
        }

        Ok(Self { days, vols })
    }

    /// Build from extracted ATM points
    pub fn from_points(points: &[AtmIvPoint]) -> VolResult<Self> {
        let pairs: Vec<(f64, f64)> = points
            .iter()
            .map(|p| (p.days_to_expiration as f64, p.implied_vol))
            .collect();
        Self::from_pairs(&pairs)
    }

    /// Implied volatility at `days` to expiration
    pub fn iv_at(&self, days: f64) -> f64 {
        let last = self.days.len() - 1;

        // Clamp to bounds (a NaN query lands on the first knot)
        if days.is_nan() || days <= self.days[0] {
            return self.vols[0];
        }
        if days >= self.days[last] {
            return self.vols[last];
        }

        // first knot strictly above the query, in 1..=last
        let hi = self.days.partition_point(|&d| d <= days);
        let lo = hi - 1;
        let frac = (days - self.days[lo]) / (self.days[hi] - self.days[lo]);
        self.vols[lo] * (1.0 - frac) + self.vols[hi] * frac
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interpolation_and_flat_wings() {
        let ts = TermStructure::from_pairs(&[(100.0, 0.30), (10.0, 0.20), (40.0, 0.25)]).unwrap();

        assert_relative_eq!(ts.iv_at(10.0), 0.20, epsilon = 1e-12);
        assert_relative_eq!(ts.iv_at(40.0), 0.25, epsilon = 1e-12);
        assert_relative_eq!(ts.iv_at(25.0), 0.225, epsilon = 1e-12);
        assert_relative_eq!(ts.iv_at(70.0), 0.275, epsilon = 1e-12);
        assert_relative_eq!(ts.iv_at(5.0), 0.20, epsilon = 1e-12);
        assert_relative_eq!(ts.iv_at(200.0), 0.30, epsilon = 1e-12);
        assert_relative_eq!(ts.iv_at(0.0), 0.20, epsilon = 1e-12);
    }

    #[test]
    fn test_single_knot_is_constant() {
        let ts = TermStructure::from_pairs(&[(30.0, 0.22)]).unwrap();
        for q in [0.0, 1.0, 29.9, 30.0, 30.1, 90.0, 10_000.0] {
            assert_eq!(ts.iv_at(q), 0.22);
        }
    }

    #[test]
    fn test_duplicate_days_averaged() {
        let ts = TermStructure::from_pairs(&[(30.0, 0.20), (60.0, 0.40), (30.0, 0.30), (30.0, 0.25)])
            .unwrap();

        assert_eq!(ts.len(), 2);
        assert_relative_eq!(ts.iv_at(30.0), 0.25, epsilon = 1e-12);
        assert_relative_eq!(ts.iv_at(45.0), 0.325, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_and_non_finite_rejected() {
        assert!(matches!(
            TermStructure::from_pairs(&[]),
            Err(VolError::NoAtmVolatility)
        ));
        assert!(TermStructure::from_pairs(&[(10.0, f64::NAN)]).is_err());
    }

    #[test]
    fn test_finite_for_any_query() {
        let ts = TermStructure::from_pairs(&[(7.0, 0.5), (21.0, 0.3), (49.0, 0.35)]).unwrap();
        for q in 0..500 {
            assert!(ts.iv_at(q as f64 * 0.37).is_finite());
        }
    }
}
