//! Expiration selection
//!
//! Picks the expirations that span the term-structure window: everything
//! before `today + 45d` plus the first expiration at or beyond it.

use chrono::{Duration, NaiveDate};

use crate::core::{VolError, VolResult};

/// Minimum days out the term structure must reach
pub const FAR_EXPIRATION_DAYS: i64 = 45;

/// Date format shared by expirations and the evaluation date
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an expiration (or evaluation) date in `YYYY-MM-DD` form
pub fn parse_expiration(s: &str) -> VolResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| VolError::invalid_input(format!("bad date '{}': {}", s, e)))
}

/// Select expirations for the term structure.
///
/// Returns an ascending prefix of the distinct input dates ending at the
/// first date on or after `today + 45d`. An expiration falling on `today`
/// is dropped from the front.
pub fn select_expirations(dates: &[NaiveDate], today: NaiveDate) -> VolResult<Vec<NaiveDate>> {
    let mut sorted = dates.to_vec();
    sorted.sort();
    sorted.dedup();

    let cutoff = today + Duration::days(FAR_EXPIRATION_DAYS);
    let last = sorted
        .iter()
        .position(|d| *d >= cutoff)
        .ok_or(VolError::NoFarDatedExpiration)?;

    sorted.truncate(last + 1);
    if sorted.first() == Some(&today) {
        sorted.remove(0);
    }

    tracing::debug!(
        "Selected {} expirations through {}",
        sorted.len(),
        sorted.last().map(|d| d.to_string()).unwrap_or_default()
    );
    Ok(sorted)
}
