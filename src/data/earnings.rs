//! Earnings event log
//!
//! A deduplicated store of earnings announcements keyed by (symbol, date).
//! Feeding it a calendar pull returns only the events it had not seen.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core::{VolError, VolResult};

/// When in the session the report lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningsTiming {
    BeforeOpen,
    AfterClose,
    #[default]
    Unknown,
}

/// One scheduled earnings announcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsEvent {
    pub symbol: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub timing: EarningsTiming,
    #[serde(default)]
    pub eps_estimate: Option<f64>,
}

impl EarningsEvent {
    pub fn new(symbol: impl Into<String>, date: NaiveDate, timing: EarningsTiming) -> Self {
        Self {
            symbol: normalize_symbol(&symbol.into()),
            date,
            timing,
            eps_estimate: None,
        }
    }

    fn key(&self) -> (String, NaiveDate) {
        (normalize_symbol(&self.symbol), self.date)
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Keyed earnings store, optionally backed by a JSON file
#[derive(Debug, Default)]
pub struct EarningsStore {
    path: Option<PathBuf>,
    events: BTreeMap<(String, NaiveDate), EarningsEvent>,
}

impl EarningsStore {
    /// Store that lives only in memory
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl AsRef<Path>) -> VolResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self {
            path: Some(path.clone()),
            events: BTreeMap::new(),
        };

        if path.exists() {
            let json = fs::read_to_string(&path)?;
            let events: Vec<EarningsEvent> =
                serde_json::from_str(&json).map_err(|e| VolError::Serialization(e.to_string()))?;
            for event in events {
                store.upsert(event);
            }
            tracing::info!("Loaded {} earnings events from {:?}", store.len(), path);
        }

        Ok(store)
    }

    /// Insert if absent. Returns `true` when the event was new.
    pub fn upsert(&mut self, mut event: EarningsEvent) -> bool {
        let key = event.key();
        if self.events.contains_key(&key) {
            return false;
        }
        event.symbol = key.0.clone();
        self.events.insert(key, event);
        true
    }

    /// Upsert every event and return the ones that were new
    pub fn record_all(&mut self, events: impl IntoIterator<Item = EarningsEvent>) -> Vec<EarningsEvent> {
        let added: Vec<EarningsEvent> = events
            .into_iter()
            .filter_map(|event| {
                let copy = event.clone();
                self.upsert(event).then_some(copy)
            })
            .collect();

        if !added.is_empty() {
            tracing::info!("Recorded {} new earnings events", added.len());
        }
        added
    }

    pub fn contains(&self, symbol: &str, date: NaiveDate) -> bool {
        self.events.contains_key(&(normalize_symbol(symbol), date))
    }

    /// Events for one symbol, ascending by date
    pub fn events_for(&self, symbol: &str) -> Vec<&EarningsEvent> {
        let symbol = normalize_symbol(symbol);
        self.events
            .values()
            .filter(|e| e.symbol == symbol)
            .collect()
    }

    /// Next event for `symbol` on or after `from`
    pub fn next_for(&self, symbol: &str, from: NaiveDate) -> Option<&EarningsEvent> {
        self.events_for(symbol).into_iter().find(|e| e.date >= from)
    }

    /// All events within `days` of `from`, ordered by date then symbol
    pub fn upcoming(&self, from: NaiveDate, days: i64) -> Vec<&EarningsEvent> {
        let until = from + Duration::days(days);
        let mut events: Vec<&EarningsEvent> = self
            .events
            .values()
            .filter(|e| e.date >= from && e.date <= until)
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));
        events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Write the store back to its file (no-op for in-memory stores)
    pub fn save(&self) -> VolResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let events: Vec<&EarningsEvent> = self.events.values().collect();
        let json = serde_json::to_string_pretty(&events)
            .map_err(|e| VolError::Serialization(e.to_string()))?;

        // write-then-rename so a crash never leaves a truncated store
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;

        tracing::debug!("Saved {} earnings events to {:?}", events.len(), path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = EarningsStore::in_memory();
        let event = EarningsEvent::new("aapl", d(2025, 5, 1), EarningsTiming::AfterClose);

        assert!(store.upsert(event.clone()));
        assert!(!store.upsert(event));
        // symbol normalization makes these the same key
        assert!(!store.upsert(EarningsEvent::new(" AAPL ", d(2025, 5, 1), EarningsTiming::Unknown)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.events_for("AAPL")[0].timing, EarningsTiming::AfterClose);
    }

    #[test]
    fn test_record_all_returns_only_new() {
        let mut store = EarningsStore::in_memory();
        store.upsert(EarningsEvent::new("MSFT", d(2025, 4, 24), EarningsTiming::AfterClose));

        let feed = vec![
            EarningsEvent::new("MSFT", d(2025, 4, 24), EarningsTiming::AfterClose),
            EarningsEvent::new("NVDA", d(2025, 5, 28), EarningsTiming::AfterClose),
            EarningsEvent::new("NVDA", d(2025, 5, 28), EarningsTiming::AfterClose),
            EarningsEvent::new("JPM", d(2025, 4, 11), EarningsTiming::BeforeOpen),
        ];
        let added = store.record_all(feed);

        let symbols: Vec<&str> = added.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["NVDA", "JPM"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_queries() {
        let mut store = EarningsStore::in_memory();
        store.record_all(vec![
            EarningsEvent::new("AAPL", d(2025, 1, 30), EarningsTiming::AfterClose),
            EarningsEvent::new("AAPL", d(2025, 5, 1), EarningsTiming::AfterClose),
            EarningsEvent::new("AMZN", d(2025, 5, 1), EarningsTiming::AfterClose),
            EarningsEvent::new("META", d(2025, 4, 30), EarningsTiming::AfterClose),
        ]);

        assert!(store.contains("aapl", d(2025, 5, 1)));
        assert_eq!(store.next_for("AAPL", d(2025, 2, 1)).unwrap().date, d(2025, 5, 1));
        assert!(store.next_for("AAPL", d(2025, 5, 2)).is_none());

        let soon: Vec<&str> = store
            .upcoming(d(2025, 4, 28), 7)
            .iter()
            .map(|e| e.symbol.as_str())
            .collect();
        assert_eq!(soon, vec!["META", "AAPL", "AMZN"]);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("earnings.json");

        let mut store = EarningsStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.upsert(EarningsEvent::new("TSLA", d(2025, 4, 22), EarningsTiming::AfterClose));
        store.save().unwrap();

        let mut reopened = EarningsStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(!reopened.upsert(EarningsEvent::new("tsla", d(2025, 4, 22), EarningsTiming::Unknown)));
    }
}
