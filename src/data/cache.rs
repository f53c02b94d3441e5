//! Local data caching
//!
//! Caches market snapshots locally to reduce API calls and enable offline analysis.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::provider::{MarketDataProvider, MarketSnapshot};
use crate::core::{VolError, VolResult};

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory
    pub cache_dir: PathBuf,
    /// Maximum age before refresh (in hours)
    pub max_age_hours: i64,
    /// Whether to use cache
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data/cache"),
            max_age_hours: 24,
            enabled: true,
        }
    }
}

/// Data cache manager
pub struct DataCache {
    config: CacheConfig,
}

impl DataCache {
    pub fn new(config: CacheConfig) -> VolResult<Self> {
        // Create cache directory if needed
        if config.enabled && !config.cache_dir.exists() {
            fs::create_dir_all(&config.cache_dir)?;
        }

        Ok(Self { config })
    }

    /// Cache key for a symbol and capture date
    fn cache_key(&self, symbol: &str, date: NaiveDate) -> PathBuf {
        self.config
            .cache_dir
            .join(format!("{}_{}_snapshot.json", symbol.to_uppercase(), date))
    }

    /// Check if cache is valid (exists and not expired)
    pub fn is_valid(&self, symbol: &str, date: NaiveDate) -> bool {
        if !self.config.enabled {
            return false;
        }

        let path = self.cache_key(symbol, date);
        let modified = fs::metadata(&path).and_then(|m| m.modified());
        match modified {
            Ok(modified) => {
                let modified: DateTime<Utc> = modified.into();
                Utc::now() - modified < Duration::hours(self.config.max_age_hours)
            }
            Err(_) => false,
        }
    }

    /// Save snapshot to cache
    pub fn save_snapshot(&self, date: NaiveDate, snapshot: &MarketSnapshot) -> VolResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let path = self.cache_key(&snapshot.symbol, date);
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| VolError::Serialization(e.to_string()))?;
        fs::write(&path, json)?;

        tracing::info!("Cached snapshot for {} at {:?}", snapshot.symbol, path);
        Ok(())
    }

    /// Load snapshot from cache
    pub fn load_snapshot(&self, symbol: &str, date: NaiveDate) -> VolResult<Option<MarketSnapshot>> {
        if !self.is_valid(symbol, date) {
            return Ok(None);
        }

        let path = self.cache_key(symbol, date);
        let json = fs::read_to_string(&path)?;
        let snapshot: MarketSnapshot =
            serde_json::from_str(&json).map_err(|e| VolError::Serialization(e.to_string()))?;

        tracing::info!("Loaded snapshot for {} from cache", symbol);
        Ok(Some(snapshot))
    }

    /// Clear cache for a symbol
    pub fn clear(&self, symbol: &str) -> VolResult<()> {
        if !self.config.cache_dir.exists() {
            return Ok(());
        }

        let prefix = format!("{}_", symbol.to_uppercase());
        for entry in fs::read_dir(&self.config.cache_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();

            if file_name.starts_with(&prefix) && file_name.ends_with("_snapshot.json") {
                fs::remove_file(entry.path())?;
            }
        }

        Ok(())
    }

    /// Remove every cached snapshot, returning how many were deleted
    pub fn clear_all(&self) -> VolResult<usize> {
        if !self.config.cache_dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.config.cache_dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().ends_with("_snapshot.json") {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        tracing::info!("Removed {} cached snapshots", removed);
        Ok(removed)
    }

    /// List cached symbols
    pub fn list_cached(&self) -> VolResult<Vec<String>> {
        let mut symbols = Vec::new();

        if !self.config.cache_dir.exists() {
            return Ok(symbols);
        }

        for entry in fs::read_dir(&self.config.cache_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();

            if let Some(stem) = file_name.strip_suffix("_snapshot.json") {
                // SYMBOL_YYYY-MM-DD
                if let Some((symbol, _date)) = stem.rsplit_once('_') {
                    if !symbols.iter().any(|s| s == symbol) {
                        symbols.push(symbol.to_string());
                    }
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

/// Cached data fetcher - combines cache with live fetching
pub struct CachedFetcher<P> {
    cache: DataCache,
    provider: P,
    lookback_days: u32,
}

impl<P: MarketDataProvider> CachedFetcher<P> {
    pub fn new(config: CacheConfig, provider: P, lookback_days: u32) -> VolResult<Self> {
        Ok(Self {
            cache: DataCache::new(config)?,
            provider,
            lookback_days,
        })
    }

    /// Get snapshot (from cache or fetch)
    pub fn get_snapshot(&self, symbol: &str, today: NaiveDate) -> VolResult<MarketSnapshot> {
        // Try cache first
        if let Some(snapshot) = self.cache.load_snapshot(symbol, today)? {
            return Ok(snapshot);
        }

        tracing::info!("Fetching fresh data for {}", symbol);
        let snapshot = MarketSnapshot::capture(&self.provider, symbol, today, self.lookback_days)?;

        self.cache.save_snapshot(today, &snapshot)?;
        Ok(snapshot)
    }

    /// Force refresh (bypass cache)
    pub fn refresh_snapshot(&self, symbol: &str, today: NaiveDate) -> VolResult<MarketSnapshot> {
        self.cache.clear(symbol)?;
        self.get_snapshot(symbol, today)
    }
}
