//! Application configuration
//!
//! Loaded once from a TOML file and handed to the collaborators that need
//! it. Every section is optional and falls back to its defaults.
//!
//! ```toml
//! [provider]
//! timeout_secs = 20
//!
//! [cache]
//! cache_dir = "./data/cache"
//! max_age_hours = 12
//!
//! [screen]
//! min_iv_rv_ratio = 1.3
//!
//! [macro_context]
//! sector_symbol = "XLF"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analytics::{MacroConfig, RealizedParams, ScreenCriteria};
use crate::core::{VolError, VolResult};
use crate::data::{CacheConfig, YahooConfig};

/// Earnings store location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarningsConfig {
    pub store_path: PathBuf,
}

impl Default for EarningsConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./data/earnings.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: YahooConfig,
    pub cache: CacheConfig,
    pub earnings: EarningsConfig,
    pub screen: ScreenCriteria,
    pub realized: RealizedParams,
    pub macro_context: MacroConfig,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> VolResult<Self> {
        let config: AppConfig = toml::from_str(s).map_err(|e| VolError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> VolResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> VolResult<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> VolResult<()> {
        if self.realized.window < 2 {
            return Err(VolError::config("realized.window must be at least 2"));
        }
        if self.realized.trading_periods.is_nan() || self.realized.trading_periods <= 0.0 {
            return Err(VolError::config("realized.trading_periods must be positive"));
        }
        if self.provider.lookback_days <= self.realized.window as u32 {
            return Err(VolError::config(
                "provider.lookback_days must exceed realized.window",
            ));
        }
        self.macro_context.validate()
    }
}
