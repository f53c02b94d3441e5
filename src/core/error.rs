//! Error types for the volatility screener

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VolError {
    #[error("No expiration 45 or more days out")]
    NoFarDatedExpiration,

    #[error("No expiration produced an ATM implied volatility")]
    NoAtmVolatility,

    #[error("Insufficient history: need {required} bars, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Invalid price data on {date}: {field} = {value}")]
    InvalidPriceData {
        date: NaiveDate,
        field: &'static str,
        value: f64,
    },

    #[error("Realized volatility is zero, IV/RV ratio undefined")]
    ZeroRealizedVolatility,

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type VolResult<T> = Result<T, VolError>;

impl VolError {
    pub fn data_unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Failures caused by the instrument's data rather than by I/O or setup
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            Self::NoFarDatedExpiration
                | Self::NoAtmVolatility
                | Self::InsufficientHistory { .. }
                | Self::InvalidPriceData { .. }
                | Self::ZeroRealizedVolatility
        )
    }
}
