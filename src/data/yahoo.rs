//! Yahoo Finance data fetcher
//!
//! Quotes, option chains and daily bars from Yahoo Finance's unofficial API.
//!
//! Note: This is for educational/research purposes. Yahoo Finance
//! data is delayed ~15 minutes and intended for personal use.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::provider::MarketDataProvider;
use crate::core::{OptionChain, OptionQuote, PriceBar, VolError, VolResult};

/// Endpoints and HTTP settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YahooConfig {
    /// Quote and options API root
    pub base_url: String,
    /// Chart (history) API root
    pub chart_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Calendar days of daily history to request
    pub lookback_days: u32,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com/v7/finance".to_string(),
            chart_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            timeout_secs: 30,
            lookback_days: 100,
        }
    }
}

/// Yahoo Finance API client
pub struct YahooClient {
    client: reqwest::blocking::Client,
    config: YahooConfig,
}

impl YahooClient {
    pub fn new(config: YahooConfig) -> VolResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VolError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &YahooConfig {
        &self.config
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> VolResult<T> {
        tracing::debug!("GET {}", url);
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| VolError::data_unavailable(format!("Request failed: {}", e)))?
            .json()
            .map_err(|e| VolError::data_unavailable(format!("Failed to parse response: {}", e)))
    }

    /// Get current quote for a symbol
    pub fn get_quote(&self, symbol: &str) -> VolResult<SpotQuote> {
        let url = format!("{}/quote?symbols={}", self.config.base_url, symbol);
        let response: YahooQuoteResponse = self.get_json(&url)?;

        let result = response
            .quote_response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| VolError::data_unavailable("No quote data returned"))?;

        Ok(SpotQuote {
            symbol: symbol.to_string(),
            price: result.regular_market_price,
            bid: result.bid,
            ask: result.ask,
            timestamp: Utc::now(),
        })
    }

    /// Get available option expiration dates
    pub fn get_expirations(&self, symbol: &str) -> VolResult<Vec<NaiveDate>> {
        let url = format!("{}/options/{}", self.config.base_url, symbol);
        let chain = self.options_result(&url)?;

        let expiries: Vec<NaiveDate> = chain
            .expiration_dates
            .iter()
            .filter_map(|&ts| DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()))
            .collect();

        tracing::info!("{} expirations listed for {}", expiries.len(), symbol);
        Ok(expiries)
    }

    /// Get option chain for a specific expiration
    pub fn get_option_chain(&self, symbol: &str, expiry: NaiveDate) -> VolResult<OptionChain> {
        // Yahoo keys expirations by midnight UTC
        let expiry_ts = expiry
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| VolError::invalid_input(format!("bad expiry {}", expiry)))?
            .and_utc()
            .timestamp();

        let url = format!("{}/options/{}?date={}", self.config.base_url, symbol, expiry_ts);
        let chain_data = self.options_result(&url)?;

        let mut chain = OptionChain::new(symbol, expiry);
        if let Some(options) = chain_data.options.first() {
            for call in &options.calls {
                if let Some(quote) = convert_option_quote(call) {
                    chain.add_call(quote);
                }
            }
            for put in &options.puts {
                if let Some(quote) = convert_option_quote(put) {
                    chain.add_put(quote);
                }
            }
        }

        tracing::debug!(
            "Chain for {} {}: {} calls, {} puts",
            symbol,
            expiry,
            chain.calls.len(),
            chain.puts.len()
        );
        Ok(chain)
    }

    /// Daily OHLCV bars for the last `lookback_days` calendar days
    pub fn get_daily_bars(&self, symbol: &str, lookback_days: u32) -> VolResult<Vec<PriceBar>> {
        let end = Utc::now().timestamp();
        let start = end - i64::from(lookback_days) * 86_400;
        let url = format!(
            "{}/{}?period1={}&period2={}&interval=1d",
            self.config.chart_url, symbol, start, end
        );

        let response: YahooChartResponse = self.get_json(&url)?;
        if let Some(err) = response.chart.error {
            return Err(VolError::data_unavailable(format!(
                "Chart error for {}: {}",
                symbol, err.description
            )));
        }
        let result = response
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| VolError::data_unavailable("No chart data returned"))?;

        let bars = convert_chart(&result);
        tracing::info!("Fetched {} daily bars for {}", bars.len(), symbol);
        Ok(bars)
    }

    fn options_result(&self, url: &str) -> VolResult<YahooOptionChainData> {
        let response: YahooOptionsResponse = self.get_json(url)?;
        response
            .option_chain
            .result
            .into_iter()
            .next()
            .ok_or_else(|| VolError::data_unavailable("No options data returned"))
    }
}

impl MarketDataProvider for YahooClient {
    fn list_expirations(&self, symbol: &str) -> VolResult<Vec<NaiveDate>> {
        self.get_expirations(symbol)
    }

    fn fetch_option_chain(&self, symbol: &str, expiry: NaiveDate) -> VolResult<OptionChain> {
        self.get_option_chain(symbol, expiry)
    }

    fn fetch_spot_price(&self, symbol: &str) -> VolResult<f64> {
        self.get_quote(symbol).map(|q| q.price)
    }

    fn fetch_daily_bars(&self, symbol: &str, lookback_days: u32) -> VolResult<Vec<PriceBar>> {
        self.get_daily_bars(symbol, lookback_days)
    }
}

/// Convert Yahoo option data to our quote format; quotes without a strike
/// or implied volatility are dropped
fn convert_option_quote(data: &YahooOptionData) -> Option<OptionQuote> {
    let strike = data.strike.filter(|k| *k > 0.0)?;
    let iv = data.implied_volatility.filter(|v| v.is_finite() && *v >= 0.0)?;

    let mut quote = OptionQuote::new(strike, iv);
    quote.bid = data.bid;
    quote.ask = data.ask;
    quote.last = data.last_price;
    quote.volume = data.volume.and_then(|v| u64::try_from(v).ok());
    quote.open_interest = data.open_interest.and_then(|oi| u64::try_from(oi).ok());
    quote.contract_symbol = data.contract_symbol.clone();
    Some(quote)
}

/// Zip the chart's parallel arrays into bars, skipping days with gaps
fn convert_chart(result: &YahooChartResult) -> Vec<PriceBar> {
    let Some(quote) = result.indicators.quote.first() else {
        return Vec::new();
    };

    result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date = DateTime::from_timestamp(ts, 0)?.date_naive();
            let open = (*quote.open.get(i)?)?;
            let high = (*quote.high.get(i)?)?;
            let low = (*quote.low.get(i)?)?;
            let close = (*quote.close.get(i)?)?;
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0.0);
            Some(PriceBar::new(date, open, high, low, close, volume.max(0.0) as u64))
        })
        .collect()
}

/// Spot price quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotQuote {
    pub symbol: String,
    pub price: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

// Yahoo Finance API response structures

#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: YahooQuoteResult,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResult {
    result: Vec<YahooQuoteData>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteData {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: f64,
    bid: Option<f64>,
    ask: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: YahooOptionChain,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChain {
    result: Vec<YahooOptionChainData>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChainData {
    #[serde(rename = "expirationDates")]
    expiration_dates: Vec<i64>,
    options: Vec<YahooOptions>,
}

#[derive(Debug, Deserialize)]
struct YahooOptions {
    calls: Vec<YahooOptionData>,
    puts: Vec<YahooOptionData>,
}

#[derive(Debug, Deserialize)]
struct YahooOptionData {
    #[serde(rename = "contractSymbol")]
    contract_symbol: Option<String>,
    strike: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    #[serde(rename = "lastPrice")]
    last_price: Option<f64>,
    volume: Option<i64>,
    #[serde(rename = "openInterest")]
    open_interest: Option<i64>,
    #[serde(rename = "impliedVolatility")]
    implied_volatility: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooChartResult>>,
    error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}
