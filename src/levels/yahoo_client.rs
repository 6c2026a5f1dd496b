use super::config;
use super::error::RetrievalError;
use super::models::{OptionChainSnapshot, StrikeRecord};
use super::source::OptionsSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use rand::{seq::SliceRandom, thread_rng};
use reqwest::{Client, header};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

// -----------------------------------------------
// CLIENT WRAPPER WITH SESSION STATE
// -----------------------------------------------
pub struct YahooClient {
    client: Client,
    crumb: Arc<RwLock<Option<String>>>,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            crumb: Arc::new(RwLock::new(None)),
        })
    }

    /// Session cookie and crumb (only once per client)
    async fn crumb(&self) -> Result<String, RetrievalError> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }

        let mut cached = self.crumb.write().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // fc.yahoo.com answers 404 but sets the session cookie
        let _ = self.client.get(config::YAHOO_COOKIE_URL).send().await?;

        let res = self.client.get(config::YAHOO_CRUMB_URL).send().await?;
        let status = res.status();
        let crumb = res.text().await?.trim().to_string();

        if !status.is_success() || crumb.is_empty() || crumb.contains('<') {
            return Err(RetrievalError::Status {
                status: status.as_u16(),
                preview: format!("Failed to obtain crumb: {}", preview(&crumb)),
            });
        }

        debug!("Obtained Yahoo crumb");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    /// GET with retry on rate limits, server errors and transport failures
    async fn fetch_json(&self, url: &str) -> Result<String, RetrievalError> {
        let backoff = ExponentialBackoff::from_millis(config::RETRY_BASE_DELAY_MS)
            .factor(config::RETRY_FACTOR)
            .max_delay(Duration::from_secs(config::RETRY_MAX_DELAY_SECS))
            .take(config::RETRY_MAX_ATTEMPTS);

        RetryIf::start(
            backoff,
            || async {
                let res = self.client.get(url).send().await?;
                let status = res.status();
                let text = res.text().await?;

                if !status.is_success() {
                    warn!(%url, status = status.as_u16(), "Request failed");
                    return Err(RetrievalError::Status {
                        status: status.as_u16(),
                        preview: preview(&text),
                    });
                }

                let trimmed = text.trim();
                if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
                    return Err(RetrievalError::NonJsonResponse(preview(&text)));
                }

                Ok::<String, RetrievalError>(text)
            },
            RetrievalError::is_retryable,
        )
        .await
    }

    /// Raw options payload for a symbol, optionally for one expiration timestamp
    async fn fetch_options(&self, symbol: &str, expiration_ts: Option<i64>) -> Result<YahooOptionChainData, RetrievalError> {
        let crumb = self.crumb().await?;
        let url = match expiration_ts {
            Some(ts) => config::yahoo_chain_url(symbol, ts, &crumb),
            None => config::yahoo_expirations_url(symbol, &crumb),
        };

        let text = self.fetch_json(&url).await?;
        parse_options_response(&text, symbol)
    }
}

#[async_trait]
impl OptionsSource for YahooClient {
    async fn list_expirations(&self, symbol: &str) -> Result<Vec<String>, RetrievalError> {
        let data = self.fetch_options(symbol, None).await?;
        Ok(expiration_strings(&data.expiration_dates))
    }

    async fn get_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChainSnapshot, RetrievalError> {
        let ts = expiration.and_time(NaiveTime::MIN).and_utc().timestamp();
        let data = self.fetch_options(symbol, Some(ts)).await?;
        Ok(to_snapshot(data))
    }
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

// -----------------------------------------------
// RESPONSE CONVERSION
// -----------------------------------------------

pub fn parse_options_response(text: &str, symbol: &str) -> Result<YahooOptionChainData, RetrievalError> {
    let response: YahooOptionsResponse = serde_json::from_str(text)?;

    if let Some(error) = response.option_chain.error {
        return Err(RetrievalError::NoData(format!("{}: {}", symbol, error)));
    }

    response
        .option_chain
        .result
        .into_iter()
        .next()
        .ok_or_else(|| RetrievalError::NoData(format!("No options data returned for {}", symbol)))
}

/// Unix expiration timestamps as `YYYY-MM-DD` (UTC), provider order preserved
pub fn expiration_strings(timestamps: &[i64]) -> Vec<String> {
    timestamps
        .iter()
        .filter_map(|&ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.date_naive().format(config::DATE_FORMAT).to_string())
        .collect()
}

pub fn to_snapshot(data: YahooOptionChainData) -> OptionChainSnapshot {
    let mut snapshot = OptionChainSnapshot::default();

    if let Some(options) = data.options.into_iter().next() {
        snapshot.calls = options.calls.iter().filter_map(to_strike_record).collect();
        snapshot.puts = options.puts.iter().filter_map(to_strike_record).collect();
    }

    snapshot
}

fn to_strike_record(contract: &YahooOptionContract) -> Option<StrikeRecord> {
    let strike = contract.strike.filter(|s| s.is_finite())?;
    let open_interest = contract.open_interest.unwrap_or(0).max(0) as u64;
    Some(StrikeRecord::new(strike, open_interest))
}

// Yahoo Finance API response structures

#[derive(Debug, Deserialize)]
struct YahooOptionsResponse {
    #[serde(rename = "optionChain")]
    option_chain: YahooOptionChain,
}

#[derive(Debug, Deserialize)]
struct YahooOptionChain {
    #[serde(default)]
    result: Vec<YahooOptionChainData>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct YahooOptionChainData {
    #[serde(rename = "expirationDates", default)]
    pub expiration_dates: Vec<i64>,

    #[serde(default)]
    pub options: Vec<YahooOptions>,
}

#[derive(Debug, Deserialize)]
pub struct YahooOptions {
    #[serde(default)]
    pub calls: Vec<YahooOptionContract>,

    #[serde(default)]
    pub puts: Vec<YahooOptionContract>,
}

#[derive(Debug, Deserialize)]
pub struct YahooOptionContract {
    pub strike: Option<f64>,

    #[serde(rename = "openInterest")]
    pub open_interest: Option<i64>,
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    // Rotating Accept-Language headers
    let lang = config::ACCEPT_LANGUAGES
        .choose(&mut thread_rng())
        .copied()
        .unwrap_or("en-US,en;q=0.9");
    headers.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_str(lang)?);
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));

    Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .user_agent(config::USER_AGENT)
        .timeout(config::HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}
