#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use oi_levels::levels::{OptionChainSnapshot, OptionsSource, RetrievalError, StrikeRecord};
use std::collections::HashMap;
use std::time::Duration;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn records(pairs: &[(f64, u64)]) -> Vec<StrikeRecord> {
    pairs.iter().map(|&(s, oi)| StrikeRecord::new(s, oi)).collect()
}

#[derive(Default)]
struct StubSymbol {
    expirations: Option<Result<Vec<String>, RetrievalError>>,
    chains: HashMap<NaiveDate, Result<OptionChainSnapshot, RetrievalError>>,
    delay: Duration,
}

/// In-memory data source; unknown symbols and expirations fail with `NoData`
#[derive(Default)]
pub struct StubSource {
    symbols: HashMap<String, StubSymbol>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expirations(mut self, symbol: &str, dates: &[&str]) -> Self {
        self.symbols.entry(symbol.to_string()).or_default().expirations =
            Some(Ok(dates.iter().map(|d| d.to_string()).collect()));
        self
    }

    pub fn expirations_fail(mut self, symbol: &str, reason: &str) -> Self {
        self.symbols.entry(symbol.to_string()).or_default().expirations =
            Some(Err(RetrievalError::Request(reason.to_string())));
        self
    }

    pub fn chain(mut self, symbol: &str, expiration: &str, calls: &[(f64, u64)], puts: &[(f64, u64)]) -> Self {
        self.symbols.entry(symbol.to_string()).or_default().chains.insert(
            date(expiration),
            Ok(OptionChainSnapshot {
                calls: records(calls),
                puts: records(puts),
            }),
        );
        self
    }

    pub fn chain_fail(mut self, symbol: &str, expiration: &str, reason: &str) -> Self {
        self.symbols
            .entry(symbol.to_string())
            .or_default()
            .chains
            .insert(date(expiration), Err(RetrievalError::Request(reason.to_string())));
        self
    }

    pub fn delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.symbols.entry(symbol.to_string()).or_default().delay = delay;
        self
    }
}

#[async_trait]
impl OptionsSource for StubSource {
    async fn list_expirations(&self, symbol: &str) -> Result<Vec<String>, RetrievalError> {
        let Some(stub) = self.symbols.get(symbol) else {
            return Err(RetrievalError::NoData(symbol.to_string()));
        };
        if !stub.delay.is_zero() {
            tokio::time::sleep(stub.delay).await;
        }
        stub.expirations
            .clone()
            .unwrap_or_else(|| Err(RetrievalError::NoData(symbol.to_string())))
    }

    async fn get_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<OptionChainSnapshot, RetrievalError> {
        self.symbols
            .get(symbol)
            .and_then(|stub| stub.chains.get(&expiration).cloned())
            .unwrap_or_else(|| Err(RetrievalError::NoData(format!("{} {}", symbol, expiration))))
    }
}
