use super::config;
use super::error::AnalysisError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One strike and its open interest, as supplied by the data source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeRecord {
    pub strike: f64,

    #[serde(rename = "openInterest")]
    pub open_interest: u64,
}

impl StrikeRecord {
    pub fn new(strike: f64, open_interest: u64) -> Self {
        Self { strike, open_interest }
    }
}

/// Calls and puts for a single expiration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionChainSnapshot {
    pub calls: Vec<StrikeRecord>,
    pub puts: Vec<StrikeRecord>,
}

/// Ranked strikes for one symbol/expiration with at least one qualifying strike
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpirationEntry {
    pub expiration: NaiveDate,
    pub call_strikes: Vec<StrikeRecord>,
    pub put_strikes: Vec<StrikeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolResult {
    pub symbol: String,
    pub entries: Vec<ExpirationEntry>,
}

impl SymbolResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validated parameters for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub symbols: Vec<String>,
    pub target_date: NaiveDate,
    pub num_expirations: usize,
    pub num_strikes: usize,
}

impl AnalysisRequest {
    /// Normalize symbols (trim, uppercase, drop blanks) and check the counts
    pub fn new<I, S>(
        symbols: I,
        target_date: NaiveDate,
        num_expirations: i64,
        num_strikes: i64,
    ) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = normalize_symbols(symbols);
        let request = Self {
            symbols,
            target_date,
            num_expirations: positive_count("num_expirations", num_expirations)?,
            num_strikes: positive_count("num_strikes", num_strikes)?,
        };
        request.validate()?;
        Ok(request)
    }

    /// Build from raw front-end input: comma separated tickers and a `YYYY-MM-DD` date
    pub fn parse(
        tickers: &str,
        target_date: &str,
        num_expirations: i64,
        num_strikes: i64,
    ) -> Result<Self, AnalysisError> {
        let target_date = parse_target_date(target_date)?;
        Self::new(tickers.split(','), target_date, num_expirations, num_strikes)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.symbols.is_empty() {
            return Err(AnalysisError::InvalidRequest("No valid tickers provided".to_string()));
        }
        if self.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(AnalysisError::InvalidRequest("Blank ticker in request".to_string()));
        }
        if let Some(bad) = self
            .symbols
            .iter()
            .find(|s| s.chars().any(|c| c.is_whitespace() || c.is_control() || c == '"' || c == '\\'))
        {
            return Err(AnalysisError::InvalidRequest(format!("Invalid ticker '{}'", bad)));
        }
        if self.num_expirations == 0 {
            return Err(AnalysisError::InvalidRequest("num_expirations must be at least 1".to_string()));
        }
        if self.num_strikes == 0 {
            return Err(AnalysisError::InvalidRequest("num_strikes must be at least 1".to_string()));
        }
        Ok(())
    }
}

pub fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn parse_target_date(raw: &str) -> Result<NaiveDate, AnalysisError> {
    NaiveDate::parse_from_str(raw.trim(), config::DATE_FORMAT).map_err(|e| {
        AnalysisError::InvalidRequest(format!("Malformed target date '{}': {}", raw, e))
    })
}

fn positive_count(name: &str, value: i64) -> Result<usize, AnalysisError> {
    if value < 1 {
        return Err(AnalysisError::InvalidRequest(format!(
            "{} must be at least 1, got {}",
            name, value
        )));
    }
    usize::try_from(value)
        .map_err(|_| AnalysisError::InvalidRequest(format!("{} is out of range: {}", name, value)))
}

/// Terminal output of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisArtifact {
    pub script_text: String,
    pub generated_at: DateTime<Utc>,
    pub diagnostics: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_normalizes_symbols() {
        let req = AnalysisRequest::parse(" qqq, ,spy ,qqq", "2025-07-25", 3, 2).unwrap();
        assert_eq!(req.symbols, vec!["QQQ", "SPY", "QQQ"]);
        assert_eq!(req.target_date, date("2025-07-25"));
        assert_eq!(req.num_expirations, 3);
        assert_eq!(req.num_strikes, 2);
    }

    #[test]
    fn test_rejects_invalid_requests() {
        assert!(matches!(
            AnalysisRequest::parse(" , ", "2025-07-25", 1, 1),
            Err(AnalysisError::InvalidRequest(_))
        ));
        assert!(matches!(
            AnalysisRequest::parse("QQQ", "2025-07-25", 0, 1),
            Err(AnalysisError::InvalidRequest(_))
        ));
        assert!(matches!(
            AnalysisRequest::parse("QQQ", "2025-07-25", 1, -3),
            Err(AnalysisError::InvalidRequest(_))
        ));
        assert!(matches!(
            AnalysisRequest::parse("QQQ", "25-07-2025", 1, 1),
            Err(AnalysisError::InvalidRequest(_))
        ));
        assert!(matches!(
            AnalysisRequest::parse("QQQ,SP Y", "2025-07-25", 1, 1),
            Err(AnalysisError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_catches_hand_built_request() {
        let req = AnalysisRequest {
            symbols: vec![],
            target_date: date("2025-07-25"),
            num_expirations: 1,
            num_strikes: 1,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_artifact_serializes_camel_case() {
        let artifact = AnalysisArtifact {
            script_text: "plot x;".to_string(),
            generated_at: DateTime::parse_from_rfc3339("2025-07-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            diagnostics: String::new(),
        };
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["scriptText"], "plot x;");
        assert_eq!(json["generatedAt"], "2025-07-01T12:00:00Z");
    }
}
