use thiserror::Error;

/// Run-level failures. Everything else degrades into diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Emission invariant violated: {0}")]
    EmissionInvariantViolation(String),
}

/// Failure signal from the market-data collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("HTTP status {status}: {preview}")]
    Status { status: u16, preview: String },

    #[error("Non-JSON response: {0}")]
    NonJsonResponse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No data: {0}")]
    NoData(String),
}

impl RetrievalError {
    /// Rate limits, server errors and transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            RetrievalError::Request(_) => true,
            RetrievalError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        RetrievalError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for RetrievalError {
    fn from(err: serde_json::Error) -> Self {
        RetrievalError::Parse(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed expiration date '{raw}': {reason}")]
pub struct MalformedExpirationDate {
    pub raw: String,
    pub reason: String,
}
