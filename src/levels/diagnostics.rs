//! Structured trace of what each run skipped and why.
//!
//! Stages push [`DiagnosticEvent`]s into a [`Diagnostics`] accumulator owned by
//! the symbol worker; the orchestrator merges the per-symbol accumulators in
//! request order and renders them into the artifact.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    ExpirationsUnavailable { reason: String },
    NoExpirations,
    MalformedExpiration { raw: String, reason: String },
    ChainUnavailable { expiration: NaiveDate, reason: String },
    NoOpenInterest { expiration: NaiveDate },
    NoUsableExpirations,
    TimedOut,
    TaskFailed { reason: String },
    ExpirationsUsed { expirations: Vec<NaiveDate> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticEvent {
    pub symbol: String,

    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl DiagnosticEvent {
    /// True for events that mean the symbol was skipped entirely
    pub fn is_skip(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::ExpirationsUnavailable { .. }
                | DiagnosticKind::NoExpirations
                | DiagnosticKind::NoUsableExpirations
                | DiagnosticKind::TimedOut
                | DiagnosticKind::TaskFailed { .. }
        )
    }
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = &self.symbol;
        match &self.kind {
            DiagnosticKind::ExpirationsUnavailable { reason } => {
                write!(f, "ERROR: Could not retrieve options for {}: {} (skipped)", symbol, reason)
            }
            DiagnosticKind::NoExpirations => {
                write!(f, "WARNING: No expirations found for {} (skipped)", symbol)
            }
            DiagnosticKind::MalformedExpiration { raw, reason } => {
                write!(f, "WARNING: Ignoring malformed expiration '{}' for {}: {}", raw, symbol, reason)
            }
            DiagnosticKind::ChainUnavailable { expiration, reason } => {
                write!(f, "ERROR fetching options chain for {} at {}: {}", symbol, expiration, reason)
            }
            DiagnosticKind::NoOpenInterest { expiration } => {
                write!(f, "WARNING: No strikes with open interest for {} at {}", symbol, expiration)
            }
            DiagnosticKind::NoUsableExpirations => {
                write!(f, "WARNING: No usable expirations for {} (skipped)", symbol)
            }
            DiagnosticKind::TimedOut => {
                write!(f, "TIMEOUT: {} did not finish before the run deadline (skipped)", symbol)
            }
            DiagnosticKind::TaskFailed { reason } => {
                write!(f, "ERROR: Worker for {} failed: {} (skipped)", symbol, reason)
            }
            DiagnosticKind::ExpirationsUsed { expirations } => {
                let dates: Vec<String> = expirations.iter().map(|d| d.to_string()).collect();
                write!(f, "Expiry Dates Used for {}: {}", symbol, dates.join(", "))
            }
        }
    }
}

/// Ordered accumulator of diagnostic events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    events: Vec<DiagnosticEvent>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, symbol: &str, kind: DiagnosticKind) {
        self.events.push(DiagnosticEvent {
            symbol: symbol.to_string(),
            kind,
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.events.extend(other.events);
    }

    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Symbols that were skipped, in the order they were recorded
    pub fn skipped_symbols(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.is_skip())
            .map(|e| e.symbol.as_str())
            .collect()
    }

    /// One `# `-prefixed line per event
    pub fn render(&self) -> String {
        self.events
            .iter()
            .map(|e| format!("# {}\n", e))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_and_skips() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push("ZZZZ", DiagnosticKind::NoExpirations);
        diagnostics.push(
            "QQQ",
            DiagnosticKind::ExpirationsUsed {
                expirations: vec![NaiveDate::from_ymd_opt(2025, 7, 25).unwrap()],
            },
        );

        assert_eq!(diagnostics.skipped_symbols(), vec!["ZZZZ"]);
        assert_eq!(
            diagnostics.render(),
            "# WARNING: No expirations found for ZZZZ (skipped)\n\
             # Expiry Dates Used for QQQ: 2025-07-25\n"
        );
    }
}
