pub mod config;
pub mod diagnostics;
pub mod error;
pub mod expirations;
pub mod levels_commands;
pub mod models;
pub mod orchestrator;
pub mod script;
pub mod source;
pub mod strikes;
pub mod yahoo_client;

// Re-exports (public API)
pub use diagnostics::{DiagnosticEvent, DiagnosticKind, Diagnostics};
pub use error::{AnalysisError, MalformedExpirationDate, RetrievalError};
pub use expirations::{ExpirationSelection, days_from_target, parse_expiration, select_expirations};
pub use models::{
    AnalysisArtifact, AnalysisRequest, ExpirationEntry, OptionChainSnapshot, StrikeRecord, SymbolResult,
};
pub use orchestrator::{AnalysisOrchestrator, AnalysisReport, SymbolOutcome, SymbolState, analyze_symbol};
pub use script::{Direction, emit, emit_script, identifier, line_weight, validate_script};
pub use source::{CachingSource, OptionsSource};
pub use strikes::rank_strikes;
pub use yahoo_client::YahooClient;
