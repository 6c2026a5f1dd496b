use super::config;
use super::diagnostics::{DiagnosticKind, Diagnostics};
use super::error::AnalysisError;
use super::expirations::select_expirations;
use super::models::{AnalysisArtifact, AnalysisRequest, ExpirationEntry, SymbolResult};
use super::script;
use super::source::OptionsSource;
use super::strikes::rank_strikes;
use crate::utility::Timer;
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

/// Where a symbol's pipeline is, or how it ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolState {
    FetchingExpirations,
    Selecting,
    FetchingChain,
    Ranking,
    Accumulating,
    Done,
    Skipped,
    TimedOut,
}

impl fmt::Display for SymbolState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SymbolState::FetchingExpirations => "fetching_expirations",
            SymbolState::Selecting => "selecting",
            SymbolState::FetchingChain => "fetching_chain",
            SymbolState::Ranking => "ranking",
            SymbolState::Accumulating => "accumulating",
            SymbolState::Done => "done",
            SymbolState::Skipped => "skipped",
            SymbolState::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

/// What one symbol worker hands back at assembly time
#[derive(Debug, Clone)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub state: SymbolState,
    pub result: Option<SymbolResult>,
    pub diagnostics: Diagnostics,
}

impl SymbolOutcome {
    fn skipped(symbol: &str, diagnostics: Diagnostics) -> Self {
        Self {
            symbol: symbol.to_string(),
            state: SymbolState::Skipped,
            result: None,
            diagnostics,
        }
    }

    fn timed_out(symbol: &str) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(symbol, DiagnosticKind::TimedOut);
        Self {
            symbol: symbol.to_string(),
            state: SymbolState::TimedOut,
            result: None,
            diagnostics,
        }
    }

    fn failed(symbol: &str, reason: String) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(symbol, DiagnosticKind::TaskFailed { reason });
        Self::skipped(symbol, diagnostics)
    }
}

/// Artifact plus the events it was rendered from
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub artifact: AnalysisArtifact,
    pub diagnostics: Diagnostics,
}

/// Drives the per-symbol pipeline over a batch and builds the artifact
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    source: Arc<dyn OptionsSource>,
    max_concurrent: usize,
    run_timeout: Option<Duration>,
}

impl AnalysisOrchestrator {
    pub fn new(source: Arc<dyn OptionsSource>) -> Self {
        Self {
            source,
            max_concurrent: config::DEFAULT_MAX_CONCURRENT,
            run_timeout: Some(Duration::from_secs(config::DEFAULT_RUN_TIMEOUT_SECS)),
        }
    }

    /// Pool size and deadline from `LEVELS_MAX_CONCURRENT` / `LEVELS_RUN_TIMEOUT_SECS`
    pub fn from_env(source: Arc<dyn OptionsSource>) -> Self {
        Self::new(source)
            .with_max_concurrent(config::get_max_concurrent())
            .with_run_timeout(config::get_run_timeout())
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_run_timeout(mut self, run_timeout: Option<Duration>) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout
    }

    /// Run the whole pipeline. Only an invalid request or a malformed script
    /// fails the run; retrieval problems end up in the diagnostics.
    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisArtifact, AnalysisError> {
        self.run_report(request).await.map(|report| report.artifact)
    }

    /// Same as [`run`](Self::run), keeping the structured diagnostics next to the artifact
    pub async fn run_report(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
        request.validate()?;

        let timer = Timer::start(format!("analysis of {} symbols", request.symbols.len()));
        let outcomes = self.collect_outcomes(request).await;

        let mut diagnostics = Diagnostics::new();
        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            debug!(symbol = %outcome.symbol, state = %outcome.state, "Symbol finished");
            diagnostics.extend(outcome.diagnostics);
            if let Some(result) = outcome.result {
                results.push(result);
            }
        }

        let script_text = script::emit(&results)?;
        let generated_at = Utc::now();

        info!(
            emitted = results.len(),
            skipped = diagnostics.skipped_symbols().len(),
            elapsed_secs = timer.elapsed_secs(),
            "Analysis complete"
        );

        let artifact = AnalysisArtifact {
            script_text,
            generated_at,
            diagnostics: format!("# Script executed on: {}\n{}", generated_at.to_rfc3339(), diagnostics.render()),
        };

        Ok(AnalysisReport { artifact, diagnostics })
    }

    /// Fan out one task per symbol and return their outcomes in request order
    pub async fn collect_outcomes(&self, request: &AnalysisRequest) -> Vec<SymbolOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        // a timeout past the clock's range means no deadline
        let deadline = self
            .run_timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let mut handles = Vec::with_capacity(request.symbols.len());

        for symbol in request.symbols.iter().cloned() {
            let source = Arc::clone(&self.source);
            let sem = Arc::clone(&semaphore);
            let target = request.target_date;
            let num_expirations = request.num_expirations;
            let num_strikes = request.num_strikes;
            let span = info_span!("symbol", symbol = %symbol);

            let handle = tokio::spawn(
                async move {
                    let work = async {
                        let _permit = match sem.acquire_owned().await {
                            Ok(permit) => permit,
                            Err(e) => return SymbolOutcome::failed(&symbol, format!("Semaphore error: {}", e)),
                        };
                        analyze_symbol(source.as_ref(), &symbol, target, num_expirations, num_strikes).await
                    };

                    match deadline {
                        Some(deadline) => match tokio::time::timeout_at(deadline, work).await {
                            Ok(outcome) => outcome,
                            Err(_) => {
                                warn!(state = %SymbolState::TimedOut, "Run deadline reached before symbol finished");
                                SymbolOutcome::timed_out(&symbol)
                            }
                        },
                        None => work.await,
                    }
                }
                .instrument(span),
            );

            handles.push(handle);
        }

        join_all(handles)
            .await
            .into_iter()
            .zip(request.symbols.iter())
            .map(|(joined, symbol)| match joined {
                Ok(outcome) => outcome,
                Err(e) => SymbolOutcome::failed(symbol, format!("Task error: {}", e)),
            })
            .collect()
    }
}

fn enter(state: SymbolState) {
    debug!(state = %state, "State transition");
}

/// The serial pipeline for a single symbol
pub async fn analyze_symbol(
    source: &dyn OptionsSource,
    symbol: &str,
    target: NaiveDate,
    num_expirations: usize,
    num_strikes: usize,
) -> SymbolOutcome {
    let mut diagnostics = Diagnostics::new();

    enter(SymbolState::FetchingExpirations);
    let available = match source.list_expirations(symbol).await {
        Ok(available) => available,
        Err(e) => {
            warn!(error = %e, "Could not retrieve expirations");
            diagnostics.push(symbol, DiagnosticKind::ExpirationsUnavailable { reason: e.to_string() });
            return SymbolOutcome::skipped(symbol, diagnostics);
        }
    };

    if available.is_empty() {
        warn!("No expirations found");
        diagnostics.push(symbol, DiagnosticKind::NoExpirations);
        return SymbolOutcome::skipped(symbol, diagnostics);
    }

    enter(SymbolState::Selecting);
    let selection = select_expirations(&available, target, num_expirations);
    for malformed in selection.malformed {
        diagnostics.push(
            symbol,
            DiagnosticKind::MalformedExpiration { raw: malformed.raw, reason: malformed.reason },
        );
    }

    let mut entries = Vec::with_capacity(selection.selected.len());
    for expiration in selection.selected {
        enter(SymbolState::FetchingChain);
        let chain = match source.get_chain(symbol, expiration).await {
            Ok(chain) => chain,
            Err(e) => {
                warn!(%expiration, error = %e, "Could not retrieve option chain");
                diagnostics.push(
                    symbol,
                    DiagnosticKind::ChainUnavailable { expiration, reason: e.to_string() },
                );
                continue;
            }
        };

        enter(SymbolState::Ranking);
        let call_strikes = rank_strikes(&chain.calls, num_strikes);
        let put_strikes = rank_strikes(&chain.puts, num_strikes);

        if call_strikes.is_empty() && put_strikes.is_empty() {
            debug!(%expiration, "No strikes with open interest");
            diagnostics.push(symbol, DiagnosticKind::NoOpenInterest { expiration });
            continue;
        }

        enter(SymbolState::Accumulating);
        entries.push(ExpirationEntry {
            expiration,
            call_strikes,
            put_strikes,
        });
    }

    if entries.is_empty() {
        warn!("No usable expirations");
        diagnostics.push(symbol, DiagnosticKind::NoUsableExpirations);
        return SymbolOutcome::skipped(symbol, diagnostics);
    }

    diagnostics.push(
        symbol,
        DiagnosticKind::ExpirationsUsed {
            expirations: entries.iter().map(|e| e.expiration).collect(),
        },
    );
    enter(SymbolState::Done);
    info!(expirations = entries.len(), "Symbol analyzed");

    SymbolOutcome {
        symbol: symbol.to_string(),
        state: SymbolState::Done,
        result: Some(SymbolResult {
            symbol: symbol.to_string(),
            entries,
        }),
        diagnostics,
    }
}
