use crate::levels::config;
use crate::levels::{
    AnalysisError, AnalysisOrchestrator, AnalysisRequest, CachingSource, OptionsSource, YahooClient,
};
use anyhow::Result;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

// -----------------------------------------------
// API REQUEST/RESPONSE MODELS
// -----------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub tickers: Option<String>,
    pub target_date: Option<String>,
    pub num_expirations: Option<i64>,
    pub num_strikes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, start_time: Instant) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }

    fn err(error: impl ToString, start_time: Instant) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeParameters {
    pub tickers: Vec<String>,
    pub target_date: String,
    pub num_expirations: usize,
    pub num_strikes: usize,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub thinkscript: String,
    pub execution_time: String,
    pub diagnostics: String,
    pub parameters: AnalyzeParameters,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<AnalysisOrchestrator>,
}

impl AppState {
    /// Yahoo-backed state configured from the environment
    pub fn new() -> Result<Self> {
        let source = Arc::new(CachingSource::new(YahooClient::new()?));
        Ok(Self::with_source(source))
    }

    pub fn with_source(source: Arc<dyn OptionsSource>) -> Self {
        Self::with_orchestrator(AnalysisOrchestrator::from_env(source))
    }

    pub fn with_orchestrator(orchestrator: AnalysisOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// GET /api/test - Liveness check
async fn get_test() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "success",
        message: "API is working!",
    })
}

/// GET /api/analyze?tickers=QQQ,SPY&target_date=2025-07-25&num_expirations=5&num_strikes=5
async fn get_analyze(
    Query(query): Query<AnalyzeQuery>,
    State(app_state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<AnalyzeResponse>>) {
    let start_time = Instant::now();

    let tickers = query.tickers.unwrap_or_default();
    if tickers.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(
                AnalysisError::InvalidRequest("No tickers provided".to_string()),
                start_time,
            )),
        );
    }

    let target_date = query.target_date.unwrap_or_else(config::get_target_date);
    let request = match AnalysisRequest::parse(
        &tickers,
        &target_date,
        query.num_expirations.unwrap_or(config::DEFAULT_NUM_EXPIRATIONS),
        query.num_strikes.unwrap_or(config::DEFAULT_NUM_STRIKES),
    ) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected analyze request");
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::err(e, start_time)));
        }
    };

    info!(symbols = request.symbols.len(), target_date = %request.target_date, "Analyze request");

    match app_state.orchestrator.run(&request).await {
        Ok(artifact) => (
            StatusCode::OK,
            Json(ApiResponse::ok(
                AnalyzeResponse {
                    thinkscript: artifact.script_text,
                    execution_time: artifact.generated_at.to_rfc3339(),
                    diagnostics: artifact.diagnostics,
                    parameters: AnalyzeParameters {
                        tickers: request.symbols,
                        target_date: request.target_date.format(config::DATE_FORMAT).to_string(),
                        num_expirations: request.num_expirations,
                        num_strikes: request.num_strikes,
                    },
                },
                start_time,
            )),
        ),
        Err(e @ AnalysisError::InvalidRequest(_)) => {
            (StatusCode::BAD_REQUEST, Json(ApiResponse::err(e, start_time)))
        }
        Err(e @ AnalysisError::EmissionInvariantViolation(_)) => {
            error!(error = %e, "Generated script failed validation");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::err(e, start_time)))
        }
    }
}

// -----------------------------------------------
// SERVER SETUP
// -----------------------------------------------

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/test", get(get_test))
        .route("/api/analyze", get(get_analyze))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn start_server(port: u16) -> Result<()> {
    let app = build_router(AppState::new()?);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "OI Levels API server listening");
    println!("🚀 OI Levels API Server running on http://{}", addr);
    println!("📋 Available endpoints:");
    println!("   GET  /api/test");
    println!("   GET  /api/analyze?tickers=QQQ,SPY&target_date=2025-07-25&num_expirations=5&num_strikes=5");
    println!();

    axum::serve(listener, app).await?;
    Ok(())
}
