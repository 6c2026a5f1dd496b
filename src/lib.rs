pub mod api_server_axum;
pub mod app_config;
pub mod levels;
pub mod logging;
pub mod utility;

// Re-exports for convenience
pub use levels::{
    AnalysisArtifact, AnalysisError, AnalysisOrchestrator, AnalysisRequest, OptionsSource, RetrievalError,
    YahooClient,
};
