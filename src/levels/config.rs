use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use std::time::Duration;

// -----------------------------------------------
// YAHOO FINANCE ENDPOINTS
// -----------------------------------------------
pub const YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";
pub const YAHOO_CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";
pub const YAHOO_OPTIONS_BASE_URL: &str = "https://query2.finance.yahoo.com/v7/finance/options";

pub fn yahoo_expirations_url(symbol: &str, crumb: &str) -> String {
    format!(
        "{}/{}?crumb={}",
        YAHOO_OPTIONS_BASE_URL,
        urlencoding::encode(symbol),
        urlencoding::encode(crumb)
    )
}

pub fn yahoo_chain_url(symbol: &str, expiration_ts: i64, crumb: &str) -> String {
    format!(
        "{}/{}?date={}&crumb={}",
        YAHOO_OPTIONS_BASE_URL,
        urlencoding::encode(symbol),
        expiration_ts,
        urlencoding::encode(crumb)
    )
}

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                               AppleWebKit/537.36 (KHTML, like Gecko) \
                               Chrome/131.0.0.0 Safari/537.36";

pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.8",
    "en-CA,en;q=0.9",
];

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

// -----------------------------------------------
// RETRY CONFIG
// -----------------------------------------------
pub const RETRY_BASE_DELAY_MS: u64 = 100;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 3;
pub const RETRY_MAX_ATTEMPTS: usize = 3;

// -----------------------------------------------
// CACHE
// -----------------------------------------------
pub const EXPIRATIONS_CACHE_DURATION: Duration = Duration::from_secs(300); // 5 minutes

// -----------------------------------------------
// ANALYSIS DEFAULTS
// -----------------------------------------------
pub const DEFAULT_TICKERS: &[&str] = &[
    "QQQ", "SPY", "DIA", "IWM", "NVDA", "AAPL", "MSFT", "AMZN", "GOOGL", "NFLX",
    "TSLA", "AMD", "META", "NET", "ALAB", "EL", "SYM", "ZETA", "SOXL",
];
pub const DEFAULT_NUM_EXPIRATIONS: i64 = 5;
pub const DEFAULT_NUM_STRIKES: i64 = 5;
pub const DEFAULT_TARGET_OFFSET_DAYS: i64 = 180;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// -----------------------------------------------
// CONCURRENCY LIMITS
// -----------------------------------------------
pub const DEFAULT_MAX_CONCURRENT: usize = 5;
pub const MAX_CONCURRENT_CEILING: usize = 50;
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 120;

// -----------------------------------------------
// SCRIPT STYLING
// -----------------------------------------------
pub const CONTEXT_SYMBOL: &str = "GetSymbol()";
pub const NAN_SENTINEL: &str = "Double.NaN";
pub const CALL_COLOR: &str = "CreateColor(0, 236, 59)";
pub const PUT_COLOR: &str = "CreateColor(255, 17, 17)";
pub const MAX_LINE_WEIGHT: usize = 5;
pub const MIN_LINE_WEIGHT: usize = 1;

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// Get the execution mode from environment or default to batch
pub fn get_execution_mode() -> String {
    std::env::var("LEVELS_MODE").unwrap_or_else(|_| "batch".to_string())
}

/// Tickers for batch mode, comma separated
pub fn get_tickers() -> String {
    std::env::var("LEVELS_TICKERS").unwrap_or_else(|_| DEFAULT_TICKERS.join(","))
}

/// Target expiration date, defaults to six months out
pub fn get_target_date() -> String {
    std::env::var("LEVELS_TARGET_DATE").unwrap_or_else(|_| default_target_date().format(DATE_FORMAT).to_string())
}

pub fn default_target_date() -> NaiveDate {
    Local::now().date_naive() + ChronoDuration::days(DEFAULT_TARGET_OFFSET_DAYS)
}

pub fn get_num_expirations() -> i64 {
    std::env::var("LEVELS_NUM_EXPIRATIONS")
        .ok()
        .and_then(|val| val.parse::<i64>().ok())
        .unwrap_or(DEFAULT_NUM_EXPIRATIONS)
}

pub fn get_num_strikes() -> i64 {
    std::env::var("LEVELS_NUM_STRIKES")
        .ok()
        .and_then(|val| val.parse::<i64>().ok())
        .unwrap_or(DEFAULT_NUM_STRIKES)
}

/// Worker pool size for the symbol fan-out
pub fn get_max_concurrent() -> usize {
    if let Ok(val) = std::env::var("LEVELS_MAX_CONCURRENT") {
        if let Ok(num) = val.parse::<usize>() {
            return num.clamp(1, MAX_CONCURRENT_CEILING);
        }
    }

    DEFAULT_MAX_CONCURRENT
}

/// Overall run deadline; `LEVELS_RUN_TIMEOUT_SECS=0` disables it
pub fn get_run_timeout() -> Option<Duration> {
    let secs = std::env::var("LEVELS_RUN_TIMEOUT_SECS")
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RUN_TIMEOUT_SECS);

    (secs > 0).then(|| Duration::from_secs(secs))
}

pub fn get_output_path() -> String {
    std::env::var("LEVELS_OUTPUT").unwrap_or_else(|_| "oi_levels.ts".to_string())
}

pub fn get_log_dir() -> String {
    std::env::var("LEVELS_LOG_DIR").unwrap_or_else(|_| "./logs".to_string())
}

pub fn get_port() -> u16 {
    std::env::var("LEVELS_PORT")
        .unwrap_or_else(|_| "5000".to_string())
        .parse::<u16>()
        .unwrap_or(5000)
}
