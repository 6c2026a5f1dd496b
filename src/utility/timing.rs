// ============================================
// TIMING UTILITY - Performance Measurement
// ============================================
// Usage:
//   1. Manual tracking: let timer = Timer::start("name"); ... timer.stop();
//   2. Async wrapper: let result = timed_async("operation_name", || async { /* code */ }).await;
// ============================================

use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Logs how long a named operation took
pub struct Timer {
    name: String,
    start: Instant,
    threshold_ms: u128,
    stopped: bool,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self::start_with_threshold(name, 0)
    }

    /// Only logs if execution exceeds `threshold_ms`
    pub fn start_with_threshold(name: impl Into<String>, threshold_ms: u128) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            threshold_ms,
            stopped: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer and log the result
    pub fn stop(mut self) -> Duration {
        let duration = self.start.elapsed();
        self.log_duration(duration);
        self.stopped = true;
        duration
    }

    fn log_duration(&self, duration: Duration) {
        let ms = duration.as_millis();
        if ms < self.threshold_ms {
            return;
        }

        match ms {
            0..=5000 => info!(operation = %self.name, elapsed_ms = ms as u64, "Completed"),
            _ => warn!(operation = %self.name, elapsed_ms = ms as u64, "Completed slowly"),
        }
    }
}

// Auto-log on drop if never stopped
impl Drop for Timer {
    fn drop(&mut self) {
        if !self.stopped {
            let duration = self.start.elapsed();
            self.log_duration(duration);
        }
    }
}

/// Time an async function (shorthand)
pub async fn timed_async<F, Fut, R>(name: impl Into<String>, f: F) -> R
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = R>,
{
    let timer = Timer::start(name);
    let result = f().await;
    timer.stop();
    result
}
