use oi_levels::levels::{AnalysisError, AnalysisOrchestrator, AnalysisRequest, DiagnosticKind, SymbolState};
use std::sync::Arc;
use std::time::Duration;

mod common;

use common::{StubSource, date};

fn request(symbols: &[&str]) -> AnalysisRequest {
    AnalysisRequest::new(symbols.iter().copied(), date("2026-07-01"), 5, 5).unwrap()
}

fn orchestrator(source: StubSource) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(Arc::new(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_symbol_emitted() {
        let source = StubSource::new()
            .expirations("QQQ", &["2026-06-18"])
            .chain("QQQ", "2026-06-18", &[(400.0, 5000), (410.0, 3000)], &[(380.0, 4000)]);

        let artifact = orchestrator(source).run(&request(&["QQQ"])).await.unwrap();

        assert!(artifact.script_text.contains("plot oi_call_QQQ_1_1;"));
        assert!(artifact.script_text.contains("plot oi_call_QQQ_1_2;"));
        assert!(artifact.script_text.contains("plot oi_put_QQQ_1_1;"));
        assert!(!artifact.script_text.contains("oi_put_QQQ_1_2"));
        assert!(artifact.diagnostics.starts_with("# Script executed on: "));
        assert!(artifact.diagnostics.contains("Expiry Dates Used for QQQ: 2026-06-18"));
    }

    #[tokio::test]
    async fn test_symbol_without_expirations_gives_placeholder() {
        let source = StubSource::new().expirations("ZZZZ", &[]);

        let artifact = orchestrator(source).run(&request(&["ZZZZ"])).await.unwrap();

        assert!(artifact.script_text.contains("plot oi_levels_none = Double.NaN;"));
        assert!(!artifact.script_text.contains("GetSymbol()"));
        assert!(artifact.diagnostics.contains("ZZZZ"));
    }

    #[tokio::test]
    async fn test_failed_symbol_is_isolated() {
        let source = StubSource::new()
            .expirations("SPY", &["2026-06-18"])
            .chain("SPY", "2026-06-18", &[(550.0, 900)], &[(500.0, 700)])
            .expirations_fail("BAD", "connection reset");

        let artifact = orchestrator(source).run(&request(&["BAD", "SPY"])).await.unwrap();

        assert!(artifact.script_text.contains("oi_call_SPY_1_1"));
        assert!(!artifact.script_text.contains("BAD"));
        assert!(artifact.diagnostics.contains("Could not retrieve options for BAD"));
    }

    #[tokio::test]
    async fn test_failed_chain_skips_only_that_expiration() {
        let source = StubSource::new()
            .expirations("IWM", &["2026-06-18", "2026-07-17"])
            .chain_fail("IWM", "2026-07-17", "HTTP 502")
            .chain("IWM", "2026-06-18", &[(220.0, 800)], &[]);

        let artifact = orchestrator(source).run(&request(&["IWM"])).await.unwrap();

        // the failed expiration does not take a rank
        assert!(artifact.script_text.contains("plot oi_call_IWM_1_1;"));
        assert!(!artifact.script_text.contains("oi_call_IWM_2_1"));
        assert!(artifact.diagnostics.contains("ERROR fetching options chain for IWM at 2026-07-17"));
        assert!(artifact.diagnostics.contains("Expiry Dates Used for IWM: 2026-06-18"));
    }

    #[tokio::test]
    async fn test_output_follows_request_order() {
        let source = StubSource::new()
            .expirations("B", &["2026-06-18"])
            .chain("B", "2026-06-18", &[(10.0, 100)], &[])
            .delay("B", Duration::from_millis(150))
            .expirations("A", &["2026-06-18"])
            .chain("A", "2026-06-18", &[(20.0, 100)], &[]);

        let artifact = orchestrator(source).run(&request(&["B", "A"])).await.unwrap();

        let b = artifact.script_text.find("plot oi_call_B_1_1;").unwrap();
        let a = artifact.script_text.find("plot oi_call_A_1_1;").unwrap();
        assert!(b < a);

        let b = artifact.diagnostics.find("Expiry Dates Used for B").unwrap();
        let a = artifact.diagnostics.find("Expiry Dates Used for A").unwrap();
        assert!(b < a);
    }

    #[tokio::test]
    async fn test_deadline_keeps_finished_symbols() {
        let source = StubSource::new()
            .expirations("SLOW", &["2026-06-18"])
            .chain("SLOW", "2026-06-18", &[(10.0, 100)], &[])
            .delay("SLOW", Duration::from_secs(5))
            .expirations("FAST", &["2026-06-18"])
            .chain("FAST", "2026-06-18", &[(20.0, 100)], &[]);

        let orchestrator = orchestrator(source).with_run_timeout(Some(Duration::from_millis(200)));
        let outcomes = orchestrator.collect_outcomes(&request(&["SLOW", "FAST"])).await;

        assert_eq!(outcomes[0].symbol, "SLOW");
        assert_eq!(outcomes[0].state, SymbolState::TimedOut);
        assert!(outcomes[0].result.is_none());
        assert_eq!(outcomes[1].state, SymbolState::Done);

        let artifact = orchestrator.run(&request(&["SLOW", "FAST"])).await.unwrap();
        assert!(artifact.script_text.contains("oi_call_FAST_1_1"));
        assert!(!artifact.script_text.contains("SLOW"));
        assert!(artifact.diagnostics.contains("TIMEOUT: SLOW"));
    }

    #[tokio::test]
    async fn test_concurrency_limit_of_one_still_completes() {
        let source = StubSource::new()
            .expirations("A", &["2026-06-18"])
            .chain("A", "2026-06-18", &[(10.0, 100)], &[])
            .expirations("B", &["2026-06-18"])
            .chain("B", "2026-06-18", &[(20.0, 100)], &[]);

        let orchestrator = orchestrator(source).with_max_concurrent(1);
        let outcomes = orchestrator.collect_outcomes(&request(&["A", "B"])).await;

        assert!(outcomes.iter().all(|o| o.state == SymbolState::Done));
    }

    #[tokio::test]
    async fn test_unsorted_calls_ranked_before_emission() {
        let source = StubSource::new()
            .expirations("QQQ", &["2026-06-18"])
            .chain("QQQ", "2026-06-18", &[(500.0, 1000), (510.0, 2000)], &[]);
        let request = AnalysisRequest::new(["QQQ"], date("2026-07-01"), 5, 2).unwrap();

        let artifact = orchestrator(source).run(&request).await.unwrap();
        let script = &artifact.script_text;

        assert!(script.contains("    oi_call_QQQ_1_1 = 510.00;"));
        assert!(script.contains("    oi_call_QQQ_1_2 = 500.00;"));
        assert!(script.contains("oi_call_QQQ_1_1.SetLineWeight(5);"));
        assert!(script.contains("oi_call_QQQ_1_2.SetLineWeight(4);"));
        assert!(!script.contains("oi_put_QQQ"));
    }

    #[tokio::test]
    async fn test_every_chain_failing_skips_symbol() {
        let source = StubSource::new()
            .expirations("BAD", &["2026-06-18", "2026-07-17"])
            .chain_fail("BAD", "2026-06-18", "HTTP 503")
            .chain_fail("BAD", "2026-07-17", "HTTP 503")
            .expirations("SPY", &["2026-06-18"])
            .chain("SPY", "2026-06-18", &[(550.0, 900)], &[(500.0, 700)]);

        let report = orchestrator(source)
            .run_report(&request(&["BAD", "SPY"]))
            .await
            .unwrap();

        assert!(report.artifact.script_text.contains("plot oi_call_SPY_1_1;"));
        assert!(report.artifact.script_text.contains("plot oi_put_SPY_1_1;"));
        assert!(!report.artifact.script_text.contains("BAD"));
        assert!(report
            .artifact
            .diagnostics
            .contains("# WARNING: No usable expirations for BAD (skipped)"));

        assert_eq!(report.diagnostics.skipped_symbols(), vec!["BAD"]);
        let bad_kinds: Vec<&DiagnosticKind> = report
            .diagnostics
            .events()
            .iter()
            .filter(|e| e.symbol == "BAD")
            .map(|e| &e.kind)
            .collect();
        assert_eq!(bad_kinds.len(), 3);
        assert!(matches!(bad_kinds[2], DiagnosticKind::NoUsableExpirations));
    }

    #[tokio::test]
    async fn test_oversized_timeout_means_no_deadline() {
        let source = StubSource::new()
            .expirations("QQQ", &["2026-06-18"])
            .chain("QQQ", "2026-06-18", &[(400.0, 5000)], &[]);

        let orchestrator = orchestrator(source).with_run_timeout(Some(Duration::from_secs(u64::MAX)));
        let artifact = orchestrator.run(&request(&["QQQ"])).await.unwrap();

        assert!(artifact.script_text.contains("plot oi_call_QQQ_1_1;"));
        assert!(!artifact.diagnostics.contains("TIMEOUT"));
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_before_work() {
        let bad = AnalysisRequest {
            symbols: Vec::new(),
            target_date: date("2026-07-01"),
            num_expirations: 5,
            num_strikes: 5,
        };
        let result = orchestrator(StubSource::new()).run(&bad).await;
        assert!(matches!(result, Err(AnalysisError::InvalidRequest(_))));

        assert!(AnalysisRequest::new([" ", ""], date("2026-07-01"), 5, 5).is_err());
        assert!(AnalysisRequest::new(["QQQ"], date("2026-07-01"), 0, 5).is_err());
        assert!(AnalysisRequest::new(["QQQ"], date("2026-07-01"), 5, -1).is_err());
        assert!(AnalysisRequest::parse("QQQ", "07/01/2026", 5, 5).is_err());
    }
}
