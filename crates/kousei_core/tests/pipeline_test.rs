//! End-to-end runs through an external filter and a LanguageTool server.
#![cfg(unix)]

use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kousei_core::{
    CancellationToken, CheckerConfig, FILTER_ERROR_RULE, FilterConfig, PipelineError,
    Replacement, RunOutcome, ServerConfig, Severity, Snapshot, Span, Url,
};

/// Drops `%` comments up to the end of the line, like a LaTeX filter would.
const COMMENT_FILTER: &str =
    r#"cat >/dev/null; printf '{"text":"Hi \\nwrold","charmap":[0,1,2,8,9,10,11,12,13]}'"#;

fn config(server: &MockServer, script: &str) -> ServerConfig {
    ServerConfig {
        checker: CheckerConfig {
            endpoint: server.uri(),
            timeout_ms: 2_000,
        },
        filter: FilterConfig::Command {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        },
        ..Default::default()
    }
}

fn snapshot(text: &str) -> Snapshot {
    Snapshot::new(Url::parse("file:///tmp/thesis.tex").unwrap(), 1, text)
}

fn typo_match(offset: usize) -> serde_json::Value {
    serde_json::json!({
        "matches": [{
            "message": "Possible spelling mistake found.",
            "shortMessage": "Spelling mistake",
            "offset": offset,
            "length": 5,
            "replacements": [{"value": "world"}],
            "context": {"text": "Hi \nwrold", "offset": 4, "length": 5},
            "rule": {"id": "MORFOLOGIK_RULE_EN_US", "category": {"id": "TYPOS"}}
        }]
    })
}

#[tokio::test]
async fn test_findings_are_mapped_back_through_the_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/check"))
        .and(body_string_contains("language=en-US"))
        .respond_with(ResponseTemplate::new(200).set_body_json(typo_match(4)))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = config(&server, COMMENT_FILTER).pipeline().unwrap();
    let outcome = pipeline
        .run(&snapshot("Hi %note\nwrold"), &CancellationToken::new())
        .await
        .unwrap();

    let RunOutcome::Finished(diagnostics) = outcome else {
        panic!("Expected a finished run, got {outcome:?}");
    };
    assert_eq!(diagnostics.len(), 1);

    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.rule_id, "morfologik_rule_en_us");
    assert_eq!(diagnostic.span, Span::new(9, 14));
    assert!(!diagnostic.approximate);
    assert_eq!(diagnostic.severity, Severity::Warning);
    assert_eq!(diagnostic.matched, "wrold");
    assert_eq!(diagnostic.replacements, vec![Replacement::new("world")]);
}

#[tokio::test]
async fn test_filter_failure_degrades_to_single_diagnostic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(typo_match(0)))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = config(&server, "cat >/dev/null; echo 'missing }' >&2; exit 1")
        .pipeline()
        .unwrap();
    let outcome = pipeline
        .run(&snapshot("\\emph{wrold"), &CancellationToken::new())
        .await
        .unwrap();

    let RunOutcome::Finished(diagnostics) = outcome else {
        panic!("Expected a finished run, got {outcome:?}");
    };
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule_id, FILTER_ERROR_RULE);
    assert_eq!(diagnostics[0].span, Span::new(0, 0));
    assert!(diagnostics[0].message.contains("missing }"));
}

#[tokio::test]
async fn test_unreachable_checker_fails_the_run() {
    let server = MockServer::start().await;
    let pipeline = config(&server, COMMENT_FILTER).pipeline().unwrap();
    drop(server);

    let err = pipeline
        .run(&snapshot("Hi %note\nwrold"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_checker_failure(), "Expected checker failure, got {err:?}");
}

#[tokio::test]
async fn test_slow_checker_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(typo_match(4))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let mut config = config(&server, COMMENT_FILTER);
    config.checker.timeout_ms = 50;
    let err = config
        .pipeline()
        .unwrap()
        .run(&snapshot("Hi %note\nwrold"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::CheckerTimeout(_)));
    assert!(err.is_checker_failure());
}

#[tokio::test]
async fn test_cancelled_run_does_not_reach_the_checker() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(typo_match(4)))
        .expect(0)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();
    let outcome = config(&server, COMMENT_FILTER)
        .pipeline()
        .unwrap()
        .run(&snapshot("Hi %note\nwrold"), &token)
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Cancelled);
}
