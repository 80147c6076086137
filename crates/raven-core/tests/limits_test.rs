#![allow(clippy::unwrap_used)]
// Evaluation bounds: every runaway script ends in an `EvaluationError`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use raven_core::{CoreError, EvalLimits, EvaluationError, EvaluationErrorKind, Evaluator};

// ── Helpers ─────────────────────────────────────────────────────────

fn eval_error(limits: EvalLimits, source: &str) -> EvaluationError {
    match Evaluator::new(limits).evaluate_raw(source, &BTreeMap::new()) {
        Err(CoreError::Evaluation(e)) => e,
        other => panic!("expected an evaluation error, got {other:?}"),
    }
}

fn short_timeout() -> EvalLimits {
    EvalLimits {
        timeout: Duration::from_millis(200),
        ..EvalLimits::default()
    }
}

fn assert_kind(source: &str, kind: EvaluationErrorKind) {
    let err = eval_error(EvalLimits::default(), source);
    assert_eq!(err.kind, kind, "{source}: {}", err.message);
}

// ── Limits ──────────────────────────────────────────────────────────

#[test]
fn test_infinite_loop_times_out() {
    let started = Instant::now();
    let err = eval_error(short_timeout(), "while (true) {}");
    assert_eq!(err.kind, EvaluationErrorKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_unbounded_recursion() {
    assert_kind(
        "function f(n) { return f(n + 1) } f(0)",
        EvaluationErrorKind::ResourceLimit,
    );
}

#[test]
fn test_huge_sizes_never_reach_the_allocator() {
    for source in [
        "return 'abc'.padStart(2**40)",
        "return 'abc'.padEnd(2**40, 'xy')",
        "return 'x'.repeat(2**40)",
        "return Array(2**40)",
        "return (1).toFixed(1000)",
    ] {
        let err = eval_error(EvalLimits::default(), source);
        assert!(
            matches!(
                err.kind,
                EvaluationErrorKind::Range | EvaluationErrorKind::ResourceLimit
            ),
            "{source}: {err}"
        );
    }
}

#[test]
fn test_large_builtin_results_hit_the_heap_limit() {
    for source in [
        "return 'abc'.padStart(2**28)",
        "return 'x'.repeat(2**28)",
        "return new Array(2**28).fill(0)",
        "return Range(2**40)",
        "return Nic(2**40, 1000, 'e1000')",
    ] {
        assert_kind(source, EvaluationErrorKind::ResourceLimit);
    }
}

#[test]
fn test_heap_limit_spans_the_whole_run() {
    let source = r"
        let kept = []
        for (let i = 0; i < 600; i++) kept.push(String(i).repeat(4000000))
        return kept.length
    ";
    let err = eval_error(EvalLimits::default(), source);
    assert_eq!(err.kind, EvaluationErrorKind::ResourceLimit);

    let tight = EvalLimits {
        max_heap_bytes: 8 * 1024 * 1024,
        ..EvalLimits::default()
    };
    let err = eval_error(
        tight,
        "let xs = []; while (true) xs.push(String(xs.length).repeat(100000))",
    );
    assert_eq!(err.kind, EvaluationErrorKind::ResourceLimit);

    let fine = Evaluator::default()
        .evaluate_raw("return 'x'.repeat(1000).length", &BTreeMap::new())
        .unwrap();
    assert_eq!(fine, serde_json::json!(1000));
}

#[test]
fn test_cancellation_mid_run() {
    let token = CancellationToken::new();
    let evaluator = Evaluator::new(EvalLimits {
        timeout: Duration::from_secs(30),
        ..EvalLimits::default()
    });
    let canceller = {
        let token = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            token.cancel();
        })
    };
    let err = evaluator
        .evaluate_with_cancel("while (true) {}", &BTreeMap::new(), &token)
        .unwrap_err();
    canceller.join().unwrap();
    let CoreError::Evaluation(e) = err else {
        panic!("expected an evaluation error");
    };
    assert_eq!(e.kind, EvaluationErrorKind::Cancelled);
}

#[test]
fn test_cycles_cannot_escape() {
    let err = eval_error(
        EvalLimits::default(),
        "let a = { name: 'loop' }; a.self = a; topo = a",
    );
    assert_eq!(err.kind, EvaluationErrorKind::Type);
}

#[test]
fn test_no_host_capabilities() {
    for source in [
        "return require('fs')",
        "return process.env",
        "return fetch('http://example.com')",
        "return Date.now()",
    ] {
        let err = eval_error(EvalLimits::default(), source);
        assert!(
            matches!(
                err.kind,
                EvaluationErrorKind::Reference | EvaluationErrorKind::Syntax | EvaluationErrorKind::Thrown
            ),
            "{source}: {err}"
        );
    }
    assert_kind("return Math.random()", EvaluationErrorKind::Type);
}

#[tokio::test]
async fn test_async_evaluation() {
    let topology = Evaluator::default()
        .evaluate_async(
            "topo = { name: 'async', nodes: [Node('n0', 0, [])] }".into(),
            BTreeMap::new(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(topology.name, "async");
}
