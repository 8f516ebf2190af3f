//! End-to-end coverage of spec §8's concrete scenarios (a-f) and the
//! quantified invariants that are cheap to check on real programs.

use a0::{
    build_allowed_caps, execute, format, parse, run, validate, A0Value, CancelToken, Options,
    Policy, RuntimeError, ToolDef, ToolMode,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// A stubbed `fs.read` tool that always succeeds with a fixed payload,
/// recording every call it receives so tests can assert on budget
/// enforcement ordering.
struct StubFsRead {
    calls: Arc<Mutex<Vec<A0Value>>>,
}

impl ToolDef for StubFsRead {
    fn name(&self) -> &str {
        "fs.read"
    }

    fn mode(&self) -> ToolMode {
        ToolMode::Read
    }

    fn capability_id(&self) -> &str {
        "fs.read"
    }

    fn validate_args(&self, _args: &A0Value) -> Result<(), String> {
        Ok(())
    }

    fn execute(&self, args: &A0Value, _cancel: &CancelToken) -> Result<A0Value, String> {
        self.calls.lock().unwrap().push(args.clone());
        Ok(A0Value::string("data"))
    }
}

fn options_with_fs_read(
    run_id: &str,
    allowed: BTreeSet<String>,
) -> (Options, Arc<Mutex<Vec<A0Value>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut options = Options::new(run_id, allowed);
    options
        .tools
        .insert("fs.read".to_string(), Box::new(StubFsRead { calls: calls.clone() }));
    (options, calls)
}

/// (a) `return { ok: true }` with deny-all policy: exit 0, evidence empty.
#[test]
fn scenario_a_deny_all_return_ok() {
    let policy = Policy::empty();
    let allowed = build_allowed_caps(&policy, false);
    let outcome = run("return { ok: true }", "a.a0", Options::new("run-a", allowed));

    assert!(outcome.diagnostics.is_empty());
    assert!(outcome.evidence.is_empty());
    let record = outcome.value.unwrap();
    assert_eq!(record.as_record().unwrap().get("ok"), Some(&A0Value::Bool(true)));
}

/// (b) a declared-but-undeclared-in-policy capability fails with
/// `E_CAP_DENIED` before any tool invocation — no `tool_start` emitted.
#[test]
fn scenario_b_cap_denied_before_any_tool_call() {
    let source = "cap { fs.read: true }\ncall? fs.read { path: \"x\" }\nreturn {}";
    let (mut options, calls) = options_with_fs_read("run-b", BTreeSet::new());

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    options.trace_sink = Some(Box::new(move |event| {
        sink_events.lock().unwrap().push(event.event);
    }));

    let out = run(source, "b.a0", options);
    assert!(out.value.is_none());
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, a0::DiagnosticCode::ECapDenied);
    assert!(calls.lock().unwrap().is_empty());
    assert!(!events.lock().unwrap().iter().any(|e| matches!(e, a0::TraceEventKind::ToolStart)));
}

/// (c) a failed `assert` halts the run with one `assert` evidence
/// record and `E_ASSERT`.
#[test]
fn scenario_c_failed_assert_halts_with_evidence() {
    let source = "assert { that: false, msg: \"nope\" }\nreturn { ok: true }";
    let outcome = run(source, "c.a0", Options::new("run-c", BTreeSet::new()));

    assert!(outcome.value.is_none());
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].code, a0::DiagnosticCode::EAssert);
    assert_eq!(outcome.evidence.len(), 1);
    assert_eq!(outcome.evidence[0].kind, a0::EvidenceKind::Assert);
    assert!(!outcome.evidence[0].ok);
    assert_eq!(outcome.evidence[0].msg, "nope");
}

/// (d) a failed `check` does not halt the run — the value still
/// comes back, with one `check` evidence record.
#[test]
fn scenario_d_failed_check_does_not_halt() {
    let source = "check { that: false, msg: \"soft\" }\nreturn { ok: true }";
    let outcome = run(source, "d.a0", Options::new("run-d", BTreeSet::new()));

    assert!(outcome.diagnostics.is_empty());
    let record = outcome.value.unwrap();
    assert_eq!(record.as_record().unwrap().get("ok"), Some(&A0Value::Bool(true)));
    assert_eq!(outcome.evidence.len(), 1);
    assert_eq!(outcome.evidence[0].kind, a0::EvidenceKind::Check);
    assert!(!outcome.evidence[0].ok);
    assert_eq!(outcome.evidence[0].msg, "soft");
}

/// (e) `maxToolCalls: 1` with two `fs.read` calls raises `E_BUDGET` on
/// the second; exactly one `tool_start`/`tool_end` pair reaches the
/// tool, and a `budget_exceeded` event names `maxToolCalls`.
#[test]
fn scenario_e_budget_exceeded_on_second_tool_call() {
    let source = "budget { maxToolCalls: 1 }\ncap { fs.read: true }\n\
                  call? fs.read { path: \"a\" } -> a\n\
                  call? fs.read { path: \"b\" } -> b\n\
                  return { a: a, b: b }";
    let allowed: BTreeSet<String> = ["fs.read".to_string()].into_iter().collect();
    let (mut options, calls) = options_with_fs_read("run-e", allowed);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    options.trace_sink = Some(Box::new(move |event| {
        sink_events.lock().unwrap().push((event.event, event.data.clone()));
    }));

    let outcome = run(source, "e.a0", options);
    assert!(outcome.value.is_none());
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].code, a0::DiagnosticCode::EBudget);
    assert_eq!(calls.lock().unwrap().len(), 1);

    let recorded = events.lock().unwrap();
    let tool_starts = recorded.iter().filter(|(k, _)| matches!(k, a0::TraceEventKind::ToolStart)).count();
    let tool_ends = recorded.iter().filter(|(k, _)| matches!(k, a0::TraceEventKind::ToolEnd)).count();
    assert_eq!(tool_starts, 1);
    assert_eq!(tool_ends, 1);

    let budget_event = recorded
        .iter()
        .find(|(k, _)| matches!(k, a0::TraceEventKind::BudgetExceeded))
        .expect("budget_exceeded event");
    let data = budget_event.1.as_ref().unwrap();
    assert_eq!(data.get("budget").and_then(|v| v.as_str()), Some("maxToolCalls"));
}

/// (f) a user function threaded through `map` applies to every
/// element in order.
#[test]
fn scenario_f_map_over_user_function() {
    let source = "fn dbl { x } { return { v: x * 2 } }\n\
                  let r = map { in: [1, 2, 3], fn: \"dbl\" }\n\
                  return { r: r }";
    let outcome = run(source, "f.a0", Options::new("run-f", BTreeSet::new()));

    assert!(outcome.diagnostics.is_empty());
    let record = outcome.value.unwrap();
    let r = record.as_record().unwrap().get("r").unwrap().as_list().unwrap();
    let expected: Vec<A0Value> = [2.0, 4.0, 6.0]
        .into_iter()
        .map(|n| {
            let mut rec = a0::Record::new();
            rec.insert("v", A0Value::Number(n));
            A0Value::record(rec)
        })
        .collect();
    assert_eq!(r, expected.as_slice());
}

/// Spec invariant 1: formatting is idempotent modulo comments.
#[test]
fn invariant_formatter_is_idempotent() {
    let source = "let x = 1\nlet y = { a: 1, b: [1, 2, 3] }\nreturn { x: x, y: y }";
    let first = parse(source, "inv1.a0").program.unwrap();
    let formatted_once = format(&first);
    let reparsed = parse(&formatted_once, "inv1.a0").program.unwrap();
    let formatted_twice = format(&reparsed);
    assert_eq!(formatted_once, formatted_twice);
}

/// Spec invariant 2: a validator-clean program either returns a value
/// or raises exactly one documented runtime error.
#[test]
fn invariant_clean_program_raises_at_most_one_error() {
    let source = "let xs = [1, 2, 0]\n\
                  let total = reduce { in: xs, fn: \"div\", init: 10 }\n\
                  return { total: total }\n";
    let with_fn = format!("fn div {{ acc, x }} {{ return acc / x }}\n{source}");
    let program = parse(&with_fn, "inv2.a0").program.unwrap();
    assert!(validate(&program).is_empty());

    let outcome = execute(&program, Options::new("run-inv2", BTreeSet::new()));
    assert!(outcome.value.is_none());
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].code, a0::DiagnosticCode::EType);
}

/// `try`/`catch` converts a catchable runtime error to a bound record,
/// but `assert` failures stay uncatchable per spec §4.7/§7.
#[test]
fn try_catch_does_not_catch_assert() {
    let source = "let result = try {\n  assert { that: false, msg: \"boom\" }\n  return { ok: true }\n} catch { e } {\n  return { caught: e.code }\n}\nreturn result";
    let outcome = run(source, "try.a0", Options::new("run-try", BTreeSet::new()));
    assert!(outcome.value.is_none());
    assert_eq!(outcome.diagnostics[0].code, a0::DiagnosticCode::EAssert);
    assert_eq!(outcome.evidence.len(), 1);
}

#[test]
fn try_catch_catches_type_errors() {
    let source = "let result = try {\n  return { v: 1 + \"x\" }\n} catch { e } {\n  return { caught: e.code }\n}\nreturn result";
    let outcome = run(source, "try2.a0", Options::new("run-try2", BTreeSet::new()));
    assert!(outcome.diagnostics.is_empty());
    let record = outcome.value.unwrap();
    assert_eq!(
        record.as_record().unwrap().get("caught").and_then(A0Value::as_str),
        Some("E_TYPE")
    );
}

/// Asserting `RuntimeError::is_catchable` distinguishes assert from
/// every other runtime error kind used in this module.
#[test]
fn runtime_error_assert_is_the_only_uncatchable_kind() {
    let span = a0::Span::synthetic();
    let assert_err = RuntimeError::Assert { message: "x".into(), span: span.clone(), details: None };
    assert!(!assert_err.is_catchable());
    let type_err = RuntimeError::Type { message: "x".into(), span };
    assert!(type_err.is_catchable());
}
