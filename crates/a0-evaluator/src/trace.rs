//! The structured trace-event stream (spec §3, §6).
//!
//! Every event carries a millisecond-precision UTC timestamp and the
//! caller-supplied `run_id`; `data` holds whatever per-kind payload
//! spec §3 lists (tool name/args/mode, budget field, fn name, ...) as
//! a loose `serde_json::Value` rather than one struct per event kind,
//! since the payload shape genuinely varies by `event`. This is
//! deliberately a second, independent output from the `tracing::debug!`
//! spans scattered through the evaluator: the trace stream is a
//! contract a host program parses, the `tracing` spans are for humans
//! debugging the evaluator itself.

use a0_position::Span;
use serde::Serialize;

/// One of the eighteen event tags spec §3 enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEventKind {
    RunStart,
    RunEnd,
    StmtStart,
    StmtEnd,
    ToolStart,
    ToolEnd,
    Evidence,
    BudgetExceeded,
    ForStart,
    ForEnd,
    FnCallStart,
    FnCallEnd,
    MatchStart,
    MatchEnd,
    MapStart,
    MapEnd,
    ReduceStart,
    ReduceEnd,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub ts: String,
    pub run_id: String,
    pub event: TraceEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Millisecond-precision ISO-8601 UTC, e.g. `2026-07-29T12:34:56.789Z`.
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// A sink the evaluator calls once per emitted event. Boxed rather
/// than generic so `Options` doesn't need to thread a type parameter
/// through every evaluator function.
pub type TraceSink = Box<dyn FnMut(&TraceEvent) + Send>;
