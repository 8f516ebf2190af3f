//! The public facade for the A0 language core (spec §6): `parse`,
//! `validate`, `format`, `execute`, `load_policy`, `build_allowed_caps`.
//!
//! This crate owns none of the pipeline logic itself — it re-exports
//! the pipeline crates' types and wires their outputs together the way
//! a host (CLI front-end, tool-implementing library, trace
//! pretty-printer) is expected to: `run` means parse, then validate,
//! then (if clean) evaluate; `check` stops after validate; `fmt` only
//! needs parse.
//!
//! ```
//! use std::collections::BTreeSet;
//! let options = a0::Options::new("inline-run", BTreeSet::new());
//! let outcome = a0::run("return { ok: true }", "inline.a0", options);
//! assert!(outcome.diagnostics.is_empty());
//! assert_eq!(
//!     outcome.value.as_ref().and_then(|v| v.as_record()).and_then(|r| r.get("ok")),
//!     Some(&a0::A0Value::Bool(true)),
//! );
//! ```

pub use a0_ast::{self as ast, Program};
pub use a0_position::{self as position, Span};
pub use a0_diagnostics::{self as diagnostics, Diagnostic};
pub use a0_diagnostics_codes::{self as diagnostics_codes, DiagnosticCode};
pub use a0_evaluator::{
    self as evaluator, CancelToken, Evidence, EvidenceKind, ExecError, ExecOutcome, Options,
    RuntimeError, ToolDef, TraceEvent, TraceEventKind, TraceSink,
};
pub use a0_formatter as formatter;
pub use a0_lexer as lexer;
pub use a0_parser::{self as parser, ParseOutput};
pub use a0_policy::{self as policy, Policy, ToolMode};
pub use a0_stdlib::{self as stdlib, StdlibFn};
pub use a0_validator as validator;
pub use a0_value::{A0Value, Record};

use std::collections::BTreeSet;
use std::path::Path;

/// Parses `source` into an AST plus a diagnostic batch (spec §6:
/// `parse(src, file) -> {program?, diagnostics}`). Recovery means
/// `program` can be `Some` even when `diagnostics` is non-empty.
pub fn parse(source: &str, file: impl Into<std::sync::Arc<str>>) -> ParseOutput {
    a0_parser::parse(source, file)
}

/// Runs every static check over an already-parsed program (spec §6:
/// `validate(program) -> [diagnostic]`). An empty result is the
/// precondition `execute` relies on.
pub fn validate(program: &Program) -> Vec<Diagnostic> {
    a0_validator::validate(program)
}

/// Pretty-prints a program back to canonical A0 source (spec §6:
/// `format(program) -> string`). Idempotent for every program that
/// round-trips through `parse` without diagnostics (spec invariant 1).
pub fn format(program: &Program) -> String {
    a0_formatter::format(program)
}

/// Loads the effective policy by the layered search spec §4.6
/// describes (spec §6: `load_policy(cwd?, home?) -> policy`).
pub fn load_policy(cwd: Option<&Path>, home: Option<&Path>) -> Policy {
    a0_policy::load_policy(cwd, home)
}

/// Computes the effective capability allow-set from a policy (spec
/// §6: `build_allowed_caps(policy, unsafe_allow_all) -> set<string>`).
pub fn build_allowed_caps(policy: &Policy, unsafe_allow_all: bool) -> BTreeSet<String> {
    a0_policy::build_allowed_caps(policy, unsafe_allow_all)
}

/// The facade-level result of [`execute`]: a value on success, `None`
/// on failure, the evidence accumulated either way, and a diagnostic
/// batch that is empty on success or carries exactly one entry (the
/// terminal [`RuntimeError`] converted via
/// [`RuntimeError::into_diagnostic`]) on failure — mirroring spec
/// §7's "diagnostics and runtime errors share the shape" note.
#[derive(Debug)]
pub struct ExecuteOutcome {
    pub value: Option<A0Value>,
    pub evidence: Vec<Evidence>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs a validated program to completion (spec §6: `execute(program,
/// options) -> {value, evidence, diagnostics}`). Callers that skip
/// [`validate`] get whatever the evaluator's own runtime checks catch,
/// not the full static guarantee spec invariant 2 describes.
pub fn execute(program: &Program, options: Options) -> ExecuteOutcome {
    match a0_evaluator::execute(program, options) {
        Ok(ExecOutcome { value, evidence }) => {
            ExecuteOutcome { value: Some(value), evidence, diagnostics: Vec::new() }
        }
        Err(ExecError { error, evidence }) => {
            let diagnostic = error.into_diagnostic();
            ExecuteOutcome { value: None, evidence, diagnostics: vec![diagnostic] }
        }
    }
}

/// Everything a `run` front-end needs in one call: parse, validate,
/// and (if validation found nothing) execute. Stops after parsing if
/// the parser found no program at all, and after validation if it
/// found any diagnostic — matching the CLI exit-code contract of spec
/// §6 (`2` for parse/validation failure, not a mix of both phases'
/// diagnostics).
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub program: Option<Program>,
    pub diagnostics: Vec<Diagnostic>,
    pub value: Option<A0Value>,
    pub evidence: Vec<Evidence>,
}

/// Parses, validates, and (if clean) executes `source` under
/// `options`. `options.run_id`/`allowed_capabilities`/`tools`/`stdlib`
/// are used verbatim for the evaluator stage; everything else in
/// `options` is caller-supplied as usual.
pub fn run(source: &str, file: impl Into<std::sync::Arc<str>>, options: Options) -> RunOutcome {
    let ParseOutput { program, diagnostics } = parse(source, file);
    let Some(program) = program else {
        return RunOutcome { program: None, diagnostics, value: None, evidence: Vec::new() };
    };
    let validation = validate(&program);
    if !validation.is_empty() {
        return RunOutcome {
            program: Some(program),
            diagnostics: validation,
            value: None,
            evidence: Vec::new(),
        };
    }
    let ExecuteOutcome { value, evidence, diagnostics } = execute(&program, options);
    RunOutcome { program: Some(program), diagnostics, value, evidence }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn run_with_no_capabilities_returns_ok() {
        let outcome = run("return { ok: true }", "t.a0", Options::new("run-1", BTreeSet::new()));
        assert!(outcome.diagnostics.is_empty());
        let record = outcome.value.unwrap();
        assert_eq!(record.as_record().unwrap().get("ok"), Some(&A0Value::Bool(true)));
    }

    #[test]
    fn run_stops_after_validation_on_bad_program() {
        let outcome = run("let x = 1", "t.a0", Options::new("run-1", BTreeSet::new()));
        assert!(outcome.value.is_none());
        assert!(!outcome.diagnostics.is_empty());
        assert!(outcome.diagnostics.iter().any(|d| d.code == DiagnosticCode::ENoReturn));
    }
}
