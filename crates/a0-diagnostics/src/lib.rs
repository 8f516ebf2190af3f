//! Diagnostic records and rendering for the A0 pipeline.
//!
//! Every stage from lexing through validation reports failures as
//! [`Diagnostic`] values rather than aborting at the first one: a lex
//! error still produces a best-effort token stream, a parse error still
//! produces a partial AST, and validation always returns the full list
//! of findings rather than stopping at the first. This module defines
//! the shared diagnostic record and its two renderings (`machine`,
//! `pretty`) used by every later stage, plus [`ParseLimits`] /
//! [`ParseLimitTracker`], the parser's own recursion-depth and
//! error-count guard — distinct from the evaluator's user-declared
//! runtime budget.

use a0_diagnostics_codes::DiagnosticCode;
use a0_position::Span;
use std::fmt;

/// Severity of a diagnostic. Only `Error` affects a front-end's exit
/// code; `Warning` and `Note` are informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        write!(f, "{s}")
    }
}

/// A single diagnostic produced by the lexer, parser, validator, or
/// evaluator.
///
/// Lexing and parsing diagnostics are always [`Severity::Error`] in
/// this implementation (neither stage emits warnings); the validator
/// can emit either.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub span: Span,
    pub message: String,
    /// A single one-line suggestion, rendered beneath the primary
    /// message. `None` for most diagnostics (spec §4.1's optional `hint`).
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, span: Span, message: impl Into<String>) -> Self {
        Self { code, severity: Severity::Error, span, message: message.into(), hint: None }
    }

    pub fn warning(code: DiagnosticCode, span: Span, message: impl Into<String>) -> Self {
        Self { code, severity: Severity::Warning, span, message: message.into(), hint: None }
    }

    pub fn with_note(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Machine-readable rendering: JSON with exactly the keys `code`,
    /// `message`, `span`, `hint` (spec §4.1(a)).
    pub fn machine(&self) -> String {
        serde_json::json!({
            "code": self.code.as_str(),
            "message": self.message,
            "span": self.span,
            "hint": self.hint,
        })
        .to_string()
    }

    /// Human-facing multi-line rendering, in the style of a compiler
    /// diagnostic: `error[E_PARSE]: message\n  --> file:line:col\n  hint: ...`
    /// (spec §4.1(b)).
    pub fn pretty(&self) -> String {
        let mut out =
            format!("{}[{}]: {}\n  --> {}", self.severity, self.code.as_str(), self.message, self.span);
        if let Some(hint) = &self.hint {
            out.push_str(&format!("\n  hint: {hint}"));
        }
        out
    }
}

/// Renders a batch of diagnostics: a JSON array for the machine
/// rendering, or blank-line-separated pretty records (spec §4.1).
pub fn render_machine_batch(diagnostics: &[Diagnostic]) -> String {
    let values: Vec<serde_json::Value> = diagnostics
        .iter()
        .map(|d| {
            serde_json::json!({
                "code": d.code.as_str(),
                "message": d.message,
                "span": d.span,
                "hint": d.hint,
            })
        })
        .collect();
    serde_json::Value::Array(values).to_string()
}

pub fn render_pretty_batch(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(Diagnostic::pretty).collect::<Vec<_>>().join("\n\n")
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty())
    }
}

/// Recursion-depth and error-count limits for the lexer and parser.
///
/// These bound the parser's own work before an AST even exists, so
/// adversarial or deeply nested input fails fast with an `E_PARSE`
/// rather than overflowing the stack. This is distinct from the
/// evaluator's user-declared runtime budget, which bounds the *executed
/// program's* tool calls and wall time, not the parser's recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Maximum nesting depth for recursive grammar productions
    /// (expressions, blocks, match arms).
    pub max_depth: usize,
    /// Maximum number of diagnostics to collect before the parser
    /// gives up and returns what it has.
    pub max_errors: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self { max_depth: 256, max_errors: 100 }
    }
}

impl ParseLimits {
    /// Strict limits suitable for parsing untrusted input under a
    /// capability-constrained policy.
    pub fn strict() -> Self {
        Self { max_depth: 64, max_errors: 20 }
    }
}

/// Tracks consumption of a [`ParseLimits`] budget during a single parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseLimitTracker {
    current_depth: usize,
    max_depth_reached: usize,
    errors_emitted: usize,
}

impl ParseLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth_reached(&self) -> usize {
        self.max_depth_reached
    }

    pub fn errors_emitted(&self) -> usize {
        self.errors_emitted
    }

    /// Returns `false` (and does not enter) if descending one more
    /// level would exceed `limits.max_depth`.
    #[must_use]
    pub fn enter_depth(&mut self, limits: &ParseLimits) -> bool {
        if self.current_depth >= limits.max_depth {
            return false;
        }
        self.current_depth += 1;
        if self.current_depth > self.max_depth_reached {
            self.max_depth_reached = self.current_depth;
        }
        true
    }

    pub fn exit_depth(&mut self) {
        self.current_depth = self.current_depth.saturating_sub(1);
    }

    pub fn errors_exhausted(&self, limits: &ParseLimits) -> bool {
        self.errors_emitted >= limits.max_errors
    }

    pub fn record_error(&mut self) {
        self.errors_emitted = self.errors_emitted.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn span() -> Span {
        Span::new("main.a0".into(), 1, 1, 1, 5)
    }

    #[test]
    fn machine_rendering_is_json_with_exact_keys() {
        let d = Diagnostic::error(DiagnosticCode::EParse, span(), "unexpected token");
        let value: serde_json::Value = serde_json::from_str(&d.machine()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("code").and_then(|v| v.as_str()), Some("E_PARSE"));
        assert_eq!(obj.get("message").and_then(|v| v.as_str()), Some("unexpected token"));
        assert!(obj.contains_key("span"));
        assert!(obj.get("hint").unwrap().is_null());
    }

    #[test]
    fn pretty_rendering_includes_hint() {
        let d = Diagnostic::error(DiagnosticCode::EUnbound, span(), "unbound name `x`")
            .with_note("did you mean `y`?");
        let rendered = d.pretty();
        assert!(rendered.contains("error[E_UNBOUND]"));
        assert!(rendered.contains("hint: did you mean `y`?"));
    }

    #[test]
    fn depth_tracker_respects_limit() {
        let limits = ParseLimits { max_depth: 2, max_errors: 100 };
        let mut tracker = ParseLimitTracker::new();

        assert!(tracker.enter_depth(&limits));
        assert!(tracker.enter_depth(&limits));
        assert!(!tracker.enter_depth(&limits));

        tracker.exit_depth();
        assert!(tracker.enter_depth(&limits));
        assert_eq!(tracker.max_depth_reached(), 2);
    }

    #[test]
    fn error_budget_exhausts() {
        let limits = ParseLimits { max_depth: 100, max_errors: 2 };
        let mut tracker = ParseLimitTracker::new();

        assert!(!tracker.errors_exhausted(&limits));
        tracker.record_error();
        tracker.record_error();
        assert!(tracker.errors_exhausted(&limits));
    }
}
