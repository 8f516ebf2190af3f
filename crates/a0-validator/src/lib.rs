//! Static diagnostic pass over a parsed A0 [`Program`].
//!
//! `validate` never executes anything and never stops at the first
//! finding — it walks the whole tree and returns every diagnostic it
//! can find in one pass, the same batching discipline the parser uses
//! for syntax errors. A program with an empty diagnostic list from this
//! crate is the precondition [`a0_evaluator`](../a0_evaluator/index.html)
//! relies on (spec invariant: `validate(parse(P)) == []` implies
//! `execute` either returns a value or raises exactly one documented
//! runtime error).
//!
//! # Example
//!
//! ```
//! let out = a0_parser::parse("return { ok: true }", "t.a0");
//! let diagnostics = a0_validator::validate(out.program.as_ref().unwrap());
//! assert!(diagnostics.is_empty());
//! ```
//!
//! Five check families run, in no required order: return discipline
//! (§4.5.1), header shape (§4.5.2), binding scoping (§4.5.3), tool
//! resolution (§4.5.4), and function resolution (§4.5.5).

use a0_ast::{Expr, Header, IdentPath, MatchArm, Program, RecordEntry, RecordLit, Stmt};
use a0_diagnostics::Diagnostic;
use a0_diagnostics_codes::DiagnosticCode;
use a0_policy::{KNOWN_CAPABILITIES, ToolMode};
use a0_position::Span;
use std::collections::HashSet;
use std::sync::Arc;

const BUDGET_FIELDS: &[&str] = &["timeMs", "maxToolCalls", "maxBytesWritten", "maxIterations"];

/// Runs every static check against `program` and returns the full
/// diagnostic batch (empty if the program is well-formed).
pub fn validate(program: &Program) -> Vec<Diagnostic> {
    let mut v = Validator {
        diagnostics: Vec::new(),
        declared_caps: HashSet::new(),
        fn_names: HashSet::new(),
        stdlib_names: a0_stdlib::ALL_NAMES.iter().copied().collect(),
    };
    v.check_headers(&program.headers);
    v.check_return_discipline(&program.statements);
    let mut scope = Scope::new();
    v.check_stmts(&program.statements, &mut scope);
    tracing::debug!(diagnostics = v.diagnostics.len(), "validate_end");
    v.diagnostics
}

/// A chain of binding frames, innermost last. Mirrors the evaluator's
/// `Environment` chain (§3): a new frame per `for` iteration, `match`
/// arm, function body, and `try`/`catch` body; `if` branches share the
/// enclosing frame, since the spec's environment model does not list
/// `if` among the frame-creating constructs.
struct Scope {
    frames: Vec<HashSet<Arc<str>>>,
}

impl Scope {
    fn new() -> Self {
        Self { frames: vec![HashSet::new()] }
    }

    fn push(&mut self) {
        self.frames.push(HashSet::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn is_bound(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|f| f.contains(name))
    }

    /// Declares `name` in the innermost frame. Returns `false` (a
    /// duplicate binding) if the name was already declared in that
    /// same frame.
    #[must_use]
    fn declare(&mut self, name: Arc<str>) -> bool {
        self.frames.last_mut().expect("scope always has a root frame").insert(name)
    }
}

struct Validator {
    diagnostics: Vec<Diagnostic>,
    declared_caps: HashSet<String>,
    fn_names: HashSet<Arc<str>>,
    stdlib_names: HashSet<&'static str>,
}

impl Validator {
    fn err(&mut self, code: DiagnosticCode, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(code, span, message));
    }

    // ---- §4.5.1 return discipline ----

    fn check_return_discipline(&mut self, stmts: &[Stmt]) {
        match stmts.iter().position(|s| matches!(s, Stmt::Return { .. })) {
            None => {
                let span = stmts.last().map(|s| s.span().clone()).unwrap_or_else(Span::synthetic);
                self.err(DiagnosticCode::ENoReturn, span, "program must end with a `return` statement");
            }
            Some(idx) if idx + 1 < stmts.len() => {
                for stmt in &stmts[idx + 1..] {
                    self.err(
                        DiagnosticCode::EReturnNotLast,
                        stmt.span().clone(),
                        "unreachable statement after `return`",
                    );
                }
            }
            _ => {}
        }
    }

    // ---- §4.5.2 headers ----

    fn check_headers(&mut self, headers: &[Header]) {
        let mut budget_seen = false;
        for header in headers {
            match header {
                Header::Cap { fields, .. } => self.check_cap_header(fields),
                Header::Budget { fields, span } => {
                    if budget_seen {
                        self.err(DiagnosticCode::EDupBudget, span.clone(), "more than one `budget` header");
                    }
                    budget_seen = true;
                    self.check_budget_header(fields);
                }
                Header::Import { span, .. } => {
                    self.err(
                        DiagnosticCode::EImportUnsupported,
                        span.clone(),
                        "`import` is reserved and not yet supported",
                    );
                }
            }
        }
    }

    fn check_cap_header(&mut self, fields: &RecordLit) {
        for entry in &fields.entries {
            let RecordEntry::Pair { key, value, span } = entry else { continue };
            if !KNOWN_CAPABILITIES.contains(&key.as_ref()) {
                self.err(DiagnosticCode::EUnknownCap, span.clone(), format!("unknown capability `{key}`"));
            }
            let is_true = matches!(value, Expr::Bool { value: true, .. });
            if !is_true {
                self.err(
                    DiagnosticCode::ECapValue,
                    value.span().clone(),
                    format!("capability `{key}` must be declared as `true`"),
                );
            }
            if is_true && KNOWN_CAPABILITIES.contains(&key.as_ref()) {
                self.declared_caps.insert(key.to_string());
            }
        }
    }

    fn check_budget_header(&mut self, fields: &RecordLit) {
        for entry in &fields.entries {
            let RecordEntry::Pair { key, value, span } = entry else { continue };
            if !BUDGET_FIELDS.contains(&key.as_ref()) {
                self.err(DiagnosticCode::EUnknownBudget, span.clone(), format!("unknown budget field `{key}`"));
                continue;
            }
            if !matches!(value, Expr::Int { .. }) {
                self.err(
                    DiagnosticCode::EBudgetType,
                    value.span().clone(),
                    format!("budget field `{key}` must be an integer literal"),
                );
            }
        }
    }

    // ---- §4.5.3-5 statements / bindings / tools / functions ----

    fn check_stmts(&mut self, stmts: &[Stmt], scope: &mut Scope) {
        for stmt in stmts {
            self.check_stmt(stmt, scope);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, scope: &mut Scope) {
        match stmt {
            Stmt::Let { name, value, span } => {
                self.check_expr(value, scope);
                if !scope.declare(name.clone()) {
                    self.err(DiagnosticCode::EDupBinding, span.clone(), format!("duplicate binding `{name}`"));
                }
            }
            Stmt::Expr { value, arrow_target, .. } => {
                self.check_expr(value, scope);
                if let Some(path) = arrow_target {
                    let name = path.head();
                    if !scope.declare(Arc::from(name)) {
                        self.err(
                            DiagnosticCode::EDupBinding,
                            path.span.clone(),
                            format!("duplicate binding `{name}`"),
                        );
                    }
                }
            }
            Stmt::Return { value, .. } => self.check_expr(value, scope),
            Stmt::FnDecl { name, params, body, span } => {
                if self.fn_names.contains(name) || self.stdlib_names.contains(name.as_ref()) {
                    self.err(
                        DiagnosticCode::EFnDup,
                        span.clone(),
                        format!("function `{name}` is already defined or shadows a stdlib name"),
                    );
                } else {
                    self.fn_names.insert(name.clone());
                }
                scope.push();
                for param in params {
                    if !scope.declare(param.clone()) {
                        self.err(
                            DiagnosticCode::EDupBinding,
                            span.clone(),
                            format!("duplicate parameter `{param}`"),
                        );
                    }
                }
                self.check_stmts(body, scope);
                scope.pop();
            }
            Stmt::Try { body, catch_binding, catch_body, .. } => {
                self.check_try(body, catch_binding, catch_body, scope);
            }
        }
    }

    fn check_try(&mut self, body: &[Stmt], catch_binding: &Arc<str>, catch_body: &[Stmt], scope: &mut Scope) {
        scope.push();
        self.check_stmts(body, scope);
        scope.pop();
        scope.push();
        scope.declare(catch_binding.clone());
        self.check_stmts(catch_body, scope);
        scope.pop();
    }

    fn check_expr(&mut self, expr: &Expr, scope: &mut Scope) {
        match expr {
            Expr::Int { .. } | Expr::Float { .. } | Expr::Bool { .. } | Expr::Str { .. } | Expr::Null { .. } => {}
            Expr::Ident(path) => {
                if !scope.is_bound(path.head()) {
                    self.err(
                        DiagnosticCode::EUnbound,
                        path.span.clone(),
                        format!("unbound name `{}`", path.head()),
                    );
                }
            }
            Expr::Record(rec) => self.check_record(rec, scope),
            Expr::List { elements, .. } => {
                for e in elements {
                    self.check_expr(e, scope);
                }
            }
            Expr::Call { tool, args, span } => {
                self.check_record(args, scope);
                self.check_tool_use(tool, span, true);
            }
            Expr::Do { tool, args, span } => {
                self.check_record(args, scope);
                self.check_tool_use(tool, span, false);
            }
            Expr::Assert { args, .. } | Expr::Check { args, .. } => self.check_record(args, scope),
            Expr::FnCall { path, args, span } => {
                self.check_record(args, scope);
                let name = path.render();
                if !self.fn_names.contains(name.as_str()) && !self.stdlib_names.contains(name.as_str()) {
                    self.err(DiagnosticCode::EUnknownFn, span.clone(), format!("unknown function `{name}`"));
                }
            }
            Expr::If { cond, then_branch, else_branch, .. } => {
                self.check_expr(cond, scope);
                self.check_stmts(then_branch, scope);
                if let Some(eb) = else_branch {
                    self.check_stmts(eb, scope);
                }
            }
            Expr::For { list, binding, body, .. } => {
                self.check_expr(list, scope);
                scope.push();
                scope.declare(binding.clone());
                self.check_stmts(body, scope);
                scope.pop();
            }
            Expr::Match { subject, ok_arm, err_arm, .. } => {
                self.check_expr(subject, scope);
                if let Some(arm) = ok_arm {
                    self.check_match_arm(arm, scope);
                }
                if let Some(arm) = err_arm {
                    self.check_match_arm(arm, scope);
                }
            }
            Expr::Try { body, catch_binding, catch_body, .. } => {
                self.check_try(body, catch_binding, catch_body, scope);
            }
            Expr::Binary { left, right, .. } => {
                self.check_expr(left, scope);
                self.check_expr(right, scope);
            }
            Expr::Unary { operand, .. } => self.check_expr(operand, scope),
        }
    }

    fn check_match_arm(&mut self, arm: &MatchArm, scope: &mut Scope) {
        scope.push();
        scope.declare(arm.binding.clone());
        self.check_stmts(&arm.body, scope);
        scope.pop();
    }

    fn check_record(&mut self, rec: &RecordLit, scope: &mut Scope) {
        for entry in &rec.entries {
            match entry {
                RecordEntry::Pair { value, .. } => self.check_expr(value, scope),
                RecordEntry::Spread { expr, .. } => self.check_expr(expr, scope),
            }
        }
    }

    fn check_tool_use(&mut self, tool: &IdentPath, span: &Span, read_only: bool) {
        let name = tool.render();
        match a0_policy::tool_mode(&name) {
            None => {
                self.err(DiagnosticCode::EUnknownTool, span.clone(), format!("unknown tool `{name}`"));
            }
            Some(mode) => {
                if read_only && mode == ToolMode::Effect {
                    self.err(
                        DiagnosticCode::ECallEffect,
                        span.clone(),
                        format!("tool `{name}` has side effects; invoke it with `do`, not `call?`"),
                    );
                }
                if !self.declared_caps.contains(&name) {
                    self.err(
                        DiagnosticCode::EUndeclaredCap,
                        span.clone(),
                        format!("capability `{name}` is not declared in a `cap` header"),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn diags(src: &str) -> Vec<Diagnostic> {
        let out = a0_parser::parse(src, "t.a0");
        validate(out.program.as_ref().expect("program"))
    }

    fn codes(src: &str) -> Vec<DiagnosticCode> {
        diags(src).into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn minimal_program_is_clean() {
        assert_eq!(diags("return { ok: true }"), vec![]);
    }

    #[test]
    fn missing_return_is_e_no_return() {
        assert_eq!(codes("let x = 1"), vec![DiagnosticCode::ENoReturn]);
    }

    #[test]
    fn statement_after_return_is_flagged() {
        assert_eq!(codes("return 1\nlet x = 2"), vec![DiagnosticCode::EReturnNotLast]);
    }

    #[test]
    fn unknown_capability_name_is_rejected() {
        assert!(codes("cap { not.a.cap: true }\nreturn {}").contains(&DiagnosticCode::EUnknownCap));
    }

    #[test]
    fn cap_value_must_be_literal_true() {
        assert!(codes("cap { fs.read: false }\nreturn {}").contains(&DiagnosticCode::ECapValue));
    }

    #[test]
    fn duplicate_budget_header_is_rejected() {
        assert!(codes("budget { timeMs: 1 }\nbudget { timeMs: 2 }\nreturn {}").contains(&DiagnosticCode::EDupBudget));
    }

    #[test]
    fn unknown_budget_field_is_rejected() {
        assert!(codes("budget { bogus: 1 }\nreturn {}").contains(&DiagnosticCode::EUnknownBudget));
    }

    #[test]
    fn budget_field_must_be_integer_literal() {
        assert!(codes(r#"budget { timeMs: "soon" }
return {}"#)
            .contains(&DiagnosticCode::EBudgetType));
    }

    #[test]
    fn import_header_is_always_rejected() {
        assert!(codes(r#"import "x" as y
return {}"#)
            .contains(&DiagnosticCode::EImportUnsupported));
    }

    #[test]
    fn duplicate_let_binding_in_same_scope_is_rejected() {
        assert!(codes("let x = 1\nlet x = 2\nreturn x").contains(&DiagnosticCode::EDupBinding));
    }

    #[test]
    fn self_referential_let_is_unbound() {
        assert!(codes("let x = x\nreturn x").contains(&DiagnosticCode::EUnbound));
    }

    #[test]
    fn unbound_identifier_is_rejected() {
        assert!(codes("return y").contains(&DiagnosticCode::EUnbound));
    }

    #[test]
    fn for_binding_does_not_leak_past_the_loop() {
        let out = diags(r#"let r = for { in: [1], as: "item" } { return item }
return item"#);
        assert!(out.iter().any(|d| d.code == DiagnosticCode::EUnbound));
    }

    #[test]
    fn undeclared_tool_call_is_rejected() {
        assert!(codes(r#"call? fs.read { path: "x" }
return {}"#)
            .contains(&DiagnosticCode::EUndeclaredCap));
    }

    #[test]
    fn unknown_tool_name_is_rejected() {
        assert!(codes(r#"do not.a.tool { }
return {}"#)
            .contains(&DiagnosticCode::EUnknownTool));
    }

    #[test]
    fn call_on_effect_tool_is_rejected() {
        assert!(codes(r#"cap { sh.exec: true }
call? sh.exec { cmd: "ls" }
return {}"#)
            .contains(&DiagnosticCode::ECallEffect));
    }

    #[test]
    fn properly_declared_tool_call_passes() {
        assert_eq!(
            codes(r#"cap { fs.read: true }
call? fs.read { path: "x" }
return {}"#),
            vec![]
        );
    }

    #[test]
    fn fn_name_cannot_shadow_stdlib() {
        assert!(codes("fn len { x } { return x }\nreturn {}").contains(&DiagnosticCode::EFnDup));
    }

    #[test]
    fn duplicate_fn_name_is_rejected() {
        assert!(codes(
            "fn a { x } { return x }\nfn a { y } { return y }\nreturn {}"
        )
        .contains(&DiagnosticCode::EFnDup));
    }

    #[test]
    fn forward_reference_to_a_function_is_unknown() {
        assert!(codes(r#"let r = later { x: 1 }
fn later { x } { return x }
return r"#)
            .contains(&DiagnosticCode::EUnknownFn));
    }

    #[test]
    fn recursive_function_call_is_allowed() {
        assert_eq!(
            codes(
                "fn fact { n } { return if (n <= 1) { return 1 } else { return fact { n: n } } }\nreturn fact { n: 3 }"
            ),
            vec![]
        );
    }

    #[test]
    fn unknown_stdlib_function_name_is_rejected() {
        assert!(codes("return bogus.fn { }").contains(&DiagnosticCode::EUnknownFn));
    }

    #[test]
    fn duplicate_function_parameter_is_rejected() {
        assert!(codes("fn f { x, x } { return x }\nreturn {}").contains(&DiagnosticCode::EDupBinding));
    }
}
