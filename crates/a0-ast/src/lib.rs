//! AST node types for A0 programs: headers, statements, expressions.
//!
//! Every node carries a [`Span`] so the validator and evaluator can
//! attribute diagnostics precisely. This crate only defines the shape
//! of the tree — parsing (`a0-parser`), formatting (`a0-formatter`),
//! static checking (`a0-validator`), and execution (`a0-evaluator`)
//! each consume it for their own purpose.

use a0_position::Span;
use std::sync::Arc;

/// A parsed A0 program: zero or more headers followed by the
/// statement pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub headers: Vec<Header>,
    pub statements: Vec<Stmt>,
}

/// A `cap`, `budget`, or `import` header appearing before any
/// statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    /// `cap { fs.read: true, ... }`
    Cap { fields: RecordLit, span: Span },
    /// `budget { timeMs: 5000, ... }`
    Budget { fields: RecordLit, span: Span },
    /// `import "path" as alias` — reserved, always rejected by the
    /// validator with `E_IMPORT_UNSUPPORTED`.
    Import { path: Arc<str>, alias: Arc<str>, span: Span },
}

impl Header {
    pub fn span(&self) -> &Span {
        match self {
            Header::Cap { span, .. } | Header::Budget { span, .. } | Header::Import { span, .. } => span,
        }
    }
}

/// A dotted or plain identifier path (`a`, `fs.read`, `a.b.c`).
#[derive(Debug, Clone, PartialEq)]
pub struct IdentPath {
    pub segments: Vec<Arc<str>>,
    pub span: Span,
}

impl IdentPath {
    pub fn single(name: impl Into<Arc<str>>, span: Span) -> Self {
        Self { segments: vec![name.into()], span }
    }

    /// The first segment, used to resolve the path's binding (e.g. the
    /// variable `a` in `a.b.c`).
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// Renders the path back to dotted text, e.g. `a.b.c`.
    pub fn render(&self) -> String {
        self.segments.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(".")
    }
}

/// A record literal: ordered key/value pairs plus `...expr` spreads,
/// interleaved in textual order (later entries, whether a direct pair
/// or a spread's keys, override earlier ones with the same key).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLit {
    pub entries: Vec<RecordEntry>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordEntry {
    Pair { key: Arc<str>, value: Expr, span: Span },
    Spread { expr: Expr, span: Span },
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let NAME = expr`
    Let { name: Arc<str>, value: Expr, span: Span },
    /// `expr` or `expr -> NAME`.
    Expr { value: Expr, arrow_target: Option<IdentPath>, span: Span },
    /// `return expr`
    Return { value: Expr, span: Span },
    /// `fn NAME { params } { body }`
    FnDecl { name: Arc<str>, params: Vec<Arc<str>>, body: Vec<Stmt>, span: Span },
    /// `try { body } catch { e } { catch_body }`
    Try { body: Vec<Stmt>, catch_binding: Arc<str>, catch_body: Vec<Stmt>, span: Span },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Let { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::FnDecl { span, .. }
            | Stmt::Try { span, .. } => span,
        }
    }
}

/// Binary operators, by precedence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

/// The sole unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
}

/// A `match` arm: `ok { v } { body }` or `err { e } { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub binding: Arc<str>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int { text: Arc<str>, value: f64, span: Span },
    Float { text: Arc<str>, value: f64, span: Span },
    Bool { value: bool, span: Span },
    Str { value: Arc<str>, span: Span },
    Null { span: Span },
    Ident(IdentPath),
    Record(RecordLit),
    List { elements: Vec<Expr>, span: Span },
    /// `call? tool.path { args }` — read-only tool invocation.
    Call { tool: IdentPath, args: RecordLit, span: Span },
    /// `do tool.path { args }` — effectful tool invocation.
    Do { tool: IdentPath, args: RecordLit, span: Span },
    Assert { args: RecordLit, span: Span },
    Check { args: RecordLit, span: Span },
    /// A call to a user `fn` or a stdlib function: `name { args }`.
    FnCall { path: IdentPath, args: RecordLit, span: Span },
    /// Record-form or block-form `if`.
    If { cond: Box<Expr>, then_branch: Vec<Stmt>, else_branch: Option<Vec<Stmt>>, span: Span },
    /// `for { in: xs, as: "v" } { body }`.
    For { list: Box<Expr>, binding: Arc<str>, body: Vec<Stmt>, span: Span },
    /// `match subj { ok {v} {...} err {e} {...} }`.
    Match { subject: Box<Expr>, ok_arm: Option<MatchArm>, err_arm: Option<MatchArm>, span: Span },
    /// `try { ... } catch { e } { ... }` used as an expression (same
    /// shape as [`Stmt::Try`], reachable anywhere an expression is).
    Try { body: Vec<Stmt>, catch_binding: Arc<str>, catch_body: Vec<Stmt>, span: Span },
    Binary { op: BinOp, left: Box<Expr>, right: Box<Expr>, span: Span },
    Unary { op: UnOp, operand: Box<Expr>, span: Span },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Int { span, .. }
            | Expr::Float { span, .. }
            | Expr::Bool { span, .. }
            | Expr::Str { span, .. }
            | Expr::Null { span }
            | Expr::List { span, .. }
            | Expr::Call { span, .. }
            | Expr::Do { span, .. }
            | Expr::Assert { span, .. }
            | Expr::Check { span, .. }
            | Expr::FnCall { span, .. }
            | Expr::If { span, .. }
            | Expr::For { span, .. }
            | Expr::Match { span, .. }
            | Expr::Try { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. } => span,
            Expr::Ident(path) => &path.span,
            Expr::Record(r) => &r.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new("t.a0", 1, 1, 1, 1)
    }

    #[test]
    fn ident_path_renders_dotted() {
        let path = IdentPath {
            segments: vec![Arc::from("fs"), Arc::from("read")],
            span: span(),
        };
        assert_eq!(path.render(), "fs.read");
        assert_eq!(path.head(), "fs");
    }

    #[test]
    fn expr_span_covers_every_variant() {
        let e = Expr::Binary {
            op: BinOp::Add,
            left: Box::new(Expr::Int { text: Arc::from("1"), value: 1.0, span: span() }),
            right: Box::new(Expr::Int { text: Arc::from("2"), value: 2.0, span: span() }),
            span: span(),
        };
        assert_eq!(e.span(), &span());
    }
}
