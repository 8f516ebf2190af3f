//! Precedence-climbing parser: A0 token stream → AST.
//!
//! The grammar (see crate-level docs in `spec.md` §4.3) is:
//!
//! ```text
//! expr        := if | for | match | try | call? | do | assert | check | comparison
//! comparison  := additive ((> | < | >= | <= | == | !=) additive)?     -- non-associative
//! additive    := multiplicative ((+ | -) multiplicative)*             -- left-assoc
//! mult        := unary ((* | / | %) unary)*                          -- left-assoc
//! unary       := '-' unary | primary
//! primary     := '(' expr ')' | record | list | literal | ident-or-fn-call
//! ```
//!
//! Parsing never stops at the first error: a malformed statement is
//! skipped to the next synchronization point (a statement-starting
//! keyword, `}`, or end of input) so a caller gets the complete list
//! of `E_PARSE`/`E_AST` diagnostics for a file in one pass, mirroring
//! the lexer's resume-after-error discipline.

use a0_ast::{BinOp, Expr, Header, IdentPath, MatchArm, Program, RecordEntry, RecordLit, Stmt, UnOp};
use a0_diagnostics::{Diagnostic, ParseLimitTracker, ParseLimits};
use a0_diagnostics_codes::DiagnosticCode;
use a0_position::{ByteSpan, LineIndex, Span};
use a0_token::{Keyword, Punct, Token, TokenKind};
use std::sync::Arc;

/// The parsed program (if recovery produced a complete tree) and the
/// full batch of diagnostics collected along the way.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub program: Option<Program>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses `source` with default recursion/error-count limits.
pub fn parse(source: &str, file: impl Into<Arc<str>>) -> ParseOutput {
    parse_with_limits(source, file, ParseLimits::default(), false)
}

/// Parses `source`, preserving the parser's raw expected-token list in
/// diagnostic hints instead of a concise message (useful for tooling
/// that wants the full context of a syntax error).
pub fn parse_debug(source: &str, file: impl Into<Arc<str>>) -> ParseOutput {
    parse_with_limits(source, file, ParseLimits::default(), true)
}

/// Parses `source` under explicit [`ParseLimits`].
pub fn parse_with_limits(
    source: &str,
    file: impl Into<Arc<str>>,
    limits: ParseLimits,
    debug: bool,
) -> ParseOutput {
    let file = file.into();
    let lexed = a0_lexer::lex(source, file.clone());
    let mut diagnostics = lexed.diagnostics;

    let index = LineIndex::new(source);
    let mut parser = Parser {
        tokens: lexed.tokens,
        pos: 0,
        file,
        source,
        index,
        diagnostics: Vec::new(),
        limits,
        tracker: ParseLimitTracker::new(),
        debug,
    };
    let program = parser.parse_program();
    diagnostics.append(&mut parser.diagnostics);
    tracing::debug!(errors = diagnostics.len(), "parse_end");
    ParseOutput { program: Some(program), diagnostics }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    file: Arc<str>,
    source: &'a str,
    index: LineIndex,
    diagnostics: Vec<Diagnostic>,
    limits: ParseLimits,
    tracker: ParseLimitTracker,
    debug: bool,
}

/// RAII-ish guard pattern isn't worth it here: every recursive entry
/// point calls `enter`/`exit` explicitly and returns early on `enter`
/// failure, matching `a0-diagnostics::ParseLimitTracker`'s contract.
impl<'a> Parser<'a> {
    fn kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn byte_span(&self) -> ByteSpan {
        self.tokens[self.pos].span
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 { 0 } else { self.tokens[self.pos - 1].span.end }
    }

    fn is_eof(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn to_span(&self, bs: ByteSpan) -> Span {
        let (sl, sc) = self.index.offset_to_line_col(self.source, bs.start);
        let (el, ec) = self.index.offset_to_line_col(self.source, bs.end);
        Span::new(self.file.clone(), sl, sc, el, ec)
    }

    fn mk_span(&self, start: usize, end: usize) -> Span {
        self.to_span(ByteSpan::new(start, end.max(start)))
    }

    fn record_error(&mut self, span: Span, code: DiagnosticCode, message: impl Into<String>, hint: Option<&str>) {
        if self.tracker.errors_exhausted(&self.limits) {
            return;
        }
        self.tracker.record_error();
        let mut diag = Diagnostic::error(code, span, message.into());
        if let Some(h) = hint {
            diag = diag.with_note(h);
        }
        self.diagnostics.push(diag);
    }

    fn is_punct(&self, p: Punct) -> bool {
        matches!(self.kind(), TokenKind::Punct(k) if *k == p)
    }

    fn is_keyword(&self, k: Keyword) -> bool {
        matches!(self.kind(), TokenKind::Keyword(kw) if *kw == k)
    }

    fn eat_punct(&mut self, p: Punct) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, k: Keyword) -> bool {
        if self.is_keyword(k) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: Punct) -> Option<ByteSpan> {
        if self.is_punct(p) {
            let span = self.byte_span();
            self.advance();
            Some(span)
        } else {
            let got = self.kind().to_string();
            let msg = if self.debug {
                format!("expected `{}`, found {got} (raw expected set: [\"{}\"])", p.as_str(), p.as_str())
            } else {
                format!("expected `{}`, found {got}", p.as_str())
            };
            let span = self.mk_span(self.byte_span().start, self.byte_span().end);
            self.record_error(span, DiagnosticCode::EParse, msg, None);
            None
        }
    }

    fn expect_keyword(&mut self, k: Keyword) -> Option<ByteSpan> {
        if self.is_keyword(k) {
            let span = self.byte_span();
            self.advance();
            Some(span)
        } else {
            let got = self.kind().to_string();
            let msg = format!("expected keyword `{}`, found {got}", k.as_str());
            let span = self.mk_span(self.byte_span().start, self.byte_span().end);
            self.record_error(span, DiagnosticCode::EParse, msg, None);
            None
        }
    }

    fn expect_ident(&mut self) -> Option<(Arc<str>, ByteSpan)> {
        if let TokenKind::Ident(name) = self.kind() {
            let name = name.clone();
            let span = self.byte_span();
            self.advance();
            Some((name, span))
        } else {
            let got = self.kind().to_string();
            let span = self.mk_span(self.byte_span().start, self.byte_span().end);
            self.record_error(span, DiagnosticCode::EParse, format!("expected identifier, found {got}"), None);
            None
        }
    }

    /// Skips tokens until a plausible statement boundary, so one
    /// malformed statement doesn't cascade into spurious errors for
    /// everything after it.
    fn synchronize(&mut self) {
        loop {
            if self.is_eof() || self.is_punct(Punct::RBrace) {
                return;
            }
            if self.is_keyword(Keyword::Let)
                || self.is_keyword(Keyword::Return)
                || self.is_keyword(Keyword::Fn)
                || self.is_keyword(Keyword::Try)
                || self.is_keyword(Keyword::CallQuestion)
                || self.is_keyword(Keyword::Do)
                || self.is_keyword(Keyword::Assert)
                || self.is_keyword(Keyword::Check)
            {
                return;
            }
            self.advance();
        }
    }

    fn enter(&mut self) -> bool {
        if !self.tracker.enter_depth(&self.limits) {
            let span = self.mk_span(self.byte_span().start, self.byte_span().end);
            self.record_error(
                span,
                DiagnosticCode::EParse,
                "expression nesting too deep",
                Some("break the expression into intermediate `let` bindings"),
            );
            false
        } else {
            true
        }
    }

    fn exit(&mut self) {
        self.tracker.exit_depth();
    }

    // ---- top level ----

    fn parse_program(&mut self) -> Program {
        let headers = self.parse_headers();
        let mut statements = Vec::new();
        while !self.is_eof() {
            if let Some(stmt) = self.parse_stmt() {
                statements.push(stmt);
            } else {
                self.synchronize();
            }
        }
        Program { headers, statements }
    }

    fn parse_headers(&mut self) -> Vec<Header> {
        let mut headers = Vec::new();
        loop {
            if self.is_keyword(Keyword::Cap) {
                let start = self.byte_span().start;
                self.advance();
                let fields = self.parse_record();
                let span = self.mk_span(start, self.prev_end());
                headers.push(Header::Cap { fields, span });
            } else if self.is_keyword(Keyword::Budget) {
                let start = self.byte_span().start;
                self.advance();
                let fields = self.parse_record();
                let span = self.mk_span(start, self.prev_end());
                headers.push(Header::Budget { fields, span });
            } else if self.is_keyword(Keyword::Import) {
                let start = self.byte_span().start;
                self.advance();
                let path = match self.kind() {
                    TokenKind::StringLiteral(s) => {
                        let s = s.clone();
                        self.advance();
                        s
                    }
                    _ => {
                        let span = self.mk_span(self.byte_span().start, self.byte_span().end);
                        self.record_error(span, DiagnosticCode::EParse, "expected string path after `import`", None);
                        Arc::from("")
                    }
                };
                self.expect_keyword(Keyword::As);
                let alias = self.expect_ident().map(|(n, _)| n).unwrap_or_else(|| Arc::from(""));
                let span = self.mk_span(start, self.prev_end());
                headers.push(Header::Import { path, alias, span });
            } else {
                break;
            }
        }
        headers
    }

    // ---- statements ----

    fn parse_stmt(&mut self) -> Option<Stmt> {
        if self.is_keyword(Keyword::Let) {
            return self.parse_let_stmt();
        }
        if self.is_keyword(Keyword::Return) {
            return self.parse_return_stmt();
        }
        if self.is_keyword(Keyword::Fn) {
            return self.parse_fn_decl();
        }
        if self.is_keyword(Keyword::Try) {
            let (body, catch_binding, catch_body, span) = self.parse_try_parts()?;
            return Some(Stmt::Try { body, catch_binding, catch_body, span });
        }
        let start = self.byte_span().start;
        let value = self.parse_expr()?;
        let arrow_target = if self.eat_punct(Punct::Arrow) { Some(self.parse_dotted_ident_path()?) } else { None };
        let span = self.mk_span(start, self.prev_end());
        Some(Stmt::Expr { value, arrow_target, span })
    }

    fn parse_let_stmt(&mut self) -> Option<Stmt> {
        let start = self.byte_span().start;
        self.advance(); // `let`
        let (name, _) = self.expect_ident()?;
        self.expect_punct(Punct::Eq)?;
        let value = self.parse_expr()?;
        let span = self.mk_span(start, self.prev_end());
        Some(Stmt::Let { name, value, span })
    }

    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let start = self.byte_span().start;
        self.advance(); // `return`
        let value = self.parse_expr()?;
        let span = self.mk_span(start, self.prev_end());
        Some(Stmt::Return { value, span })
    }

    fn parse_fn_decl(&mut self) -> Option<Stmt> {
        let start = self.byte_span().start;
        self.advance(); // `fn`
        let (name, _) = self.expect_ident()?;
        let params = self.parse_params()?;
        let (body, _) = self.parse_block()?;
        let span = self.mk_span(start, self.prev_end());
        Some(Stmt::FnDecl { name, params, body, span })
    }

    fn parse_params(&mut self) -> Option<Vec<Arc<str>>> {
        self.expect_punct(Punct::LBrace)?;
        let mut params = Vec::new();
        while !self.is_punct(Punct::RBrace) && !self.is_eof() {
            let (name, _) = self.expect_ident()?;
            params.push(name);
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_punct(Punct::RBrace)?;
        Some(params)
    }

    /// `{ e }` — exactly one identifier, used for match-arm and
    /// catch bindings. Empty or multi-identifier forms are `E_PARSE`.
    fn parse_single_binding(&mut self) -> Option<Arc<str>> {
        self.expect_punct(Punct::LBrace)?;
        if self.is_punct(Punct::RBrace) {
            let span = self.mk_span(self.byte_span().start, self.byte_span().end);
            self.record_error(span, DiagnosticCode::EParse, "expected exactly one binding name, found none", None);
            self.advance();
            return None;
        }
        let (name, _) = self.expect_ident()?;
        if self.is_punct(Punct::Comma) {
            let span = self.mk_span(self.byte_span().start, self.byte_span().end);
            self.record_error(span, DiagnosticCode::EParse, "expected exactly one binding name, found more than one", None);
            while !self.is_punct(Punct::RBrace) && !self.is_eof() {
                self.advance();
            }
        }
        self.expect_punct(Punct::RBrace)?;
        Some(name)
    }

    fn parse_block(&mut self) -> Option<(Vec<Stmt>, ByteSpan)> {
        let open = self.expect_punct(Punct::LBrace)?;
        let mut stmts = Vec::new();
        while !self.is_punct(Punct::RBrace) && !self.is_eof() {
            if let Some(stmt) = self.parse_stmt() {
                stmts.push(stmt);
            } else {
                self.synchronize();
            }
        }
        let close_start = self.byte_span().start;
        self.expect_punct(Punct::RBrace);
        Some((stmts, ByteSpan::new(open.start, close_start.max(open.end))))
    }

    fn parse_try_parts(&mut self) -> Option<(Vec<Stmt>, Arc<str>, Vec<Stmt>, Span)> {
        let start = self.byte_span().start;
        self.advance(); // `try`
        let (body, _) = self.parse_block()?;
        self.expect_keyword(Keyword::Catch)?;
        let catch_binding = self.parse_single_binding().unwrap_or_else(|| Arc::from("e"));
        let (catch_body, _) = self.parse_block()?;
        let span = self.mk_span(start, self.prev_end());
        Some((body, catch_binding, catch_body, span))
    }

    // ---- records / lists ----

    /// Reused for every record-literal context: header fields, tool
    /// and function call args, `assert`/`check` args, `if`/`for`
    /// record headers, and plain `{ ... }` expressions.
    fn parse_record(&mut self) -> RecordLit {
        let Some(open) = self.expect_punct(Punct::LBrace) else {
            let span = self.mk_span(self.byte_span().start, self.byte_span().end);
            return RecordLit { entries: Vec::new(), span };
        };
        let mut entries = Vec::new();
        while !self.is_punct(Punct::RBrace) && !self.is_eof() {
            if self.is_punct(Punct::DotDotDot) {
                let start = self.byte_span().start;
                self.advance();
                if let Some(expr) = self.parse_expr() {
                    let span = self.mk_span(start, self.prev_end());
                    entries.push(RecordEntry::Spread { expr, span });
                }
            } else if matches!(self.kind(), TokenKind::Ident(_)) {
                let start = self.byte_span().start;
                let key = self.parse_record_key();
                if self.expect_punct(Punct::Colon).is_none() {
                    self.synchronize_record_entry();
                    continue;
                }
                let Some(value) = self.parse_expr() else {
                    self.synchronize_record_entry();
                    continue;
                };
                let span = self.mk_span(start, self.prev_end());
                entries.push(RecordEntry::Pair { key, value, span });
            } else {
                let got = self.kind().to_string();
                let span = self.mk_span(self.byte_span().start, self.byte_span().end);
                self.record_error(
                    span,
                    DiagnosticCode::EParse,
                    format!("expected record key, spread, or `}}`, found {got}"),
                    None,
                );
                self.advance();
                continue;
            }
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        let close_start = self.byte_span().start;
        self.expect_punct(Punct::RBrace);
        RecordLit { entries, span: self.mk_span(open.start, close_start.max(open.end)) }
    }

    fn synchronize_record_entry(&mut self) {
        while !self.is_punct(Punct::Comma) && !self.is_punct(Punct::RBrace) && !self.is_eof() {
            self.advance();
        }
        self.eat_punct(Punct::Comma);
    }

    /// A record key: a dotted identifier chain rendered as one string,
    /// e.g. `fs.read`.
    fn parse_record_key(&mut self) -> Arc<str> {
        let Some((first, _)) = self.expect_ident() else {
            return Arc::from("");
        };
        let mut text = first.to_string();
        while self.is_punct(Punct::Dot) && matches!(self.peek_next_kind(), TokenKind::Ident(_)) {
            self.advance(); // `.`
            if let TokenKind::Ident(seg) = self.kind() {
                text.push('.');
                text.push_str(seg);
            }
            self.advance();
        }
        Arc::from(text)
    }

    fn peek_next_kind(&self) -> &TokenKind {
        let idx = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn parse_list(&mut self) -> (Vec<Expr>, ByteSpan) {
        let open = self.byte_span();
        self.advance(); // `[`
        let mut elements = Vec::new();
        while !self.is_punct(Punct::RBracket) && !self.is_eof() {
            match self.parse_expr() {
                Some(e) => elements.push(e),
                None => {
                    while !self.is_punct(Punct::Comma) && !self.is_punct(Punct::RBracket) && !self.is_eof() {
                        self.advance();
                    }
                }
            }
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        let close_start = self.byte_span().start;
        self.expect_punct(Punct::RBracket);
        (elements, ByteSpan::new(open.start, close_start.max(open.end)))
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> Option<Expr> {
        if !self.enter() {
            return None;
        }
        let result = self.parse_expr_inner();
        self.exit();
        result
    }

    fn parse_expr_inner(&mut self) -> Option<Expr> {
        if self.is_keyword(Keyword::If) {
            return self.parse_if_expr();
        }
        if self.is_keyword(Keyword::For) {
            return self.parse_for_expr();
        }
        if self.is_keyword(Keyword::Match) {
            return self.parse_match_expr();
        }
        if self.is_keyword(Keyword::Try) {
            let (body, catch_binding, catch_body, span) = self.parse_try_parts()?;
            return Some(Expr::Try { body, catch_binding, catch_body, span });
        }
        if self.is_keyword(Keyword::CallQuestion) {
            return self.parse_call_like(true);
        }
        if self.is_keyword(Keyword::Do) {
            return self.parse_call_like(false);
        }
        if self.is_keyword(Keyword::Assert) {
            let start = self.byte_span().start;
            self.advance();
            let args = self.parse_record();
            let span = self.mk_span(start, self.prev_end());
            return Some(Expr::Assert { args, span });
        }
        if self.is_keyword(Keyword::Check) {
            let start = self.byte_span().start;
            self.advance();
            let args = self.parse_record();
            let span = self.mk_span(start, self.prev_end());
            return Some(Expr::Check { args, span });
        }
        self.parse_comparison()
    }

    fn parse_call_like(&mut self, read_only: bool) -> Option<Expr> {
        let start = self.byte_span().start;
        self.advance(); // `call?` or `do`
        let tool = self.parse_dotted_ident_path()?;
        let args = self.parse_record();
        let span = self.mk_span(start, self.prev_end());
        Some(if read_only {
            Expr::Call { tool, args, span }
        } else {
            Expr::Do { tool, args, span }
        })
    }

    fn parse_if_expr(&mut self) -> Option<Expr> {
        let start = self.byte_span().start;
        self.advance(); // `if`
        if self.is_punct(Punct::LParen) {
            self.advance();
            let cond = self.parse_expr()?;
            self.expect_punct(Punct::RParen);
            let (then_branch, _) = self.parse_block()?;
            let else_branch = if self.eat_keyword(Keyword::Else) {
                if self.is_keyword(Keyword::If) {
                    let nested = self.parse_if_expr()?;
                    let nested_span = nested.span().clone();
                    Some(vec![Stmt::Return { value: nested, span: nested_span }])
                } else {
                    Some(self.parse_block()?.0)
                }
            } else {
                None
            };
            let span = self.mk_span(start, self.prev_end());
            return Some(Expr::If { cond: Box::new(cond), then_branch, else_branch, span });
        }
        if self.is_punct(Punct::LBrace) {
            let rec = self.parse_record();
            let cond = record_field(&rec, "cond").cloned().unwrap_or_else(|| {
                Expr::Null { span: rec.span.clone() }
            });
            let then_expr = record_field(&rec, "then").cloned();
            let else_expr = record_field(&rec, "else").cloned();
            if then_expr.is_none() {
                self.record_error(
                    rec.span.clone(),
                    DiagnosticCode::EParse,
                    "record-form `if` requires a `then` field",
                    None,
                );
            }
            let then_branch = then_expr
                .map(|e| {
                    let s = e.span().clone();
                    vec![Stmt::Return { value: e, span: s }]
                })
                .unwrap_or_default();
            let else_branch = else_expr.map(|e| {
                let s = e.span().clone();
                vec![Stmt::Return { value: e, span: s }]
            });
            let span = self.mk_span(start, self.prev_end());
            return Some(Expr::If { cond: Box::new(cond), then_branch, else_branch, span });
        }
        let span = self.mk_span(self.byte_span().start, self.byte_span().end);
        self.record_error(span.clone(), DiagnosticCode::EParse, "expected `(` or `{` after `if`", None);
        None
    }

    fn parse_for_expr(&mut self) -> Option<Expr> {
        let start = self.byte_span().start;
        self.advance(); // `for`
        let rec = self.parse_record();
        let list = record_field(&rec, "in").cloned().unwrap_or_else(|| Expr::Null { span: rec.span.clone() });
        if record_field(&rec, "in").is_none() {
            self.record_error(rec.span.clone(), DiagnosticCode::EParse, "`for` requires an `in` field", None);
        }
        let binding = match record_field(&rec, "as") {
            Some(Expr::Str { value, .. }) => value.clone(),
            _ => {
                self.record_error(
                    rec.span.clone(),
                    DiagnosticCode::EParse,
                    "`for` requires an `as` field holding a string literal binding name",
                    None,
                );
                Arc::from("_")
            }
        };
        let (body, _) = self.parse_block()?;
        let span = self.mk_span(start, self.prev_end());
        Some(Expr::For { list: Box::new(list), binding, body, span })
    }

    fn parse_match_expr(&mut self) -> Option<Expr> {
        let start = self.byte_span().start;
        self.advance(); // `match`
        let subject = self.parse_comparison()?;
        self.expect_punct(Punct::LBrace)?;
        let mut ok_arm = None;
        let mut err_arm = None;
        while !self.is_punct(Punct::RBrace) && !self.is_eof() {
            let (arm_name, arm_start) = self.expect_ident()?;
            if arm_name.as_ref() != "ok" && arm_name.as_ref() != "err" {
                let span = self.mk_span(arm_start.start, arm_start.end);
                self.record_error(
                    span,
                    DiagnosticCode::EParse,
                    format!("match arms must be named `ok` or `err`, found `{arm_name}`"),
                    None,
                );
            }
            let binding = self.parse_single_binding().unwrap_or_else(|| Arc::from("_"));
            let (body, _) = self.parse_block()?;
            let span = self.mk_span(arm_start.start, self.prev_end());
            let arm = MatchArm { binding, body, span: span.clone() };
            if arm_name.as_ref() == "ok" {
                if ok_arm.is_some() {
                    self.record_error(span, DiagnosticCode::EParse, "duplicate `ok` match arm", None);
                }
                ok_arm = Some(arm);
            } else if arm_name.as_ref() == "err" {
                if err_arm.is_some() {
                    self.record_error(span, DiagnosticCode::EParse, "duplicate `err` match arm", None);
                }
                err_arm = Some(arm);
            }
        }
        self.expect_punct(Punct::RBrace);
        let span = self.mk_span(start, self.prev_end());
        Some(Expr::Match { subject: Box::new(subject), ok_arm, err_arm, span })
    }

    fn parse_dotted_ident_path(&mut self) -> Option<IdentPath> {
        let (first, first_span) = self.expect_ident()?;
        let mut segments = vec![first];
        let mut end = first_span.end;
        while self.is_punct(Punct::Dot) && matches!(self.peek_next_kind(), TokenKind::Ident(_)) {
            self.advance();
            if let TokenKind::Ident(seg) = self.kind() {
                segments.push(seg.clone());
            }
            end = self.byte_span().end;
            self.advance();
        }
        Some(IdentPath { segments, span: self.mk_span(first_span.start, end) })
    }

    fn parse_comparison(&mut self) -> Option<Expr> {
        let left = self.parse_additive()?;
        let op = match self.kind() {
            TokenKind::Punct(Punct::Gt) => BinOp::Gt,
            TokenKind::Punct(Punct::Lt) => BinOp::Lt,
            TokenKind::Punct(Punct::Ge) => BinOp::Ge,
            TokenKind::Punct(Punct::Le) => BinOp::Le,
            TokenKind::Punct(Punct::EqEq) => BinOp::Eq,
            TokenKind::Punct(Punct::Ne) => BinOp::Ne,
            _ => return Some(left),
        };
        let start = left.span().clone();
        self.advance();
        let right = self.parse_additive()?;
        let span = Span::union(&start, right.span());
        Some(Expr::Binary { op, left: Box::new(left), right: Box::new(right), span })
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_mult()?;
        loop {
            let op = match self.kind() {
                TokenKind::Punct(Punct::Plus) => BinOp::Add,
                TokenKind::Punct(Punct::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mult()?;
            let span = Span::union(left.span(), right.span());
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span };
        }
        Some(left)
    }

    fn parse_mult(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.kind() {
                TokenKind::Punct(Punct::Star) => BinOp::Mul,
                TokenKind::Punct(Punct::Slash) => BinOp::Div,
                TokenKind::Punct(Punct::Percent) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let span = Span::union(left.span(), right.span());
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span };
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        if self.is_punct(Punct::Minus) {
            let start = self.byte_span().start;
            self.advance();
            let operand = self.parse_unary()?;
            let span = self.mk_span(start, self.prev_end());
            return Some(Expr::Unary { op: UnOp::Neg, operand: Box::new(operand), span });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        match self.kind().clone() {
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect_punct(Punct::RParen);
                Some(e)
            }
            TokenKind::Punct(Punct::LBrace) => Some(Expr::Record(self.parse_record())),
            TokenKind::Punct(Punct::LBracket) => {
                let (elements, span) = self.parse_list();
                Some(Expr::List { elements, span: self.to_span(span) })
            }
            TokenKind::Keyword(Keyword::True) => {
                let span = self.mk_span(self.byte_span().start, self.byte_span().end);
                self.advance();
                Some(Expr::Bool { value: true, span })
            }
            TokenKind::Keyword(Keyword::False) => {
                let span = self.mk_span(self.byte_span().start, self.byte_span().end);
                self.advance();
                Some(Expr::Bool { value: false, span })
            }
            TokenKind::Keyword(Keyword::Null) => {
                let span = self.mk_span(self.byte_span().start, self.byte_span().end);
                self.advance();
                Some(Expr::Null { span })
            }
            TokenKind::IntLiteral { text, value } => {
                let span = self.mk_span(self.byte_span().start, self.byte_span().end);
                self.advance();
                Some(Expr::Int { text, value, span })
            }
            TokenKind::FloatLiteral { text, value } => {
                let span = self.mk_span(self.byte_span().start, self.byte_span().end);
                self.advance();
                Some(Expr::Float { text, value, span })
            }
            TokenKind::StringLiteral(value) => {
                let span = self.mk_span(self.byte_span().start, self.byte_span().end);
                self.advance();
                Some(Expr::Str { value, span })
            }
            TokenKind::Ident(_) => {
                let path = self.parse_dotted_ident_path()?;
                if self.is_punct(Punct::LBrace) {
                    let args = self.parse_record();
                    let span = Span::union(&path.span, &args.span);
                    Some(Expr::FnCall { path, args, span })
                } else {
                    Some(Expr::Ident(path))
                }
            }
            other => {
                let got = other.to_string();
                let span = self.mk_span(self.byte_span().start, self.byte_span().end);
                self.record_error(span.clone(), DiagnosticCode::EParse, format!("unexpected {got}"), None);
                if !matches!(other, TokenKind::Eof) {
                    self.advance();
                }
                None
            }
        }
    }
}

/// Looks up the last pair matching `key` in a record literal (later
/// entries override earlier ones, matching record evaluation
/// semantics), ignoring spreads — used only for the small set of
/// record-form control-flow headers (`if`/`for`) whose fields are
/// always literal pairs.
fn record_field<'r>(rec: &'r RecordLit, key: &str) -> Option<&'r Expr> {
    rec.entries
        .iter()
        .rev()
        .find_map(|e| match e {
            RecordEntry::Pair { key: k, value, .. } if k.as_ref() == key => Some(value),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(src: &str) -> Program {
        let out = parse(src, "test.a0");
        assert!(out.diagnostics.is_empty(), "unexpected diagnostics: {:?}", out.diagnostics);
        out.program.expect("program")
    }

    #[test]
    fn minimal_return_program() {
        let program = parse_ok("return { ok: true }");
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(program.statements[0], Stmt::Return { .. }));
    }

    #[test]
    fn let_and_arrow_binding() {
        let program = parse_ok(
            r#"
            cap { fs.read: true }
            let x = 1
            call? fs.read { path: "a" } -> y
            return { x: x, y: y }
            "#,
        );
        assert_eq!(program.headers.len(), 1);
        assert_eq!(program.statements.len(), 3);
        assert!(matches!(program.statements[0], Stmt::Let { .. }));
        match &program.statements[1] {
            Stmt::Expr { value: Expr::Call { .. }, arrow_target: Some(_), .. } => {}
            other => panic!("unexpected stmt: {other:?}"),
        }
    }

    #[test]
    fn precedence_climbing_orders_operators_correctly() {
        let program = parse_ok("return 1 + 2 * 3");
        let Stmt::Return { value, .. } = &program.statements[0] else { panic!() };
        match value {
            Expr::Binary { op: BinOp::Add, right, .. } => {
                assert!(matches!(**right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn comparison_is_non_associative_only_one_consumed() {
        // `1 < 2` parses as a single comparison; the grammar forbids
        // chaining so a second comparator is left for the caller (here
        // making the overall statement a parse error, which is correct:
        // `1 < 2 < 3` is not valid A0).
        let out = parse("return 1 < 2 < 3", "test.a0");
        assert!(!out.diagnostics.is_empty());
    }

    #[test]
    fn record_form_if_desugars_to_return_blocks() {
        let program = parse_ok("return if { cond: true, then: 1, else: 2 }");
        let Stmt::Return { value: Expr::If { then_branch, else_branch, .. }, .. } = &program.statements[0] else {
            panic!()
        };
        assert_eq!(then_branch.len(), 1);
        assert!(matches!(then_branch[0], Stmt::Return { .. }));
        assert!(else_branch.is_some());
    }

    #[test]
    fn block_form_if_else() {
        let program = parse_ok("return if (true) { return 1 } else { return 2 }");
        assert!(matches!(&program.statements[0], Stmt::Return { value: Expr::If { .. }, .. }));
    }

    #[test]
    fn for_loop_requires_string_as_binding() {
        let program = parse_ok(r#"return for { in: [1,2], as: "v" } { return v }"#);
        let Stmt::Return { value: Expr::For { binding, .. }, .. } = &program.statements[0] else { panic!() };
        assert_eq!(binding.as_ref(), "v");
    }

    #[test]
    fn match_requires_ok_and_err_arm_names() {
        let out = parse(
            r#"return match x { good {v} { return v } err {e} { return e } }"#,
            "test.a0",
        );
        assert!(out.diagnostics.iter().any(|d| d.code == DiagnosticCode::EParse));
    }

    #[test]
    fn fn_decl_and_call_dotted_path_args() {
        let program = parse_ok(
            r#"
            fn dbl { x } { return { v: x * 2 } }
            let r = map { in: [1,2,3], fn: "dbl" }
            return { r: r }
            "#,
        );
        assert!(matches!(program.statements[0], Stmt::FnDecl { .. }));
    }

    #[test]
    fn record_key_can_be_dotted() {
        let program = parse_ok(r#"cap { fs.read: true, http.get: true }
return {}"#);
        let Header::Cap { fields, .. } = &program.headers[0] else { panic!() };
        let keys: Vec<_> =
            fields.entries.iter().filter_map(|e| match e { RecordEntry::Pair { key, .. } => Some(key.to_string()), _ => None }).collect();
        assert_eq!(keys, vec!["fs.read".to_string(), "http.get".to_string()]);
    }

    #[test]
    fn malformed_statement_recovers_and_reports_diagnostic() {
        let out = parse("let x = \nreturn { ok: true }", "test.a0");
        assert!(!out.diagnostics.is_empty());
        let program = out.program.expect("best-effort program");
        assert!(program.statements.iter().any(|s| matches!(s, Stmt::Return { .. })));
    }

    #[test]
    fn unterminated_record_reports_e_parse() {
        let out = parse("return { a: 1", "test.a0");
        assert!(out.diagnostics.iter().any(|d| d.code == DiagnosticCode::EParse));
    }

    #[test]
    fn try_catch_as_statement_and_expression() {
        let program = parse_ok(
            r#"
            try { return 1 } catch { e } { return 0 }
            return try { return 2 } catch { e } { return 0 }
            "#,
        );
        assert!(matches!(program.statements[0], Stmt::Try { .. }));
        assert!(matches!(
            &program.statements[1],
            Stmt::Return { value: Expr::Try { .. }, .. }
        ));
    }
}
