//! Converts A0 source text into a token stream.
//!
//! The lexer is context-free: every input byte belongs to exactly one
//! token under a single set of rules (no quote-like-operator or heredoc
//! sub-modes). It never stops at the first bad character — a lexical
//! error is recorded as an `E_LEX` diagnostic carrying a precise span,
//! and scanning resumes after the offending byte, so a caller gets the
//! complete picture of what's wrong with a source file in one pass.
//!
//! # Example
//!
//! ```
//! use a0_lexer::lex;
//!
//! let output = lex(r#"let x = 1"#, "main.a0");
//! assert!(output.diagnostics.is_empty());
//! assert_eq!(output.tokens.len(), 5); // let, x, =, 1, eof
//! ```

use a0_diagnostics::Diagnostic;
use a0_diagnostics_codes::DiagnosticCode;
use a0_position::{ByteSpan, LineIndex, Span};
use a0_token::{Keyword, Punct, Token, TokenKind};
use std::sync::Arc;

/// The token stream and any `E_LEX` diagnostics produced while
/// scanning it.
#[derive(Debug, Clone, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Tokenizes `source`, attributing diagnostics to `file` (shown in
/// span rendering; carries no other meaning to the lexer).
pub fn lex(source: &str, file: impl Into<Arc<str>>) -> LexOutput {
    let file = file.into();
    let index = LineIndex::new(source);
    let mut lexer = Lexer { source, bytes: source.as_bytes(), pos: 0, file, index };
    lexer.run()
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    file: Arc<str>,
    index: LineIndex,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> LexOutput {
        tracing::trace!(len = self.bytes.len(), "lex_start");
        let mut tokens = Vec::new();
        let mut diagnostics = Vec::new();

        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, ByteSpan::new(start, start)));
                break;
            };

            if is_ident_start(c) {
                tokens.push(self.scan_ident_or_keyword(start));
            } else if c.is_ascii_digit() {
                match self.scan_number(start) {
                    Ok(tok) => tokens.push(tok),
                    Err(diag) => {
                        diagnostics.push(diag);
                        self.advance_byte();
                    }
                }
            } else if c == '"' {
                match self.scan_string(start) {
                    Ok(tok) => tokens.push(tok),
                    Err(diag) => diagnostics.push(diag),
                }
            } else if let Some((punct, len)) = self.scan_punct() {
                self.pos += len;
                tokens.push(Token::new(TokenKind::Punct(punct), ByteSpan::new(start, self.pos)));
            } else {
                let end = start + c.len_utf8();
                diagnostics.push(self.error_at(
                    ByteSpan::new(start, end),
                    DiagnosticCode::ELex,
                    format!("unexpected character `{c}`"),
                ));
                self.pos = end;
            }
        }

        tracing::debug!(tokens = tokens.len(), errors = diagnostics.len(), "lex_end");
        LexOutput { tokens, diagnostics }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset..)?.chars().next()
    }

    fn advance_byte(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += c.len_utf8(),
                Some('#') => {
                    let rest = &self.bytes[self.pos..];
                    match memchr::memchr(b'\n', rest) {
                        Some(nl) => self.pos += nl,
                        None => self.pos = self.bytes.len(),
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_ident_or_keyword(&mut self, start: usize) -> Token {
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.pos];

        if text == "call" && self.peek() == Some('?') {
            self.pos += 1;
            return Token::new(
                TokenKind::Keyword(Keyword::CallQuestion),
                ByteSpan::new(start, self.pos),
            );
        }

        let span = ByteSpan::new(start, self.pos);
        match Keyword::from_str(text) {
            Some(kw) => Token::new(TokenKind::Keyword(kw), span),
            None => Token::new(TokenKind::Ident(Arc::from(text)), span),
        }
    }

    /// Integers: `0|[1-9]\d*`. Floats: `(0|[1-9]\d*)\.\d+([eE][+-]?\d+)?`.
    /// Negative numbers are not lexed here — the parser applies unary
    /// minus to a positive literal.
    fn scan_number(&mut self, start: usize) -> Result<Token, Diagnostic> {
        self.scan_digits();
        let mut is_float = false;

        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            self.scan_digits();
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let mark = self.pos;
            let mut lookahead = self.pos + 1;
            if matches!(self.peek_at(1), Some('+') | Some('-')) {
                lookahead += 1;
            }
            if self.source[lookahead..].chars().next().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos = lookahead;
                self.scan_digits();
            } else {
                self.pos = mark;
            }
        }

        let text = &self.source[start..self.pos];
        let span = ByteSpan::new(start, self.pos);
        let value: f64 = text.parse().map_err(|_| {
            self.error_at(span, DiagnosticCode::ELex, format!("invalid number literal `{text}`"))
        })?;

        let text: Arc<str> = Arc::from(text);
        Ok(Token::new(
            if is_float {
                TokenKind::FloatLiteral { text, value }
            } else {
                TokenKind::IntLiteral { text, value }
            },
            span,
        ))
    }

    fn scan_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn scan_string(&mut self, start: usize) -> Result<Token, Diagnostic> {
        self.pos += 1; // opening quote
        let mut value = String::new();

        loop {
            match self.peek() {
                None => {
                    let span = ByteSpan::new(start, self.pos);
                    return Err(self.error_at(
                        span,
                        DiagnosticCode::ELex,
                        "unterminated string literal",
                    ));
                }
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    let esc_start = self.pos;
                    self.pos += 1;
                    match self.peek() {
                        Some('"') => {
                            value.push('"');
                            self.pos += 1;
                        }
                        Some('\\') => {
                            value.push('\\');
                            self.pos += 1;
                        }
                        Some('/') => {
                            value.push('/');
                            self.pos += 1;
                        }
                        Some('b') => {
                            value.push('\u{8}');
                            self.pos += 1;
                        }
                        Some('f') => {
                            value.push('\u{c}');
                            self.pos += 1;
                        }
                        Some('n') => {
                            value.push('\n');
                            self.pos += 1;
                        }
                        Some('r') => {
                            value.push('\r');
                            self.pos += 1;
                        }
                        Some('t') => {
                            value.push('\t');
                            self.pos += 1;
                        }
                        Some('u') => {
                            self.pos += 1;
                            let code = self.scan_unicode_escape(esc_start)?;
                            value.push(code);
                        }
                        _ => {
                            let span = ByteSpan::new(esc_start, self.pos + 1);
                            return Err(self.error_at(
                                span,
                                DiagnosticCode::ELex,
                                "invalid escape sequence in string literal",
                            ));
                        }
                    }
                }
                Some(c) if c == '\n' => {
                    let span = ByteSpan::new(start, self.pos);
                    return Err(self.error_at(
                        span,
                        DiagnosticCode::ELex,
                        "unterminated string literal: raw newline in string",
                    ));
                }
                Some(c) => {
                    value.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }

        let span = ByteSpan::new(start, self.pos);
        Ok(Token::new(TokenKind::StringLiteral(Arc::from(value)), span))
    }

    fn scan_unicode_escape(&mut self, esc_start: usize) -> Result<char, Diagnostic> {
        let hi = self.read_hex4(esc_start)?;
        if (0xD800..=0xDBFF).contains(&hi) {
            if self.peek() == Some('\\') && self.peek_at(1) == Some('u') {
                self.pos += 2;
                let lo = self.read_hex4(esc_start)?;
                if (0xDC00..=0xDFFF).contains(&lo) {
                    let combined =
                        0x10000 + (((hi - 0xD800) as u32) << 10) + (lo - 0xDC00) as u32;
                    return char::from_u32(combined).ok_or_else(|| {
                        self.error_at(
                            ByteSpan::new(esc_start, self.pos),
                            DiagnosticCode::ELex,
                            "invalid unicode surrogate pair",
                        )
                    });
                }
            }
            return Err(self.error_at(
                ByteSpan::new(esc_start, self.pos),
                DiagnosticCode::ELex,
                "unpaired high surrogate in \\u escape",
            ));
        }
        char::from_u32(hi as u32).ok_or_else(|| {
            self.error_at(
                ByteSpan::new(esc_start, self.pos),
                DiagnosticCode::ELex,
                "invalid unicode escape",
            )
        })
    }

    fn read_hex4(&mut self, esc_start: usize) -> Result<u16, Diagnostic> {
        let digits = self.source.get(self.pos..self.pos + 4).ok_or_else(|| {
            self.error_at(
                ByteSpan::new(esc_start, self.bytes.len()),
                DiagnosticCode::ELex,
                "truncated \\u escape",
            )
        })?;
        let value = u16::from_str_radix(digits, 16).map_err(|_| {
            self.error_at(
                ByteSpan::new(esc_start, self.pos + 4),
                DiagnosticCode::ELex,
                format!("invalid hex digits in \\u escape: `{digits}`"),
            )
        })?;
        self.pos += 4;
        Ok(value)
    }

    /// Multi-character operators are matched longest-first: `->` before
    /// `-`, `>=`/`<=` before `>`/`<`, `==`/`!=` before `=`/`!`, `...`
    /// before `.`.
    fn scan_punct(&mut self) -> Option<(Punct, usize)> {
        let rest = &self.source[self.pos..];
        let two = |s: &str| rest.starts_with(s);
        if two("...") {
            return Some((Punct::DotDotDot, 3));
        }
        if two("->") {
            return Some((Punct::Arrow, 2));
        }
        if two(">=") {
            return Some((Punct::Ge, 2));
        }
        if two("<=") {
            return Some((Punct::Le, 2));
        }
        if two("==") {
            return Some((Punct::EqEq, 2));
        }
        if two("!=") {
            return Some((Punct::Ne, 2));
        }
        let c = rest.chars().next()?;
        let punct = match c {
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            ',' => Punct::Comma,
            ':' => Punct::Colon,
            '.' => Punct::Dot,
            '=' => Punct::Eq,
            '+' => Punct::Plus,
            '-' => Punct::Minus,
            '*' => Punct::Star,
            '/' => Punct::Slash,
            '%' => Punct::Percent,
            '>' => Punct::Gt,
            '<' => Punct::Lt,
            _ => return None,
        };
        Some((punct, c.len_utf8()))
    }

    fn error_at(&self, span: ByteSpan, code: DiagnosticCode, message: impl Into<String>) -> Diagnostic {
        let (start_line, start_col) = self.index.offset_to_line_col(self.source, span.start);
        let (end_line, end_col) = self.index.offset_to_line_col(self.source, span.end);
        let span = Span::new(self.file.clone(), start_line, start_col, end_line, end_col);
        Diagnostic::error(code, span, message)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let out = lex(source, "test.a0");
        assert!(out.diagnostics.is_empty(), "unexpected diagnostics: {:?}", out.diagnostics);
        out.tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn identifier_is_not_split_at_keyword_prefix() {
        let tokens = kinds("letter");
        assert_eq!(tokens, vec![TokenKind::Ident(Arc::from("letter")), TokenKind::Eof]);
    }

    #[test]
    fn call_question_is_one_token() {
        let tokens = kinds("call?");
        assert_eq!(tokens, vec![TokenKind::Keyword(Keyword::CallQuestion), TokenKind::Eof]);
    }

    #[test]
    fn integer_and_float_literals() {
        let tokens = kinds("0 42 3.14 2e10 1.5e-3");
        assert_eq!(
            tokens,
            vec![
                TokenKind::IntLiteral { text: Arc::from("0"), value: 0.0 },
                TokenKind::IntLiteral { text: Arc::from("42"), value: 42.0 },
                TokenKind::FloatLiteral { text: Arc::from("3.14"), value: 3.14 },
                TokenKind::FloatLiteral { text: Arc::from("2e10"), value: 2e10 },
                TokenKind::FloatLiteral { text: Arc::from("1.5e-3"), value: 1.5e-3 },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literal_unescapes_json_escapes() {
        let tokens = kinds(r#""a\nb\"cA""#);
        assert_eq!(tokens, vec![TokenKind::StringLiteral(Arc::from("a\nb\"cA")), TokenKind::Eof]);
    }

    #[test]
    fn operators_tokenize_longest_first() {
        let tokens = kinds("-> >= == ... . - =");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Punct(Punct::Arrow),
                TokenKind::Punct(Punct::Ge),
                TokenKind::Punct(Punct::EqEq),
                TokenKind::Punct(Punct::DotDotDot),
                TokenKind::Punct(Punct::Dot),
                TokenKind::Punct(Punct::Minus),
                TokenKind::Punct(Punct::Eq),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let tokens = kinds("let x = 1 # comment\nreturn x");
        assert!(tokens.iter().any(|k| matches!(k, TokenKind::Keyword(Keyword::Return))));
    }

    #[test]
    fn unterminated_string_is_e_lex() {
        let out = lex(r#""unterminated"#, "test.a0");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].code, DiagnosticCode::ELex);
    }

    #[test]
    fn unexpected_character_is_e_lex_and_scanning_continues() {
        let out = lex("let x = @ 1", "test.a0");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].code, DiagnosticCode::ELex);
        assert!(out.tokens.iter().any(|t| matches!(
            t.kind,
            TokenKind::IntLiteral { .. }
        )));
    }

    #[test]
    fn leading_minus_is_not_part_of_number_literal() {
        let tokens = kinds("-5");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Punct(Punct::Minus),
                TokenKind::IntLiteral { text: Arc::from("5"), value: 5.0 },
                TokenKind::Eof,
            ]
        );
    }
}
