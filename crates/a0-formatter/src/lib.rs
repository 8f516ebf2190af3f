//! Deterministic AST → canonical source text formatting.
//!
//! Two-space indentation; records and lists render inline when the
//! result fits in 72 columns, otherwise one entry per line with a
//! trailing newline before the closing delimiter. Formatting is
//! idempotent: `format(parse(format(parse(src))).program) ==
//! format(parse(src).program)` for every accepted program (`a0`'s
//! integration tests exercise this against the full pipeline; this
//! crate's own proptest below exercises it against hand-built ASTs).
//!
//! Record-form and block-form `if`/`for` both canonicalize to the same
//! textual shape on output (block-form `if (cond) { .. } else { .. }`,
//! record-shaped `for { in:, as: }` header), so re-parsing formatted
//! output always reproduces the same AST shape the formatter started
//! from — the property idempotence actually depends on. Comments are
//! not preserved; a caller whose source contained `#` comments should
//! warn the user before overwriting a file with formatted output.

use a0_ast::{BinOp, Expr, Header, Program, RecordEntry, RecordLit, Stmt};

const MAX_INLINE_WIDTH: usize = 72;

/// Renders `program` to canonical A0 source text.
pub fn format(program: &Program) -> String {
    let mut out = String::new();
    for header in &program.headers {
        out.push_str(&fmt_header(header));
        out.push('\n');
    }
    for (i, stmt) in program.statements.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&fmt_stmt(stmt, 0));
    }
    out.push('\n');
    out
}

fn indent_str(n: usize) -> String {
    "  ".repeat(n)
}

fn fmt_header(h: &Header) -> String {
    match h {
        Header::Cap { fields, .. } => format!("cap {}", fmt_record(fields, 0)),
        Header::Budget { fields, .. } => format!("budget {}", fmt_record(fields, 0)),
        Header::Import { path, alias, .. } => format!("import {} as {alias}", fmt_string_literal(path)),
    }
}

fn fmt_stmt(s: &Stmt, indent: usize) -> String {
    match s {
        Stmt::Let { name, value, .. } => format!("let {name} = {}", fmt_expr(value, indent)),
        Stmt::Expr { value, arrow_target, .. } => match arrow_target {
            Some(path) => format!("{} -> {}", fmt_expr(value, indent), path.render()),
            None => fmt_expr(value, indent),
        },
        Stmt::Return { value, .. } => format!("return {}", fmt_expr(value, indent)),
        Stmt::FnDecl { name, params, body, .. } => {
            let params = params.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join(", ");
            format!("fn {name} {{ {params} }} {}", render_block(body, indent))
        }
        Stmt::Try { body, catch_binding, catch_body, .. } => format!(
            "try {} catch {{ {catch_binding} }} {}",
            render_block(body, indent),
            render_block(catch_body, indent)
        ),
    }
}

fn render_block(stmts: &[Stmt], indent: usize) -> String {
    if stmts.is_empty() {
        return "{}".to_string();
    }
    let inner = indent + 1;
    let lines: Vec<String> =
        stmts.iter().map(|s| format!("{}{}", indent_str(inner), fmt_stmt(s, inner))).collect();
    format!("{{\n{}\n{}}}", lines.join("\n"), indent_str(indent))
}

fn fmt_record(rec: &RecordLit, indent: usize) -> String {
    if rec.entries.is_empty() {
        return "{}".to_string();
    }
    let inline_entries: Vec<String> = rec.entries.iter().map(|e| fmt_record_entry(e, indent)).collect();
    let inline = format!("{{ {} }}", inline_entries.join(", "));
    if fits_inline(&inline, indent) {
        return inline;
    }
    let inner = indent + 1;
    let lines: Vec<String> = rec
        .entries
        .iter()
        .map(|e| format!("{}{}", indent_str(inner), fmt_record_entry(e, inner)))
        .collect();
    format!("{{\n{}\n{}}}", lines.join(",\n"), indent_str(indent))
}

fn fmt_record_entry(e: &RecordEntry, indent: usize) -> String {
    match e {
        RecordEntry::Pair { key, value, .. } => format!("{key}: {}", fmt_expr(value, indent)),
        RecordEntry::Spread { expr, .. } => format!("...{}", fmt_expr(expr, indent)),
    }
}

fn fmt_list(elements: &[Expr], indent: usize) -> String {
    if elements.is_empty() {
        return "[]".to_string();
    }
    let inline_items: Vec<String> = elements.iter().map(|e| fmt_expr(e, indent)).collect();
    let inline = format!("[{}]", inline_items.join(", "));
    if fits_inline(&inline, indent) {
        return inline;
    }
    let inner = indent + 1;
    let lines: Vec<String> =
        elements.iter().map(|e| format!("{}{}", indent_str(inner), fmt_expr(e, inner))).collect();
    format!("[\n{}\n{}]", lines.join(",\n"), indent_str(indent))
}

fn fits_inline(rendered: &str, indent: usize) -> bool {
    !rendered.contains('\n') && indent * 2 + rendered.len() <= MAX_INLINE_WIDTH
}

fn fmt_expr(e: &Expr, indent: usize) -> String {
    match e {
        Expr::Int { text, .. } | Expr::Float { text, .. } => text.to_string(),
        Expr::Bool { value, .. } => value.to_string(),
        Expr::Str { value, .. } => fmt_string_literal(value),
        Expr::Null { .. } => "null".to_string(),
        Expr::Ident(path) => path.render(),
        Expr::Record(r) => fmt_record(r, indent),
        Expr::List { elements, .. } => fmt_list(elements, indent),
        Expr::Call { tool, args, .. } => format!("call? {} {}", tool.render(), fmt_record(args, indent)),
        Expr::Do { tool, args, .. } => format!("do {} {}", tool.render(), fmt_record(args, indent)),
        Expr::Assert { args, .. } => format!("assert {}", fmt_record(args, indent)),
        Expr::Check { args, .. } => format!("check {}", fmt_record(args, indent)),
        Expr::FnCall { path, args, .. } => format!("{} {}", path.render(), fmt_record(args, indent)),
        Expr::If { cond, then_branch, else_branch, .. } => {
            let mut out = format!("if ({}) {}", fmt_expr(cond, indent), render_block(then_branch, indent));
            if let Some(eb) = else_branch {
                let chained_if = match eb.as_slice() {
                    [Stmt::Return { value: inner @ Expr::If { .. }, .. }] => Some(fmt_expr(inner, indent)),
                    _ => None,
                };
                match chained_if {
                    Some(rendered) => out.push_str(&format!(" else {rendered}")),
                    None => out.push_str(&format!(" else {}", render_block(eb, indent))),
                }
            }
            out
        }
        Expr::For { list, binding, body, .. } => format!(
            "for {{ in: {}, as: {} }} {}",
            fmt_expr(list, indent),
            fmt_string_literal(binding),
            render_block(body, indent)
        ),
        Expr::Match { subject, ok_arm, err_arm, .. } => {
            let inner = indent + 1;
            let mut out = format!("match {} {{\n", fmt_expr(subject, indent));
            if let Some(arm) = ok_arm {
                out.push_str(&format!(
                    "{}ok {{ {} }} {}\n",
                    indent_str(inner),
                    arm.binding,
                    render_block(&arm.body, inner)
                ));
            }
            if let Some(arm) = err_arm {
                out.push_str(&format!(
                    "{}err {{ {} }} {}\n",
                    indent_str(inner),
                    arm.binding,
                    render_block(&arm.body, inner)
                ));
            }
            out.push_str(&format!("{}}}", indent_str(indent)));
            out
        }
        Expr::Try { body, catch_binding, catch_body, .. } => format!(
            "try {} catch {{ {catch_binding} }} {}",
            render_block(body, indent),
            render_block(catch_body, indent)
        ),
        Expr::Binary { op, left, right, .. } => {
            let prec = precedence(*op);
            let non_assoc = is_non_assoc(*op);
            let l = fmt_binary_child(left, indent, prec, non_assoc, false);
            let r = fmt_binary_child(right, indent, prec, non_assoc, true);
            format!("{l} {} {r}", op_str(*op))
        }
        Expr::Unary { operand, .. } => match operand.as_ref() {
            Expr::Binary { .. } => format!("-({})", fmt_expr(operand, indent)),
            Expr::Unary { .. } => format!("- {}", fmt_expr(operand, indent)),
            _ => format!("-{}", fmt_expr(operand, indent)),
        },
    }
}

fn fmt_binary_child(e: &Expr, indent: usize, parent_prec: u8, parent_non_assoc: bool, is_right: bool) -> String {
    let rendered = fmt_expr(e, indent);
    let needs_parens = match e {
        Expr::Binary { op, .. } => {
            let child_prec = precedence(*op);
            if child_prec < parent_prec {
                true
            } else if child_prec == parent_prec {
                parent_non_assoc || is_right
            } else {
                false
            }
        }
        _ => false,
    };
    if needs_parens {
        format!("({rendered})")
    } else {
        rendered
    }
}

fn precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le | BinOp::Eq | BinOp::Ne => 1,
        BinOp::Add | BinOp::Sub => 2,
        BinOp::Mul | BinOp::Div | BinOp::Mod => 3,
    }
}

fn is_non_assoc(op: BinOp) -> bool {
    matches!(op, BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le | BinOp::Eq | BinOp::Ne)
}

fn op_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Gt => ">",
        BinOp::Lt => "<",
        BinOp::Ge => ">=",
        BinOp::Le => "<=",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
    }
}

fn fmt_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn roundtrip(src: &str) -> (String, String) {
        let first = a0_parser::parse(src, "t.a0");
        assert!(first.diagnostics.is_empty(), "parse errors: {:?}", first.diagnostics);
        let once = format(&first.program.unwrap());
        let second = a0_parser::parse(&once, "t.a0");
        assert!(second.diagnostics.is_empty(), "reparse errors: {:?}\nformatted:\n{once}", second.diagnostics);
        let twice = format(&second.program.unwrap());
        (once, twice)
    }

    #[test]
    fn idempotent_on_minimal_program() {
        let (once, twice) = roundtrip("return { ok: true }");
        assert_eq!(once, twice);
    }

    #[test]
    fn precedence_parens_are_reinserted_where_needed() {
        let (once, _) = roundtrip("return 1 + 2 * 3");
        assert_eq!(once.trim(), "return 1 + 2 * 3");
    }

    #[test]
    fn left_grouped_addition_needs_explicit_parens_to_roundtrip() {
        // (1 + 2) * 3 and 1 + 2 * 3 are different ASTs; the formatter
        // must re-insert the parens on the first so reparsing it
        // reproduces the same tree rather than silently renormalizing
        // to operator-precedence order.
        let src = "return (1 + 2) * 3";
        let first = a0_parser::parse(src, "t.a0").program.unwrap();
        let once = format(&first);
        assert!(once.contains("(1 + 2)"), "expected parens preserved, got: {once}");
        let (_, twice) = roundtrip(src);
        assert_eq!(format(&a0_parser::parse(&once, "t.a0").program.unwrap()), twice);
    }

    #[test]
    fn right_associative_subtraction_needs_parens() {
        let src = "return 1 - (2 - 3)";
        let program = a0_parser::parse(src, "t.a0").program.unwrap();
        let rendered = format(&program);
        assert!(rendered.contains("1 - (2 - 3)"));
    }

    #[test]
    fn record_form_if_canonicalizes_to_block_form() {
        let (once, twice) = roundtrip("return if { cond: true, then: 1, else: 2 }");
        assert!(once.contains("if (true)"));
        assert_eq!(once, twice);
    }

    #[test]
    fn else_if_chain_stays_flat_not_nested() {
        let src = "return if (a) { return 1 } else if (b) { return 2 } else { return 3 }";
        let program = a0_parser::parse(src, "t.a0").program.unwrap();
        let rendered = format(&program);
        assert_eq!(rendered.matches("else if").count(), 1);
        assert!(!rendered.contains("else {\n    return if"));
    }

    #[test]
    fn large_record_breaks_to_multiline() {
        let src = "return { aaaaaaaaaa: 1, bbbbbbbbbb: 2, cccccccccc: 3, dddddddddd: 4, eeeeeeeeee: 5 }";
        let program = a0_parser::parse(src, "t.a0").program.unwrap();
        let rendered = format(&program);
        assert!(rendered.contains('\n'), "expected multiline rendering: {rendered}");
    }

    #[test]
    fn small_record_stays_inline() {
        let (once, _) = roundtrip("return { a: 1, b: 2 }");
        assert_eq!(once.trim(), "return { a: 1, b: 2 }");
    }

    #[test]
    fn string_literal_escapes_round_trip() {
        let src = r#"return { s: "a\nb\"c" }"#;
        let (once, twice) = roundtrip(src);
        assert_eq!(once, twice);
    }

    #[test]
    fn fn_and_for_and_match_idempotent() {
        let src = r#"
fn dbl { x } { return { v: x * 2 } }
let r = map { in: [1, 2, 3], fn: "dbl" }
return for { in: r, as: "item" } {
  return match item { ok { v } { return v } err { e } { return 0 } }
}
"#;
        let (once, twice) = roundtrip(src);
        assert_eq!(once, twice);
    }

    proptest::proptest! {
        #[test]
        fn format_is_idempotent_for_arithmetic_chains(
            ops in proptest::collection::vec(0..4usize, 1..6),
            nums in proptest::collection::vec(1i64..50, 2..7),
        ) {
            let symbols = ["+", "-", "*", "/"];
            let mut src = format!("return {}", nums[0]);
            for (i, op) in ops.iter().enumerate() {
                if let Some(n) = nums.get(i + 1) {
                    src.push(' ');
                    src.push_str(symbols[*op]);
                    src.push(' ');
                    src.push_str(&n.to_string());
                }
            }
            let first = a0_parser::parse(&src, "t.a0");
            if !first.diagnostics.is_empty() {
                return Ok(());
            }
            let once = format(&first.program.unwrap());
            let second = a0_parser::parse(&once, "t.a0");
            prop_assert!(second.diagnostics.is_empty());
            let twice = format(&second.program.unwrap());
            prop_assert_eq!(once, twice);
        }
    }
}
