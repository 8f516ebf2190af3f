//! The tree-walking evaluator (spec §4.7).
//!
//! One [`Evaluator`] owns the budget tracker, the function table, the
//! evidence list, and the trace sink for a single call to [`execute`].
//! Nothing here is reused across runs — a fresh `Evaluator` is built
//! per `execute` call, matching spec §5's "no global state" design
//! note.

use crate::budget::{Budget, BudgetTracker};
use crate::env::{self, Environment};
use crate::error::RuntimeError;
use crate::evidence::{Evidence, EvidenceKind};
use crate::tool::{CancelToken, ToolDef};
use crate::trace::{now_iso8601, TraceEvent, TraceEventKind, TraceSink};
use a0_ast::{BinOp, Expr, Header, IdentPath, MatchArm, Program, RecordEntry, RecordLit, Stmt, UnOp};
use a0_position::Span;
use a0_value::{A0Value, Record};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Everything a host program supplies for one run: the effective
/// capability allow-set (spec §4.1, computed by `a0-policy` ahead of
/// time), the tool and stdlib registries, and optional trace/cancel
/// hooks.
pub struct Options {
    pub run_id: String,
    pub file: Option<String>,
    pub allowed_capabilities: BTreeSet<String>,
    pub tools: HashMap<String, Box<dyn ToolDef>>,
    pub stdlib: HashMap<&'static str, Box<dyn a0_stdlib::StdlibFn>>,
    pub trace_sink: Option<TraceSink>,
    pub cancel: Option<CancelToken>,
}

impl Options {
    /// A minimal `Options` with no tools, the default stdlib registry,
    /// and no trace sink — useful for programs that only exercise pure
    /// stdlib/control-flow paths.
    pub fn new(run_id: impl Into<String>, allowed_capabilities: BTreeSet<String>) -> Self {
        Self {
            run_id: run_id.into(),
            file: None,
            allowed_capabilities,
            tools: HashMap::new(),
            stdlib: a0_stdlib::default_registry(),
            trace_sink: None,
            cancel: None,
        }
    }
}

/// The successful result of a run: its return value and the full
/// evidence list accumulated by every `assert`/`check` along the way.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub value: A0Value,
    pub evidence: Vec<Evidence>,
}

/// The failed result of a run: the terminal error plus whatever
/// evidence had already accumulated before it was raised.
#[derive(Debug)]
pub struct ExecError {
    pub error: RuntimeError,
    pub evidence: Vec<Evidence>,
}

struct FnEntry<'p> {
    params: &'p [Arc<str>],
    body: &'p [Stmt],
    closure: Environment,
}

struct Evaluator<'p> {
    allowed_capabilities: BTreeSet<String>,
    tools: HashMap<String, Box<dyn ToolDef>>,
    stdlib: HashMap<&'static str, Box<dyn a0_stdlib::StdlibFn>>,
    trace_sink: Option<TraceSink>,
    cancel: CancelToken,
    run_id: String,
    budget: Budget,
    tracker: BudgetTracker,
    evidence: Vec<Evidence>,
    functions: HashMap<Arc<str>, FnEntry<'p>>,
}

/// Runs `program` to completion under `options`. The caller is
/// responsible for having already run it through [`a0_validator::validate`]
/// — this function trusts that every name resolves, every tool call is
/// statically well-formed, and headers are shaped correctly; it does
/// not re-derive those checks.
pub fn execute<'p>(program: &'p Program, mut options: Options) -> Result<ExecOutcome, ExecError> {
    let mut evaluator = Evaluator {
        allowed_capabilities: options.allowed_capabilities,
        tools: options.tools,
        stdlib: options.stdlib,
        trace_sink: options.trace_sink.take(),
        cancel: options.cancel.take().unwrap_or_default(),
        run_id: options.run_id,
        budget: Budget::default(),
        tracker: BudgetTracker::new(),
        evidence: Vec::new(),
        functions: HashMap::new(),
    };

    let mut declared_caps: Vec<(String, Span)> = Vec::new();
    for header in &program.headers {
        match header {
            Header::Cap { fields, .. } => {
                for entry in &fields.entries {
                    if let RecordEntry::Pair { key, span, .. } = entry {
                        declared_caps.push((key.to_string(), span.clone()));
                    }
                }
            }
            Header::Budget { fields, .. } => {
                for entry in &fields.entries {
                    if let RecordEntry::Pair { key, value: Expr::Int { value, .. }, .. } = entry {
                        evaluator.budget.merge_field(key, *value as u64);
                    }
                }
            }
            Header::Import { .. } => {}
        }
    }

    for (cap, span) in &declared_caps {
        if !evaluator.allowed_capabilities.contains(cap) {
            let error = RuntimeError::CapDenied { capability: cap.clone(), span: span.clone() };
            return Err(ExecError { error, evidence: evaluator.evidence });
        }
    }

    evaluator.emit(
        TraceEventKind::RunStart,
        None,
        Some(serde_json::json!({
            "file": options.file,
            "capabilities": declared_caps.iter().map(|(c, _)| c.clone()).collect::<Vec<_>>(),
        })),
    );

    let root = env::root();
    let start = std::time::Instant::now();
    let result = evaluator.execute_block(&program.statements, &root);
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(value) => {
            evaluator.emit(
                TraceEventKind::RunEnd,
                None,
                Some(serde_json::json!({"duration_ms": duration_ms, "outcome": "ok"})),
            );
            Ok(ExecOutcome { value, evidence: evaluator.evidence })
        }
        Err(error) => {
            evaluator.emit(
                TraceEventKind::RunEnd,
                None,
                Some(serde_json::json!({
                    "duration_ms": duration_ms,
                    "outcome": "err",
                    "code": error.code().as_str(),
                    "message": error.to_string(),
                })),
            );
            Err(ExecError { error, evidence: evaluator.evidence })
        }
    }
}

impl<'p> Evaluator<'p> {
    fn emit(&mut self, kind: TraceEventKind, span: Option<Span>, data: Option<serde_json::Value>) {
        if let Some(sink) = self.trace_sink.as_mut() {
            let event = TraceEvent { ts: now_iso8601(), run_id: self.run_id.clone(), event: kind, span, data };
            sink(&event);
        }
    }

    fn raise_budget(&mut self, field: &'static str, span: &Span) -> RuntimeError {
        self.emit(
            TraceEventKind::BudgetExceeded,
            Some(span.clone()),
            Some(serde_json::json!({"budget": field})),
        );
        RuntimeError::Budget { budget: field.to_string(), span: span.clone() }
    }

    fn check_time_budget(&mut self, span: &Span) -> Result<(), RuntimeError> {
        if let Some(max) = self.budget.time_ms {
            if self.tracker.elapsed_ms() > max {
                return Err(self.raise_budget("timeMs", span));
            }
        }
        Ok(())
    }

    fn check_iterations(&mut self, span: &Span) -> Result<(), RuntimeError> {
        self.tracker.iterations += 1;
        if let Some(max) = self.budget.max_iterations {
            if self.tracker.iterations > max {
                return Err(self.raise_budget("maxIterations", span));
            }
        }
        Ok(())
    }

    /// Runs a list of statements in order. A `Stmt::Return` stops the
    /// block immediately and becomes its value; a block that runs out
    /// of statements without one yields `null` (spec §4.3 enforces
    /// return discipline only at the program's top level — nested
    /// blocks have no such static guarantee, so this is the evaluator's
    /// own fallback for them).
    fn execute_block(&mut self, stmts: &'p [Stmt], env: &Environment) -> Result<A0Value, RuntimeError> {
        for stmt in stmts {
            self.check_time_budget(stmt.span())?;
            self.emit(TraceEventKind::StmtStart, Some(stmt.span().clone()), None);
            let outcome = self.eval_stmt(stmt, env)?;
            self.emit(TraceEventKind::StmtEnd, Some(stmt.span().clone()), None);
            if let Some(value) = outcome {
                return Ok(value);
            }
        }
        Ok(A0Value::Null)
    }

    fn eval_stmt(&mut self, stmt: &'p Stmt, env: &Environment) -> Result<Option<A0Value>, RuntimeError> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let v = self.eval_expr(value, env)?;
                env::declare(env, name.clone(), v);
                Ok(None)
            }
            Stmt::Expr { value, arrow_target, .. } => {
                let v = self.eval_expr(value, env)?;
                if let Some(path) = arrow_target {
                    env::declare(env, Arc::from(path.head()), v);
                }
                Ok(None)
            }
            Stmt::Return { value, .. } => {
                let v = self.eval_expr(value, env)?;
                Ok(Some(v))
            }
            Stmt::FnDecl { name, params, body, .. } => {
                self.functions.insert(name.clone(), FnEntry { params, body, closure: env.clone() });
                Ok(None)
            }
            Stmt::Try { body, catch_binding, catch_body, .. } => {
                // Used for its side effects only — unlike `Expr::Try`,
                // a statement-position `try` has no binding syntax, so
                // its result value is discarded and the block continues.
                self.eval_try(body, catch_binding, catch_body, env)?;
                Ok(None)
            }
        }
    }

    fn eval_try(
        &mut self,
        body: &'p [Stmt],
        catch_binding: &Arc<str>,
        catch_body: &'p [Stmt],
        env: &Environment,
    ) -> Result<A0Value, RuntimeError> {
        let body_env = env::child(env);
        match self.execute_block(body, &body_env) {
            Ok(value) => Ok(value),
            Err(err) if !err.is_catchable() => Err(err),
            Err(err) => {
                let catch_env = env::child(env);
                env::declare(&catch_env, catch_binding.clone(), err.to_catch_record());
                self.execute_block(catch_body, &catch_env)
            }
        }
    }

    fn eval_expr(&mut self, expr: &'p Expr, env: &Environment) -> Result<A0Value, RuntimeError> {
        match expr {
            Expr::Int { value, .. } | Expr::Float { value, .. } => Ok(A0Value::Number(*value)),
            Expr::Bool { value, .. } => Ok(A0Value::Bool(*value)),
            Expr::Str { value, .. } => Ok(A0Value::String(Arc::clone(value))),
            Expr::Null { .. } => Ok(A0Value::Null),
            Expr::Ident(path) => self.eval_path_access(path, env),
            Expr::Record(lit) => Ok(A0Value::record(self.eval_record(lit, env)?)),
            Expr::List { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for el in elements {
                    items.push(self.eval_expr(el, env)?);
                }
                Ok(A0Value::list(items))
            }
            Expr::Call { tool, args, span } => self.eval_tool_call(tool, args, span, true, env),
            Expr::Do { tool, args, span } => self.eval_tool_call(tool, args, span, false, env),
            Expr::Assert { args, span } => self.eval_assert_check(args, span, true, env),
            Expr::Check { args, span } => self.eval_assert_check(args, span, false, env),
            Expr::FnCall { path, args, span } => {
                let name = path.render();
                let args_value = A0Value::record(self.eval_record(args, env)?);
                self.call_named(&name, args_value, span, env)
            }
            Expr::If { cond, then_branch, else_branch, .. } => {
                let c = self.eval_expr(cond, env)?;
                // `if` does not create its own frame (spec §3's
                // frame-creating construct list omits it) — a binding
                // made inside a branch stays visible afterward.
                if c.is_truthy() {
                    self.execute_block(then_branch, env)
                } else if let Some(else_stmts) = else_branch {
                    self.execute_block(else_stmts, env)
                } else {
                    Ok(A0Value::Null)
                }
            }
            Expr::For { list, binding, body, span } => self.eval_for(list, binding, body, span, env),
            Expr::Match { subject, ok_arm, err_arm, span } => {
                self.eval_match(subject, ok_arm.as_ref(), err_arm.as_ref(), span, env)
            }
            Expr::Try { body, catch_binding, catch_body, .. } => {
                self.eval_try(body, catch_binding, catch_body, env)
            }
            Expr::Binary { op, left, right, span } => {
                let l = self.eval_expr(left, env)?;
                let r = self.eval_expr(right, env)?;
                eval_binary(*op, l, r, span)
            }
            Expr::Unary { op: UnOp::Neg, operand, span } => {
                let v = self.eval_expr(operand, env)?;
                match v {
                    A0Value::Number(n) => Ok(A0Value::Number(-n)),
                    other => Err(RuntimeError::Type {
                        message: format!("unary `-` requires a number, found `{}`", other.type_name()),
                        span: span.clone(),
                    }),
                }
            }
        }
    }

    /// `a.b.c` — resolves the head in the environment, then projects
    /// successive keys. A missing key yields `null`; once the current
    /// value is `null` (or any other non-record), projecting a further
    /// key is `E_PATH`.
    fn eval_path_access(&self, path: &IdentPath, env: &Environment) -> Result<A0Value, RuntimeError> {
        let head = env::lookup(env, path.head()).ok_or_else(|| RuntimeError::Internal {
            message: format!("unbound name `{}` reached the evaluator", path.head()),
            span: path.span.clone(),
        })?;
        let mut current = head;
        for seg in &path.segments[1..] {
            current = match &current {
                A0Value::Record(r) => r.get(seg).cloned().unwrap_or(A0Value::Null),
                other => {
                    return Err(RuntimeError::Path {
                        message: format!("cannot project key `{seg}` on a `{}`", other.type_name()),
                        span: path.span.clone(),
                    });
                }
            };
        }
        Ok(current)
    }

    fn eval_record(&mut self, lit: &'p RecordLit, env: &Environment) -> Result<Record, RuntimeError> {
        let mut out = Record::new();
        for entry in &lit.entries {
            match entry {
                RecordEntry::Pair { key, value, .. } => {
                    let v = self.eval_expr(value, env)?;
                    out.insert(Arc::clone(key), v);
                }
                RecordEntry::Spread { expr, span } => {
                    let v = self.eval_expr(expr, env)?;
                    let spread = v.as_record().ok_or_else(|| RuntimeError::Type {
                        message: format!("`...` spread requires a record, found `{}`", v.type_name()),
                        span: span.clone(),
                    })?;
                    for (k, val) in spread.iter() {
                        out.insert(Arc::clone(k), val.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    fn eval_for(
        &mut self,
        list: &'p Expr,
        binding: &Arc<str>,
        body: &'p [Stmt],
        span: &Span,
        env: &Environment,
    ) -> Result<A0Value, RuntimeError> {
        let list_v = self.eval_expr(list, env)?;
        let items = list_v
            .as_list()
            .ok_or_else(|| RuntimeError::ForNotList { found: list_v.type_name(), span: span.clone() })?
            .to_vec();
        self.emit(TraceEventKind::ForStart, Some(span.clone()), None);
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            self.check_iterations(span)?;
            let iter_env = env::child(env);
            env::declare(&iter_env, binding.clone(), item);
            out.push(self.execute_block(body, &iter_env)?);
        }
        self.emit(TraceEventKind::ForEnd, Some(span.clone()), None);
        Ok(A0Value::list(out))
    }

    fn eval_match(
        &mut self,
        subject: &'p Expr,
        ok_arm: Option<&'p MatchArm>,
        err_arm: Option<&'p MatchArm>,
        span: &Span,
        env: &Environment,
    ) -> Result<A0Value, RuntimeError> {
        let v = self.eval_expr(subject, env)?;
        let record = v
            .as_record()
            .ok_or_else(|| RuntimeError::MatchNotRecord { found: v.type_name(), span: span.clone() })?;
        let (arm, payload) = if let Some(payload) = record.get("ok") {
            (ok_arm, payload.clone())
        } else if let Some(payload) = record.get("err") {
            (err_arm, payload.clone())
        } else {
            return Err(RuntimeError::MatchNoArm { span: span.clone() });
        };
        let arm = arm.ok_or_else(|| RuntimeError::MatchNoArm { span: span.clone() })?;
        self.emit(TraceEventKind::MatchStart, Some(span.clone()), None);
        let arm_env = env::child(env);
        env::declare(&arm_env, arm.binding.clone(), payload);
        let result = self.execute_block(&arm.body, &arm_env)?;
        self.emit(TraceEventKind::MatchEnd, Some(span.clone()), None);
        Ok(result)
    }

    fn eval_tool_call(
        &mut self,
        tool: &IdentPath,
        args: &'p RecordLit,
        span: &Span,
        read_only: bool,
        env: &Environment,
    ) -> Result<A0Value, RuntimeError> {
        let name = tool.render();
        let capability_id = match self.tools.get(name.as_str()) {
            Some(def) => def.capability_id().to_string(),
            None => {
                return Err(RuntimeError::Tool {
                    tool: name,
                    message: "tool not registered by host".to_string(),
                    span: span.clone(),
                });
            }
        };
        if !self.allowed_capabilities.contains(&capability_id) {
            return Err(RuntimeError::CapDenied { capability: capability_id, span: span.clone() });
        }

        let args_record = self.eval_record(args, env)?;
        let args_value = A0Value::record(args_record);

        if let Some(def) = self.tools.get(name.as_str()) {
            def.validate_args(&args_value).map_err(|message| RuntimeError::ToolArgs {
                tool: name.clone(),
                message,
                span: span.clone(),
            })?;
        }

        self.tracker.tool_calls += 1;
        if let Some(max) = self.budget.max_tool_calls {
            if self.tracker.tool_calls > max {
                return Err(self.raise_budget("maxToolCalls", span));
            }
        }

        let mode = if read_only { "read" } else { "effect" };
        self.emit(
            TraceEventKind::ToolStart,
            Some(span.clone()),
            Some(serde_json::json!({"tool": name, "args": args_value.to_json(), "mode": mode})),
        );

        let started = std::time::Instant::now();
        let cancel = self.cancel.clone();
        let result = match self.tools.get(name.as_str()) {
            Some(def) => def.execute(&args_value, &cancel),
            None => Err("tool not registered by host".to_string()),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                self.emit(
                    TraceEventKind::ToolEnd,
                    Some(span.clone()),
                    Some(serde_json::json!({"tool": name, "outcome": "ok", "duration_ms": duration_ms})),
                );
                if let Some(bytes) = value.as_record().and_then(|r| r.get("bytes")).and_then(A0Value::as_number)
                {
                    self.tracker.bytes_written += bytes as u64;
                    if let Some(max) = self.budget.max_bytes_written {
                        if self.tracker.bytes_written > max {
                            return Err(self.raise_budget("maxBytesWritten", span));
                        }
                    }
                }
                self.check_time_budget(span)?;
                Ok(value)
            }
            Err(message) => {
                self.emit(
                    TraceEventKind::ToolEnd,
                    Some(span.clone()),
                    Some(serde_json::json!({
                        "tool": name, "outcome": "err", "duration_ms": duration_ms, "error": message,
                    })),
                );
                Err(RuntimeError::Tool { tool: name, message, span: span.clone() })
            }
        }
    }

    fn eval_assert_check(
        &mut self,
        args: &'p RecordLit,
        span: &Span,
        fatal: bool,
        env: &Environment,
    ) -> Result<A0Value, RuntimeError> {
        let record = self.eval_record(args, env)?;
        let subject = record.get("that").cloned().unwrap_or(A0Value::Null);
        let ok = subject.is_truthy();
        let msg = record.get("msg").and_then(A0Value::as_str).unwrap_or_default().to_string();
        let details = record.get("details").cloned();
        let kind = if fatal { EvidenceKind::Assert } else { EvidenceKind::Check };

        self.evidence.push(Evidence { kind, ok, msg: msg.clone(), details: details.clone(), span: span.clone() });
        self.emit(
            TraceEventKind::Evidence,
            Some(span.clone()),
            Some(serde_json::json!({
                "kind": if fatal { "assert" } else { "check" }, "ok": ok, "msg": msg,
            })),
        );

        if !ok && fatal {
            return Err(RuntimeError::Assert { message: msg, span: span.clone(), details });
        }
        let mut out = Record::new();
        out.insert("ok", A0Value::Bool(ok));
        Ok(A0Value::record(out))
    }

    /// Dispatches a name that could be a higher-order built-in, a pure
    /// stdlib function, or a user-defined `fn` — the three cases
    /// `Expr::FnCall` and `map`/`filter`/`reduce`'s own `fn:` field both
    /// need to resolve the same way.
    fn call_named(
        &mut self,
        name: &str,
        args_value: A0Value,
        span: &Span,
        env: &Environment,
    ) -> Result<A0Value, RuntimeError> {
        if a0_stdlib::HIGHER_ORDER_NAMES.contains(&name) {
            let record = args_value.as_record().ok_or_else(|| RuntimeError::Type {
                message: format!("`{name}` requires a record argument"),
                span: span.clone(),
            })?;
            return match name {
                "map" => self.eval_map(record, span, env),
                "filter" => self.eval_filter(record, span, env),
                "reduce" => self.eval_reduce(record, span, env),
                _ => Err(RuntimeError::Internal {
                    message: format!("`{name}` is not a higher-order builtin"),
                    span: span.clone(),
                }),
            };
        }
        if let Some(stdlib_fn) = self.stdlib.get(name) {
            return stdlib_fn
                .execute(&args_value)
                .map_err(|message| RuntimeError::Fn { name: name.to_string(), message, span: span.clone() });
        }
        self.eval_user_fn_call(name, args_value, span)
    }

    fn eval_user_fn_call(&mut self, name: &str, args_value: A0Value, span: &Span) -> Result<A0Value, RuntimeError> {
        let Some((params, body, closure)) = self
            .functions
            .get(name)
            .map(|e| (e.params.to_vec(), e.body, e.closure.clone()))
        else {
            return Err(RuntimeError::Fn { name: name.to_string(), message: "unknown function".to_string(), span: span.clone() });
        };
        let args_record = args_value.as_record().cloned().unwrap_or_default();
        let call_env = env::child(&closure);
        for param in &params {
            let value = args_record.get(param).cloned().unwrap_or(A0Value::Null);
            env::declare(&call_env, param.clone(), value);
        }
        self.emit(TraceEventKind::FnCallStart, Some(span.clone()), Some(serde_json::json!({"name": name})));
        let result = self.execute_block(body, &call_env);
        self.emit(TraceEventKind::FnCallEnd, Some(span.clone()), Some(serde_json::json!({"name": name})));
        result
    }

    /// The arity of a user-defined function by name, used by
    /// `map`/`filter`/`reduce` to decide whether an element is passed
    /// whole (one parameter) or destructured by field name (more than
    /// one). Only user-defined functions expose named parameters this
    /// way, so `fn:`/`by:` in a higher-order call must name one —
    /// stdlib functions and unknown names are rejected here.
    fn fn_param_count(&self, name: &str, span: &Span) -> Result<usize, RuntimeError> {
        self.functions.get(name).map(|e| e.params.len()).ok_or_else(|| RuntimeError::Fn {
            name: name.to_string(),
            message: "`map`/`filter`/`reduce` `fn` must name a user-defined function".to_string(),
            span: span.clone(),
        })
    }

    fn destructure_call_arg(&self, name: &str, arity: usize, item: A0Value, span: &Span) -> Result<A0Value, RuntimeError> {
        if arity <= 1 {
            let mut out = Record::new();
            if let Some(param) = self.functions.get(name).and_then(|e| e.params.first()) {
                out.insert(param.clone(), item);
            }
            Ok(A0Value::record(out))
        } else {
            let fields = item.as_record().ok_or_else(|| RuntimeError::Type {
                message: format!("`{name}` has {arity} parameters; each element must be a record to destructure"),
                span: span.clone(),
            })?;
            Ok(A0Value::record(fields.clone()))
        }
    }

    fn eval_map(&mut self, record: &Record, span: &Span, env: &Environment) -> Result<A0Value, RuntimeError> {
        let list = record
            .get("in")
            .and_then(A0Value::as_list)
            .ok_or_else(|| RuntimeError::Type { message: "`map` requires an `in` list".to_string(), span: span.clone() })?
            .to_vec();
        let fn_name = record
            .get("fn")
            .and_then(A0Value::as_str)
            .ok_or_else(|| RuntimeError::Type { message: "`map` requires a `fn` name".to_string(), span: span.clone() })?
            .to_string();

        let arity = self.fn_param_count(&fn_name, span)?;
        self.emit(TraceEventKind::MapStart, Some(span.clone()), None);
        let mut out = Vec::with_capacity(list.len());
        for item in list {
            self.check_iterations(span)?;
            let args_value = self.destructure_call_arg(&fn_name, arity, item, span)?;
            out.push(self.call_named(&fn_name, args_value, span, env)?);
        }
        self.emit(TraceEventKind::MapEnd, Some(span.clone()), None);
        Ok(A0Value::list(out))
    }

    fn eval_filter(&mut self, record: &Record, span: &Span, env: &Environment) -> Result<A0Value, RuntimeError> {
        let list = record
            .get("in")
            .and_then(A0Value::as_list)
            .ok_or_else(|| RuntimeError::Type { message: "`filter` requires an `in` list".to_string(), span: span.clone() })?
            .to_vec();
        let fn_name = record.get("fn").and_then(A0Value::as_str).map(str::to_string);
        let by_key = record.get("by").and_then(A0Value::as_str).map(str::to_string);
        if fn_name.is_some() && by_key.is_some() {
            return Err(RuntimeError::Type {
                message: "`filter` cannot take both `fn` and `by`".to_string(),
                span: span.clone(),
            });
        }

        let mut out = Vec::new();
        if let Some(key) = by_key {
            for item in list {
                self.check_iterations(span)?;
                let keep = item.as_record().and_then(|r| r.get(&key)).is_some_and(A0Value::is_truthy);
                if keep {
                    out.push(item);
                }
            }
            return Ok(A0Value::list(out));
        }

        let fn_name = fn_name.ok_or_else(|| RuntimeError::Type {
            message: "`filter` requires either `fn` or `by`".to_string(),
            span: span.clone(),
        })?;
        let arity = self.fn_param_count(&fn_name, span)?;
        for item in list {
            self.check_iterations(span)?;
            let args_value = self.destructure_call_arg(&fn_name, arity, item.clone(), span)?;
            let predicate = self.call_named(&fn_name, args_value, span, env)?;
            let keep = predicate
                .as_record()
                .and_then(|r| r.iter().next())
                .map(|(_, v)| v.is_truthy())
                .unwrap_or(false);
            if keep {
                out.push(item);
            }
        }
        Ok(A0Value::list(out))
    }

    fn eval_reduce(&mut self, record: &Record, span: &Span, env: &Environment) -> Result<A0Value, RuntimeError> {
        let list = record
            .get("in")
            .and_then(A0Value::as_list)
            .ok_or_else(|| RuntimeError::Type { message: "`reduce` requires an `in` list".to_string(), span: span.clone() })?
            .to_vec();
        let fn_name = record
            .get("fn")
            .and_then(A0Value::as_str)
            .ok_or_else(|| RuntimeError::Type { message: "`reduce` requires a `fn` name".to_string(), span: span.clone() })?
            .to_string();
        let init = record
            .get("init")
            .cloned()
            .ok_or_else(|| RuntimeError::Type { message: "`reduce` requires an `init` value".to_string(), span: span.clone() })?;

        let params = self.functions.get(fn_name.as_str()).map(|e| e.params.to_vec()).ok_or_else(|| {
            RuntimeError::Fn {
                name: fn_name.clone(),
                message: "`reduce` `fn` must name a user-defined function with two parameters".to_string(),
                span: span.clone(),
            }
        })?;
        if params.len() != 2 {
            return Err(RuntimeError::Fn {
                name: fn_name,
                message: "`reduce` requires a two-parameter function".to_string(),
                span: span.clone(),
            });
        }

        self.emit(TraceEventKind::ReduceStart, Some(span.clone()), None);
        let mut acc = init;
        for item in list {
            self.check_iterations(span)?;
            let mut args = Record::new();
            args.insert(params[0].clone(), acc);
            args.insert(params[1].clone(), item);
            acc = self.call_named(&fn_name, A0Value::record(args), span, env)?;
        }
        self.emit(TraceEventKind::ReduceEnd, Some(span.clone()), None);
        Ok(acc)
    }
}

fn type_err(op: &str, l: &A0Value, r: &A0Value, span: &Span) -> RuntimeError {
    RuntimeError::Type {
        message: format!("`{op}` does not apply to `{}` and `{}`", l.type_name(), r.type_name()),
        span: span.clone(),
    }
}

fn eval_binary(op: BinOp, l: A0Value, r: A0Value, span: &Span) -> Result<A0Value, RuntimeError> {
    use BinOp::*;
    match op {
        Add => match (&l, &r) {
            (A0Value::Number(a), A0Value::Number(b)) => Ok(A0Value::Number(a + b)),
            (A0Value::String(a), A0Value::String(b)) => Ok(A0Value::string(format!("{a}{b}"))),
            _ => Err(type_err("+", &l, &r, span)),
        },
        Sub => numeric_op(l, r, "-", span, |a, b| Ok(a - b)),
        Mul => numeric_op(l, r, "*", span, |a, b| Ok(a * b)),
        Div => numeric_op(l, r, "/", span, |a, b| {
            if b == 0.0 {
                Err("division by zero".to_string())
            } else {
                Ok(a / b)
            }
        }),
        Mod => numeric_op(l, r, "%", span, |a, b| {
            if b == 0.0 {
                Err("modulo by zero".to_string())
            } else {
                Ok(a % b)
            }
        }),
        Gt => compare(l, r, ">", span, |o| o == std::cmp::Ordering::Greater),
        Lt => compare(l, r, "<", span, |o| o == std::cmp::Ordering::Less),
        Ge => compare(l, r, ">=", span, |o| o != std::cmp::Ordering::Less),
        Le => compare(l, r, "<=", span, |o| o != std::cmp::Ordering::Greater),
        Eq => Ok(A0Value::Bool(l == r)),
        Ne => Ok(A0Value::Bool(l != r)),
    }
}

fn numeric_op(
    l: A0Value,
    r: A0Value,
    symbol: &str,
    span: &Span,
    f: impl FnOnce(f64, f64) -> Result<f64, String>,
) -> Result<A0Value, RuntimeError> {
    let (Some(a), Some(b)) = (l.as_number(), r.as_number()) else {
        return Err(type_err(symbol, &l, &r, span));
    };
    f(a, b)
        .map(A0Value::Number)
        .map_err(|message| RuntimeError::Type { message, span: span.clone() })
}

fn compare(
    l: A0Value,
    r: A0Value,
    symbol: &str,
    span: &Span,
    f: impl FnOnce(std::cmp::Ordering) -> bool,
) -> Result<A0Value, RuntimeError> {
    let ordering = match (&l, &r) {
        (A0Value::Number(a), A0Value::Number(b)) => a.partial_cmp(b),
        (A0Value::String(a), A0Value::String(b)) => Some(a.as_ref().cmp(b.as_ref())),
        _ => None,
    };
    match ordering {
        Some(ordering) => Ok(A0Value::Bool(f(ordering))),
        None => Err(type_err(symbol, &l, &r, span)),
    }
}
