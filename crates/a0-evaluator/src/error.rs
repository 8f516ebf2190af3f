//! Runtime error taxonomy (spec §7's Runtime phase).
//!
//! One variant per runtime `E_*` code. A `RuntimeError` stops the
//! block it's raised in and unwinds until a `try`/`catch` converts it
//! to a `{code, message}` record, or it reaches the top of `execute`
//! and becomes the run's terminal failure — except [`RuntimeError::Assert`],
//! which `try` refuses to catch (spec §4.7, §7: assertion failures are
//! fatal and uncatchable).

use a0_diagnostics::Diagnostic;
use a0_diagnostics_codes::DiagnosticCode;
use a0_position::Span;
use a0_value::{A0Value, Record};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("capability `{capability}` was not granted by the active policy")]
    CapDenied { capability: String, span: Span },

    #[error("tool `{tool}` failed: {message}")]
    Tool { tool: String, message: String, span: Span },

    #[error("tool `{tool}` rejected its arguments: {message}")]
    ToolArgs { tool: String, message: String, span: Span },

    #[error("budget `{budget}` exceeded")]
    Budget { budget: String, span: Span },

    #[error("function `{name}` raised: {message}")]
    Fn { name: String, message: String, span: Span },

    #[error("path access failed: {message}")]
    Path { message: String, span: Span },

    #[error("type error: {message}")]
    Type { message: String, span: Span },

    #[error("`for` requires a list, found `{found}`")]
    ForNotList { found: &'static str, span: Span },

    #[error("`match` requires a record subject, found `{found}`")]
    MatchNotRecord { found: &'static str, span: Span },

    #[error("`match` subject has neither an `ok` nor an `err` key, or no arm handles the one it has")]
    MatchNoArm { span: Span },

    #[error("assertion failed: {message}")]
    Assert { message: String, span: Span, details: Option<A0Value> },

    #[error("i/o error: {message}")]
    Io { message: String, span: Span },

    #[error("trace sink error: {message}")]
    Trace { message: String, span: Span },

    #[error("internal error: {message}")]
    Internal { message: String, span: Span },
}

impl RuntimeError {
    pub fn code(&self) -> DiagnosticCode {
        use RuntimeError::*;
        match self {
            CapDenied { .. } => DiagnosticCode::ECapDenied,
            Tool { .. } => DiagnosticCode::ETool,
            ToolArgs { .. } => DiagnosticCode::EToolArgs,
            Budget { .. } => DiagnosticCode::EBudget,
            Fn { .. } => DiagnosticCode::EFn,
            Path { .. } => DiagnosticCode::EPath,
            Type { .. } => DiagnosticCode::EType,
            ForNotList { .. } => DiagnosticCode::EForNotList,
            MatchNotRecord { .. } => DiagnosticCode::EMatchNotRecord,
            MatchNoArm { .. } => DiagnosticCode::EMatchNoArm,
            Assert { .. } => DiagnosticCode::EAssert,
            Io { .. } => DiagnosticCode::EIo,
            Trace { .. } => DiagnosticCode::ETrace,
            Internal { .. } => DiagnosticCode::ERuntime,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.code().exit_code()
    }

    pub fn span(&self) -> &Span {
        use RuntimeError::*;
        match self {
            CapDenied { span, .. }
            | Tool { span, .. }
            | ToolArgs { span, .. }
            | Budget { span, .. }
            | Fn { span, .. }
            | Path { span, .. }
            | Type { span, .. }
            | ForNotList { span, .. }
            | MatchNotRecord { span, .. }
            | MatchNoArm { span }
            | Assert { span, .. }
            | Io { span, .. }
            | Trace { span, .. }
            | Internal { span, .. } => span,
        }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        let code = self.code();
        let span = self.span().clone();
        let message = self.to_string();
        Diagnostic::error(code, span, message)
    }

    /// Whether `try`/`catch` may convert this into a `{code, message}`
    /// record. Only `Assert` is uncatchable.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, RuntimeError::Assert { .. })
    }

    /// The `{code, message}` record a `catch` block's binding receives.
    pub fn to_catch_record(&self) -> A0Value {
        let mut record = Record::new();
        record.insert("code", A0Value::string(self.code().as_str()));
        record.insert("message", A0Value::string(self.to_string()));
        A0Value::record(record)
    }
}
