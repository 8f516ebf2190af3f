//! The A0 evaluator (spec §4.7): the tree-walking interpreter that
//! turns a validated [`a0_ast::Program`] plus a capability set, tool
//! registry, and stdlib registry into a final value, an evidence list,
//! and a stream of trace events.
//!
//! Callers are expected to run [`a0_validator::validate`] first —
//! `execute` trusts a clean validation result and does not re-derive
//! its static checks.

mod budget;
mod env;
mod error;
mod eval;
mod evidence;
mod tool;
mod trace;

pub use budget::{Budget, BudgetTracker};
pub use env::Environment;
pub use error::RuntimeError;
pub use eval::{execute, ExecError, ExecOutcome, Options};
pub use evidence::{Evidence, EvidenceKind};
pub use tool::{CancelToken, ToolDef};
pub use trace::{now_iso8601, TraceEvent, TraceEventKind, TraceSink};
