//! Evidence records produced by `assert` and `check` (spec §4.7).
//!
//! Both forms always append an evidence entry, whether they pass or
//! fail. `assert` additionally raises an uncatchable [`crate::error::RuntimeError::Assert`]
//! on failure; `check` never raises — a front-end that cares about a
//! failed `check` inspects the returned evidence list and reports exit
//! code 5 itself (spec §6).

use a0_position::Span;
use a0_value::A0Value;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Assert,
    Check,
}

#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    pub kind: EvidenceKind,
    pub ok: bool,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<A0Value>,
    pub span: Span,
}
