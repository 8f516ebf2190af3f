//! Tool contracts and the cancellation handle passed to them.
//!
//! Tools are the only place a running program touches the outside
//! world, so they're the only seat where cancellation needs to be
//! observable mid-call. [`CancelToken`] wraps an `Arc<AtomicBool>`
//! rather than anything richer — a tool implementation polls
//! `is_cancelled()` at whatever granularity makes sense for it (a
//! single syscall, a chunked read loop) and bails out with its own
//! error message; the evaluator doesn't prescribe how.

use a0_policy::ToolMode;
use a0_value::A0Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A host-supplied implementation of one named tool. `capability_id`
/// is almost always the same string as `name` — `a0-policy::KNOWN_TOOLS`
/// documents that this is the rule, not a coincidence, for every tool
/// the language currently defines — but the trait keeps them distinct
/// so a host can register a tool under one capability umbrella without
/// the evaluator caring.
pub trait ToolDef: Send + Sync {
    fn name(&self) -> &str;
    fn mode(&self) -> ToolMode;
    fn capability_id(&self) -> &str;
    fn validate_args(&self, args: &A0Value) -> Result<(), String>;
    fn execute(&self, args: &A0Value, cancel: &CancelToken) -> Result<A0Value, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
