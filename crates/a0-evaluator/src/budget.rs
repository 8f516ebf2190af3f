//! Declared limits (from `budget` headers) and the run's live counters.
//!
//! [`Budget`] is the merged, validated configuration; [`BudgetTracker`]
//! is the single piece of mutable per-run state the evaluator owns
//! (spec §5 — no other shared mutable state exists during a run). A
//! field left unset in every `budget` header means that dimension is
//! unbounded.

/// Limits merged from the program's `budget` header(s). `None` means
/// unbounded in that dimension.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    pub time_ms: Option<u64>,
    pub max_tool_calls: Option<u64>,
    pub max_bytes_written: Option<u64>,
    pub max_iterations: Option<u64>,
}

impl Budget {
    /// Merges one declared field by its header key. Unknown keys are
    /// ignored here — the validator already rejects them before the
    /// evaluator ever sees this program (`E_UNKNOWN_BUDGET`).
    pub fn merge_field(&mut self, key: &str, value: u64) {
        match key {
            "timeMs" => self.time_ms = Some(value),
            "maxToolCalls" => self.max_tool_calls = Some(value),
            "maxBytesWritten" => self.max_bytes_written = Some(value),
            "maxIterations" => self.max_iterations = Some(value),
            _ => {}
        }
    }
}

/// Live counters for one run. `started_at` anchors `elapsed_ms`;
/// `tool_calls`/`bytes_written`/`iterations` are bumped just before
/// each corresponding check so an over-limit attempt is caught before
/// its side effect (tool calls, iteration bodies) runs.
pub struct BudgetTracker {
    started_at: std::time::Instant,
    pub tool_calls: u64,
    pub bytes_written: u64,
    pub iterations: u64,
}

impl BudgetTracker {
    pub fn new() -> Self {
        Self { started_at: std::time::Instant::now(), tool_calls: 0, bytes_written: 0, iterations: 0 }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn merge_field_sets_known_keys() {
        let mut b = Budget::default();
        b.merge_field("maxToolCalls", 3);
        b.merge_field("maxIterations", 100);
        b.merge_field("unknownField", 1);
        assert_eq!(b.max_tool_calls, Some(3));
        assert_eq!(b.max_iterations, Some(100));
    }

    #[test]
    fn fresh_tracker_starts_at_zero() {
        let t = BudgetTracker::new();
        assert_eq!(t.tool_calls, 0);
        assert_eq!(t.bytes_written, 0);
        assert_eq!(t.iterations, 0);
    }
}
