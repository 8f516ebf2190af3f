//! Layered policy loading and effective-allow-set computation.
//!
//! Deny-by-default: a program only gets a capability if the active
//! policy's `allow` list names it and its `deny` list does not.
//! [`load_policy`] never fails — a missing, unreadable, or malformed
//! policy file degrades to the synthetic empty policy rather than
//! aborting the host program, matching the lenient parsing behavior
//! of tool configuration elsewhere in the stack.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The full set of capabilities the language recognizes. `unsafe_allow_all`
/// resolves to exactly this set regardless of the active policy.
pub const KNOWN_CAPABILITIES: &[&str] = &["fs.read", "fs.write", "http.get", "sh.exec"];

/// Whether a tool only reads (callable with `call?`) or has side
/// effects (callable only with `do`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolMode {
    Read,
    Effect,
}

/// The built-in tool catalog: name, mode, and capability id. In this
/// language a tool's name and the capability it requires are the same
/// string (`fs.read` both names the tool and the capability gating it).
/// The validator and evaluator use this table to check `call?`/`do`
/// and capability declarations statically, independent of whatever
/// [`crate::Policy`] is active; the *host-supplied* tool registry still
/// decides how each one actually executes.
pub const KNOWN_TOOLS: &[(&str, ToolMode)] = &[
    ("fs.read", ToolMode::Read),
    ("fs.write", ToolMode::Effect),
    ("http.get", ToolMode::Read),
    ("sh.exec", ToolMode::Effect),
];

/// Looks up a known tool's mode by name.
pub fn tool_mode(name: &str) -> Option<ToolMode> {
    KNOWN_TOOLS.iter().find(|(n, _)| *n == name).map(|(_, m)| *m)
}

/// A layered policy document, normally loaded from `.a0policy.json` or
/// `~/.a0/policy.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub version: i64,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub limits: Option<serde_json::Value>,
}

impl Policy {
    /// The deny-by-default policy used when no policy file is found or
    /// the file on disk cannot be parsed as a JSON object.
    pub fn empty() -> Self {
        Self { version: 1, allow: Vec::new(), deny: Vec::new(), limits: None }
    }
}

/// Loads the effective policy by searching, in order: `<cwd>/.a0policy.json`,
/// then `<home>/.a0/policy.json`. The first file that exists and parses as a
/// JSON object wins; everything else (missing file, I/O error, malformed
/// JSON, a JSON value that isn't an object) falls through to the next
/// candidate, and ultimately to [`Policy::empty`].
pub fn load_policy(cwd: Option<&Path>, home: Option<&Path>) -> Policy {
    let candidates = [
        cwd.map(|c| c.join(".a0policy.json")),
        home.map(|h| h.join(".a0").join("policy.json")),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Some(policy) = try_load(&candidate) {
            tracing::debug!(path = %candidate.display(), "loaded policy file");
            return policy;
        }
    }
    tracing::debug!("no policy file found, using empty policy");
    Policy::empty()
}

fn try_load(path: &PathBuf) -> Option<Policy> {
    let text = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&text).ok()?;
    if !value.is_object() {
        return None;
    }
    let version = value.get("version").and_then(|v| v.as_i64()).unwrap_or(1);
    let allow = string_array(&value, "allow");
    let deny = string_array(&value, "deny");
    let limits = value.get("limits").cloned();
    Some(Policy { version, allow, deny, limits })
}

fn string_array(value: &serde_json::Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|item| item.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Computes the effective allow-set: `policy.allow \ policy.deny`, or the
/// full [`KNOWN_CAPABILITIES`] set when `unsafe_allow_all` is set (used by
/// test harnesses and `a0`'s own integration tests, never by a hosting
/// agent in production).
pub fn build_allowed_caps(policy: &Policy, unsafe_allow_all: bool) -> BTreeSet<String> {
    if unsafe_allow_all {
        return KNOWN_CAPABILITIES.iter().map(|s| s.to_string()).collect();
    }
    let deny: BTreeSet<&str> = policy.deny.iter().map(String::as_str).collect();
    policy.allow.iter().filter(|cap| !deny.contains(cap.as_str())).cloned().collect()
}
