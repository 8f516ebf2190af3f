//! Pure, capability-free standard library functions, keyed by name.
//!
//! Every function takes exactly one [`A0Value::Record`] argument and
//! returns a value or a plain `String` error (wrapped by the evaluator
//! as `E_FN` together with the function's name). Nothing here touches
//! the filesystem, network, clock, or randomness — these functions are
//! total and deterministic except where individually noted.
//!
//! `map`, `filter`, and `reduce` appear in [`ALL_NAMES`] because the
//! validator must accept them as known function names, but they have
//! no entry in [`default_registry`]: the evaluator dispatches them
//! itself as higher-order built-ins, since they call back into the
//! user function table and share the run's iteration budget.

mod path;

use a0_value::{A0Value, Record};
use path::{parse_path, try_get_path};
use std::collections::HashMap;
use std::sync::Arc;

/// A named, pure stdlib function.
pub trait StdlibFn: Send + Sync {
    fn name(&self) -> &str;
    fn execute(&self, args: &A0Value) -> Result<A0Value, String>;
}

struct NamedFn {
    name: &'static str,
    f: fn(&A0Value) -> Result<A0Value, String>,
}

impl StdlibFn for NamedFn {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, args: &A0Value) -> Result<A0Value, String> {
        (self.f)(args)
    }
}

/// All function names the validator recognizes, including the three
/// higher-order built-ins the evaluator special-cases.
pub const ALL_NAMES: &[&str] = &[
    "parse.json",
    "get",
    "put",
    "patch",
    "eq",
    "contains",
    "not",
    "and",
    "or",
    "coalesce",
    "typeof",
    "len",
    "append",
    "concat",
    "sort",
    "filter",
    "find",
    "range",
    "join",
    "map",
    "reduce",
    "unique",
    "pluck",
    "flat",
    "str.concat",
    "str.split",
    "str.starts",
    "str.ends",
    "str.replace",
    "str.template",
    "keys",
    "values",
    "merge",
    "entries",
    "math.max",
    "math.min",
];

/// Names the evaluator dispatches itself rather than through this
/// crate's registry.
pub const HIGHER_ORDER_NAMES: &[&str] = &["map", "filter", "reduce"];

const ENTRIES: &[(&str, fn(&A0Value) -> Result<A0Value, String>)] = &[
    ("parse.json", parse_json),
    ("get", get),
    ("put", put),
    ("patch", patch),
    ("eq", eq),
    ("contains", contains),
    ("not", not),
    ("and", and),
    ("or", or),
    ("coalesce", coalesce),
    ("typeof", typeof_fn),
    ("len", len),
    ("append", append),
    ("concat", concat),
    ("sort", sort),
    ("find", find),
    ("range", range),
    ("join", join),
    ("unique", unique),
    ("pluck", pluck),
    ("flat", flat),
    ("str.concat", str_concat),
    ("str.split", str_split),
    ("str.starts", str_starts),
    ("str.ends", str_ends),
    ("str.replace", str_replace),
    ("str.template", str_template),
    ("keys", keys),
    ("values", values),
    ("merge", merge),
    ("entries", entries),
    ("math.max", math_max),
    ("math.min", math_min),
];

/// Builds a fresh registry mapping each pure stdlib name to its
/// implementation. Callers wanting to override or sandbox individual
/// functions can insert/remove entries after construction.
pub fn default_registry() -> HashMap<&'static str, Box<dyn StdlibFn>> {
    ENTRIES.iter().map(|(name, f)| (*name, Box::new(NamedFn { name, f: *f }) as Box<dyn StdlibFn>)).collect()
}

fn record_arg(args: &A0Value) -> Result<&Record, String> {
    args.as_record().ok_or_else(|| "expected a record argument".to_string())
}

fn parse_json(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let text = record.get("json").and_then(A0Value::as_str).ok_or("parse.json: `json` must be a string")?;
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| format!("parse.json: {e}"))?;
    Ok(A0Value::from_json(value))
}

fn get(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let target = record.get("in").ok_or("get: missing `in`")?;
    let path_str = record.get("path").and_then(A0Value::as_str).ok_or("get: `path` must be a string")?;
    let segments = parse_path(path_str)?;
    Ok(try_get_path(target, &segments).unwrap_or(A0Value::Null))
}

fn put(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let target = record.get("in").ok_or("put: missing `in`")?;
    let path_str = record.get("path").and_then(A0Value::as_str).ok_or("put: `path` must be a string")?;
    let value = record.get("value").cloned().ok_or("put: missing `value`")?;
    let segments = parse_path(path_str)?;
    path::set_path(target, &segments, value)
}

fn patch(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let mut current = record.get("in").cloned().ok_or("patch: missing `in`")?;
    let ops = record.get("ops").and_then(A0Value::as_list).ok_or("patch: `ops` must be a list")?;
    for op_value in ops {
        let op_record = op_value.as_record().ok_or("patch: each op must be a record")?;
        let op = op_record.get("op").and_then(A0Value::as_str).ok_or("patch: op missing `op`")?;
        let path_str = op_record.get("path").and_then(A0Value::as_str).ok_or("patch: op missing `path`")?;
        let segments = parse_path(path_str)?;
        current = match op {
            "add" => {
                let value = op_record.get("value").cloned().ok_or("patch: add requires `value`")?;
                path::insert_path(&current, &segments, value)?
            }
            "replace" => {
                try_get_path(&current, &segments)
                    .ok_or_else(|| format!("patch: replace target does not exist: {path_str}"))?;
                let value = op_record.get("value").cloned().ok_or("patch: replace requires `value`")?;
                path::set_path(&current, &segments, value)?
            }
            "remove" => path::remove_path(&current, &segments)?,
            "test" => {
                let expected = op_record.get("value").cloned().ok_or("patch: test requires `value`")?;
                let actual = try_get_path(&current, &segments)
                    .ok_or_else(|| format!("patch: test target does not exist: {path_str}"))?;
                if actual != expected {
                    return Err(format!("patch: test failed at {path_str}"));
                }
                current
            }
            "move" => {
                let from = op_record.get("from").and_then(A0Value::as_str).ok_or("patch: move requires `from`")?;
                let from_segments = parse_path(from)?;
                let value = try_get_path(&current, &from_segments)
                    .ok_or_else(|| format!("patch: move source does not exist: {from}"))?;
                let removed = path::remove_path(&current, &from_segments)?;
                path::insert_path(&removed, &segments, value)?
            }
            "copy" => {
                let from = op_record.get("from").and_then(A0Value::as_str).ok_or("patch: copy requires `from`")?;
                let from_segments = parse_path(from)?;
                let value = try_get_path(&current, &from_segments)
                    .ok_or_else(|| format!("patch: copy source does not exist: {from}"))?;
                path::insert_path(&current, &segments, value)?
            }
            other => return Err(format!("patch: unknown op `{other}`")),
        };
    }
    Ok(current)
}

fn eq(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let a = record.get("a").ok_or("eq: missing `a`")?;
    let b = record.get("b").ok_or("eq: missing `b`")?;
    Ok(A0Value::Bool(a == b))
}

fn contains(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let haystack = record.get("in").ok_or("contains: missing `in`")?;
    let needle = record.get("value").ok_or("contains: missing `value`")?;
    let result = match haystack {
        A0Value::String(s) => {
            let needle_str =
                needle.as_str().ok_or("contains: `value` must be a string when `in` is a string")?;
            s.contains(needle_str)
        }
        A0Value::List(items) => items.iter().any(|item| item == needle),
        A0Value::Record(r) => {
            let key = needle.as_str().ok_or("contains: `value` must be a string when `in` is a record")?;
            r.contains_key(key)
        }
        _ => return Err("contains: `in` must be a string, list, or record".to_string()),
    };
    Ok(A0Value::Bool(result))
}

fn not(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let value = record.get("value").ok_or("not: missing `value`")?;
    Ok(A0Value::Bool(!value.is_truthy()))
}

fn and(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let a = record.get("a").ok_or("and: missing `a`")?;
    let b = record.get("b").ok_or("and: missing `b`")?;
    Ok(A0Value::Bool(a.is_truthy() && b.is_truthy()))
}

fn or(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let a = record.get("a").ok_or("or: missing `a`")?;
    let b = record.get("b").ok_or("or: missing `b`")?;
    Ok(A0Value::Bool(a.is_truthy() || b.is_truthy()))
}

/// Fires only on strict `null` — `0`, `""`, and `false` pass through as `a`.
fn coalesce(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let a = record.get("a").ok_or("coalesce: missing `a`")?;
    let b = record.get("b").ok_or("coalesce: missing `b`")?;
    Ok(if matches!(a, A0Value::Null) { b.clone() } else { a.clone() })
}

fn typeof_fn(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let value = record.get("value").ok_or("typeof: missing `value`")?;
    Ok(A0Value::string(value.type_name()))
}

fn len(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let value = record.get("value").ok_or("len: missing `value`")?;
    let n = match value {
        A0Value::String(s) => s.chars().count(),
        A0Value::List(items) => items.len(),
        A0Value::Record(r) => r.len(),
        other => return Err(format!("len: unsupported type `{}`", other.type_name())),
    };
    Ok(A0Value::Number(n as f64))
}

fn append(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let list = record.get("list").and_then(A0Value::as_list).ok_or("append: `list` must be a list")?;
    let value = record.get("value").cloned().ok_or("append: missing `value`")?;
    let mut items = list.to_vec();
    items.push(value);
    Ok(A0Value::list(items))
}

fn concat(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let a = record.get("a").and_then(A0Value::as_list).ok_or("concat: `a` must be a list")?;
    let b = record.get("b").and_then(A0Value::as_list).ok_or("concat: `b` must be a list")?;
    let mut items = a.to_vec();
    items.extend(b.iter().cloned());
    Ok(A0Value::list(items))
}

fn sort(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let list = record.get("list").and_then(A0Value::as_list).ok_or("sort: `list` must be a list")?;
    let mut items = list.to_vec();
    if items.iter().all(|v| matches!(v, A0Value::Number(_))) {
        items.sort_by(|a, b| {
            a.as_number().unwrap_or(0.0).partial_cmp(&b.as_number().unwrap_or(0.0)).unwrap_or(std::cmp::Ordering::Equal)
        });
    } else if items.iter().all(|v| matches!(v, A0Value::String(_))) {
        items.sort_by(|a, b| a.as_str().unwrap_or("").cmp(b.as_str().unwrap_or("")));
    } else {
        return Err("sort: list elements must be all numbers or all strings".to_string());
    }
    Ok(A0Value::list(items))
}

fn find(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let list = record.get("list").and_then(A0Value::as_list).ok_or("find: `list` must be a list")?;
    let value = record.get("value").ok_or("find: missing `value`")?;
    Ok(list.iter().find(|item| *item == value).cloned().unwrap_or(A0Value::Null))
}

fn range(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let start = record.get("start").and_then(A0Value::as_number).ok_or("range: `start` must be a number")? as i64;
    let end = record.get("end").and_then(A0Value::as_number).ok_or("range: `end` must be a number")? as i64;
    let step = record.get("step").and_then(A0Value::as_number).map(|n| n as i64).unwrap_or(1);
    if step == 0 {
        return Err("range: `step` must not be zero".to_string());
    }
    let mut items = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < end {
            items.push(A0Value::Number(i as f64));
            i += step;
        }
    } else {
        while i > end {
            items.push(A0Value::Number(i as f64));
            i += step;
        }
    }
    Ok(A0Value::list(items))
}

fn join(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let list = record.get("list").and_then(A0Value::as_list).ok_or("join: `list` must be a list")?;
    let sep = record.get("sep").and_then(A0Value::as_str).unwrap_or("");
    let mut parts = Vec::with_capacity(list.len());
    for item in list {
        let s = item.as_str().ok_or("join: every element of `list` must be a string")?;
        parts.push(s.to_string());
    }
    Ok(A0Value::string(parts.join(sep)))
}

fn unique(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let list = record.get("list").and_then(A0Value::as_list).ok_or("unique: `list` must be a list")?;
    let mut out: Vec<A0Value> = Vec::new();
    for item in list {
        if !out.iter().any(|seen| seen == item) {
            out.push(item.clone());
        }
    }
    Ok(A0Value::list(out))
}

fn pluck(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let list = record.get("list").and_then(A0Value::as_list).ok_or("pluck: `list` must be a list")?;
    let key = record.get("key").and_then(A0Value::as_str).ok_or("pluck: `key` must be a string")?;
    let mut out = Vec::with_capacity(list.len());
    for (i, item) in list.iter().enumerate() {
        let r = item.as_record().ok_or_else(|| format!("pluck: element {i} is not a record"))?;
        out.push(r.get(key).cloned().unwrap_or(A0Value::Null));
    }
    Ok(A0Value::list(out))
}

fn flat(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let list = record.get("list").and_then(A0Value::as_list).ok_or("flat: `list` must be a list")?;
    let mut out = Vec::new();
    for item in list {
        match item.as_list() {
            Some(inner) => out.extend(inner.iter().cloned()),
            None => out.push(item.clone()),
        }
    }
    Ok(A0Value::list(out))
}

fn str_concat(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let a = record.get("a").and_then(A0Value::as_str).ok_or("str.concat: `a` must be a string")?;
    let b = record.get("b").and_then(A0Value::as_str).ok_or("str.concat: `b` must be a string")?;
    Ok(A0Value::string(format!("{a}{b}")))
}

fn str_split(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let value = record.get("value").and_then(A0Value::as_str).ok_or("str.split: `value` must be a string")?;
    let sep = record.get("sep").and_then(A0Value::as_str).ok_or("str.split: `sep` must be a string")?;
    if sep.is_empty() {
        return Err("str.split: `sep` must not be empty".to_string());
    }
    Ok(A0Value::list(value.split(sep).map(A0Value::string).collect::<Vec<_>>()))
}

fn str_starts(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let value = record.get("value").and_then(A0Value::as_str).ok_or("str.starts: `value` must be a string")?;
    let prefix = record.get("prefix").and_then(A0Value::as_str).ok_or("str.starts: `prefix` must be a string")?;
    Ok(A0Value::Bool(value.starts_with(prefix)))
}

fn str_ends(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let value = record.get("value").and_then(A0Value::as_str).ok_or("str.ends: `value` must be a string")?;
    let suffix = record.get("suffix").and_then(A0Value::as_str).ok_or("str.ends: `suffix` must be a string")?;
    Ok(A0Value::Bool(value.ends_with(suffix)))
}

fn str_replace(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let value = record.get("value").and_then(A0Value::as_str).ok_or("str.replace: `value` must be a string")?;
    let from = record.get("from").and_then(A0Value::as_str).ok_or("str.replace: `from` must be a string")?;
    let to = record.get("to").and_then(A0Value::as_str).ok_or("str.replace: `to` must be a string")?;
    Ok(A0Value::string(value.replace(from, to)))
}

/// Substitutes `{key}` placeholders from `vars`; a placeholder with no
/// matching key passes through unchanged, braces included.
fn str_template(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let template =
        record.get("template").and_then(A0Value::as_str).ok_or("str.template: `template` must be a string")?;
    let vars = record.get("vars").and_then(A0Value::as_record).ok_or("str.template: `vars` must be a record")?;
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut key = String::new();
        let mut closed = false;
        for d in chars.by_ref() {
            if d == '}' {
                closed = true;
                break;
            }
            key.push(d);
        }
        if !closed {
            out.push('{');
            out.push_str(&key);
            continue;
        }
        match vars.get(&key) {
            Some(v) => out.push_str(&v.to_string()),
            None => {
                out.push('{');
                out.push_str(&key);
                out.push('}');
            }
        }
    }
    Ok(A0Value::string(out))
}

fn keys(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let target = record.get("value").and_then(A0Value::as_record).ok_or("keys: `value` must be a record")?;
    Ok(A0Value::list(target.keys().map(|k| A0Value::string(k.clone())).collect::<Vec<_>>()))
}

fn values(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let target = record.get("value").and_then(A0Value::as_record).ok_or("values: `value` must be a record")?;
    Ok(A0Value::list(target.iter().map(|(_, v)| v.clone()).collect::<Vec<_>>()))
}

/// Shallow merge; keys in `b` override same-named keys in `a`.
fn merge(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let a = record.get("a").and_then(A0Value::as_record).ok_or("merge: `a` must be a record")?;
    let b = record.get("b").and_then(A0Value::as_record).ok_or("merge: `b` must be a record")?;
    let mut out = a.clone();
    for (k, v) in b.iter() {
        out.insert(k.clone(), v.clone());
    }
    Ok(A0Value::record(out))
}

fn entries(args: &A0Value) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let target = record.get("value").and_then(A0Value::as_record).ok_or("entries: `value` must be a record")?;
    let list = target
        .iter()
        .map(|(k, v)| {
            let mut entry = Record::new();
            entry.insert(Arc::clone(k), v.clone());
            A0Value::record(entry)
        })
        .collect::<Vec<_>>();
    Ok(A0Value::list(list))
}

fn math_max(args: &A0Value) -> Result<A0Value, String> {
    math_extreme(args, "math.max", true)
}

fn math_min(args: &A0Value) -> Result<A0Value, String> {
    math_extreme(args, "math.min", false)
}

fn math_extreme(args: &A0Value, label: &str, want_max: bool) -> Result<A0Value, String> {
    let record = record_arg(args)?;
    let numbers: Vec<f64> = if let Some(values) = record.get("values").and_then(A0Value::as_list) {
        values
            .iter()
            .map(|v| v.as_number().ok_or_else(|| format!("{label}: `values` elements must be numbers")))
            .collect::<Result<_, _>>()?
    } else {
        let a = record.get("a").and_then(A0Value::as_number).ok_or_else(|| format!("{label}: `a` must be a number"))?;
        let b = record.get("b").and_then(A0Value::as_number).ok_or_else(|| format!("{label}: `b` must be a number"))?;
        vec![a, b]
    };
    if numbers.is_empty() {
        return Err(format!("{label}: no numbers given"));
    }
    let seed = if want_max { f64::NEG_INFINITY } else { f64::INFINITY };
    let result = numbers.into_iter().fold(seed, |acc, n| if want_max { acc.max(n) } else { acc.min(n) });
    Ok(A0Value::Number(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: A0Value) -> Result<A0Value, String> {
        default_registry().get(name).expect("function registered").execute(&args)
    }

    fn rec(pairs: Vec<(&str, A0Value)>) -> A0Value {
        let mut r = Record::new();
        for (k, v) in pairs {
            r.insert(k, v);
        }
        A0Value::record(r)
    }

    #[test]
    fn all_names_other_than_higher_order_are_registered() {
        let registry = default_registry();
        for name in ALL_NAMES {
            if HIGHER_ORDER_NAMES.contains(name) {
                assert!(!registry.contains_key(name), "{name} should not be in the pure registry");
            } else {
                assert!(registry.contains_key(name), "{name} missing from registry");
            }
        }
    }

    #[test]
    fn parse_json_decodes_into_a0value() {
        let result = call("parse.json", rec(vec![("json", A0Value::string(r#"{"a":1}"#))])).unwrap();
        assert_eq!(result.as_record().unwrap().get("a"), Some(&A0Value::Number(1.0)));
    }

    #[test]
    fn get_supports_dotted_and_bracketed_paths() {
        let inner = rec(vec![("b", A0Value::list(vec![A0Value::Number(10.0), A0Value::Number(20.0)]))]);
        let target = rec(vec![("a", inner)]);
        let args = rec(vec![("in", target), ("path", A0Value::string("a.b[1]"))]);
        assert_eq!(call("get", args).unwrap(), A0Value::Number(20.0));
    }

    #[test]
    fn get_missing_path_yields_null() {
        let args = rec(vec![("in", rec(vec![])), ("path", A0Value::string("missing.key"))]);
        assert_eq!(call("get", args).unwrap(), A0Value::Null);
    }

    #[test]
    fn put_sets_nested_path_creating_intermediates() {
        let args = rec(vec![("in", rec(vec![])), ("path", A0Value::string("a.b")), ("value", A0Value::Number(1.0))]);
        let result = call("put", args).unwrap();
        assert_eq!(
            result.as_record().unwrap().get("a").unwrap().as_record().unwrap().get("b"),
            Some(&A0Value::Number(1.0))
        );
    }

    #[test]
    fn patch_add_replace_remove_sequence() {
        let ops = A0Value::list(vec![
            rec(vec![("op", A0Value::string("add")), ("path", A0Value::string("x")), ("value", A0Value::Number(1.0))]),
            rec(vec![("op", A0Value::string("replace")), ("path", A0Value::string("x")), ("value", A0Value::Number(2.0))]),
            rec(vec![("op", A0Value::string("test")), ("path", A0Value::string("x")), ("value", A0Value::Number(2.0))]),
        ]);
        let args = rec(vec![("in", rec(vec![])), ("ops", ops)]);
        let result = call("patch", args).unwrap();
        assert_eq!(result.as_record().unwrap().get("x"), Some(&A0Value::Number(2.0)));
    }

    #[test]
    fn patch_test_failure_is_an_error() {
        let ops = A0Value::list(vec![rec(vec![
            ("op", A0Value::string("test")),
            ("path", A0Value::string("x")),
            ("value", A0Value::Number(2.0)),
        ])]);
        let args = rec(vec![("in", rec(vec![("x", A0Value::Number(1.0))])), ("ops", ops)]);
        assert!(call("patch", args).is_err());
    }

    #[test]
    fn patch_move_relocates_value() {
        let ops = A0Value::list(vec![rec(vec![
            ("op", A0Value::string("move")),
            ("from", A0Value::string("a")),
            ("path", A0Value::string("b")),
        ])]);
        let args = rec(vec![("in", rec(vec![("a", A0Value::Number(7.0))])), ("ops", ops)]);
        let result = call("patch", args).unwrap();
        let out = result.as_record().unwrap();
        assert_eq!(out.get("b"), Some(&A0Value::Number(7.0)));
        assert_eq!(out.get("a"), None);
    }

    #[test]
    fn eq_treats_nan_as_equal_to_nan() {
        let args = rec(vec![("a", A0Value::Number(f64::NAN)), ("b", A0Value::Number(f64::NAN))]);
        assert_eq!(call("eq", args).unwrap(), A0Value::Bool(true));
    }

    #[test]
    fn contains_dispatches_by_container_kind() {
        assert_eq!(
            call("contains", rec(vec![("in", A0Value::string("hello")), ("value", A0Value::string("ell"))])).unwrap(),
            A0Value::Bool(true)
        );
        assert_eq!(
            call(
                "contains",
                rec(vec![("in", A0Value::list(vec![A0Value::Number(1.0)])), ("value", A0Value::Number(1.0))])
            )
            .unwrap(),
            A0Value::Bool(true)
        );
        assert_eq!(
            call(
                "contains",
                rec(vec![("in", rec(vec![("k", A0Value::Null)])), ("value", A0Value::string("k"))])
            )
            .unwrap(),
            A0Value::Bool(true)
        );
    }

    #[test]
    fn coalesce_fires_only_on_strict_null() {
        assert_eq!(
            call("coalesce", rec(vec![("a", A0Value::Number(0.0)), ("b", A0Value::Number(9.0))])).unwrap(),
            A0Value::Number(0.0)
        );
        assert_eq!(
            call("coalesce", rec(vec![("a", A0Value::Null), ("b", A0Value::Number(9.0))])).unwrap(),
            A0Value::Number(9.0)
        );
    }

    #[test]
    fn str_template_passes_through_unmatched_placeholders() {
        let args = rec(vec![
            ("template", A0Value::string("hi {name}, {unknown}")),
            ("vars", rec(vec![("name", A0Value::string("a0"))])),
        ]);
        assert_eq!(call("str.template", args).unwrap(), A0Value::string("hi a0, {unknown}"));
    }

    #[test]
    fn sort_rejects_mixed_types() {
        let args = rec(vec![("list", A0Value::list(vec![A0Value::Number(1.0), A0Value::string("a")]))]);
        assert!(call("sort", args).is_err());
    }

    #[test]
    fn merge_lets_b_override_a() {
        let a = rec(vec![("x", A0Value::Number(1.0)), ("y", A0Value::Number(2.0))]);
        let b = rec(vec![("y", A0Value::Number(3.0))]);
        let result = call("merge", rec(vec![("a", a), ("b", b)])).unwrap();
        let out = result.as_record().unwrap();
        assert_eq!(out.get("x"), Some(&A0Value::Number(1.0)));
        assert_eq!(out.get("y"), Some(&A0Value::Number(3.0)));
    }

    #[test]
    fn math_max_accepts_either_pair_or_values_list() {
        assert_eq!(
            call("math.max", rec(vec![("a", A0Value::Number(1.0)), ("b", A0Value::Number(5.0))])).unwrap(),
            A0Value::Number(5.0)
        );
        let values = A0Value::list(vec![A0Value::Number(3.0), A0Value::Number(9.0), A0Value::Number(1.0)]);
        assert_eq!(call("math.max", rec(vec![("values", values)])).unwrap(), A0Value::Number(9.0));
    }

    proptest::proptest! {
        #[test]
        fn unique_never_contains_duplicates(nums in proptest::collection::vec(0i64..10, 0..20)) {
            let list = A0Value::list(nums.iter().map(|n| A0Value::Number(*n as f64)).collect::<Vec<_>>());
            let result = call("unique", rec(vec![("list", list)])).unwrap();
            let items = result.as_list().unwrap();
            for i in 0..items.len() {
                for j in (i + 1)..items.len() {
                    prop_assert_ne!(&items[i], &items[j]);
                }
            }
        }
    }
}
