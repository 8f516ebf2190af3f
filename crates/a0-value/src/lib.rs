//! The A0 runtime value: a tagged union of `null`, `bool`, `number`,
//! `string`, `list`, and `record`, shared by the validator, evaluator,
//! stdlib, and tool boundary.
//!
//! `number` is a single IEEE-754 `f64` — the lexer distinguishes
//! integer and float literal *forms* for ergonomics, but both produce
//! this one runtime type. `string`/`list`/`record` back their storage
//! with `Arc`, so cloning a value already owned by an environment frame
//! or a composite value is a pointer copy, never a deep copy: the
//! evaluator constructs new values rather than mutating existing ones,
//! and this makes that discipline cheap.

mod record;

pub use record::Record;

use std::fmt;
use std::sync::Arc;

/// The universal runtime value of an A0 program.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum A0Value {
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    List(Arc<[A0Value]>),
    Record(Arc<Record>),
}

impl A0Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        A0Value::String(s.into())
    }

    pub fn list(items: impl Into<Vec<A0Value>>) -> Self {
        A0Value::List(Arc::from(items.into()))
    }

    pub fn record(record: Record) -> Self {
        A0Value::Record(Arc::new(record))
    }

    /// `false | null | 0 | ""` are falsy; everything else — including
    /// `NaN` and empty list/record — is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            A0Value::Null => false,
            A0Value::Bool(b) => *b,
            A0Value::Number(n) => *n != 0.0,
            A0Value::String(s) => !s.is_empty(),
            A0Value::List(_) | A0Value::Record(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            A0Value::Null => "null",
            A0Value::Bool(_) => "bool",
            A0Value::Number(_) => "number",
            A0Value::String(_) => "string",
            A0Value::List(_) => "list",
            A0Value::Record(_) => "record",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            A0Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            A0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            A0Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[A0Value]> {
        match self {
            A0Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            A0Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Converts a `serde_json::Value` into an `A0Value`, used by
    /// `parse.json` and at the tool-call boundary.
    pub fn from_json(value: serde_json::Value) -> A0Value {
        match value {
            serde_json::Value::Null => A0Value::Null,
            serde_json::Value::Bool(b) => A0Value::Bool(b),
            serde_json::Value::Number(n) => A0Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => A0Value::String(Arc::from(s)),
            serde_json::Value::Array(items) => {
                A0Value::List(Arc::from(items.into_iter().map(A0Value::from_json).collect::<Vec<_>>()))
            }
            serde_json::Value::Object(map) => {
                let record: Record = map
                    .into_iter()
                    .map(|(k, v)| (Arc::from(k), A0Value::from_json(v)))
                    .collect();
                A0Value::record(record)
            }
        }
    }

    /// Converts an `A0Value` into a `serde_json::Value`, used to render
    /// tool arguments and evidence payloads.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            A0Value::Null => serde_json::Value::Null,
            A0Value::Bool(b) => serde_json::Value::Bool(*b),
            A0Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            A0Value::String(s) => serde_json::Value::String(s.to_string()),
            A0Value::List(items) => {
                serde_json::Value::Array(items.iter().map(A0Value::to_json).collect())
            }
            A0Value::Record(r) => serde_json::Value::Object(
                r.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect(),
            ),
        }
    }
}

/// Deep structural equality. `NaN == NaN` here (unlike IEEE-754
/// comparison operators), matching the stdlib `eq` function's contract
/// rather than `<`/`>`/arithmetic comparison semantics.
impl PartialEq for A0Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (A0Value::Null, A0Value::Null) => true,
            (A0Value::Bool(a), A0Value::Bool(b)) => a == b,
            (A0Value::Number(a), A0Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (A0Value::String(a), A0Value::String(b)) => a == b,
            (A0Value::List(a), A0Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (A0Value::Record(a), A0Value::Record(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|bv| bv == v))
            }
            _ => false,
        }
    }
}

impl fmt::Display for A0Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            A0Value::Null => write!(f, "null"),
            A0Value::Bool(b) => write!(f, "{b}"),
            A0Value::Number(n) => write!(f, "{n}"),
            A0Value::String(s) => write!(f, "{s}"),
            A0Value::List(_) | A0Value::Record(_) => write!(f, "{}", self.to_json()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn falsy_values() {
        assert!(!A0Value::Null.is_truthy());
        assert!(!A0Value::Bool(false).is_truthy());
        assert!(!A0Value::Number(0.0).is_truthy());
        assert!(!A0Value::string("").is_truthy());
    }

    #[test]
    fn truthy_edge_cases() {
        assert!(A0Value::Number(f64::NAN).is_truthy());
        assert!(A0Value::list(Vec::new()).is_truthy());
        assert!(A0Value::record(Record::new()).is_truthy());
        assert!(A0Value::Bool(true).is_truthy());
        assert!(A0Value::string("0").is_truthy());
    }

    #[test]
    fn record_insertion_order_is_preserved() {
        let mut r = Record::new();
        r.insert("b", A0Value::Number(2.0));
        r.insert("a", A0Value::Number(1.0));
        let keys: Vec<_> = r.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn record_equality_is_order_independent() {
        let mut a = Record::new();
        a.insert("x", A0Value::Number(1.0));
        a.insert("y", A0Value::Number(2.0));
        let mut b = Record::new();
        b.insert("y", A0Value::Number(2.0));
        b.insert("x", A0Value::Number(1.0));
        assert_eq!(A0Value::record(a), A0Value::record(b));
    }

    #[test]
    fn json_round_trip_preserves_structure() {
        let json = serde_json::json!({"a": 1, "b": [true, null, "x"]});
        let value = A0Value::from_json(json.clone());
        assert_eq!(value.to_json(), json);
    }

    fn arb_value() -> impl Strategy<Value = A0Value> {
        let leaf = prop_oneof![
            Just(A0Value::Null),
            any::<bool>().prop_map(A0Value::Bool),
            any::<f64>().prop_filter("finite", |n| n.is_finite()).prop_map(A0Value::Number),
            "[a-z]{0,8}".prop_map(A0Value::string),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(A0Value::list),
                proptest::collection::vec(("[a-z]{1,4}", inner), 0..4).prop_map(|pairs| {
                    let record: Record =
                        pairs.into_iter().map(|(k, v)| (Arc::from(k), v)).collect();
                    A0Value::record(record)
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn deep_equality_is_reflexive(v in arb_value()) {
            prop_assert_eq!(v.clone(), v);
        }

        #[test]
        fn deep_equality_is_symmetric(a in arb_value(), b in arb_value()) {
            prop_assert_eq!(a == b, b == a);
        }
    }
}
