//! Dotted/bracketed path navigation shared by `get`, `put`, and `patch`
//! (e.g. `a.b[0].c`).

use a0_value::{A0Value, Record};
use std::sync::Arc;

pub(crate) enum PathSeg {
    Key(Arc<str>),
    Index(usize),
}

pub(crate) fn parse_path(path: &str) -> Result<Vec<PathSeg>, String> {
    let mut segs = Vec::new();
    let mut buf = String::new();
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !buf.is_empty() {
                    segs.push(PathSeg::Key(Arc::from(buf.as_str())));
                    buf.clear();
                }
            }
            '[' => {
                if !buf.is_empty() {
                    segs.push(PathSeg::Key(Arc::from(buf.as_str())));
                    buf.clear();
                }
                let mut digits = String::new();
                let mut closed = false;
                for d in chars.by_ref() {
                    if d == ']' {
                        closed = true;
                        break;
                    }
                    digits.push(d);
                }
                if !closed {
                    return Err(format!("unterminated index in path: {path}"));
                }
                let idx: usize =
                    digits.parse().map_err(|_| format!("invalid index `{digits}` in path: {path}"))?;
                segs.push(PathSeg::Index(idx));
            }
            other => buf.push(other),
        }
    }
    if !buf.is_empty() {
        segs.push(PathSeg::Key(Arc::from(buf.as_str())));
    }
    if segs.is_empty() {
        return Err("empty path".to_string());
    }
    Ok(segs)
}

pub(crate) fn try_get_path(value: &A0Value, segments: &[PathSeg]) -> Option<A0Value> {
    let mut current = value.clone();
    for seg in segments {
        current = match (&current, seg) {
            (A0Value::Record(r), PathSeg::Key(k)) => r.get(k)?.clone(),
            (A0Value::List(items), PathSeg::Index(i)) => items.get(*i)?.clone(),
            _ => return None,
        };
    }
    Some(current)
}

/// Sets the value at `segments`, overwriting an existing list index or
/// padding with `null` up to it, auto-vivifying missing records along
/// the way. Used by `put` and `patch`'s `replace` op.
pub(crate) fn set_path(value: &A0Value, segments: &[PathSeg], new_value: A0Value) -> Result<A0Value, String> {
    match segments.split_first() {
        None => Ok(new_value),
        Some((PathSeg::Key(k), rest)) => {
            let mut record = value.as_record().cloned().unwrap_or_default();
            let child = record.get(k).cloned().unwrap_or(A0Value::Null);
            let updated = set_path(&child, rest, new_value)?;
            record.insert(Arc::clone(k), updated);
            Ok(A0Value::record(record))
        }
        Some((PathSeg::Index(i), rest)) => {
            let mut items: Vec<A0Value> = value.as_list().map(<[A0Value]>::to_vec).unwrap_or_default();
            while items.len() <= *i {
                items.push(A0Value::Null);
            }
            let updated = set_path(&items[*i], rest, new_value)?;
            items[*i] = updated;
            Ok(A0Value::list(items))
        }
    }
}

/// Inserts the value at `segments`: a list index shifts later elements
/// right (erroring past the end of the list), a record key is set.
/// Matches RFC 6902 `add` semantics; used by `patch`'s `add`, `move`,
/// and `copy` ops.
pub(crate) fn insert_path(value: &A0Value, segments: &[PathSeg], new_value: A0Value) -> Result<A0Value, String> {
    match segments.split_first() {
        None => Ok(new_value),
        Some((PathSeg::Key(k), rest)) if rest.is_empty() => {
            let mut record = value.as_record().cloned().unwrap_or_default();
            record.insert(Arc::clone(k), new_value);
            Ok(A0Value::record(record))
        }
        Some((PathSeg::Index(i), rest)) if rest.is_empty() => {
            let mut items: Vec<A0Value> = value.as_list().map(<[A0Value]>::to_vec).unwrap_or_default();
            if *i > items.len() {
                return Err("add: index out of range".to_string());
            }
            items.insert(*i, new_value);
            Ok(A0Value::list(items))
        }
        Some((PathSeg::Key(k), rest)) => {
            let mut record = value.as_record().cloned().unwrap_or_default();
            let child = record.get(k).cloned().unwrap_or(A0Value::Null);
            let updated = insert_path(&child, rest, new_value)?;
            record.insert(Arc::clone(k), updated);
            Ok(A0Value::record(record))
        }
        Some((PathSeg::Index(i), rest)) => {
            let mut items: Vec<A0Value> = value.as_list().map(<[A0Value]>::to_vec).unwrap_or_default();
            while items.len() <= *i {
                items.push(A0Value::Null);
            }
            let updated = insert_path(&items[*i], rest, new_value)?;
            items[*i] = updated;
            Ok(A0Value::list(items))
        }
    }
}

/// Removes the value at `segments`, erroring if any segment along the
/// way does not exist.
pub(crate) fn remove_path(value: &A0Value, segments: &[PathSeg]) -> Result<A0Value, String> {
    match segments.split_first() {
        None => Err("cannot remove the root value".to_string()),
        Some((PathSeg::Key(k), rest)) if rest.is_empty() => {
            let record = value.as_record().ok_or("remove: not a record")?;
            if !record.contains_key(k) {
                return Err(format!("remove: key not found: {k}"));
            }
            let new: Record = record.iter().filter(|(rk, _)| rk.as_ref() != k.as_ref()).map(|(k, v)| (Arc::clone(k), v.clone())).collect();
            Ok(A0Value::record(new))
        }
        Some((PathSeg::Index(i), rest)) if rest.is_empty() => {
            let items = value.as_list().ok_or("remove: not a list")?;
            if *i >= items.len() {
                return Err("remove: index out of range".to_string());
            }
            let mut new = items.to_vec();
            new.remove(*i);
            Ok(A0Value::list(new))
        }
        Some((PathSeg::Key(k), rest)) => {
            let record = value.as_record().ok_or("remove: not a record")?;
            let child = record.get(k).ok_or_else(|| format!("remove: key not found: {k}"))?;
            let updated = remove_path(child, rest)?;
            let mut new = record.clone();
            new.insert(Arc::clone(k), updated);
            Ok(A0Value::record(new))
        }
        Some((PathSeg::Index(i), rest)) => {
            let items = value.as_list().ok_or("remove: not a list")?;
            let child = items.get(*i).ok_or("remove: index out of range")?;
            let updated = remove_path(child, rest)?;
            let mut new = items.to_vec();
            new[*i] = updated;
            Ok(A0Value::list(new))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_path_handles_dotted_and_bracketed_segments() {
        let segs = parse_path("a.b[2].c").unwrap();
        assert_eq!(segs.len(), 4);
    }

    #[test]
    fn parse_path_rejects_unterminated_bracket() {
        assert!(parse_path("a[1").is_err());
    }

    #[test]
    fn insert_path_shifts_list_elements() {
        let list = A0Value::list(vec![A0Value::Number(1.0), A0Value::Number(3.0)]);
        let segs = parse_path("[1]").unwrap();
        let result = insert_path(&list, &segs, A0Value::Number(2.0)).unwrap();
        assert_eq!(
            result.as_list().unwrap(),
            &[A0Value::Number(1.0), A0Value::Number(2.0), A0Value::Number(3.0)]
        );
    }
}
