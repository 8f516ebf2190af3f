use crate::A0Value;
use std::sync::Arc;

/// An insertion-ordered string-keyed map.
///
/// A0 records in practice are small (tool arguments, stdlib inputs,
/// `{key}` templates), so this is a linear-scan `Vec` rather than a
/// hash map: insertion order is preserved for formatting without a
/// separate index, and lookup cost is negligible at expected sizes.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Record {
    entries: Vec<(Arc<str>, A0Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&A0Value> {
        self.entries.iter().find(|(k, _)| k.as_ref() == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.as_ref() == key)
    }

    /// Inserts `key`, overwriting any existing value and preserving the
    /// position of the first insertion.
    pub fn insert(&mut self, key: impl Into<Arc<str>>, value: A0Value) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &A0Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl FromIterator<(Arc<str>, A0Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (Arc<str>, A0Value)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}
