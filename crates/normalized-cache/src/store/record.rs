use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
};

use serde_json::Value;

use crate::{error::ValueShape, identity::RecordId};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Leaves, including lists of leaves.
    Scalar(Value),
    Link(Link),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Link {
    Null,
    Record(RecordId),
    List(Vec<Link>),
}

impl FieldValue {
    /// `None` for nulls, which fit any shape.
    pub(crate) fn shape(&self) -> Option<ValueShape> {
        match self {
            FieldValue::Scalar(Value::Null) | FieldValue::Link(Link::Null) => None,
            FieldValue::Scalar(_) => Some(ValueShape::Scalar),
            FieldValue::Link(Link::Record(_)) => Some(ValueShape::Reference),
            FieldValue::Link(Link::List(_)) => Some(ValueShape::ReferenceList),
        }
    }
}

impl Link {
    pub fn references(&self, id: &RecordId) -> bool {
        match self {
            Link::Null => false,
            Link::Record(record) => record == id,
            Link::List(items) => items.iter().any(|item| item.references(id)),
        }
    }
}

#[derive(Debug)]
pub struct Record {
    type_name: String,
    pub(super) fields: HashMap<String, FieldValue>,
    pub(super) stale: HashSet<String>,
    // Reads only hold a shared reference to the store.
    last_touched: AtomicU64,
}

impl Record {
    pub(super) fn new(type_name: String, generation: u64) -> Self {
        Record {
            type_name,
            fields: HashMap::new(),
            stale: HashSet::new(),
            last_touched: AtomicU64::new(generation),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> + '_ {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_stale(&self, key: &str) -> bool {
        self.stale.contains(key)
    }

    pub fn last_touched(&self) -> u64 {
        self.last_touched.load(Ordering::Relaxed)
    }

    pub(super) fn touch(&self, generation: u64) {
        self.last_touched.fetch_max(generation, Ordering::Relaxed);
    }

    pub(super) fn mark_stale(&mut self, field: Option<&str>) {
        let keys = self
            .fields
            .keys()
            .filter(|key| field.is_none_or(|field| field_name(key) == field))
            .cloned()
            .collect::<Vec<_>>();
        self.stale.extend(keys);
    }
}

/// `friends(first: 10)` -> `friends`
pub(crate) fn field_name(key: &str) -> &str {
    key.split_once('(').map(|(name, _)| name).unwrap_or(key).trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names() {
        assert_eq!(field_name("friends(first: 10)"), "friends");
        assert_eq!(field_name("friends (first: 10)"), "friends");
        assert_eq!(field_name("name"), "name");
    }

    #[test]
    fn null_fits_every_shape() {
        assert_eq!(FieldValue::Scalar(Value::Null).shape(), None);
        assert_eq!(FieldValue::Link(Link::Null).shape(), None);
        assert_eq!(
            FieldValue::Link(Link::List(vec![])).shape(),
            Some(ValueShape::ReferenceList)
        );
    }
}
