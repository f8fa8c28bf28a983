use serde_json::{Map, Value};

use super::{FieldRef, FieldValue, Link, RecordStore};
use crate::{
    identity::RecordId,
    selection::{FieldShape, ObjectSelection, SelectionSet},
    subscriptions::DependencySet,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub data: Value,
    /// Every record field the read looked at, whether it found a value or not.
    pub dependencies: DependencySet,
    pub has_missing: bool,
    /// At least one of the fields read was marked stale.
    pub stale: bool,
}

pub(super) struct Reader<'a> {
    store: &'a RecordStore,
    variables: &'a Value,
    partial: bool,
    dependencies: DependencySet,
    has_missing: bool,
    stale: bool,
}

impl<'a> Reader<'a> {
    pub fn new(store: &'a RecordStore, variables: &'a Value, partial: bool) -> Self {
        Reader {
            store,
            variables,
            partial,
            dependencies: DependencySet::new(),
            has_missing: false,
            stale: false,
        }
    }

    pub fn read(mut self, selection: &SelectionSet, root: &RecordId) -> ReadOutcome {
        let data = Value::Object(self.object(root, selection));

        ReadOutcome {
            data,
            dependencies: self.dependencies,
            has_missing: self.has_missing,
            stale: self.stale,
        }
    }

    fn object(&mut self, id: &RecordId, selection: &SelectionSet) -> Map<String, Value> {
        let record = self.store.get(id);
        if let Some(record) = record {
            record.touch(self.store.generation);
        }

        let mut data = Map::with_capacity(selection.len());

        for (alias, field) in selection {
            let key = field.key(self.variables);
            self.dependencies.insert(FieldRef::new(id.clone(), key.as_ref()));

            let value = record.and_then(|record| {
                if record.is_stale(&key) {
                    self.stale = true;
                }
                record.get(&key)
            });

            let value = match (value, &field.shape) {
                (Some(FieldValue::Scalar(value)), _) => Some(value.clone()),
                (Some(FieldValue::Link(link)), FieldShape::Object(selection)) => self.link(link, selection),
                // A link read through a leaf selection means the record is not what this selection
                // expects.
                (Some(FieldValue::Link(_)), _) | (None, _) => {
                    self.has_missing = true;
                    self.missing()
                }
            };

            if let Some(value) = value {
                data.insert(alias.clone(), value);
            }
        }

        data
    }

    fn link(&mut self, link: &Link, selection: &ObjectSelection) -> Option<Value> {
        match link {
            Link::Null => Some(Value::Null),
            Link::List(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| self.link(item, selection).unwrap_or(Value::Null))
                    .collect(),
            )),
            Link::Record(id) => {
                let exists = self.store.contains(id);
                // The fields are walked anyway, so that rewriting the record notifies this read.
                let object = self.object(id, &selection.fields);
                if exists {
                    Some(Value::Object(object))
                } else {
                    self.has_missing = true;
                    self.missing()
                }
            }
        }
    }

    /// What to put in place of missing data: `null`, or nothing at all for partial reads.
    fn missing(&self) -> Option<Value> {
        (!self.partial).then_some(Value::Null)
    }
}
