//! The normalized records.
//!
//! Every object of a response becomes a [`Record`]: a flat map from field key to either a scalar
//! or a [`Link`] to other records. Records reference each other by [`RecordId`] only, so cycles
//! (a user being the friend of their friend) need no special care.

mod lists;
mod read;
mod record;
mod write;

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
};

use serde_json::Value;

pub use self::{
    lists::ListPosition,
    read::ReadOutcome,
    record::{FieldValue, Link, Record},
};
use self::{lists::ListLocation, record::field_name};
use crate::{
    error::CacheResult,
    identity::{IdentityResolver, RecordId},
    selection::SelectionSet,
};

/// Type name of the root record.
pub const ROOT_TYPE: &str = "Query";

/// One field of one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    pub record: RecordId,
    pub key: String,
}

impl FieldRef {
    pub fn new(record: impl Into<RecordId>, key: impl Into<String>) -> Self {
        FieldRef {
            record: record.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.record, self.key)
    }
}

/// The record fields whose value actually changed during a write.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Touched(HashSet<FieldRef>);

impl Touched {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: &FieldRef) -> bool {
        self.0.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRef> {
        self.0.iter()
    }

    pub fn records(&self) -> BTreeSet<&RecordId> {
        self.0.iter().map(|field| &field.record).collect()
    }

    pub(crate) fn insert(&mut self, field: FieldRef) {
        self.0.insert(field);
    }

    pub(crate) fn extend(&mut self, other: Touched) {
        self.0.extend(other.0);
    }
}

impl FromIterator<FieldRef> for Touched {
    fn from_iter<T: IntoIterator<Item = FieldRef>>(iter: T) -> Self {
        Touched(iter.into_iter().collect())
    }
}

#[derive(Debug, Default)]
pub struct RecordStore {
    identity: IdentityResolver,
    records: HashMap<RecordId, Record>,
    lists: HashMap<String, Vec<ListLocation>>,
    generation: u64,
}

impl RecordStore {
    pub fn new(identity: IdentityResolver) -> Self {
        RecordStore {
            identity,
            ..Default::default()
        }
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    /// Writes `data`, an object described by `selection`, into the record `root`.
    ///
    /// Either every field is written or, on a shape conflict, none is.
    pub fn write(
        &mut self,
        selection: &SelectionSet,
        data: &Value,
        root: &RecordId,
        variables: &Value,
    ) -> CacheResult<Touched> {
        let Value::Object(object) = data else {
            return Ok(Touched::default());
        };

        let type_name = self.type_of(root);
        let mut planner = write::Planner::new(&self.identity, variables);
        planner.object(root, &type_name, selection, object)?;
        let plan = planner.finish();

        self.apply(plan)
    }

    /// Reconstructs the data described by `selection` starting from the record `root`.
    pub fn read(&self, selection: &SelectionSet, root: &RecordId, variables: &Value, partial: bool) -> ReadOutcome {
        read::Reader::new(self, variables, partial).read(selection, root)
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &Record)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes the record. Lists it held are forgotten too.
    pub fn delete(&mut self, id: &RecordId) -> Option<Record> {
        let record = self.records.remove(id)?;

        self.lists.retain(|_, locations| {
            locations.retain(|location| &location.record != id);
            !locations.is_empty()
        });

        tracing::trace!("deleted record {id}");
        Some(record)
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.lists.clear();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Flags every field of every record of `type_name` as stale, or only `field` when given.
    pub fn mark_stale(&mut self, type_name: &str, field: Option<&str>) {
        for record in self.records.values_mut().filter(|record| record.type_name() == type_name) {
            record.mark_stale(field);
        }
    }

    pub fn mark_record_stale(&mut self, id: &RecordId, field: Option<&str>) {
        if let Some(record) = self.records.get_mut(id) {
            record.mark_stale(field);
        }
    }

    fn type_of(&self, id: &RecordId) -> String {
        if let Some(record) = self.records.get(id) {
            return record.type_name().to_string();
        }
        if id.is_root() {
            return ROOT_TYPE.to_string();
        }
        id.as_str()
            .split_once(':')
            .map(|(type_name, _)| type_name)
            .unwrap_or(id.as_str())
            .to_string()
    }

    fn apply(&mut self, plan: write::WritePlan) -> CacheResult<Touched> {
        plan.check_shapes(&self.records)?;

        let write::WritePlan { writes, types, lists } = plan;
        let generation = self.generation;
        let mut touched = Touched::default();

        for write::PendingWrite { record: id, key, value } in writes {
            let record = self.records.entry(id.clone()).or_insert_with(|| {
                let type_name = types.get(&id).cloned().unwrap_or_default();
                Record::new(type_name, generation)
            });
            record.touch(generation);
            record.stale.remove(&key);

            if record.fields.get(&key) == Some(&value) {
                continue;
            }

            tracing::trace!("writing {id}.{key}");
            record.fields.insert(key.clone(), value);
            touched.insert(FieldRef::new(id, key));
        }

        for (name, location) in lists {
            let locations = self.lists.entry(name).or_default();
            if !locations.contains(&location) {
                locations.push(location);
            }
        }

        Ok(touched)
    }
}
