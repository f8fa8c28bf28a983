//! Which live query read which record field.
//!
//! Each query owns the [`DependencySet`] of its last read. A write reports the fields it changed
//! and only the queries that read one of those exact fields are notified: a change to a field of a
//! shared record nobody selected stays silent.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    identity::RecordId,
    store::{FieldRef, Touched},
};

pub type DependencySet = HashSet<FieldRef>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(u64);

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct Subscriptions {
    next_id: u64,
    queries: HashMap<QueryId, DependencySet>,
    by_field: HashMap<FieldRef, HashSet<QueryId>>,
    /// Number of dependencies, all queries included, on each record.
    by_record: HashMap<RecordId, usize>,
}

impl Subscriptions {
    pub fn register(&mut self, dependencies: DependencySet) -> QueryId {
        let id = QueryId(self.next_id);
        self.next_id += 1;

        self.index(id, &dependencies);
        self.queries.insert(id, dependencies);
        self.check_invariants();

        id
    }

    /// Swaps the dependencies of a query for the ones of its latest read. Nothing is merged.
    pub fn replace(&mut self, id: QueryId, dependencies: DependencySet) {
        let Some(previous) = self.queries.remove(&id) else {
            return;
        };
        self.unindex(id, &previous);

        self.index(id, &dependencies);
        self.queries.insert(id, dependencies);
        self.check_invariants();
    }

    pub fn remove(&mut self, id: QueryId) -> Option<DependencySet> {
        let dependencies = self.queries.remove(&id)?;
        self.unindex(id, &dependencies);
        self.check_invariants();

        Some(dependencies)
    }

    /// The queries that read at least one of the touched fields.
    pub fn notify(&self, touched: &Touched) -> BTreeSet<QueryId> {
        touched
            .iter()
            .filter_map(|field| self.by_field.get(field))
            .flatten()
            .copied()
            .collect()
    }

    pub fn is_referenced(&self, record: &RecordId) -> bool {
        self.by_record.contains_key(record)
    }

    pub fn dependencies(&self, id: QueryId) -> Option<&DependencySet> {
        self.queries.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = QueryId> + '_ {
        self.queries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    fn index(&mut self, id: QueryId, dependencies: &DependencySet) {
        for field in dependencies {
            self.by_field.entry(field.clone()).or_default().insert(id);
            *self.by_record.entry(field.record.clone()).or_default() += 1;
        }
    }

    fn unindex(&mut self, id: QueryId, dependencies: &DependencySet) {
        for field in dependencies {
            if let Some(queries) = self.by_field.get_mut(field) {
                queries.remove(&id);
                if queries.is_empty() {
                    self.by_field.remove(field);
                }
            }

            if let Some(count) = self.by_record.get_mut(&field.record) {
                *count -= 1;
                if *count == 0 {
                    self.by_record.remove(&field.record);
                }
            }
        }
    }

    fn check_invariants(&self) {
        if cfg!(debug_assertions) {
            let dependencies = self.queries.values().map(HashSet::len).sum::<usize>();
            debug_assert_eq!(dependencies, self.by_record.values().sum::<usize>());
            debug_assert_eq!(dependencies, self.by_field.values().map(HashSet::len).sum::<usize>());
            debug_assert!(self.by_field.iter().all(|(field, queries)| queries
                .iter()
                .all(|id| self.queries.get(id).is_some_and(|set| set.contains(field)))));
        }
    }
}
