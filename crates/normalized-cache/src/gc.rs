//! Generation based eviction.
//!
//! Every completed query advances the store generation. A record that nobody wrote or read for
//! more than `buffer_size` generations is removed, unless a live query still depends on it.
//! Reachability between records plays no part: a record pointed at by another one is collected
//! like any other, and a later read reports it as missing.

use crate::{identity::RecordId, store::RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GarbageCollector {
    buffer_size: u64,
}

impl Default for GarbageCollector {
    fn default() -> Self {
        GarbageCollector::new(10)
    }
}

impl GarbageCollector {
    pub fn new(buffer_size: usize) -> Self {
        GarbageCollector {
            buffer_size: buffer_size as u64,
        }
    }

    pub fn buffer_size(&self) -> u64 {
        self.buffer_size
    }

    /// Advances the generation and removes the expired records, returning their identifiers.
    pub fn collect(&self, store: &mut RecordStore, is_referenced: impl Fn(&RecordId) -> bool) -> Vec<RecordId> {
        let generation = store.advance_generation();

        let mut expired = store
            .iter()
            .filter(|(id, record)| {
                !id.is_root()
                    && generation.saturating_sub(record.last_touched()) > self.buffer_size
                    && !is_referenced(id)
            })
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();
        expired.sort();

        for id in &expired {
            store.delete(id);
        }

        if !expired.is_empty() {
            tracing::debug!("collected {} records at generation {generation}", expired.len());
        }

        expired
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::selection::{Field, SelectionSet};

    fn viewer() -> SelectionSet {
        SelectionSet::from_iter([(
            "viewer".to_string(),
            Field::object("viewer", "User", [("id", Field::scalar("id", "ID"))]),
        )])
    }

    #[test]
    fn records_expire_after_the_buffer() {
        let mut store = RecordStore::default();
        store
            .write(&viewer(), &json!({"viewer": {"id": "1"}}), &RecordId::root(), &json!({}))
            .unwrap();

        let gc = GarbageCollector::new(2);
        assert!(gc.collect(&mut store, |_| false).is_empty());
        assert!(gc.collect(&mut store, |_| false).is_empty());

        let collected = gc.collect(&mut store, |_| false);
        assert_eq!(collected, vec![RecordId::from("User:1")]);
        assert!(!store.contains(&RecordId::from("User:1")));
        // The root is never collected.
        assert!(store.contains(&RecordId::root()));
    }

    #[test]
    fn reads_keep_records_alive() {
        let mut store = RecordStore::default();
        store
            .write(&viewer(), &json!({"viewer": {"id": "1"}}), &RecordId::root(), &json!({}))
            .unwrap();

        let gc = GarbageCollector::new(1);
        for _ in 0..5 {
            gc.collect(&mut store, |_| false);
            let outcome = store.read(&viewer(), &RecordId::root(), &json!({}), false);
            assert!(!outcome.has_missing);
        }

        assert!(store.contains(&RecordId::from("User:1")));
    }

    #[test]
    fn referenced_records_survive_a_zero_buffer() {
        let mut store = RecordStore::default();
        store
            .write(&viewer(), &json!({"viewer": {"id": "1"}}), &RecordId::root(), &json!({}))
            .unwrap();

        let gc = GarbageCollector::new(0);
        for _ in 0..3 {
            assert!(gc
                .collect(&mut store, |id| id == &RecordId::from("User:1"))
                .is_empty());
        }
        assert!(store.contains(&RecordId::from("User:1")));
    }
}
