//! In place mutations of named lists.
//!
//! A regular write replaces the whole sequence of a list field. The operations here are the only
//! way to change a list incrementally: inserting a record at either end, removing one or toggling
//! its membership. Every location a list was written to is updated.

use serde_json::Value;

use super::{FieldRef, FieldValue, Link, Record, RecordStore, Touched};
use crate::{
    error::{CacheError, CacheResult, ValueShape},
    identity::RecordId,
    selection::SelectionSet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPosition {
    Start,
    #[default]
    End,
}

/// Where a named list lives: the field `key` of `record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ListLocation {
    pub record: RecordId,
    pub key: String,
    pub node_type: String,
    /// Set for connections, whose items are edges pointing at the nodes.
    pub connection: Option<ConnectionKeys>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ConnectionKeys {
    pub edge_type: String,
    pub node_key: String,
}

impl RecordStore {
    /// Writes `data` to its own record and inserts it in every location of the list `name`.
    ///
    /// The object must have an identity, unkeyed objects have no record to point at.
    pub fn list_insert(
        &mut self,
        name: &str,
        selection: &SelectionSet,
        data: &Value,
        variables: &Value,
        position: ListPosition,
    ) -> CacheResult<Touched> {
        let locations = self.list_locations(name)?;
        let id = self.list_item_id(name, &locations, data)?;

        let mut touched = self.write(selection, data, &id, variables)?;
        for location in &locations {
            touched.extend(self.insert_at(location, &id, position)?);
        }

        tracing::trace!("inserted {id} in list {name}");
        Ok(touched)
    }

    pub fn list_remove(&mut self, name: &str, id: &RecordId) -> CacheResult<Touched> {
        let locations = self.list_locations(name)?;

        let mut touched = Touched::default();
        for location in &locations {
            touched.extend(self.remove_from(location, id));
        }

        Ok(touched)
    }

    /// Whether `id` is in any location of the list.
    pub fn list_contains(&self, name: &str, id: &RecordId) -> CacheResult<bool> {
        let locations = self.list_locations(name)?;
        Ok(locations.iter().any(|location| self.position_of(location, id).is_some()))
    }

    /// Removes the object from the list if it is there, inserts it otherwise.
    pub fn list_toggle(
        &mut self,
        name: &str,
        selection: &SelectionSet,
        data: &Value,
        variables: &Value,
        position: ListPosition,
    ) -> CacheResult<Touched> {
        let locations = self.list_locations(name)?;
        let id = self.list_item_id(name, &locations, data)?;

        if self.list_contains(name, &id)? {
            self.list_remove(name, &id)
        } else {
            self.list_insert(name, selection, data, variables, position)
        }
    }

    fn list_locations(&self, name: &str) -> CacheResult<Vec<ListLocation>> {
        self.lists
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::UnknownList(name.to_string()))
    }

    fn list_item_id(&self, name: &str, locations: &[ListLocation], data: &Value) -> CacheResult<RecordId> {
        let unkeyed = || CacheError::UnkeyedListItem { list: name.to_string() };
        let Value::Object(object) = data else {
            return Err(unkeyed());
        };

        let type_name = object
            .get("__typename")
            .and_then(Value::as_str)
            .or_else(|| locations.first().map(|location| location.node_type.as_str()))
            .unwrap_or_default();

        self.identity.identify(type_name, object).ok_or_else(unkeyed)
    }

    fn insert_at(&mut self, location: &ListLocation, id: &RecordId, position: ListPosition) -> CacheResult<Touched> {
        let mut touched = Touched::default();
        if !self.records.contains_key(&location.record) || self.position_of(location, id).is_some() {
            return Ok(touched);
        }

        let item = match &location.connection {
            None => id.clone(),
            Some(keys) => {
                let edge = RecordId::embedded(&location.record, &format!("{}[{id}]", location.key));
                let generation = self.generation;
                let record = self
                    .records
                    .entry(edge.clone())
                    .or_insert_with(|| Record::new(keys.edge_type.clone(), generation));
                let node = FieldValue::Link(Link::Record(id.clone()));
                if record.fields.get(&keys.node_key) != Some(&node) {
                    record.fields.insert(keys.node_key.clone(), node);
                    touched.insert(FieldRef::new(edge.clone(), keys.node_key.clone()));
                }
                edge
            }
        };

        let generation = self.generation;
        let Some(record) = self.records.get_mut(&location.record) else {
            return Ok(touched);
        };
        record.touch(generation);

        let is_empty = matches!(
            record.fields.get(&location.key),
            None | Some(FieldValue::Link(Link::Null) | FieldValue::Scalar(Value::Null))
        );
        if is_empty {
            record
                .fields
                .insert(location.key.clone(), FieldValue::Link(Link::List(Vec::new())));
        }

        let items = match record.fields.get_mut(&location.key) {
            Some(FieldValue::Link(Link::List(items))) => items,
            Some(other) => {
                return Err(CacheError::RecordShapeConflict {
                    record: location.record.clone(),
                    field: location.key.clone(),
                    existing: other.shape().unwrap_or(ValueShape::Scalar),
                    incoming: ValueShape::ReferenceList,
                });
            }
            None => return Ok(touched),
        };

        match position {
            ListPosition::Start => items.insert(0, Link::Record(item)),
            ListPosition::End => items.push(Link::Record(item)),
        }
        record.stale.remove(&location.key);

        touched.insert(FieldRef::new(location.record.clone(), location.key.clone()));
        Ok(touched)
    }

    fn remove_from(&mut self, location: &ListLocation, id: &RecordId) -> Touched {
        let mut touched = Touched::default();

        let Some(index) = self.position_of(location, id) else {
            return touched;
        };

        if let Some(FieldValue::Link(Link::List(items))) = self
            .records
            .get_mut(&location.record)
            .and_then(|record| record.fields.get_mut(&location.key))
        {
            items.remove(index);
            touched.insert(FieldRef::new(location.record.clone(), location.key.clone()));
        }

        touched
    }

    /// Index of the item pointing at `id`, through its edge for connections.
    fn position_of(&self, location: &ListLocation, id: &RecordId) -> Option<usize> {
        let Some(FieldValue::Link(Link::List(items))) = self
            .records
            .get(&location.record)
            .and_then(|record| record.get(&location.key))
        else {
            return None;
        };

        items.iter().position(|item| {
            let Link::Record(item) = item else {
                return false;
            };
            match &location.connection {
                None => item == id,
                Some(keys) => self
                    .records
                    .get(item)
                    .and_then(|edge| edge.get(&keys.node_key))
                    .is_some_and(|node| matches!(node, FieldValue::Link(link) if link.references(id))),
            }
        })
    }
}
