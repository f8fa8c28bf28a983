use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{
    field_name,
    lists::{ConnectionKeys, ListLocation},
    FieldValue, Link, Record,
};
use crate::{
    error::{CacheError, CacheResult, ValueShape},
    identity::{IdentityResolver, RecordId},
    selection::{Field, FieldShape, ListInfo, ObjectSelection, SelectionSet},
};

pub(super) struct PendingWrite {
    pub record: RecordId,
    pub key: String,
    pub value: FieldValue,
}

/// Everything a write would change, computed before the store is touched.
pub(super) struct WritePlan {
    pub writes: Vec<PendingWrite>,
    pub types: HashMap<RecordId, String>,
    pub lists: Vec<(String, ListLocation)>,
}

impl WritePlan {
    /// A field keeps the shape it was first written with, within the plan as well as against the
    /// records already stored.
    pub fn check_shapes(&self, records: &HashMap<RecordId, Record>) -> CacheResult<()> {
        let mut planned = HashMap::<(&RecordId, &str), ValueShape>::new();

        for write in &self.writes {
            let Some(incoming) = write.value.shape() else {
                continue;
            };

            let existing = planned.get(&(&write.record, write.key.as_str())).copied().or_else(|| {
                records
                    .get(&write.record)
                    .and_then(|record| record.get(&write.key))
                    .and_then(FieldValue::shape)
            });

            if let Some(existing) = existing {
                if existing != incoming {
                    return Err(CacheError::RecordShapeConflict {
                        record: write.record.clone(),
                        field: write.key.clone(),
                        existing,
                        incoming,
                    });
                }
            }

            planned.insert((&write.record, write.key.as_str()), incoming);
        }

        Ok(())
    }
}

pub(super) struct Planner<'a> {
    identity: &'a IdentityResolver,
    variables: &'a Value,
    writes: Vec<PendingWrite>,
    types: HashMap<RecordId, String>,
    lists: Vec<(String, ListLocation)>,
}

impl<'a> Planner<'a> {
    pub fn new(identity: &'a IdentityResolver, variables: &'a Value) -> Self {
        Planner {
            identity,
            variables,
            writes: Vec::new(),
            types: HashMap::new(),
            lists: Vec::new(),
        }
    }

    pub fn finish(self) -> WritePlan {
        WritePlan {
            writes: self.writes,
            types: self.types,
            lists: self.lists,
        }
    }

    pub fn object(
        &mut self,
        id: &RecordId,
        type_name: &str,
        selection: &SelectionSet,
        object: &Map<String, Value>,
    ) -> CacheResult<()> {
        self.types.entry(id.clone()).or_insert_with(|| type_name.to_string());

        for (alias, field) in selection {
            // Fields missing from the response are left as they are.
            let Some(value) = object.get(alias) else {
                continue;
            };
            let key = field.key(self.variables).into_owned();

            let value = match &field.shape {
                FieldShape::Scalar | FieldShape::Enum => FieldValue::Scalar(value.clone()),
                FieldShape::Object(selection) => {
                    let link = self.link(id, &key, &key, field, selection, value)?;
                    if let Some(list) = &selection.list {
                        self.register_list(id, &key, list, selection, &link);
                    }
                    FieldValue::Link(link)
                }
            };

            self.writes.push(PendingWrite {
                record: id.clone(),
                key,
                value,
            });
        }

        Ok(())
    }

    fn link(
        &mut self,
        parent: &RecordId,
        key: &str,
        path: &str,
        field: &Field,
        selection: &ObjectSelection,
        value: &Value,
    ) -> CacheResult<Link> {
        match value {
            Value::Null => Ok(Link::Null),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.link(parent, key, &format!("{path}[{i}]"), field, selection, item))
                .collect::<CacheResult<Vec<_>>>()
                .map(Link::List),
            Value::Object(object) => {
                let type_name = match object.get("__typename").and_then(Value::as_str) {
                    Some(concrete) if selection.is_abstract => concrete,
                    _ => field.type_name.as_str(),
                };
                let id = self
                    .identity
                    .identify(type_name, object)
                    .unwrap_or_else(|| RecordId::embedded(parent, path));

                self.object(&id, type_name, &selection.fields, object)?;
                Ok(Link::Record(id))
            }
            other => Err(CacheError::UnexpectedValue {
                record: parent.clone(),
                field: key.to_string(),
                found: other.to_string(),
            }),
        }
    }

    fn register_list(&mut self, parent: &RecordId, key: &str, list: &ListInfo, selection: &ObjectSelection, link: &Link) {
        let location = if list.connection {
            // The connection object holds the list, in its `edges` field.
            let Link::Record(connection) = link else {
                return;
            };
            let Some(edges) = selection
                .fields
                .values()
                .find(|field| field_name(&field.key_raw) == "edges")
            else {
                return;
            };
            let node_key = edges
                .as_object()
                .and_then(|edges| {
                    edges
                        .fields
                        .values()
                        .find(|field| field_name(&field.key_raw) == "node")
                })
                .map(|node| node.key(self.variables).into_owned())
                .unwrap_or_else(|| "node".to_string());

            ListLocation {
                record: connection.clone(),
                key: edges.key(self.variables).into_owned(),
                node_type: list.type_name.clone(),
                connection: Some(ConnectionKeys {
                    edge_type: edges.type_name.clone(),
                    node_key,
                }),
            }
        } else {
            ListLocation {
                record: parent.clone(),
                key: key.to_string(),
                node_type: list.type_name.clone(),
                connection: None,
            }
        };

        self.lists.push((list.name.clone(), location));
    }
}
