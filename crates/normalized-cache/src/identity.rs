use std::{fmt, sync::Arc};

use cache_config::IdentityConfig;
use serde_json::{Map, Value};

/// Stable key of a record, `Type:value` for objects with an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct RecordId(Arc<str>);

impl RecordId {
    pub const ROOT: &'static str = "_ROOT_";

    pub fn new(id: impl Into<Arc<str>>) -> Self {
        RecordId(id.into())
    }

    pub fn root() -> Self {
        RecordId::new(Self::ROOT)
    }

    pub fn is_root(&self) -> bool {
        self.0.as_ref() == Self::ROOT
    }

    /// Identifier of an object without identity, derived from where it sits in its parent.
    /// The same position always gets the same identifier, other positions never share it.
    pub(crate) fn embedded(parent: &RecordId, path: &str) -> Self {
        RecordId::new(format!("{parent}.{path}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::new(id)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    config: IdentityConfig,
}

impl IdentityResolver {
    pub fn new(config: IdentityConfig) -> Self {
        IdentityResolver { config }
    }

    /// Returns `None` when the object has none of the identity fields of its type.
    ///
    /// A field counts as present as long as it exists and is not `null`: `false` and `0` are valid
    /// identity values. Types identified by a single field get `Type:value`, the others get the
    /// JSON object of their present identity fields, `Book:{"isbn":"978","edition":2}`, so that no
    /// value can be mistaken for a combination of several.
    pub fn identify(&self, type_name: &str, object: &Map<String, Value>) -> Option<RecordId> {
        let keys = self.config.keys_for(type_name);
        let present = keys
            .iter()
            .filter_map(|key| {
                let value = object.get(key)?;
                (!value.is_null()).then_some((key, value))
            })
            .collect::<Vec<_>>();

        let identity = match present.as_slice() {
            [] => return None,
            [(_, Value::String(value))] if keys.len() == 1 => value.clone(),
            [(_, value)] if keys.len() == 1 => value.to_string(),
            _ => Value::Object(
                present
                    .into_iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            )
            .to_string(),
        };

        Some(RecordId::new(format!("{type_name}:{identity}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn default_keys() {
        let resolver = IdentityResolver::default();

        assert_eq!(
            resolver.identify("User", &object(json!({"id": "1", "name": "Ada"}))),
            Some(RecordId::from("User:1"))
        );
        assert_eq!(resolver.identify("User", &object(json!({"name": "Ada"}))), None);
        assert_eq!(resolver.identify("User", &object(json!({"id": null}))), None);
    }

    #[test]
    fn falsy_values_are_identities() {
        let resolver = IdentityResolver::default();

        assert_eq!(
            resolver.identify("Flag", &object(json!({"id": false}))),
            Some(RecordId::from("Flag:false"))
        );
        assert_eq!(
            resolver.identify("Counter", &object(json!({"id": 0}))),
            Some(RecordId::from("Counter:0"))
        );
    }

    #[test]
    fn per_type_override() {
        let mut config = IdentityConfig::default();
        config.types.insert("Book".into(), vec!["isbn".into(), "edition".into()]);
        let resolver = IdentityResolver::new(config);

        assert_eq!(
            resolver.identify("Book", &object(json!({"id": "x", "isbn": "978", "edition": 2}))),
            Some(RecordId::from(r#"Book:{"isbn":"978","edition":2}"#))
        );
        assert_eq!(
            resolver.identify("Book", &object(json!({"isbn": "978"}))),
            Some(RecordId::from(r#"Book:{"isbn":"978"}"#))
        );
        assert_eq!(resolver.identify("Book", &object(json!({"id": "x"}))), None);
    }

    #[test]
    fn composite_identities_never_collide() {
        let mut config = IdentityConfig::default();
        config.types.insert("Book".into(), vec!["isbn".into(), "edition".into()]);
        let resolver = IdentityResolver::new(config);

        let joined = resolver.identify("Book", &object(json!({"isbn": "a__b"})));
        let split = resolver.identify("Book", &object(json!({"isbn": "a", "edition": "b"})));
        let other_field = resolver.identify("Book", &object(json!({"edition": "a__b"})));

        assert!(joined.is_some());
        assert_ne!(joined, split);
        assert_ne!(joined, other_field);
    }
}
