use std::collections::BTreeMap;

/// Which fields make up the identity of an object.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Used for every type without an override. `["id"]` by default.
    pub default_keys: Vec<String>,
    /// Per-type overrides, keyed by type name.
    pub types: BTreeMap<String, Vec<String>>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            default_keys: vec!["id".to_string()],
            types: BTreeMap::new(),
        }
    }
}

impl IdentityConfig {
    pub fn keys_for(&self, type_name: &str) -> &[String] {
        self.types
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or(self.default_keys.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_takes_precedence() {
        let mut config = IdentityConfig::default();
        config.types.insert("Book".into(), vec!["isbn".into()]);

        assert_eq!(config.keys_for("Book"), ["isbn".to_string()]);
        assert_eq!(config.keys_for("User"), ["id".to_string()]);
    }
}
