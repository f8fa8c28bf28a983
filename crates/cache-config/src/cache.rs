/// How a query execution combines the cache and the network.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CachePolicy {
    /// Settle from the cache when it can answer, otherwise go to the network.
    #[default]
    CacheOrNetwork,
    /// Never read the cache before fetching.
    NetworkOnly,
    /// Never fetch.
    CacheOnly,
    /// Settle from the cache right away, then again with fresh network data.
    CacheAndNetwork,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// The number of completed queries a record may go untouched before it can be collected.
    /// 10 by default.
    pub buffer_size: usize,
    pub default_policy: CachePolicy,
    /// Whether reads tolerate missing fields by default.
    pub default_partial: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            buffer_size: 10,
            default_policy: CachePolicy::default(),
            default_partial: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn policy_from_str() {
        assert_eq!(CachePolicy::from_str("cache_only"), Ok(CachePolicy::CacheOnly));
        assert_eq!(CachePolicy::from_str("network_only"), Ok(CachePolicy::NetworkOnly));
        assert!(CachePolicy::from_str("CacheOnly").is_err());
        assert_eq!(CachePolicy::CacheAndNetwork.to_string(), "cache_and_network");
    }
}
