use std::{collections::BTreeMap, time::Duration};

use url::Url;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// GraphQL endpoint the client talks to.
    pub url: Url,
    /// Defaults to 30s
    #[serde(deserialize_with = "duration_str::deserialize_duration")]
    pub timeout: Duration,
    /// Headers sent with every request.
    pub headers: BTreeMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://127.0.0.1:4000/graphql").expect("must be correct"),
            timeout: Duration::from_secs(30),
            headers: BTreeMap::new(),
        }
    }
}
