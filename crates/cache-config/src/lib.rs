mod cache;
mod fetch;
mod identity;
mod log_level;

use std::path::Path;

pub use cache::{CacheConfig, CachePolicy};
pub use fetch::FetchConfig;
pub use identity::IdentityConfig;
pub use log_level::LogLevel;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read the configuration at {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Everything the cache and its client need to know at process start.
#[derive(Debug, Default, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub cache: CacheConfig,
    pub identity: IdentityConfig,
    pub fetch: FetchConfig,
    pub log_level: Option<LogLevel>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use indoc::indoc;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();

        assert_eq!(config.cache.buffer_size, 10);
        assert_eq!(config.cache.default_policy, CachePolicy::CacheOrNetwork);
        assert!(!config.cache.default_partial);
        assert_eq!(config.identity.default_keys, vec!["id".to_string()]);
        assert!(config.identity.types.is_empty());
        assert_eq!(config.fetch.timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn full_config() {
        let config = Config::from_toml(indoc! {r#"
            log_level = "debug"

            [cache]
            buffer_size = 3
            default_policy = "cache_and_network"
            default_partial = true

            [identity]
            default_keys = ["id", "uuid"]

            [identity.types]
            Book = ["isbn"]

            [fetch]
            url = "http://localhost:4000/graphql"
            timeout = "5s"
            headers = { authorization = "Bearer secret" }
        "#})
        .unwrap();

        insta::assert_debug_snapshot!(config, @r###"
        Config {
            cache: CacheConfig {
                buffer_size: 3,
                default_policy: CacheAndNetwork,
                default_partial: true,
            },
            identity: IdentityConfig {
                default_keys: [
                    "id",
                    "uuid",
                ],
                types: {
                    "Book": [
                        "isbn",
                    ],
                },
            },
            fetch: FetchConfig {
                url: Url {
                    scheme: "http",
                    cannot_be_a_base: false,
                    username: "",
                    password: None,
                    host: Some(
                        Domain(
                            "localhost",
                        ),
                    ),
                    port: Some(
                        4000,
                    ),
                    path: "/graphql",
                    query: None,
                    fragment: None,
                },
                timeout: 5s,
                headers: {
                    "authorization": "Bearer secret",
                },
            },
            log_level: Some(
                Debug,
            ),
        }
        "###);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = Config::from_toml(indoc! {r#"
            [cache]
            buffer = 3
        "#})
        .unwrap_err();

        assert!(error.to_string().contains("unknown field `buffer`"), "{error}");
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let error = Config::from_toml(indoc! {r#"
            [cache]
            default_policy = "sometimes"
        "#})
        .unwrap_err();

        assert!(error.to_string().contains("unknown variant `sometimes`"), "{error}");
    }
}
