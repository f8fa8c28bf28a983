use std::str::FromStr;

use strum::VariantNames;

/// Verbosity of the cache crates. Anything outside of them only logs at `trace`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::IntoStaticStr,
    strum::VariantNames,
    strum::EnumIter,
)]
#[serde(try_from = "String", into = "&'static str")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

const CRATES: &[&str] = &["normalized_cache", "cache_client", "runtime", "runtime_local", "normcache"];

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Directive for an `EnvFilter`.
    pub fn as_filter_str(&self) -> String {
        match self {
            LogLevel::Off | LogLevel::Trace => self.as_str().to_string(),
            level => {
                let mut directives = CRATES
                    .iter()
                    .map(|name| format!("{name}={level}"))
                    .collect::<Vec<_>>();
                directives.push("off".to_string());
                directives.join(",")
            }
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as strum::IntoEnumIterator>::iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    r#""{s}" is not a valid log level (expected one of {})."#,
                    LogLevel::VARIANTS.join(", ")
                )
            })
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}
