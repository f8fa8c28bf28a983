use clap::ValueEnum;

/// How log lines are written to stderr.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogStyle {
    /// Human readable, colored when stderr is a terminal
    Text,
    /// One JSON object per line
    Json,
}
