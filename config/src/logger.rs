//! Logging verbosity and output format.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Complete, CompleteResult, FromEnv, ParseEnvError, ReadEnv};

/// Log level for reading from environment and (de)serializing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Level {
    /// Trace
    TRACE,
    /// Debug
    DEBUG,
    /// Info (Default)
    #[default]
    INFO,
    /// Warn
    WARN,
    /// Error
    ERROR,
}

/// Unknown log level `{0}`
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Self::TRACE),
            "DEBUG" => Ok(Self::DEBUG),
            "INFO" => Ok(Self::INFO),
            "WARN" => Ok(Self::WARN),
            "ERROR" => Ok(Self::ERROR),
            _ => Err(ParseLevelError(s.to_owned())),
        }
    }
}

/// Convert [`Level`] into [`tracing::Level`]
pub fn into_tracing_level(level: Level) -> tracing::Level {
    match level {
        Level::TRACE => tracing::Level::TRACE,
        Level::DEBUG => tracing::Level::DEBUG,
        Level::INFO => tracing::Level::INFO,
        Level::WARN => tracing::Level::WARN,
        Level::ERROR => tracing::Level::ERROR,
    }
}

/// Reflects formatters in `tracing_subscriber::fmt::format`
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Human readable, single line per event
    #[default]
    Full,
    /// Shorter lines without span context
    Compact,
    /// Multi-line output for development
    Pretty,
    /// Newline delimited JSON
    Json,
}

/// Unknown log format `{0}`
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub struct ParseFormatError(String);

impl FromStr for Format {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ParseFormatError(s.to_owned())),
        }
    }
}

/// 'Logger' configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UserLayer {
    /// Level of logging verbosity
    pub level: Option<Level>,
    /// Output format
    pub format: Option<Format>,
}

/// Complete 'Logger' configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Level of logging verbosity
    pub level: Level,
    /// Output format
    pub format: Format,
}

impl UserLayer {
    /// Values set in `over` take precedence
    #[must_use]
    pub fn merge(self, over: Self) -> Self {
        Self {
            level: over.level.or(self.level),
            format: over.format.or(self.format),
        }
    }
}

impl Complete for UserLayer {
    type Output = Config;

    fn complete(self) -> CompleteResult<Self::Output> {
        Ok(Config {
            level: self.level.unwrap_or_default(),
            format: self.format.unwrap_or_default(),
        })
    }
}

impl FromEnv for UserLayer {
    fn from_env(env: &impl ReadEnv) -> Result<Self, ParseEnvError> {
        Ok(Self {
            level: parse_var(env, "LOG_LEVEL")?,
            format: parse_var(env, "LOG_FORMAT")?,
        })
    }
}

pub(crate) fn parse_var<T: FromStr>(
    env: &impl ReadEnv,
    key: &'static str,
) -> Result<Option<T>, ParseEnvError> {
    env.read_env(key)
        .map(|value| {
            value.parse().map_err(|_| ParseEnvError {
                key,
                value: value.into_owned(),
            })
        })
        .transpose()
}
