//! Layered configuration for contract chaincode.
//!
//! Every section comes as a `UserLayer` of optional values, read from a JSON5
//! file and from the environment, which is then turned into a strict `Config`
//! through [`Complete`].

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

pub mod env;
pub mod logger;
pub mod metadata;

pub use env::{std_env, ReadEnv, TestEnv};

/// Result of [`Complete::complete`]
pub type CompleteResult<T> = Result<T, CompleteError>;

/// Fill the gaps of a user layer with defaults
pub trait Complete {
    /// Strict configuration produced
    type Output;

    /// Produce the strict configuration.
    ///
    /// # Errors
    /// If a provided value is unusable.
    fn complete(self) -> CompleteResult<Self::Output>;
}

/// Failed to complete configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub enum CompleteError {
    /// `{0}` must not be empty
    Empty(&'static str),
}

/// Read a user layer from environment variables
pub trait FromEnv: Sized {
    /// Collect the variables known to the layer.
    ///
    /// # Errors
    /// If a variable is set to an unparsable value.
    fn from_env(env: &impl ReadEnv) -> Result<Self, ParseEnvError>;
}

/// Failed to parse env var `{key}` with value `{value}`
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub struct ParseEnvError {
    /// Variable name
    pub key: &'static str,
    /// Raw value
    pub value: String,
}

/// Failed to load configuration
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum LoadError {
    /// Failed to read config file `{path}`
    Read {
        /// Path of the file
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Failed to parse config file
    Parse(#[from] json5::Error),
    /// Invalid environment
    Env(#[from] ParseEnvError),
    /// Invalid configuration
    Complete(#[from] CompleteError),
}

/// All sections as provided by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserLayer {
    /// Logging
    pub logger: logger::UserLayer,
    /// Metadata file discovery
    pub metadata: metadata::UserLayer,
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Logging
    pub logger: logger::Config,
    /// Metadata file discovery
    pub metadata: metadata::Config,
}

impl UserLayer {
    /// Parse a JSON5 document.
    ///
    /// # Errors
    /// If the document is malformed or has unknown fields.
    pub fn from_json5(raw: &str) -> Result<Self, LoadError> {
        Ok(json5::from_str(raw)?)
    }

    /// Read and parse a JSON5 file.
    ///
    /// # Errors
    /// If the file can't be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json5(&raw)
    }

    /// Values set in `over` take precedence
    #[must_use]
    pub fn merge(self, over: Self) -> Self {
        Self {
            logger: self.logger.merge(over.logger),
            metadata: self.metadata.merge(over.metadata),
        }
    }
}

impl FromEnv for UserLayer {
    fn from_env(env: &impl ReadEnv) -> Result<Self, ParseEnvError> {
        Ok(Self {
            logger: logger::UserLayer::from_env(env)?,
            metadata: metadata::UserLayer::from_env(env)?,
        })
    }
}

impl Complete for UserLayer {
    type Output = Config;

    fn complete(self) -> CompleteResult<Self::Output> {
        Ok(Config {
            logger: self.logger.complete()?,
            metadata: self.metadata.complete()?,
        })
    }
}

impl Config {
    /// Load configuration from an optional file, overridden by the environment.
    ///
    /// # Errors
    /// If the file or the environment can't be parsed, or the result is
    /// unusable.
    pub fn load(path: Option<&Path>, env: &impl ReadEnv) -> Result<Self, LoadError> {
        let file = match path {
            Some(path) => UserLayer::from_file(path)?,
            None => UserLayer::default(),
        };
        let layer = file.merge(UserLayer::from_env(env)?);
        Ok(layer.complete()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{Format, Level};

    #[test]
    fn empty_document_completes_to_defaults() {
        let config = UserLayer::from_json5("{}").unwrap().complete().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(UserLayer::from_json5("{ telemetry: {} }").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let file = UserLayer::from_json5("{ logger: { level: 'WARN', format: 'compact' } }").unwrap();
        let env = TestEnv::new().set("LOG_LEVEL", "debug");
        let config = file
            .merge(UserLayer::from_env(&env).unwrap())
            .complete()
            .unwrap();
        assert_eq!(config.logger.level, Level::DEBUG);
        assert_eq!(config.logger.format, Format::Compact);
    }
}
