//! Where the metadata file is looked for.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    logger::parse_var, Complete, CompleteError, CompleteResult, FromEnv, ParseEnvError, ReadEnv,
};

/// Folder searched first
pub const DEFAULT_PRIMARY_FOLDER: &str = "META-INF";
/// Folder searched when the primary one has no metadata file
pub const DEFAULT_SECONDARY_FOLDER: &str = "contract-metadata";
/// Name of the metadata file
pub const DEFAULT_FILE_NAME: &str = "metadata.json";

/// 'Metadata' configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct UserLayer {
    /// Directory holding the metadata folders, the working directory if unset
    pub root: Option<PathBuf>,
    /// Folder searched first
    pub primary_folder: Option<String>,
    /// Fallback folder
    pub secondary_folder: Option<String>,
    /// File name inside either folder
    pub file_name: Option<String>,
}

/// Complete 'Metadata' configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the metadata folders, the working directory if unset
    pub root: Option<PathBuf>,
    /// Folder searched first
    pub primary_folder: String,
    /// Fallback folder
    pub secondary_folder: String,
    /// File name inside either folder
    pub file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            primary_folder: DEFAULT_PRIMARY_FOLDER.to_owned(),
            secondary_folder: DEFAULT_SECONDARY_FOLDER.to_owned(),
            file_name: DEFAULT_FILE_NAME.to_owned(),
        }
    }
}

impl UserLayer {
    /// Values set in `over` take precedence
    #[must_use]
    pub fn merge(self, over: Self) -> Self {
        Self {
            root: over.root.or(self.root),
            primary_folder: over.primary_folder.or(self.primary_folder),
            secondary_folder: over.secondary_folder.or(self.secondary_folder),
            file_name: over.file_name.or(self.file_name),
        }
    }
}

fn non_empty(value: Option<String>, default: &str, field: &'static str) -> CompleteResult<String> {
    match value {
        None => Ok(default.to_owned()),
        Some(value) if value.is_empty() => Err(CompleteError::Empty(field)),
        Some(value) => Ok(value),
    }
}

impl Complete for UserLayer {
    type Output = Config;

    fn complete(self) -> CompleteResult<Self::Output> {
        Ok(Config {
            root: self.root,
            primary_folder: non_empty(
                self.primary_folder,
                DEFAULT_PRIMARY_FOLDER,
                "metadata.primary_folder",
            )?,
            secondary_folder: non_empty(
                self.secondary_folder,
                DEFAULT_SECONDARY_FOLDER,
                "metadata.secondary_folder",
            )?,
            file_name: non_empty(self.file_name, DEFAULT_FILE_NAME, "metadata.file_name")?,
        })
    }
}

impl FromEnv for UserLayer {
    fn from_env(env: &impl ReadEnv) -> Result<Self, ParseEnvError> {
        Ok(Self {
            root: parse_var(env, "CONTRACT_METADATA_ROOT")?,
            ..Self::default()
        })
    }
}
