//! Reading a metadata document shipped with the chaincode.

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

use fabric_contract_config::metadata::Config;
use parking_lot::Mutex;

use crate::ContractChaincodeMetadata;

/// File access used to locate and read the metadata file
pub trait FileSystem: Send + Sync {
    /// Directory relative lookups start from
    ///
    /// # Errors
    /// If the directory can't be determined.
    fn current_dir(&self) -> io::Result<PathBuf>;

    /// Whole contents of the file at `path`
    ///
    /// # Errors
    /// If the file can't be read.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// The real file system
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// File system kept in memory, recording every read attempt
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    current_dir: PathBuf,
    files: HashMap<PathBuf, Vec<u8>>,
    reads: Mutex<Vec<PathBuf>>,
}

impl MemoryFileSystem {
    /// Empty file system rooted at `current_dir`
    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: current_dir.into(),
            ..Self::default()
        }
    }

    /// Add a file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// Paths read so far, in order
    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.lock().clone()
    }
}

impl FileSystem for MemoryFileSystem {
    fn current_dir(&self) -> io::Result<PathBuf> {
        Ok(self.current_dir.clone())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.reads.lock().push(path.to_path_buf());
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file does not exist"))
    }
}

/// Failed to read metadata
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum ReadMetadataError {
    /// failed to read metadata from file. Could not determine working directory
    WorkingDir(#[source] io::Error),
    /// failed to read metadata from file: {primary_path}: {primary}; {secondary_path}: {secondary}
    Read {
        /// Path tried first
        primary_path: String,
        /// Why the first path failed
        primary: io::Error,
        /// Path tried next
        secondary_path: String,
        /// Why the second path failed
        secondary: io::Error,
    },
    /// failed to parse metadata file {path}
    Parse {
        /// File that was read
        path: String,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },
}

impl ReadMetadataError {
    /// No metadata file exists in either location
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Read { primary, secondary, .. }
                if primary.kind() == io::ErrorKind::NotFound
                    && secondary.kind() == io::ErrorKind::NotFound
        )
    }
}

/// Read the metadata file from the primary folder, falling back to the
/// secondary one.
///
/// # Errors
/// If neither file can be read, or the file read isn't a metadata document.
pub fn read_metadata_file(
    config: &Config,
    fs: &dyn FileSystem,
) -> Result<ContractChaincodeMetadata, ReadMetadataError> {
    let root = match &config.root {
        Some(root) => root.clone(),
        None => fs.current_dir().map_err(ReadMetadataError::WorkingDir)?,
    };

    let primary_path = root.join(&config.primary_folder).join(&config.file_name);
    let (path, bytes) = match fs.read(&primary_path) {
        Ok(bytes) => (primary_path, bytes),
        Err(primary) => {
            let secondary_path = root.join(&config.secondary_folder).join(&config.file_name);
            match fs.read(&secondary_path) {
                Ok(bytes) => (secondary_path, bytes),
                Err(secondary) => {
                    return Err(ReadMetadataError::Read {
                        primary_path: primary_path.display().to_string(),
                        primary,
                        secondary_path: secondary_path.display().to_string(),
                        secondary,
                    })
                }
            }
        }
    };

    tracing::debug!(path = %path.display(), "Reading metadata file");
    serde_json::from_slice(&bytes).map_err(|source| ReadMetadataError::Parse {
        path: path.display().to_string(),
        source,
    })
}
