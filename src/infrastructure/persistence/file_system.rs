use crate::domain::errors::DomainError;
use crate::infrastructure::logging::logger;
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::{self as tokio_fs, create_dir_all, read_to_string};

/// Represents the tracker data directory structure
pub struct DataDirectory {
    root: PathBuf,
    misc: PathBuf,
    logs: PathBuf,
}

impl DataDirectory {
    /// Subdirectory holding backups and write-in-progress files.
    pub const MISC_DIR: &'static str = "Misc";

    /// Create a new DataDirectory instance
    pub fn new(root: PathBuf) -> Self {
        let misc = root.join(Self::MISC_DIR);
        let logs = root.join("logs");

        Self { root, misc, logs }
    }

    /// Initialize the data directory structure
    pub async fn initialize(&self) -> Result<(), DomainError> {
        tracing::info!("Initializing data directory at: {:?}", self.root);

        self.create_directory(&self.root).await?;
        self.create_directory(&self.misc).await?;
        self.create_directory(&self.logs).await?;

        Ok(())
    }

    /// Create a directory if it doesn't exist
    async fn create_directory(&self, path: &Path) -> Result<(), DomainError> {
        if !path.exists() {
            tracing::info!("Creating directory: {:?}", path);
            create_dir_all(path).await.map_err(|e| {
                tracing::error!("Failed to create directory {:?}: {}", path, e);
                DomainError::InternalError(format!("Failed to create directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the configuration root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the backup and temp-file directory
    pub fn misc(&self) -> &Path {
        &self.misc
    }

    /// Get the log directory
    pub fn logs(&self) -> &Path {
        &self.logs
    }
}

/// Read a file into a string
///
/// Thin wrapper that maps I/O failures into domain errors so callers can
/// apply their own retry policy.
pub async fn read_text_file(path: &Path) -> Result<String, DomainError> {
    read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DomainError::NotFound(format!("File not found: {}", path.display()))
        } else {
            DomainError::InternalError(format!("Failed to read file: {}", e))
        }
    })
}

/// Read a JSON file and deserialize it
pub async fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, DomainError> {
    logger::debug(&format!("Reading JSON file: {:?}", path));

    let contents = read_text_file(path).await?;

    serde_json::from_str(&contents).map_err(|e| {
        logger::error(&format!("Failed to parse JSON from file {:?}: {}", path, e));
        DomainError::InvalidData(format!("Invalid JSON: {}", e))
    })
}

/// Write a JSON file
///
/// Serializes data to pretty-printed JSON and writes it to a file, creating
/// the parent directory if necessary. The write itself is not atomic; callers
/// that need atomicity write to a side file and rename it into place.
pub async fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<(), DomainError> {
    logger::debug(&format!("Writing JSON file: {:?}", path));

    if let Some(parent) = path.parent() {
        create_dir_all(parent).await.map_err(|e| {
            logger::error(&format!(
                "Failed to create parent directory for {:?}: {}",
                path, e
            ));
            DomainError::InternalError(format!("Failed to create directory: {}", e))
        })?;
    }

    let json = serde_json::to_string_pretty(data).map_err(|e| {
        logger::error(&format!(
            "Failed to serialize to JSON for file {:?}: {}",
            path, e
        ));
        DomainError::InvalidData(format!("Failed to serialize to JSON: {}", e))
    })?;

    tokio_fs::write(path, json).await.map_err(|e| {
        logger::error(&format!("Failed to write to file {:?}: {}", path, e));
        DomainError::InternalError(format!("Failed to write to file: {}", e))
    })?;

    Ok(())
}

/// List files in a directory with a specific extension
pub async fn list_files_with_extension(
    dir: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, DomainError> {
    list_files_matching(dir, |path| {
        path.extension().is_some_and(|ext| ext == extension)
    })
    .await
}

/// List files in a directory whose name starts with a specific prefix
pub async fn list_files_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, DomainError> {
    let prefix = prefix.to_string();
    list_files_matching(dir, move |path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&prefix))
    })
    .await
}

async fn list_files_matching(
    dir: &Path,
    filter: impl Fn(&Path) -> bool,
) -> Result<Vec<PathBuf>, DomainError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = tokio_fs::read_dir(dir).await.map_err(|e| {
        logger::error(&format!("Failed to read directory {:?}: {}", dir, e));
        DomainError::InternalError(format!("Failed to read directory: {}", e))
    })?;

    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(|e| {
        logger::error(&format!("Failed to read directory entry: {}", e));
        DomainError::InternalError(format!("Failed to read directory entry: {}", e))
    })? {
        let path = entry.path();

        if path.is_file() && filter(&path) {
            files.push(path);
        }
    }

    Ok(files)
}

/// Delete a file
///
/// Deleting a file that does not exist is not an error.
pub async fn delete_file(path: &Path) -> Result<(), DomainError> {
    logger::debug(&format!("Deleting file: {:?}", path));

    if !path.exists() {
        return Ok(());
    }

    tokio_fs::remove_file(path).await.map_err(|e| {
        logger::error(&format!("Failed to delete file {:?}: {}", path, e));
        DomainError::InternalError(format!("Failed to delete file: {}", e))
    })?;

    Ok(())
}

/// Last modification time of a file, or the epoch when the file does not
/// exist or the platform cannot report one.
pub async fn file_modified_time(path: &Path) -> SystemTime {
    match tokio_fs::metadata(path).await {
        Ok(metadata) => metadata.modified().unwrap_or(UNIX_EPOCH),
        Err(_) => UNIX_EPOCH,
    }
}
