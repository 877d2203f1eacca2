//! JSON file helpers shared by the context manager and the run store.
//!
//! Writes go to a sibling temp file first and are moved into place with a
//! rename, so a reader sees either the old or the new document.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PersistenceError;

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PersistenceError> {
    let write_err = |reason: String| PersistenceError::Write {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }

    let content = serde_json::to_string_pretty(value).map_err(|e| write_err(e.to_string()))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp_name);

    std::fs::write(&tmp, content).map_err(|e| write_err(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        write_err(e.to_string())
    })
}

/// Read and decode a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistenceError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PersistenceError::Missing(path.to_path_buf()));
        }
        Err(e) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    serde_json::from_str(&content).map_err(|e| PersistenceError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
