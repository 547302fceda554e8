//! Exclusive writes into the knowledge tree.

use crate::error::IngestResult;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Result of storing a rendered entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Written(PathBuf),
    /// The destination already existed and was left untouched.
    AlreadyExists(PathBuf),
}

/// Create `path` with `contents`, failing over to `AlreadyExists` if the file
/// is present. The existence check and the creation are one atomic step.
pub fn store_exclusive(path: &Path, contents: &str) -> IngestResult<StoreOutcome> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Ok(StoreOutcome::AlreadyExists(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = file.write_all(contents.as_bytes()).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e.into());
    }

    Ok(StoreOutcome::Written(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writes_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("articles/ML_001_x.md");

        let outcome = store_exclusive(&path, "body").unwrap();
        assert_eq!(outcome, StoreOutcome::Written(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "body");
    }

    #[test]
    fn test_existing_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entry.md");
        fs::write(&path, "original").unwrap();

        let outcome = store_exclusive(&path, "replacement").unwrap();
        assert_eq!(outcome, StoreOutcome::AlreadyExists(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
    }
}
