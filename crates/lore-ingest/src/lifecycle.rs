//! File lifecycle tracking.
//!
//! A file's state is the lifecycle directory that currently holds it. Every
//! transition is a single move, so a file name is never present in two
//! lifecycle directories at once.

use crate::error::IngestResult;
use lore_config::ProjectLayout;
use lore_core::{FileDescriptor, FileState};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Lifecycle transitions used by the pipeline.
pub trait LifecycleStore: Send + Sync {
    /// Move a discovered file into `processing/`. Fails if the source is gone.
    fn claim(&self, file: &FileDescriptor) -> IngestResult<PathBuf>;

    /// Move a claimed file from `processing/` to `completed/`.
    fn complete(&self, file: &FileDescriptor) -> IngestResult<PathBuf>;

    /// Move a file to `failed/` from `processing/`, or from its discovered
    /// location if it was never claimed. Never fails; secondary errors are
    /// logged and `None` is returned.
    fn fail(&self, file: &FileDescriptor, reason: &str) -> Option<PathBuf>;

    /// Names of the files currently in `state`, sorted.
    fn list(&self, state: FileState) -> Vec<String>;
}

/// Lifecycle store backed by the intake directories.
#[derive(Debug, Clone)]
pub struct FsLifecycle {
    layout: ProjectLayout,
}

impl FsLifecycle {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    /// Create the four lifecycle directories. Idempotent.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for state in FileState::ALL {
            fs::create_dir_all(self.layout.state_dir(state))?;
        }
        Ok(())
    }

    fn target(&self, state: FileState, file: &FileDescriptor) -> PathBuf {
        self.layout.state_dir(state).join(file.name())
    }
}

impl LifecycleStore for FsLifecycle {
    fn claim(&self, file: &FileDescriptor) -> IngestResult<PathBuf> {
        let dest = self.target(FileState::Processing, file);
        move_file(&file.path, &dest)?;
        debug!("Claimed {:?}", dest);
        Ok(dest)
    }

    fn complete(&self, file: &FileDescriptor) -> IngestResult<PathBuf> {
        let src = self.target(FileState::Processing, file);
        let dest = self.target(FileState::Completed, file);
        move_file(&src, &dest)?;
        Ok(dest)
    }

    fn fail(&self, file: &FileDescriptor, reason: &str) -> Option<PathBuf> {
        let processing = self.target(FileState::Processing, file);
        let src = if processing.exists() {
            processing
        } else {
            file.path.clone()
        };
        let dest = self.target(FileState::Failed, file);

        match move_file(&src, &dest) {
            Ok(()) => Some(dest),
            Err(e) => {
                error!(
                    "Could not move {} to failed/ after error '{}': {}",
                    file.name(),
                    reason,
                    e
                );
                None
            }
        }
    }

    fn list(&self, state: FileState) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.layout.state_dir(state)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Move `src` to `dest`, creating the destination directory on demand.
///
/// Uses a rename; when that fails but the source still exists (for example
/// across filesystems) the file is copied and the source removed.
pub fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if src.is_file() => {
            debug!("Rename {:?} failed ({}), falling back to copy", src, e);
            fs::copy(src, dest)?;
            fs::remove_file(src)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lore_core::FileKind;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, FsLifecycle, FileDescriptor) {
        let dir = tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        let store = FsLifecycle::new(layout.clone());
        store.ensure_dirs().unwrap();

        let path = layout.raw_dir.join("a.txt");
        fs::write(&path, "hello").unwrap();
        (dir, store, FileDescriptor::new(path, FileKind::Text))
    }

    #[test]
    fn test_claim_then_complete() {
        let (_dir, store, file) = setup();

        let claimed = store.claim(&file).unwrap();
        assert!(claimed.exists());
        assert_eq!(store.list(FileState::Raw), Vec::<String>::new());
        assert_eq!(store.list(FileState::Processing), vec!["a.txt"]);

        store.complete(&file).unwrap();
        assert_eq!(store.list(FileState::Processing), Vec::<String>::new());
        assert_eq!(store.list(FileState::Completed), vec!["a.txt"]);
    }

    #[test]
    fn test_claim_missing_source_errors() {
        let (_dir, store, file) = setup();
        fs::remove_file(&file.path).unwrap();
        assert!(store.claim(&file).is_err());
    }

    #[test]
    fn test_fail_from_processing_and_raw() {
        let (_dir, store, file) = setup();

        // Claimed: moved out of processing
        store.claim(&file).unwrap();
        let moved = store.fail(&file, "boom").unwrap();
        assert_eq!(moved, store.layout.failed_dir.join("a.txt"));
        assert!(store.list(FileState::Processing).is_empty());
        assert_eq!(store.list(FileState::Failed), vec!["a.txt"]);

        // Never claimed: moved straight from raw
        let raw = store.layout.raw_dir.join("b.txt");
        fs::write(&raw, "world").unwrap();
        let unclaimed = FileDescriptor::new(raw, FileKind::Text);
        assert!(store.fail(&unclaimed, "boom").is_some());
        assert_eq!(store.list(FileState::Failed), vec!["a.txt", "b.txt"]);
        assert!(store.list(FileState::Raw).is_empty());
    }

    #[test]
    fn test_fail_never_raises() {
        let (_dir, store, file) = setup();
        fs::remove_file(&file.path).unwrap();

        assert_eq!(store.fail(&file, "boom"), None);
        assert!(store.list(FileState::Failed).is_empty());
    }

    #[test]
    fn test_directories_created_on_demand() {
        let dir = tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        let store = FsLifecycle::new(layout.clone());

        let src = dir.path().join("inbox.md");
        fs::write(&src, "# Title").unwrap();
        let file = FileDescriptor::new(&src, FileKind::Text);

        store.claim(&file).unwrap();
        assert!(layout.processing_dir.join("inbox.md").exists());
    }
}
