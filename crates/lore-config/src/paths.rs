//! Application and project paths.

use directories::ProjectDirs;
use lore_core::FileState;
use std::path::{Path, PathBuf};

/// Per-user locations following platform conventions.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl AppPaths {
    /// Create paths using platform-specific directories.
    pub fn new() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("com", "lore", "lore")?;
        let config_dir = proj_dirs.config_dir().to_path_buf();

        Some(Self {
            config_file: config_dir.join("config.toml"),
            config_dir,
        })
    }
}

/// Directory layout of a knowledge project.
///
/// ```text
/// <root>/knowledge/                 generated entries
/// <root>/intake/{raw,processing,completed,failed}/
/// <root>/intake/tmp_images/         per-run scratch space
/// <root>/logs/pipeline/             run reports
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub knowledge_dir: PathBuf,
    pub intake_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub processing_dir: PathBuf,
    pub completed_dir: PathBuf,
    pub failed_dir: PathBuf,
    pub tmp_images_dir: PathBuf,
    pub report_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let intake_dir = root.join("intake");

        Self {
            knowledge_dir: root.join("knowledge"),
            raw_dir: intake_dir.join(FileState::Raw.dir_name()),
            processing_dir: intake_dir.join(FileState::Processing.dir_name()),
            completed_dir: intake_dir.join(FileState::Completed.dir_name()),
            failed_dir: intake_dir.join(FileState::Failed.dir_name()),
            tmp_images_dir: intake_dir.join("tmp_images"),
            report_dir: root.join("logs").join("pipeline"),
            intake_dir,
            root,
        }
    }

    /// Lifecycle directory that represents `state`.
    pub fn state_dir(&self, state: FileState) -> &Path {
        match state {
            FileState::Raw => &self.raw_dir,
            FileState::Processing => &self.processing_dir,
            FileState::Completed => &self.completed_dir,
            FileState::Failed => &self.failed_dir,
        }
    }

    /// Create every directory of the layout except the scratch area.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.knowledge_dir)?;
        for state in FileState::ALL {
            std::fs::create_dir_all(self.state_dir(state))?;
        }
        std::fs::create_dir_all(&self.report_dir)?;
        Ok(())
    }

    /// Check if the project has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.knowledge_dir.is_dir() && self.raw_dir.is_dir()
    }

    /// Express `path` relative to the project root when possible.
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_app_paths_creation() {
        let paths = AppPaths::new();
        assert!(paths.is_some());

        let paths = paths.unwrap();
        assert!(paths.config_file.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_layout_directories() {
        let layout = ProjectLayout::new("/data/kb");
        assert_eq!(layout.raw_dir, PathBuf::from("/data/kb/intake/raw"));
        assert_eq!(
            layout.state_dir(FileState::Failed),
            Path::new("/data/kb/intake/failed")
        );
        assert_eq!(layout.report_dir, PathBuf::from("/data/kb/logs/pipeline"));
        assert_eq!(
            layout.relative(Path::new("/data/kb/knowledge/qa/QA_001_x.md")),
            "knowledge/qa/QA_001_x.md"
        );
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        assert!(!layout.is_initialized());

        layout.ensure_dirs().unwrap();

        assert!(layout.is_initialized());
        for state in FileState::ALL {
            assert!(layout.state_dir(state).is_dir());
        }
        assert!(layout.report_dir.is_dir());
        assert!(!layout.tmp_images_dir.exists());
    }
}
