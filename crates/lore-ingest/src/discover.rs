//! Intake directory discovery.

use crate::error::IngestResult;
use lore_core::{FileDescriptor, FileKind, TypeFilter};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// List candidate files directly inside `input_dir`, sorted by name.
///
/// Only supported extensions are returned; hidden files and directories are
/// skipped. A missing or empty directory yields an empty list.
pub fn discover(input_dir: &Path, filter: Option<TypeFilter>) -> IngestResult<Vec<FileDescriptor>> {
    if !input_dir.is_dir() {
        info!("Intake directory {:?} does not exist, nothing to do", input_dir);
        return Ok(Vec::new());
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;
        let path = entry.path();

        if !entry.file_type().is_file() {
            continue;
        }

        // Skip hidden files
        if entry
            .file_name()
            .to_str()
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        let Some(kind) = FileKind::from_path(path) else {
            debug!("Skipping unsupported file {:?}", path);
            continue;
        };

        if let Some(filter) = filter {
            if !filter.allows(kind) {
                debug!("Skipping {:?}: {} excluded by filter {}", path, kind, filter);
                continue;
            }
        }

        files.push(FileDescriptor::new(path, kind));
    }

    if files.is_empty() {
        info!("No files to process in {:?}", input_dir);
    } else {
        info!("Discovered {} files in {:?}", files.len(), input_dir);
    }

    Ok(files)
}
