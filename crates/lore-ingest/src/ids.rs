//! Entry identifier allocation.
//!
//! Identifiers are derived from the `id:` field in the frontmatter of the
//! entries already in the knowledge tree. For each prefix the next number is
//! one more than the largest numeric run found in any id with that prefix.

use chrono::NaiveDate;
use lore_core::IdPrefix;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{LazyLock, Mutex};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Numeric runs above this are ignored so counters always have room to grow.
const MAX_COUNTER_SEED: u64 = u32::MAX as u64;

static NUMERIC_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("numeric run pattern"));

/// Read the `id:` field from a file's frontmatter.
///
/// Only the header is read. Files without a leading `---` block, without an
/// id, or that cannot be read yield `None`.
pub fn read_frontmatter_id(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut in_frontmatter = false;

    for line in BufReader::new(file).lines() {
        let line = line.ok()?;
        let trimmed = line.trim();

        if trimmed == "---" {
            if in_frontmatter {
                return None;
            }
            in_frontmatter = true;
            continue;
        }
        if !in_frontmatter {
            if trimmed.is_empty() {
                continue;
            }
            return None;
        }
        if let Some(value) = line.strip_prefix("id:") {
            let id = value.trim().trim_matches('"').trim_matches('\'');
            return (!id.is_empty()).then(|| id.to_string());
        }
    }

    None
}

/// Largest numeric run embedded in `id`, ignoring runs too large to count from.
fn max_numeric_run(id: &str) -> Option<u64> {
    NUMERIC_RUN
        .find_iter(id)
        .filter_map(|m| m.as_str().parse::<u64>().ok())
        .filter(|&n| n <= MAX_COUNTER_SEED)
        .max()
}

/// Scan the knowledge tree once and return the highest number seen per prefix.
///
/// Unreadable or malformed files are skipped; the scan is best effort.
pub fn scan_counters(knowledge_root: &Path) -> HashMap<IdPrefix, u64> {
    let mut counters = HashMap::new();

    if !knowledge_root.is_dir() {
        return counters;
    }

    for entry in WalkDir::new(knowledge_root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        let Some(id) = read_frontmatter_id(path) else {
            trace!("No readable id in {:?}", path);
            continue;
        };
        let Some(n) = max_numeric_run(&id) else {
            continue;
        };

        for prefix in IdPrefix::ALL {
            if id.starts_with(prefix.as_str()) {
                let max = counters.entry(prefix).or_insert(0);
                *max = (*max).max(n);
            }
        }
    }

    counters
}

/// One-shot allocation: scan the tree and format the next id for `prefix`.
pub fn next_id(prefix: IdPrefix, knowledge_root: &Path, as_of: NaiveDate) -> String {
    let max_seen = scan_counters(knowledge_root)
        .get(&prefix)
        .copied()
        .unwrap_or(0);
    prefix.format_id(max_seen.saturating_add(1), as_of)
}

/// Serialized id allocator shared by every worker of a run.
///
/// Seeded by a single scan, then served from memory so concurrent workers
/// never receive the same id.
#[derive(Debug)]
pub struct IdAllocator {
    counters: Mutex<HashMap<IdPrefix, u64>>,
    as_of: NaiveDate,
}

impl IdAllocator {
    pub fn new(counters: HashMap<IdPrefix, u64>, as_of: NaiveDate) -> Self {
        Self {
            counters: Mutex::new(counters),
            as_of,
        }
    }

    /// Seed from the entries currently under `knowledge_root`.
    pub fn seed(knowledge_root: &Path, as_of: NaiveDate) -> Self {
        let counters = scan_counters(knowledge_root);
        debug!("Seeded id counters: {:?}", counters);
        Self::new(counters, as_of)
    }

    /// Allocate the next id for `prefix`.
    pub fn allocate(&self, prefix: IdPrefix) -> String {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let n = counters.entry(prefix).or_insert(0);
        *n = n.saturating_add(1);
        prefix.format_id(*n, self.as_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 3).unwrap()
    }

    fn write_entry(dir: &Path, rel: &str, id: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("---\nid: {}\ncategory: sales\n---\n\n# Body\n", id)).unwrap();
    }

    #[test]
    fn test_read_frontmatter_id() {
        let dir = tempdir().unwrap();
        write_entry(dir.path(), "qa/QA_004_x.md", "QA_004");
        assert_eq!(
            read_frontmatter_id(&dir.path().join("qa/QA_004_x.md")).as_deref(),
            Some("QA_004")
        );

        let plain = dir.path().join("plain.md");
        std::fs::write(&plain, "# No frontmatter\n\nid: QA_999\n").unwrap();
        assert_eq!(read_frontmatter_id(&plain), None);
    }

    #[test]
    fn test_empty_tree_starts_at_one() {
        let dir = tempdir().unwrap();
        assert_eq!(next_id(IdPrefix::Qa, dir.path(), date()), "QA_001");
        assert_eq!(next_id(IdPrefix::Bk, &dir.path().join("missing"), date()), "BK_001_P001");
    }

    #[test]
    fn test_max_across_all_numeric_runs() {
        let dir = tempdir().unwrap();
        write_entry(dir.path(), "qa/a.md", "QA_007");
        write_entry(dir.path(), "qa/b.md", "QA_003");
        write_entry(dir.path(), "articles/c.md", "BK_012_P001");

        assert_eq!(next_id(IdPrefix::Qa, dir.path(), date()), "QA_008");
        assert_eq!(next_id(IdPrefix::Bk, dir.path(), date()), "BK_013_P001");
        // Date components count as numeric runs too
        write_entry(dir.path(), "articles/d.md", "ML_202410_002");
        assert_eq!(
            next_id(IdPrefix::Ml, dir.path(), date()),
            format!("ML_202410_{:03}", 202411)
        );
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let dir = tempdir().unwrap();
        write_entry(dir.path(), "qa/a.md", "QA_002");
        std::fs::write(dir.path().join("qa/binary.md"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();
        std::fs::write(dir.path().join("qa/empty.md"), "").unwrap();
        std::fs::write(dir.path().join("qa/bad.md"), "---\nid:\n---\n").unwrap();

        assert_eq!(next_id(IdPrefix::Qa, dir.path(), date()), "QA_003");
    }

    #[test]
    fn test_oversized_numeric_runs_are_ignored() {
        let dir = tempdir().unwrap();
        write_entry(dir.path(), "qa/a.md", "QA_005");
        write_entry(dir.path(), "qa/b.md", "QA_18446744073709551615");
        write_entry(dir.path(), "qa/c.md", "QA_99999999999999999999999");

        assert_eq!(next_id(IdPrefix::Qa, dir.path(), date()), "QA_006");

        let allocator = IdAllocator::seed(dir.path(), date());
        assert_eq!(allocator.allocate(IdPrefix::Qa), "QA_006");
    }

    #[test]
    fn test_allocator_is_monotonic() {
        let dir = tempdir().unwrap();
        write_entry(dir.path(), "articles/a.md", "BK_004_P001");

        let allocator = IdAllocator::seed(dir.path(), date());
        assert_eq!(allocator.allocate(IdPrefix::Bk), "BK_005_P001");
        assert_eq!(allocator.allocate(IdPrefix::Bk), "BK_006_P001");
        assert_eq!(allocator.allocate(IdPrefix::Qa), "QA_001");
    }

    #[test]
    fn test_rescan_never_reallocates_issued_id() {
        let dir = tempdir().unwrap();
        let first = next_id(IdPrefix::Qa, dir.path(), date());
        write_entry(dir.path(), "qa/first.md", &first);

        let second = next_id(IdPrefix::Qa, dir.path(), date());
        assert_ne!(first, second);
        assert_eq!(second, "QA_002");
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let allocator = Arc::new(IdAllocator::new(HashMap::new(), date()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| allocator.allocate(IdPrefix::Qa))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id allocated");
            }
        }
        assert_eq!(seen.len(), 200);
    }
}
