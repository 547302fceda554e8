//! Run outcomes, the report aggregator and the persisted run report.

use crate::error::{IngestError, IngestResult};
use chrono::{DateTime, Local};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// A successfully stored entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub source: String,
    pub output: String,
    pub category: String,
    pub sub_category: String,
    pub priority: String,
    pub confidence: f64,
    pub quality_score: f64,
    pub entry_id: String,
}

/// An entry that needs a human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(flatten)]
    pub entry: EntryRecord,
    pub reason: String,
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub source: String,
    pub error: String,
    pub moved_to: Option<String>,
}

/// A file whose entry already existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub source: String,
    pub output: String,
    pub reason: String,
}

/// Terminal result of one file's pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(EntryRecord),
    /// A stored entry that also needs review. Counted as a success.
    NeedsManualReview {
        entry: EntryRecord,
        reasons: Vec<String>,
    },
    SkippedDuplicate(DuplicateRecord),
    Failed(FailureRecord),
}

impl Outcome {
    /// Name of the intake file this outcome belongs to.
    pub fn source(&self) -> &str {
        match self {
            Outcome::Success(entry) | Outcome::NeedsManualReview { entry, .. } => &entry.source,
            Outcome::SkippedDuplicate(record) => &record.source,
            Outcome::Failed(record) => &record.source,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

#[derive(Debug, Default)]
struct Lists {
    success: Vec<EntryRecord>,
    failed: Vec<FailureRecord>,
    skipped_duplicate: Vec<DuplicateRecord>,
    manual_review: Vec<ReviewRecord>,
}

/// Collects outcomes from concurrent workers.
#[derive(Debug)]
pub struct ReportAggregator {
    run_id: String,
    started_at: DateTime<Local>,
    input_files: usize,
    lists: Mutex<Lists>,
}

impl ReportAggregator {
    pub fn new(run_id: impl Into<String>, input_files: usize) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Local::now(),
            input_files,
            lists: Mutex::new(Lists::default()),
        }
    }

    /// Append an outcome. Safe to call from any worker.
    pub fn record(&self, outcome: Outcome) {
        let mut lists = self.lists.lock().unwrap_or_else(|p| p.into_inner());
        match outcome {
            Outcome::Success(entry) => lists.success.push(entry),
            Outcome::NeedsManualReview { entry, reasons } => {
                lists.manual_review.push(ReviewRecord {
                    entry: entry.clone(),
                    reason: reasons.join("; "),
                });
                lists.success.push(entry);
            }
            Outcome::SkippedDuplicate(record) => lists.skipped_duplicate.push(record),
            Outcome::Failed(record) => lists.failed.push(record),
        }
    }

    /// Freeze the collected outcomes into a report.
    pub fn finalize(&self) -> PipelineReport {
        let lists = self.lists.lock().unwrap_or_else(|p| p.into_inner());

        let mut by_category = BTreeMap::new();
        let mut by_type = BTreeMap::new();
        for entry in &lists.success {
            *by_category.entry(entry.category.clone()).or_insert(0) += 1;
            *by_type.entry(entry_type(&entry.entry_id)).or_insert(0) += 1;
        }

        let mut sorted = Lists {
            success: lists.success.clone(),
            failed: lists.failed.clone(),
            skipped_duplicate: lists.skipped_duplicate.clone(),
            manual_review: lists.manual_review.clone(),
        };
        sorted.success.sort_by(|a, b| a.source.cmp(&b.source));
        sorted.failed.sort_by(|a, b| a.source.cmp(&b.source));
        sorted.skipped_duplicate.sort_by(|a, b| a.source.cmp(&b.source));
        sorted.manual_review.sort_by(|a, b| a.entry.source.cmp(&b.entry.source));

        PipelineReport {
            run_id: self.run_id.clone(),
            started_at: self.started_at.to_rfc3339(),
            completed_at: Local::now().to_rfc3339(),
            input_files: self.input_files,
            results: ResultCounts {
                success: sorted.success.len(),
                failed: sorted.failed.len(),
                skipped_duplicate: sorted.skipped_duplicate.len(),
                manual_review: sorted.manual_review.len(),
            },
            files_created: sorted.success,
            errors: sorted.failed,
            skipped_duplicate: sorted.skipped_duplicate,
            manual_review: sorted.manual_review,
            stats: ReportStats {
                by_category,
                by_type,
            },
        }
    }
}

/// Id prefix of an entry id (`BK_001_P001` -> `BK`).
fn entry_type(entry_id: &str) -> String {
    match entry_id.split_once('_') {
        Some((prefix, _)) if !prefix.is_empty() => prefix.to_string(),
        _ => "OTHER".to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultCounts {
    pub success: usize,
    pub failed: usize,
    pub skipped_duplicate: usize,
    pub manual_review: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    pub by_category: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

/// The persisted run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub input_files: usize,
    pub results: ResultCounts,
    pub files_created: Vec<EntryRecord>,
    pub errors: Vec<FailureRecord>,
    pub skipped_duplicate: Vec<DuplicateRecord>,
    pub manual_review: Vec<ReviewRecord>,
    pub stats: ReportStats,
}

impl PipelineReport {
    /// Path of the report for `run_id` inside `report_dir`.
    pub fn path_for(report_dir: &Path, run_id: &str) -> PathBuf {
        report_dir.join(format!("report_{}.json", run_id))
    }

    /// Write the report as pretty JSON. Fails if the directory is unwritable.
    pub fn persist(&self, report_dir: &Path) -> IngestResult<PathBuf> {
        let path = Self::path_for(report_dir, &self.run_id);
        let write = || -> std::io::Result<()> {
            std::fs::create_dir_all(report_dir)?;
            let json = serde_json::to_string_pretty(self)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            std::fs::write(&path, json + "\n")
        };

        write().map_err(|e| IngestError::Report(format!("cannot write report to {:?}: {}", path, e)))?;
        info!("Report saved to {:?}", path);
        Ok(path)
    }

    pub fn load(path: &Path) -> IngestResult<Self> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| IngestError::Report(format!("invalid report {:?}: {}", path, e)))
    }

    /// Human-readable summary. Manual review items and failures are listed
    /// individually since both need action.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "{}", format!("Run {}", self.run_id).bold());
        let _ = writeln!(out, "  Input files:  {}", self.input_files);
        let _ = writeln!(out, "  {}", format!("Succeeded:    {}", self.results.success).green());
        let _ = writeln!(out, "  {}", format!("Duplicates:   {}", self.results.skipped_duplicate).dimmed());
        let _ = writeln!(out, "  {}", format!("Review:       {}", self.results.manual_review).yellow());
        let _ = writeln!(out, "  {}", format!("Failed:       {}", self.results.failed).red());

        if !self.stats.by_category.is_empty() {
            let _ = writeln!(out, "\n{}", "By category:".bold());
            for (category, count) in &self.stats.by_category {
                let _ = writeln!(out, "  {:<20} {}", category, count);
            }
        }

        if !self.manual_review.is_empty() {
            let _ = writeln!(out, "\n{}", "Needs manual review:".yellow().bold());
            for item in &self.manual_review {
                let _ = writeln!(
                    out,
                    "  {} -> {} ({})",
                    item.entry.source,
                    item.entry.output,
                    item.reason
                );
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out, "\n{}", "Failed (see intake/failed/):".red().bold());
            for item in &self.errors {
                let _ = writeln!(out, "  {}: {}", item.source, item.error);
            }
        }

        if !self.skipped_duplicate.is_empty() {
            let _ = writeln!(out, "\n{}", "Skipped duplicates:".dimmed());
            for item in &self.skipped_duplicate {
                let _ = writeln!(out, "  {} -> {}", item.source, item.output);
            }
        }

        out
    }

    pub fn print_summary(&self) {
        print!("{}", self.render_summary());
    }
}

/// Timestamp-derived run id, suffixed `_N` if a report with that id exists.
pub fn generate_run_id(report_dir: &Path, now: DateTime<Local>) -> String {
    let base = now.format("%Y%m%d_%H%M%S").to_string();
    if !PipelineReport::path_for(report_dir, &base).exists() {
        return base;
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|id| !PipelineReport::path_for(report_dir, id).exists())
        .unwrap_or(base)
}

/// Run ids of stored reports, newest first.
pub fn list_reports(report_dir: &Path) -> Vec<String> {
    let pattern = report_dir.join("report_*.json");
    let Some(pattern) = pattern.to_str() else {
        return Vec::new();
    };

    let mut ids: Vec<String> = glob::glob(pattern)
        .map(|paths| {
            paths
                .filter_map(|p| p.ok())
                .filter_map(|p| {
                    p.file_stem()
                        .and_then(|s| s.to_str())
                        .and_then(|s| s.strip_prefix("report_"))
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default();

    ids.sort_by(|a, b| b.cmp(a));
    ids
}

/// Result of looking up a stored report.
#[derive(Debug)]
pub enum ReportLookup {
    Found(PathBuf),
    /// Unknown id; carries up to ten available ids.
    NotFound { available: Vec<String> },
    Empty,
}

/// Find the report for `which` (`latest` or a run id).
pub fn find_report(report_dir: &Path, which: &str) -> ReportLookup {
    let ids = list_reports(report_dir);
    if ids.is_empty() {
        return ReportLookup::Empty;
    }

    let id = if which == "latest" {
        Some(ids[0].clone())
    } else {
        ids.iter().find(|id| id.as_str() == which).cloned()
    };

    match id {
        Some(id) => ReportLookup::Found(PipelineReport::path_for(report_dir, &id)),
        None => ReportLookup::NotFound {
            available: ids.into_iter().take(10).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn entry(source: &str, category: &str, id: &str) -> EntryRecord {
        EntryRecord {
            source: source.to_string(),
            output: format!("knowledge/articles/{}_x.md", id),
            category: category.to_string(),
            sub_category: String::new(),
            priority: "medium".to_string(),
            confidence: 0.9,
            quality_score: 0.9,
            entry_id: id.to_string(),
        }
    }

    fn sample_report() -> PipelineReport {
        let aggregator = ReportAggregator::new("20241003_101500", 4);
        aggregator.record(Outcome::Success(entry("a.txt", "sales", "ML_202410_001")));
        aggregator.record(Outcome::NeedsManualReview {
            entry: entry("d.pdf", "medical", "BK_002_P001"),
            reasons: vec!["low confidence: 0.40".to_string(), "unknown category: x".to_string()],
        });
        aggregator.record(Outcome::SkippedDuplicate(DuplicateRecord {
            source: "b.pdf".to_string(),
            output: "knowledge/articles/BK_001_P001_x.md".to_string(),
            reason: "destination already exists".to_string(),
        }));
        aggregator.record(Outcome::Failed(FailureRecord {
            source: "c.mov".to_string(),
            error: "Extraction failed for c.mov: ffmpeg missing".to_string(),
            moved_to: Some("intake/failed/c.mov".to_string()),
        }));
        aggregator.finalize()
    }

    #[test]
    fn test_review_counts_as_success() {
        let report = sample_report();
        assert_eq!(report.results.success, 2);
        assert_eq!(report.results.manual_review, 1);
        assert_eq!(report.results.skipped_duplicate, 1);
        assert_eq!(report.results.failed, 1);
        assert_eq!(
            report.results.success + report.results.failed + report.results.skipped_duplicate,
            report.input_files
        );
        assert_eq!(report.manual_review[0].reason, "low confidence: 0.40; unknown category: x");
    }

    #[test]
    fn test_stats() {
        let report = sample_report();
        assert_eq!(report.stats.by_category.get("sales"), Some(&1));
        assert_eq!(report.stats.by_category.get("medical"), Some(&1));
        assert_eq!(report.stats.by_type.get("ML"), Some(&1));
        assert_eq!(report.stats.by_type.get("BK"), Some(&1));
        assert_eq!(entry_type("weird"), "OTHER");
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(sample_report()).unwrap();
        for key in [
            "run_id",
            "started_at",
            "completed_at",
            "input_files",
            "results",
            "files_created",
            "errors",
            "skipped_duplicate",
            "manual_review",
            "stats",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        let review = &value["manual_review"][0];
        assert_eq!(review["source"], "d.pdf");
        assert_eq!(review["entry_id"], "BK_002_P001");
        assert!(review["reason"].is_string());
        assert_eq!(value["errors"][0]["moved_to"], "intake/failed/c.mov");
    }

    #[test]
    fn test_persist_and_load() {
        let dir = tempdir().unwrap();
        let report = sample_report();

        let path = report.persist(&dir.path().join("logs/pipeline")).unwrap();
        assert!(path.ends_with("report_20241003_101500.json"));
        assert_eq!(PipelineReport::load(&path).unwrap(), report);
    }

    #[test]
    fn test_persist_unwritable_dir_errors() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("logs");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = sample_report().persist(&blocker.join("pipeline")).unwrap_err();
        assert!(matches!(err, IngestError::Report(_)));
    }

    #[test]
    fn test_run_id_suffix_when_taken() {
        let dir = tempdir().unwrap();
        let now = Local.with_ymd_and_hms(2024, 10, 3, 10, 15, 0).unwrap();

        assert_eq!(generate_run_id(dir.path(), now), "20241003_101500");
        std::fs::write(dir.path().join("report_20241003_101500.json"), "{}").unwrap();
        assert_eq!(generate_run_id(dir.path(), now), "20241003_101500_1");
    }

    #[test]
    fn test_find_report() {
        let dir = tempdir().unwrap();
        assert!(matches!(find_report(dir.path(), "latest"), ReportLookup::Empty));

        for id in ["20241001_090000", "20241003_101500", "20241002_120000"] {
            std::fs::write(dir.path().join(format!("report_{}.json", id)), "{}").unwrap();
        }

        assert_eq!(list_reports(dir.path())[0], "20241003_101500");
        match find_report(dir.path(), "latest") {
            ReportLookup::Found(path) => assert!(path.ends_with("report_20241003_101500.json")),
            other => panic!("unexpected {:?}", other),
        }
        match find_report(dir.path(), "19990101_000000") {
            ReportLookup::NotFound { available } => assert_eq!(available.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_concurrent_record() {
        let aggregator = Arc::new(ReportAggregator::new("run", 64));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let aggregator = Arc::clone(&aggregator);
                std::thread::spawn(move || {
                    for i in 0..8 {
                        aggregator.record(Outcome::Success(entry(
                            &format!("f{}_{}.txt", t, i),
                            "sales",
                            "ML_1",
                        )));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(aggregator.finalize().results.success, 64);
    }

    #[test]
    fn test_summary_surfaces_review_and_failures() {
        colored::control::set_override(false);
        let summary = sample_report().render_summary();
        assert!(summary.contains("Needs manual review:"));
        assert!(summary.contains("d.pdf"));
        assert!(summary.contains("c.mov: Extraction failed for c.mov: ffmpeg missing"));
    }
}
