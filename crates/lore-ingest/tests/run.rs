//! End-to-end runs of the ingestion pipeline against a temporary project,
//! with scripted extractors and analyzers standing in for external tools.

use async_trait::async_trait;
use chrono::NaiveDate;
use lore_config::ProjectLayout;
use lore_core::FileState;
use lore_ingest::testing::{MemoryLifecycle, MockAnalyzer, MockBehavior, MockExtractor};
use lore_ingest::{
    AnalyzerSettings, FsLifecycle, IngestError, LanguageModel, LifecycleStore, OllamaAnalyzer, Pipeline,
    PipelineReport, PipelineSettings, RetryPolicy, RunOptions, RunOutcome, DUPLICATE_REASON,
};
use lore_ollama::{GenerateRequest, OllamaError, OllamaResult};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

fn project(files: &[&str]) -> (TempDir, ProjectLayout) {
    let dir = tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    layout.ensure_dirs().unwrap();
    for name in files {
        fs::write(layout.raw_dir.join(name), format!("contents of {}", name)).unwrap();
    }
    (dir, layout)
}

fn pipeline(layout: &ProjectLayout, extractor: Arc<MockExtractor>, analyzer: Arc<MockAnalyzer>) -> Pipeline {
    Pipeline::new(layout.clone(), extractor, analyzer)
        .with_settings(PipelineSettings {
            retry: RetryPolicy::immediate(3),
            ..PipelineSettings::default()
        })
        .with_date(NaiveDate::from_ymd_opt(2024, 10, 3).unwrap())
}

fn options(workers: usize) -> RunOptions {
    RunOptions {
        input_dir: None,
        workers,
        type_filter: None,
        dry_run: false,
    }
}

fn names_in(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

async fn completed_run(pipeline: &Pipeline, options: &RunOptions) -> (PipelineReport, std::path::PathBuf) {
    match pipeline.run(options).await.unwrap() {
        RunOutcome::Completed { report, path } => (report, path),
        other => panic!("expected a completed run, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mixed_run_with_duplicate_and_failure() {
    let (_dir, layout) = project(&["a.txt", "b.pdf", "c.mov"]);
    let existing = layout
        .knowledge_dir
        .join("articles")
        .join("BK_001_P001_Closing Techniques.md");
    fs::create_dir_all(existing.parent().unwrap()).unwrap();
    fs::write(&existing, "hand-written notes\n").unwrap();

    let extractor = Arc::new(MockExtractor::new().fail("c.mov", "ffmpeg exited with status 1"));
    let analyzer = Arc::new(MockAnalyzer::new().with_title("b.pdf", "Closing Techniques"));
    let (report, path) = completed_run(&pipeline(&layout, extractor, analyzer), &options(2)).await;

    assert!(path.exists());
    assert_eq!(report.input_files, 3);
    assert_eq!(report.results.success, 1);
    assert_eq!(report.results.skipped_duplicate, 1);
    assert_eq!(report.results.failed, 1);

    assert_eq!(report.files_created[0].source, "a.txt");
    assert_eq!(report.skipped_duplicate[0].source, "b.pdf");
    assert_eq!(report.skipped_duplicate[0].reason, DUPLICATE_REASON);
    assert_eq!(report.errors[0].source, "c.mov");
    assert!(report.errors[0].error.contains("ffmpeg exited with status 1"));
    assert_eq!(report.errors[0].moved_to.as_deref(), Some("intake/failed/c.mov"));

    assert_eq!(names_in(&layout.completed_dir), set(&["a.txt", "b.pdf"]));
    assert_eq!(names_in(&layout.failed_dir), set(&["c.mov"]));
    assert!(names_in(&layout.raw_dir).is_empty());
    assert!(names_in(&layout.processing_dir).is_empty());

    assert_eq!(fs::read_to_string(&existing).unwrap(), "hand-written notes\n");
}

#[tokio::test]
async fn test_every_file_lands_in_exactly_one_place() {
    let files = ["one.txt", "two.md", "three.pdf", "four.mp3", "five.png", "six.mov"];

    for workers in 1..=4 {
        let (_dir, layout) = project(&files);
        let extractor = Arc::new(
            MockExtractor::new()
                .fail("three.pdf", "corrupt xref table")
                .with("five.png", MockBehavior::Text("[OCR error] tesseract crashed".into())),
        );
        let analyzer = Arc::new(MockAnalyzer::new());
        let (report, _) = completed_run(&pipeline(&layout, extractor, analyzer), &options(workers)).await;

        let completed = names_in(&layout.completed_dir);
        let failed = names_in(&layout.failed_dir);
        assert!(completed.is_disjoint(&failed));
        assert_eq!(&completed | &failed, set(&files));
        assert_eq!(failed, set(&["five.png", "three.pdf"]));

        let counted = report.results.success + report.results.failed + report.results.skipped_duplicate;
        assert_eq!(counted, report.input_files);
        assert_eq!(report.input_files, files.len());
    }
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let (_dir, layout) = project(&["notes.txt"]);
    let analyzer = Arc::new(MockAnalyzer::new().transient_then_ok("notes.txt", 2));
    let run = pipeline(&layout, Arc::new(MockExtractor::new()), Arc::clone(&analyzer));

    let (report, _) = completed_run(&run, &options(1)).await;

    assert_eq!(analyzer.calls("notes.txt"), 3);
    assert_eq!(report.results.success, 1);
    assert_eq!(report.files_created[0].category, "sales");
    assert!(report.manual_review.is_empty());
}

#[tokio::test]
async fn test_exhausted_retries_store_fallback_entry() {
    let (_dir, layout) = project(&["notes.txt"]);
    let analyzer = Arc::new(MockAnalyzer::new().always_transient("notes.txt"));
    let run = pipeline(&layout, Arc::new(MockExtractor::new()), Arc::clone(&analyzer));

    let (report, _) = completed_run(&run, &options(1)).await;

    assert_eq!(analyzer.calls("notes.txt"), 3);
    assert_eq!(report.results.success, 1);
    assert_eq!(report.results.manual_review, 1);
    assert_eq!(report.files_created[0].category, "unclassified");
    assert_eq!(report.files_created[0].confidence, 0.0);
    assert!(layout.root.join(&report.files_created[0].output).exists());
    assert_eq!(names_in(&layout.completed_dir), set(&["notes.txt"]));
}

#[tokio::test]
async fn test_permanent_rejection_fails_file() {
    let (_dir, layout) = project(&["notes.txt"]);
    let analyzer = Arc::new(MockAnalyzer::new().script(
        "notes.txt",
        vec![Err(lore_ingest::AnalyzeError::Permanent("content too short".into()))],
    ));
    let run = pipeline(&layout, Arc::new(MockExtractor::new()), Arc::clone(&analyzer));

    let (report, _) = completed_run(&run, &options(1)).await;

    assert_eq!(analyzer.calls("notes.txt"), 1);
    assert_eq!(report.results.failed, 1);
    assert_eq!(names_in(&layout.failed_dir), set(&["notes.txt"]));
}

/// A server that has never pulled the requested model.
struct MissingModel;

#[async_trait]
impl LanguageModel for MissingModel {
    async fn complete(&self, request: GenerateRequest) -> OllamaResult<String> {
        Err(OllamaError::ModelNotFound { model: request.model })
    }
}

#[tokio::test]
async fn test_missing_model_fails_file_without_retry() {
    let (_dir, layout) = project(&["notes.txt"]);
    let analyzer = Arc::new(OllamaAnalyzer::new(MissingModel, AnalyzerSettings::default()));
    let run = Pipeline::new(layout.clone(), Arc::new(MockExtractor::new()), analyzer)
        .with_settings(PipelineSettings {
            retry: RetryPolicy::immediate(3),
            ..PipelineSettings::default()
        });

    let (report, _) = completed_run(&run, &options(1)).await;

    assert_eq!(report.results.success, 0);
    assert_eq!(report.results.failed, 1);
    assert!(report.errors[0].error.contains("Model not found"));
    assert!(report.files_created.is_empty());
    assert_eq!(names_in(&layout.failed_dir), set(&["notes.txt"]));
    assert!(names_in(&layout.completed_dir).is_empty());
}

#[test]
fn test_invalid_config_is_rejected_at_setup() {
    let (_dir, layout) = project(&[]);
    let mut config = lore_config::Config::default();
    config.retry.attempts = 0;

    let result = Pipeline::from_config(layout, &config);
    assert!(matches!(result, Err(IngestError::Config(_))));
}

#[tokio::test]
async fn test_one_failure_does_not_affect_others() {
    let files = ["a.txt", "b.txt", "c.txt", "d.txt"];

    for workers in 1..=files.len() {
        let (_dir, layout) = project(&files);
        let extractor = Arc::new(MockExtractor::new().fail("b.txt", "unreadable"));
        let (report, _) = completed_run(
            &pipeline(&layout, extractor, Arc::new(MockAnalyzer::new())),
            &options(workers),
        )
        .await;

        let sources: BTreeSet<String> = report.files_created.iter().map(|e| e.source.clone()).collect();
        assert_eq!(sources, set(&["a.txt", "c.txt", "d.txt"]));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].source, "b.txt");
    }
}

#[tokio::test]
async fn test_ids_unique_and_increase_across_runs() {
    let (_dir, layout) = project(&["a.txt", "b.txt", "c.md", "d.txt", "e.txt"]);
    let run = pipeline(&layout, Arc::new(MockExtractor::new()), Arc::new(MockAnalyzer::new()));

    let (first, _) = completed_run(&run, &options(4)).await;
    let ids: BTreeSet<String> = first.files_created.iter().map(|e| e.entry_id.clone()).collect();
    assert_eq!(ids.len(), 5);
    assert_eq!(first.stats.by_type.get("ML"), Some(&5));

    fs::write(layout.raw_dir.join("f.txt"), "later").unwrap();
    let (second, _) = completed_run(&run, &options(4)).await;
    let next = &second.files_created[0].entry_id;

    assert!(!ids.contains(next));
    assert!(ids.iter().all(|id| id < next), "{} should sort after {:?}", next, ids);
}

#[tokio::test]
async fn test_workers_bound_concurrency() {
    let files = ["1.txt", "2.txt", "3.txt", "4.txt", "5.txt", "6.txt"];
    let (_dir, layout) = project(&files);
    let extractor = Arc::new(MockExtractor::new().with_delay(Duration::from_millis(50)));
    let run = pipeline(&layout, Arc::clone(&extractor), Arc::new(MockAnalyzer::new()));

    let (report, _) = completed_run(&run, &options(2)).await;

    assert_eq!(report.results.success, files.len());
    assert_eq!(extractor.calls(), files.len());
    assert!(extractor.max_in_flight() <= 2);
    assert!(extractor.max_in_flight() >= 1);
}

#[tokio::test]
async fn test_panicking_worker_is_recorded_as_failure() {
    let (_dir, layout) = project(&["crash.txt", "fine.txt"]);
    let extractor = Arc::new(MockExtractor::new().with("crash.txt", MockBehavior::Panic));
    let run = pipeline(&layout, extractor, Arc::new(MockAnalyzer::new()));

    let (report, _) = completed_run(&run, &options(2)).await;

    assert_eq!(report.results.success, 1);
    assert_eq!(report.results.failed, 1);
    assert_eq!(report.errors[0].source, "crash.txt");
    assert!(report.errors[0].error.contains("worker panicked"));
    assert_eq!(names_in(&layout.failed_dir), set(&["crash.txt"]));
    assert_eq!(names_in(&layout.completed_dir), set(&["fine.txt"]));
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let dir = tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    fs::create_dir_all(&layout.raw_dir).unwrap();
    fs::write(layout.raw_dir.join("a.txt"), "a").unwrap();
    fs::write(layout.raw_dir.join("b.mp4"), "b").unwrap();

    let extractor = Arc::new(MockExtractor::new());
    let analyzer = Arc::new(MockAnalyzer::new());
    let run = pipeline(&layout, Arc::clone(&extractor), Arc::clone(&analyzer));
    let outcome = run
        .run(&RunOptions {
            dry_run: true,
            ..options(2)
        })
        .await
        .unwrap();

    match outcome {
        RunOutcome::DryRun(files) => {
            let names: Vec<String> = files.iter().map(|f| f.name()).collect();
            assert_eq!(names, vec!["a.txt", "b.mp4"]);
        }
        other => panic!("expected a dry run, got {:?}", other),
    }
    assert_eq!(extractor.calls(), 0);
    assert_eq!(analyzer.total_calls(), 0);
    assert_eq!(names_in(&layout.raw_dir), set(&["a.txt", "b.mp4"]));
    assert!(!layout.knowledge_dir.exists());
    assert!(!layout.report_dir.exists());
}

#[tokio::test]
async fn test_empty_intake_writes_no_report() {
    let (_dir, layout) = project(&[]);
    let run = pipeline(&layout, Arc::new(MockExtractor::new()), Arc::new(MockAnalyzer::new()));

    let outcome = run.run(&options(3)).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Empty));
    assert!(names_in(&layout.report_dir).is_empty());
}

#[tokio::test]
async fn test_unwritable_report_location_aborts_run() {
    let dir = tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    fs::create_dir_all(&layout.raw_dir).unwrap();
    fs::write(layout.raw_dir.join("a.txt"), "a").unwrap();
    fs::create_dir_all(layout.report_dir.parent().unwrap()).unwrap();
    fs::write(&layout.report_dir, "not a directory").unwrap();

    let run = pipeline(&layout, Arc::new(MockExtractor::new()), Arc::new(MockAnalyzer::new()));
    let result = run.run(&options(1)).await;

    assert!(matches!(result, Err(IngestError::Setup(_))));
    assert_eq!(names_in(&layout.raw_dir), set(&["a.txt"]));
}

#[tokio::test]
async fn test_scratch_directory_removed_after_run() {
    let (_dir, layout) = project(&["a.txt"]);
    fs::create_dir_all(layout.tmp_images_dir.join("a")).unwrap();
    fs::write(layout.tmp_images_dir.join("a").join("frame.png"), "png").unwrap();

    let run = pipeline(&layout, Arc::new(MockExtractor::new()), Arc::new(MockAnalyzer::new()));
    completed_run(&run, &options(1)).await;

    assert!(!layout.tmp_images_dir.exists());
}

#[tokio::test]
async fn test_report_round_trips_from_disk() {
    let (_dir, layout) = project(&["a.txt", "b.pdf"]);
    let run = pipeline(&layout, Arc::new(MockExtractor::new()), Arc::new(MockAnalyzer::new()));

    let (report, path) = completed_run(&run, &options(2)).await;
    let loaded = PipelineReport::load(&path).unwrap();

    assert_eq!(loaded, report);
    assert_eq!(loaded.stats.by_category.get("sales"), Some(&2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hung_extractor_blocks_run_but_not_other_files() {
    let (_dir, layout) = project(&["stuck.mp4", "quick.txt"]);
    let extractor = Arc::new(MockExtractor::new().with("stuck.mp4", MockBehavior::Hang));
    let run = pipeline(&layout, extractor, Arc::new(MockAnalyzer::new()));

    let result = tokio::time::timeout(Duration::from_millis(500), run.run(&options(2))).await;

    assert!(result.is_err());
    assert_eq!(names_in(&layout.completed_dir), set(&["quick.txt"]));
    assert_eq!(names_in(&layout.processing_dir), set(&["stuck.mp4"]));
}

#[tokio::test]
async fn test_in_memory_lifecycle_tracks_states() {
    let (_dir, layout) = project(&["a.txt", "b.txt"]);
    let lifecycle = Arc::new(MemoryLifecycle::new(&layout.intake_dir));
    lifecycle.add_raw("a.txt").unwrap();
    lifecycle.add_raw("b.txt").unwrap();

    let extractor = Arc::new(MockExtractor::new().fail("b.txt", "bad encoding"));
    let run = pipeline(&layout, extractor, Arc::new(MockAnalyzer::new()))
        .with_lifecycle(Arc::clone(&lifecycle) as Arc<dyn LifecycleStore>);

    let (report, _) = completed_run(&run, &options(2)).await;

    assert_eq!(report.results.success, 1);
    assert_eq!(lifecycle.state_of("a.txt"), Some(FileState::Completed));
    assert_eq!(lifecycle.state_of("b.txt"), Some(FileState::Failed));
    assert_eq!(lifecycle.list(FileState::Completed), vec!["a.txt"]);
    // Real files are untouched by the in-memory store.
    assert_eq!(names_in(&layout.raw_dir), set(&["a.txt", "b.txt"]));
}

#[test]
fn test_fs_lifecycle_lists_states() {
    let (_dir, layout) = project(&["a.txt", "b.txt"]);
    let lifecycle = FsLifecycle::new(layout.clone());

    assert_eq!(lifecycle.list(FileState::Raw), vec!["a.txt", "b.txt"]);
    assert!(lifecycle.list(FileState::Completed).is_empty());
}
