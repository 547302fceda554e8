//! Lore Ingest - The intake pipeline.
//!
//! This crate provides:
//! - Discovery of intake files and their lifecycle across `raw/`,
//!   `processing/`, `completed/` and `failed/`
//! - Collision-free entry id allocation
//! - The per-file pipeline (extract, analyze, render, store) with retry
//!   and failure isolation
//! - A bounded worker pool and the run report

pub mod analyze;
mod discover;
mod error;
pub mod extract;
mod ids;
mod lifecycle;
mod pipeline;
mod pool;
mod render;
mod report;
mod run;
mod store;
pub mod testing;

pub use analyze::{
    analyze_with_retry, AnalyzeError, Analyzer, AnalyzerSettings, LanguageModel, OllamaAnalyzer, RetryPolicy,
};
pub use discover::discover;
pub use error::{IngestError, IngestResult};
pub use extract::{Extractor, MediaExtractor};
pub use ids::{next_id, read_frontmatter_id, scan_counters, IdAllocator};
pub use lifecycle::{move_file, FsLifecycle, LifecycleStore};
pub use pipeline::{PipelineExecutor, PipelineSettings, DUPLICATE_REASON};
pub use pool::WorkerPool;
pub use render::{destination_path, infer_source_name, sanitize_title, MarkdownRenderer, Renderer};
pub use report::{
    find_report, generate_run_id, list_reports, DuplicateRecord, EntryRecord, FailureRecord,
    Outcome, PipelineReport, ReportAggregator, ReportLookup, ReviewRecord,
};
pub use run::{Pipeline, RunOptions, RunOutcome};
pub use store::{store_exclusive, StoreOutcome};
