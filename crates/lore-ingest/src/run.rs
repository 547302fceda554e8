//! Run-level orchestration: discovery, fan-out, report.

use crate::analyze::{Analyzer, OllamaAnalyzer};
use crate::discover::discover;
use crate::error::{IngestError, IngestResult};
use crate::extract::{Extractor, MediaExtractor};
use crate::ids::IdAllocator;
use crate::lifecycle::{FsLifecycle, LifecycleStore};
use crate::pipeline::{PipelineExecutor, PipelineSettings};
use crate::pool::WorkerPool;
use crate::render::{MarkdownRenderer, Renderer};
use crate::report::{generate_run_id, PipelineReport, ReportAggregator};
use chrono::{Local, NaiveDate};
use lore_config::{Config, ProjectLayout};
use lore_core::{FileDescriptor, TypeFilter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Parameters of a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Intake directory; defaults to `intake/raw`.
    pub input_dir: Option<PathBuf>,
    pub workers: usize,
    pub type_filter: Option<TypeFilter>,
    /// List what would be processed without touching anything.
    pub dry_run: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            input_dir: None,
            workers: config.pipeline.workers,
            type_filter: config.pipeline.type_filter,
            dry_run: false,
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Nothing to process.
    Empty,
    /// Files that would be processed.
    DryRun(Vec<FileDescriptor>),
    Completed { report: PipelineReport, path: PathBuf },
}

/// The ingestion orchestrator and its collaborators.
pub struct Pipeline {
    layout: ProjectLayout,
    extractor: Arc<dyn Extractor>,
    analyzer: Arc<dyn Analyzer>,
    renderer: Arc<dyn Renderer>,
    lifecycle: Arc<dyn LifecycleStore>,
    settings: PipelineSettings,
    as_of: Option<NaiveDate>,
}

impl Pipeline {
    pub fn new(layout: ProjectLayout, extractor: Arc<dyn Extractor>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            lifecycle: Arc::new(FsLifecycle::new(layout.clone())),
            renderer: Arc::new(MarkdownRenderer),
            settings: PipelineSettings::default(),
            layout,
            extractor,
            analyzer,
            as_of: None,
        }
    }

    /// Default collaborators: media tools for extraction, Ollama for analysis.
    pub fn from_config(layout: ProjectLayout, config: &Config) -> IngestResult<Self> {
        config.validate()?;
        let extractor = MediaExtractor::from_config(&config.processing);
        let analyzer = OllamaAnalyzer::from_config(config)?;
        Ok(Self::new(layout, Arc::new(extractor), Arc::new(analyzer))
            .with_settings(PipelineSettings::from_config(config)))
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn LifecycleStore>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Date used for date-scoped ids; defaults to today.
    pub fn with_date(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Discover and process every intake file, then persist the report.
    ///
    /// Per-file problems never fail the run; only setup errors and an
    /// unwritable report directory do.
    pub async fn run(&self, options: &RunOptions) -> IngestResult<RunOutcome> {
        let input_dir = options
            .input_dir
            .clone()
            .unwrap_or_else(|| self.layout.raw_dir.clone());

        if !options.dry_run {
            self.layout.ensure_dirs().map_err(|e| {
                IngestError::Setup(format!(
                    "cannot create project directories under {:?}: {}",
                    self.layout.root, e
                ))
            })?;
        }

        let files = discover(&input_dir, options.type_filter)?;
        if files.is_empty() {
            return Ok(RunOutcome::Empty);
        }
        if options.dry_run {
            return Ok(RunOutcome::DryRun(files));
        }

        let now = Local::now();
        let run_id = generate_run_id(&self.layout.report_dir, now);
        let as_of = self.as_of.unwrap_or_else(|| now.date_naive());
        info!("Run {}: {} files from {:?}", run_id, files.len(), input_dir);

        let executor = Arc::new(PipelineExecutor::new(
            self.layout.clone(),
            Arc::clone(&self.extractor),
            Arc::clone(&self.analyzer),
            Arc::clone(&self.renderer),
            Arc::clone(&self.lifecycle),
            Arc::new(IdAllocator::seed(&self.layout.knowledge_dir, as_of)),
            self.settings.clone(),
        ));
        let aggregator = Arc::new(ReportAggregator::new(run_id, files.len()));

        WorkerPool::new(options.workers)
            .run(executor, files, Arc::clone(&aggregator))
            .await;

        let report = aggregator.finalize();
        let persisted = report.persist(&self.layout.report_dir);
        self.cleanup_scratch();

        let path = persisted?;
        Ok(RunOutcome::Completed { report, path })
    }

    fn cleanup_scratch(&self) {
        let scratch = &self.layout.tmp_images_dir;
        if scratch.exists() {
            if let Err(e) = std::fs::remove_dir_all(scratch) {
                warn!("Could not remove scratch directory {:?}: {}", scratch, e);
            }
        }
    }
}
