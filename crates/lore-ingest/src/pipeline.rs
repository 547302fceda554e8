//! Per-file pipeline: extract, analyze, render, store.

use crate::analyze::{analyze_with_retry, Analyzer, RetryPolicy};
use crate::error::{IngestError, IngestResult};
use crate::extract::Extractor;
use crate::ids::IdAllocator;
use crate::lifecycle::LifecycleStore;
use crate::render::{destination_path, infer_source_name, Renderer};
use crate::report::{DuplicateRecord, EntryRecord, FailureRecord, Outcome};
use crate::store::{store_exclusive, StoreOutcome};
use lore_config::{Config, ProjectLayout};
use lore_core::{ExtractedContent, FileDescriptor, FileKind};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Reason recorded for duplicate outputs.
pub const DUPLICATE_REASON: &str = "destination already exists";

/// Tunables of the per-file pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Extracted text shorter than this (with no images) is unusable.
    pub min_content_chars: usize,
    pub retry: RetryPolicy,
    pub fallback_category: String,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_content_chars: config.pipeline.min_content_chars,
            retry: RetryPolicy::from_config(&config.retry),
            fallback_category: config.taxonomy.fallback_category.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Runs the stage sequence for single files and turns every error into a
/// `Failed` outcome.
pub struct PipelineExecutor {
    layout: ProjectLayout,
    extractor: Arc<dyn Extractor>,
    analyzer: Arc<dyn Analyzer>,
    renderer: Arc<dyn Renderer>,
    lifecycle: Arc<dyn LifecycleStore>,
    ids: Arc<IdAllocator>,
    settings: PipelineSettings,
}

impl PipelineExecutor {
    pub fn new(
        layout: ProjectLayout,
        extractor: Arc<dyn Extractor>,
        analyzer: Arc<dyn Analyzer>,
        renderer: Arc<dyn Renderer>,
        lifecycle: Arc<dyn LifecycleStore>,
        ids: Arc<IdAllocator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            layout,
            extractor,
            analyzer,
            renderer,
            lifecycle,
            ids,
            settings,
        }
    }

    /// Process one file. Never fails: errors become `Outcome::Failed` and the
    /// file is moved to `failed/`.
    #[instrument(skip_all, fields(file = %file.name(), kind = %file.kind))]
    pub async fn process(&self, file: &FileDescriptor) -> Outcome {
        match self.run_stages(file).await {
            Ok(outcome) => outcome,
            Err(e) => self.fail(file, &e.to_string()),
        }
    }

    /// Record a failure for `file` and move it to `failed/`.
    pub fn fail(&self, file: &FileDescriptor, message: &str) -> Outcome {
        error!("Failed to process {}: {}", file.name(), message);
        let moved_to = self
            .lifecycle
            .fail(file, message)
            .map(|path| self.layout.relative(&path));

        Outcome::Failed(FailureRecord {
            source: file.name(),
            error: message.to_string(),
            moved_to,
        })
    }

    async fn run_stages(&self, file: &FileDescriptor) -> IngestResult<Outcome> {
        let claimed = self.lifecycle.claim(file)?;

        let kind = FileKind::from_path(&claimed)
            .ok_or_else(|| IngestError::UnsupportedFormat(file.name()))?;

        let scratch_dir = self.layout.tmp_images_dir.join(file.stem());
        let content = self.extractor.extract(&claimed, kind, &scratch_dir).await?;
        self.check_extracted(file, &content)?;
        debug!("Extracted {} chars, {} images", content.text.len(), content.images.len());

        let result = analyze_with_retry(
            self.analyzer.as_ref(),
            &content,
            &self.settings.retry,
            &self.settings.fallback_category,
        )
        .await?;

        let prefix = kind.id_prefix();
        let entry_id = self.ids.allocate(prefix);
        let source_name = infer_source_name(&file.path);
        let markdown = self
            .renderer
            .render(&result, &entry_id, &source_name, &file.name());

        let title = if result.title.trim().is_empty() {
            file.stem()
        } else {
            result.title.clone()
        };
        let destination = destination_path(&self.layout.knowledge_dir, prefix, &entry_id, &title);

        match store_exclusive(&destination, &markdown)? {
            StoreOutcome::AlreadyExists(path) => {
                self.lifecycle.complete(file)?;
                let output = self.layout.relative(&path);
                warn!("Skipping {}: {} ({})", file.name(), DUPLICATE_REASON, output);
                Ok(Outcome::SkippedDuplicate(DuplicateRecord {
                    source: file.name(),
                    output,
                    reason: DUPLICATE_REASON.to_string(),
                }))
            }
            StoreOutcome::Written(path) => {
                self.lifecycle.complete(file)?;
                let entry = EntryRecord {
                    source: file.name(),
                    output: self.layout.relative(&path),
                    category: result.category.clone(),
                    sub_category: result.sub_category.clone(),
                    priority: result.priority.to_string(),
                    confidence: result.confidence,
                    quality_score: result.quality_score,
                    entry_id,
                };
                info!("Stored {} as {}", file.name(), entry.output);

                if result.needs_manual_review {
                    Ok(Outcome::NeedsManualReview {
                        entry,
                        reasons: result.review_reasons,
                    })
                } else {
                    Ok(Outcome::Success(entry))
                }
            }
        }
    }

    /// Reject empty extractions and extractor error sentinels.
    fn check_extracted(&self, file: &FileDescriptor, content: &ExtractedContent) -> IngestResult<()> {
        let text = content.text.trim();

        if let Some(first_line) = text.lines().next() {
            let first_line = first_line.trim();
            if first_line.starts_with('[') && first_line.to_lowercase().contains("error") {
                return Err(IngestError::extraction(file.name(), first_line));
            }
        }

        if content.images.is_empty() && text.chars().count() < self.settings.min_content_chars {
            return Err(IngestError::extraction(
                file.name(),
                format!(
                    "no usable content ({} chars extracted)",
                    text.chars().count()
                ),
            ));
        }

        Ok(())
    }
}
