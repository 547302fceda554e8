//! Content extraction for each supported file kind.

mod docx;
mod markdown;
mod media;
mod pdf;
mod text;

pub use docx::extract_docx;
pub use markdown::extract_markdown;
pub use pdf::{clean_pdf_text, extract_pdf};
pub use text::extract_text;

use crate::error::{IngestError, IngestResult};
use async_trait::async_trait;
use lore_config::ProcessingConfig;
use lore_core::{ExtractedContent, FileKind};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Turns a claimed intake file into text plus attached images.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract `path`. Images produced along the way are written under
    /// `scratch_dir`, which the caller removes at the end of the run.
    async fn extract(
        &self,
        path: &Path,
        kind: FileKind,
        scratch_dir: &Path,
    ) -> IngestResult<ExtractedContent>;
}

/// Default extractor: document parsers plus Whisper / ffmpeg / Tesseract.
#[derive(Debug, Clone)]
pub struct MediaExtractor {
    whisper_model: String,
    language: String,
    ocr_enabled: bool,
}

impl MediaExtractor {
    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            whisper_model: config.whisper_model.clone(),
            language: config.language.clone(),
            ocr_enabled: config.ocr_enabled,
        }
    }

    fn extract_blocking(
        &self,
        path: &Path,
        kind: FileKind,
        scratch_dir: &Path,
    ) -> IngestResult<ExtractedContent> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        debug!("Extracting {:?} as {}", path, kind);

        match kind {
            FileKind::Text => extract_text(path),
            FileKind::Pdf => extract_pdf(path),
            FileKind::Docx => extract_docx(path, scratch_dir),
            FileKind::Audio => media::extract_audio_file(
                path,
                &self.whisper_model,
                &self.language,
                scratch_dir,
            ),
            FileKind::Video => media::extract_video_file(
                path,
                &self.whisper_model,
                &self.language,
                scratch_dir,
            ),
            FileKind::Image => media::extract_image_file(path, self.ocr_enabled),
        }
    }
}

impl Default for MediaExtractor {
    fn default() -> Self {
        Self::from_config(&ProcessingConfig::default())
    }
}

#[async_trait]
impl Extractor for MediaExtractor {
    async fn extract(
        &self,
        path: &Path,
        kind: FileKind,
        scratch_dir: &Path,
    ) -> IngestResult<ExtractedContent> {
        let this = self.clone();
        let path: PathBuf = path.to_path_buf();
        let scratch_dir = scratch_dir.to_path_buf();
        let name = display_name(&path);

        tokio::task::spawn_blocking(move || this.extract_blocking(&path, kind, &scratch_dir))
            .await
            .map_err(|e| IngestError::extraction(name, format!("extraction task failed: {}", e)))?
    }
}

/// File name used in error messages.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
