//! Core domain types for Lore.

use crate::error::Error;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of raw file accepted into the intake area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Text,
    Pdf,
    Docx,
    Video,
    Audio,
    Image,
}

impl FileKind {
    pub const ALL: [FileKind; 6] = [
        FileKind::Text,
        FileKind::Pdf,
        FileKind::Docx,
        FileKind::Video,
        FileKind::Audio,
        FileKind::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Text => "text",
            FileKind::Pdf => "pdf",
            FileKind::Docx => "docx",
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Image => "image",
        }
    }

    /// Detect the kind from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "md" | "csv" => Some(FileKind::Text),
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            "mp4" | "mov" | "avi" | "mkv" | "wmv" => Some(FileKind::Video),
            "mp3" | "wav" | "m4a" | "aac" | "ogg" | "flac" => Some(FileKind::Audio),
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" => Some(FileKind::Image),
            _ => None,
        }
    }

    /// Detect the kind of a path from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// The entry id prefix used for knowledge entries derived from this kind.
    pub fn id_prefix(&self) -> IdPrefix {
        match self {
            FileKind::Video => IdPrefix::Vid,
            FileKind::Audio => IdPrefix::Aud,
            FileKind::Pdf => IdPrefix::Bk,
            FileKind::Docx | FileKind::Text => IdPrefix::Ml,
            FileKind::Image => IdPrefix::Pr,
        }
    }

    /// Whether the content is a transcript of spoken media.
    pub fn is_spoken(&self) -> bool {
        matches!(self, FileKind::Video | FileKind::Audio)
    }
}

impl FromStr for FileKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown file kind: {}", s)))
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Content-type filter applied during discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    Text,
    Video,
    Audio,
    Image,
    Media,
}

impl TypeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeFilter::Text => "text",
            TypeFilter::Video => "video",
            TypeFilter::Audio => "audio",
            TypeFilter::Image => "image",
            TypeFilter::Media => "media",
        }
    }

    /// Kinds admitted by this filter.
    pub fn allowed_kinds(&self) -> &'static [FileKind] {
        match self {
            TypeFilter::Text => &[FileKind::Text, FileKind::Pdf, FileKind::Docx],
            TypeFilter::Video => &[FileKind::Video],
            TypeFilter::Audio => &[FileKind::Audio],
            TypeFilter::Image => &[FileKind::Image],
            TypeFilter::Media => &[FileKind::Video, FileKind::Audio, FileKind::Image],
        }
    }

    pub fn allows(&self, kind: FileKind) -> bool {
        self.allowed_kinds().contains(&kind)
    }
}

impl FromStr for TypeFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(TypeFilter::Text),
            "video" => Ok(TypeFilter::Video),
            "audio" => Ok(TypeFilter::Audio),
            "image" => Ok(TypeFilter::Image),
            "media" => Ok(TypeFilter::Media),
            other => Err(Error::InvalidInput(format!("unknown type filter: {}", other))),
        }
    }
}

impl std::fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Origin code of a knowledge entry, used for id formatting and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdPrefix {
    Vid,
    Aud,
    Qa,
    Ml,
    Bk,
    Tl,
    Nl,
    Pr,
}

impl IdPrefix {
    pub const ALL: [IdPrefix; 8] = [
        IdPrefix::Vid,
        IdPrefix::Aud,
        IdPrefix::Qa,
        IdPrefix::Ml,
        IdPrefix::Bk,
        IdPrefix::Tl,
        IdPrefix::Nl,
        IdPrefix::Pr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Vid => "VID",
            IdPrefix::Aud => "AUD",
            IdPrefix::Qa => "QA",
            IdPrefix::Ml => "ML",
            IdPrefix::Bk => "BK",
            IdPrefix::Tl => "TL",
            IdPrefix::Nl => "NL",
            IdPrefix::Pr => "PR",
        }
    }

    /// Subdirectory of the knowledge root that holds entries with this prefix.
    pub fn knowledge_dir(&self) -> &'static str {
        match self {
            IdPrefix::Vid => "seminars",
            IdPrefix::Aud => "trainings",
            IdPrefix::Qa => "qa",
            IdPrefix::Ml | IdPrefix::Bk | IdPrefix::Nl => "articles",
            IdPrefix::Tl | IdPrefix::Pr => "sales_tools",
        }
    }

    /// Format the identifier for counter value `n`.
    ///
    /// The layouts differ per prefix and are read by downstream tooling:
    /// `QA_007`, `VID_202410_07_01`, `BK_007_P001`, `ML_202410_007`.
    pub fn format_id(&self, n: u64, as_of: NaiveDate) -> String {
        let ym = as_of.format("%Y%m");
        match self {
            IdPrefix::Qa => format!("QA_{:03}", n),
            IdPrefix::Vid | IdPrefix::Aud => format!("{}_{}_{:02}_01", self.as_str(), ym, n),
            IdPrefix::Bk => format!("BK_{:03}_P001", n),
            _ => format!("{}_{}_{:03}", self.as_str(), ym, n),
        }
    }
}

impl FromStr for IdPrefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdPrefix::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown id prefix: {}", s)))
    }
}

impl std::fmt::Display for IdPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of an intake file.
///
/// The state is never stored: it is whichever lifecycle directory currently
/// holds the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Raw,
    Processing,
    Completed,
    Failed,
}

impl FileState {
    pub const ALL: [FileState; 4] = [
        FileState::Raw,
        FileState::Processing,
        FileState::Completed,
        FileState::Failed,
    ];

    /// Name of the lifecycle directory representing this state.
    pub fn dir_name(&self) -> &'static str {
        match self {
            FileState::Raw => "raw",
            FileState::Processing => "processing",
            FileState::Completed => "completed",
            FileState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::Completed | FileState::Failed)
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// A discovered intake file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub kind: FileKind,
}

impl FileDescriptor {
    pub fn new(path: impl Into<PathBuf>, kind: FileKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// File name; this is the file's identity across lifecycle directories.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// An image produced during extraction (or the intake file itself for images).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedImage {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl ExtractedImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            page: None,
        }
    }
}

/// Output of the extraction stage.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub source_path: PathBuf,
    pub kind: FileKind,
    pub text: String,
    pub images: Vec<ExtractedImage>,
    /// Title found inside the document (first H1, document heading).
    pub title_hint: Option<String>,
    pub metadata: serde_json::Value,
}

impl ExtractedContent {
    pub fn new(source_path: impl Into<PathBuf>, kind: FileKind, text: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            kind,
            text: text.into(),
            images: Vec::new(),
            title_hint: None,
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_images(mut self, images: Vec<ExtractedImage>) -> Self {
        self.images = images;
        self
    }

    pub fn with_title_hint(mut self, title: impl Into<String>) -> Self {
        self.title_hint = Some(title.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Stem of the source file, used as a last-resort title.
    pub fn source_stem(&self) -> String {
        self.source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn source_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Editorial priority of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" | "mid" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(Error::InvalidInput(format!("unknown priority: {}", other))),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// Output of the analysis stage: labels plus the structured body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub category: String,
    pub sub_category: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub tones: Vec<String>,
    pub title: String,
    pub summary: String,
    pub sections: Vec<Section>,
    pub qa_pairs: Vec<QaPair>,
    pub image_descriptions: Vec<String>,
    pub confidence: f64,
    pub quality_score: f64,
    pub needs_manual_review: bool,
    pub review_reasons: Vec<String>,
}

impl AnalysisResult {
    /// Low-confidence classification used when analysis could not be obtained.
    pub fn fallback(content: &ExtractedContent, category: &str, reason: impl Into<String>) -> Self {
        let body = truncate_chars(content.text.trim(), 3000);
        let title = content
            .title_hint
            .clone()
            .unwrap_or_else(|| content.source_stem());
        Self {
            category: category.to_string(),
            sub_category: String::new(),
            priority: Priority::Medium,
            tags: Vec::new(),
            tones: Vec::new(),
            sections: if body.is_empty() {
                Vec::new()
            } else {
                vec![Section {
                    heading: title.clone(),
                    content: body.to_string(),
                }]
            },
            title,
            summary: String::new(),
            qa_pairs: Vec::new(),
            image_descriptions: Vec::new(),
            confidence: 0.0,
            quality_score: 0.0,
            needs_manual_review: true,
            review_reasons: vec![reason.into()],
        }
    }
}

/// Slice `s` to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
