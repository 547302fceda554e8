//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use lore_core::TypeFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub taxonomy: TaxonomyConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration for a project root.
    ///
    /// Order: an explicit file, then `<root>/config/lore.toml`, then the
    /// per-user config file, then defaults.
    pub fn resolve(root: &Path, explicit: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::Invalid(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from(path);
        }

        let project_file = Self::project_file(root);
        if project_file.exists() {
            debug!("Using project config {:?}", project_file);
            return Self::load_from(&project_file);
        }

        match AppPaths::new() {
            Some(paths) if paths.config_file.exists() => {
                debug!("Using user config {:?}", paths.config_file);
                Self::load_from(&paths.config_file)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Location of the project-local config file.
    pub fn project_file(root: &Path) -> PathBuf {
        root.join("config").join("lore.toml")
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_config_string())?;
        Ok(())
    }

    /// Reject values no run can work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.retry.attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("review.min_confidence", self.review.min_confidence),
            ("review.min_quality", self.review.min_quality),
            ("review.verify_below", self.review.verify_below),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Lore Configuration
# Knowledge intake pipeline

[pipeline]
# Number of files processed concurrently
workers = 5

# Extracted text shorter than this (in characters) is rejected
min_content_chars = 30

# Run the verification pass on low-confidence classifications
verify = true

# Restrict runs to one content type: text, video, audio, image, media
# type_filter = "media"

[retry]
# Total analysis attempts per file before the fallback classification is used
attempts = 3

# Delay before retry k is base_delay_ms * k
base_delay_ms = 1000

[review]
# Entries below these scores are flagged for manual review
min_confidence = 0.6
min_quality = 0.6

# Classifications at or above this confidence skip verification
verify_below = 0.95

[ollama]
host = "http://localhost:11434"
model = "gpt-oss:20b"
vision_model = "llava"
timeout_seconds = 180

[processing]
# Whisper model size: tiny, base, small, medium, large
whisper_model = "base"
language = "en"
ocr_enabled = true
cleanup_transcripts = true

[taxonomy]
fallback_category = "unclassified"
tones = ["encouraging", "critical", "analytical", "empathetic", "casual", "passionate"]
# Leave empty to accept free-form tags
tags = []

[taxonomy.categories]
sales = ["prospecting", "closing", "referrals", "presentation", "objection handling"]
corporate = ["financial statements", "retirement planning", "succession", "tax planning", "cash flow"]
estate = ["inheritance tax", "asset transfer", "wills and trusts", "real estate"]
medical = ["clinic founding", "private practice", "malpractice", "practice succession"]
mindset = ["professionalism", "motivation", "goal setting", "time management"]
compliance = ["solicitation rules", "privacy", "suitability", "disclosure"]

# Spelling variants rewritten before classification
[taxonomy.terminology]
# "P&L" = "P/L"

[ui]
color = true
"#
        .to_string()
    }
}

/// Run-level pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
    pub min_content_chars: usize,
    pub verify: bool,
    pub type_filter: Option<TypeFilter>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            min_content_chars: 30,
            verify: true,
            type_filter: None,
        }
    }
}

/// Retry policy for the analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Manual review thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub min_confidence: f64,
    pub min_quality: f64,
    pub verify_below: f64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            min_quality: 0.6,
            verify_below: 0.95,
        }
    }
}

/// Ollama LLM settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
    pub vision_model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "gpt-oss:20b".to_string(),
            vision_model: "llava".to_string(),
            timeout_seconds: 180,
        }
    }
}

/// Media extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub whisper_model: String,
    pub language: String,
    pub ocr_enabled: bool,
    pub cleanup_transcripts: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            whisper_model: "base".to_string(),
            language: "en".to_string(),
            ocr_enabled: true,
            cleanup_transcripts: true,
        }
    }
}

/// Label vocabulary the analyzer validates against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    pub categories: BTreeMap<String, Vec<String>>,
    pub tags: Vec<String>,
    pub tones: Vec<String>,
    pub fallback_category: String,
    pub terminology: BTreeMap<String, String>,
}

impl TaxonomyConfig {
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    pub fn sub_categories(&self, category: &str) -> &[String] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        let categories = [
            (
                "sales",
                &["prospecting", "closing", "referrals", "presentation", "objection handling"][..],
            ),
            (
                "corporate",
                &["financial statements", "retirement planning", "succession", "tax planning", "cash flow"][..],
            ),
            (
                "estate",
                &["inheritance tax", "asset transfer", "wills and trusts", "real estate"][..],
            ),
            (
                "medical",
                &["clinic founding", "private practice", "malpractice", "practice succession"][..],
            ),
            (
                "mindset",
                &["professionalism", "motivation", "goal setting", "time management"][..],
            ),
            (
                "compliance",
                &["solicitation rules", "privacy", "suitability", "disclosure"][..],
            ),
        ]
        .into_iter()
        .map(|(name, subs)| {
            (
                name.to_string(),
                subs.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect();

        Self {
            categories,
            tags: Vec::new(),
            tones: ["encouraging", "critical", "analytical", "empathetic", "casual", "passionate"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fallback_category: "unclassified".to_string(),
            terminology: BTreeMap::new(),
        }
    }
}

/// UI/Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { color: true }
    }
}
