//! Multi-pass analyzer backed by an Ollama server.

use super::json::extract_json;
use super::labels::{fuzzy_match, normalize_terminology, validate_labels};
use super::{prompts, AnalyzeError, Analyzer};
use crate::error::{IngestError, IngestResult};
use async_trait::async_trait;
use base64::Engine;
use lore_config::{Config, ReviewConfig, TaxonomyConfig};
use lore_core::{truncate_chars, AnalysisResult, ExtractedContent, ExtractedImage, Priority, QaPair, Section};
use lore_ollama::{GenerateOptions, GenerateRequest, OllamaClient, OllamaError, OllamaResult};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

const MAX_SECTIONS: usize = 8;
const FALLBACK_SECTION_CHARS: usize = 3000;
const CLEANUP_MIN_CHARS: usize = 100;
const CLEANUP_CHUNK_CHARS: usize = 10000;

/// Text generation backend used by the analyzer.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run a non-streaming generation and return the response text.
    async fn complete(&self, request: GenerateRequest) -> OllamaResult<String>;
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, request: GenerateRequest) -> OllamaResult<String> {
        Ok(self.generate(request).await?.response)
    }
}

/// Why a JSON pass produced no usable object.
#[derive(Error, Debug)]
enum PassError {
    #[error("{0}")]
    Model(#[from] OllamaError),

    #[error("{0}")]
    Parse(String),
}

impl PassError {
    /// Backend errors keep their own retry classification; malformed output is retried.
    fn into_analyze(self, context: &str) -> AnalyzeError {
        let transient = match &self {
            PassError::Model(e) => e.is_transient(),
            PassError::Parse(_) => true,
        };
        let message = format!("{}: {}", context, self);
        if transient {
            AnalyzeError::Transient(message)
        } else {
            AnalyzeError::Permanent(message)
        }
    }
}

/// Models, vocabulary and thresholds for the analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub text_model: String,
    pub vision_model: String,
    pub taxonomy: TaxonomyConfig,
    pub review: ReviewConfig,
    pub verify: bool,
    pub min_content_chars: usize,
    pub cleanup_transcripts: bool,
}

impl AnalyzerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            text_model: config.ollama.model.clone(),
            vision_model: config.ollama.vision_model.clone(),
            taxonomy: config.taxonomy.clone(),
            review: config.review.clone(),
            verify: config.pipeline.verify,
            min_content_chars: config.pipeline.min_content_chars,
            cleanup_transcripts: config.processing.cleanup_transcripts,
        }
    }
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Classification, structuring and verification in three model passes.
pub struct OllamaAnalyzer<M = OllamaClient> {
    model: M,
    settings: AnalyzerSettings,
}

impl OllamaAnalyzer<OllamaClient> {
    pub fn from_config(config: &Config) -> IngestResult<Self> {
        let client = OllamaClient::from_config(&config.ollama)
            .map_err(|e| IngestError::Setup(format!("Failed to create Ollama client: {}", e)))?;
        Ok(Self::new(client, AnalyzerSettings::from_config(config)))
    }
}

impl<M: LanguageModel> OllamaAnalyzer<M> {
    pub fn new(model: M, settings: AnalyzerSettings) -> Self {
        Self { model, settings }
    }

    async fn json_pass(&self, prompt: String) -> Result<Value, PassError> {
        let request = GenerateRequest::new(&self.settings.text_model, prompt)
            .with_system(prompts::SYSTEM)
            .with_json_format()
            .with_options(GenerateOptions::new().with_temperature(0.2));

        let response = self.model.complete(request).await?;
        extract_json(&response).ok_or_else(|| PassError::Parse("response was not a JSON object".to_string()))
    }

    /// Describe attached images; a failed image becomes a placeholder line.
    async fn describe_images(&self, content: &ExtractedContent) -> Vec<String> {
        let mut descriptions = Vec::with_capacity(content.images.len());
        let context = truncate_chars(content.text.trim(), 500).to_string();

        for image in &content.images {
            let name = image_name(image);
            match self.describe_image(image, &context).await {
                Ok(text) if !text.is_empty() => descriptions.push(format!("[image: {}] {}", name, text)),
                Ok(_) => descriptions.push(format!("[image: {} - description unavailable]", name)),
                Err(e) => {
                    warn!("Could not describe image {}: {}", name, e);
                    descriptions.push(format!("[image: {} - description unavailable]", name));
                }
            }
        }

        descriptions
    }

    async fn describe_image(&self, image: &ExtractedImage, context: &str) -> Result<String, String> {
        let bytes = tokio::fs::read(&image.path).await.map_err(|e| e.to_string())?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

        let request = GenerateRequest::new(&self.settings.vision_model, prompts::describe_image(context))
            .with_images(vec![encoded])
            .with_options(GenerateOptions::new().with_temperature(0.2));

        let response = self.model.complete(request).await.map_err(|e| e.to_string())?;
        Ok(response.trim().to_string())
    }

    /// Clean a transcript chunk by chunk; a failed chunk is kept as is.
    async fn clean_transcript(&self, text: &str) -> String {
        let chunks = sentence_chunks(text, CLEANUP_CHUNK_CHARS);
        let mut cleaned = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            let request = GenerateRequest::new(&self.settings.text_model, prompts::cleanup_transcript(chunk))
                .with_options(GenerateOptions::new().with_temperature(0.1));

            match self.model.complete(request).await {
                Ok(response) if !response.trim().is_empty() => cleaned.push(response.trim().to_string()),
                Ok(_) => cleaned.push(chunk.trim().to_string()),
                Err(e) => {
                    warn!("Transcript cleanup failed for chunk {}: {}", i + 1, e);
                    cleaned.push(chunk.trim().to_string());
                }
            }
        }

        cleaned.join("\n\n")
    }

    async fn preprocess(&self, content: &ExtractedContent) -> (String, Vec<String>) {
        let mut text = content.text.trim().to_string();

        if content.kind.is_spoken()
            && self.settings.cleanup_transcripts
            && text.chars().count() > CLEANUP_MIN_CHARS
        {
            text = self.clean_transcript(&text).await;
        }

        let descriptions = self.describe_images(content).await;
        if !descriptions.is_empty() {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str("## Image descriptions\n\n");
            text.push_str(&descriptions.join("\n\n---\n\n"));
        }

        (normalize_terminology(&text, &self.settings.taxonomy), descriptions)
    }

    async fn classify(&self, text: &str, content: &ExtractedContent) -> Result<AnalysisResult, AnalyzeError> {
        let prompt = prompts::classify(text, &content.source_name(), &self.settings.taxonomy);
        let value = self
            .json_pass(prompt)
            .await
            .map_err(|e| e.into_analyze("classification failed"))?;

        let (Some(category), Some(confidence)) = (value["category"].as_str(), value["confidence"].as_f64())
        else {
            return Err(AnalyzeError::Transient(
                "classification response missing category or confidence".to_string(),
            ));
        };

        let title = non_empty(&value["title"])
            .or_else(|| content.title_hint.clone())
            .unwrap_or_else(|| content.source_stem());

        Ok(AnalysisResult {
            category: category.to_string(),
            sub_category: non_empty(&value["sub_category"]).unwrap_or_default(),
            priority: value["priority"]
                .as_str()
                .and_then(|p| p.parse::<Priority>().ok())
                .unwrap_or_default(),
            tags: string_list(&value["tags"]),
            tones: string_list(&value["tones"]),
            title,
            summary: non_empty(&value["summary"]).unwrap_or_default(),
            sections: Vec::new(),
            qa_pairs: Vec::new(),
            image_descriptions: Vec::new(),
            confidence: confidence.clamp(0.0, 1.0),
            quality_score: 0.0,
            needs_manual_review: false,
            review_reasons: Vec::new(),
        })
    }

    async fn structure(&self, text: &str, result: &mut AnalysisResult) {
        let parsed = self
            .json_pass(prompts::structure(text, result))
            .await
            .and_then(|value| {
                let sections = parse_sections(&value["sections"]);
                if sections.is_empty() {
                    Err(PassError::Parse("no sections returned".to_string()))
                } else {
                    Ok((sections, parse_qa(&value["qa_pairs"])))
                }
            });

        match parsed {
            Ok((sections, qa_pairs)) => {
                result.sections = sections;
                result.qa_pairs = qa_pairs;
            }
            Err(e) => {
                warn!("Structuring failed, keeping a single section: {}", e);
                let heading = if result.title.is_empty() {
                    "Content".to_string()
                } else {
                    result.title.clone()
                };
                result.sections = vec![Section {
                    heading,
                    content: truncate_chars(text, FALLBACK_SECTION_CHARS).to_string(),
                }];
            }
        }
    }

    async fn verify(&self, text: &str, result: &mut AnalysisResult) {
        let taxonomy = &self.settings.taxonomy;
        let value = match self.json_pass(prompts::verify(text, result, taxonomy)).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Verification failed, using confidence as quality: {}", e);
                result.quality_score = result.confidence;
                return;
            }
        };

        result.quality_score = value["quality_score"].as_f64().unwrap_or(0.0).clamp(0.0, 1.0);

        let corrections = &value["corrections"];
        if let Some(category) = corrections["category"].as_str() {
            if let Some(valid) = fuzzy_match(category, &taxonomy.category_names()) {
                if valid != result.category {
                    debug!("Verification corrected category {} -> {}", result.category, valid);
                    result.category = valid.to_string();
                }
            }
        }
        if let Some(priority) = corrections["priority"].as_str().and_then(|p| p.parse().ok()) {
            result.priority = priority;
        }
        if let Some(sub) = non_empty(&corrections["sub_category"]) {
            result.sub_category = sub;
        }
        if let Some(title) = non_empty(&corrections["title"]) {
            result.title = title;
        }
        if let Some(summary) = non_empty(&corrections["summary"]) {
            result.summary = summary;
        }

        result.review_reasons.extend(string_list(&value["issues"]));
    }

    fn flag_for_review(&self, result: &mut AnalysisResult) {
        let review = &self.settings.review;
        let low_confidence = result.confidence < review.min_confidence;
        let low_quality = result.quality_score > 0.0 && result.quality_score < review.min_quality;

        if low_confidence {
            result
                .review_reasons
                .push(format!("low confidence: {:.2}", result.confidence));
        }
        if low_quality {
            result
                .review_reasons
                .push(format!("low quality score: {:.2}", result.quality_score));
        }
        result.needs_manual_review |= low_confidence || low_quality;
    }
}

#[async_trait]
impl<M: LanguageModel> Analyzer for OllamaAnalyzer<M> {
    async fn analyze(&self, content: &ExtractedContent) -> Result<AnalysisResult, AnalyzeError> {
        let (text, descriptions) = self.preprocess(content).await;

        let chars = text.trim().chars().count();
        if chars < self.settings.min_content_chars {
            return Err(AnalyzeError::Permanent(format!(
                "content too short for analysis ({} chars, minimum {})",
                chars, self.settings.min_content_chars
            )));
        }

        let mut result = self.classify(&text, content).await?;
        result.image_descriptions = descriptions;
        validate_labels(&mut result, &self.settings.taxonomy);

        self.structure(&text, &mut result).await;

        if self.settings.verify && result.confidence < self.settings.review.verify_below {
            self.verify(&text, &mut result).await;
        } else {
            result.quality_score = result.confidence;
        }

        self.flag_for_review(&mut result);

        info!(
            "Analyzed {}: {}/{} (confidence {:.2}, quality {:.2})",
            content.source_name(),
            result.category,
            result.sub_category,
            result.confidence,
            result.quality_score
        );

        Ok(result)
    }
}

fn image_name(image: &ExtractedImage) -> String {
    image
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.path.display().to_string())
}

fn non_empty(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(non_empty).collect())
        .unwrap_or_default()
}

fn parse_sections(value: &Value) -> Vec<Section> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let content = non_empty(&item["content"])?;
                    Some(Section {
                        heading: non_empty(&item["heading"]).unwrap_or_default(),
                        content,
                    })
                })
                .take(MAX_SECTIONS)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_qa(value: &Value) -> Vec<QaPair> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(QaPair {
                        question: non_empty(&item["question"])?,
                        answer: non_empty(&item["answer"])?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Split `text` into chunks of at most `max_chars`, breaking after sentence
/// ends where possible. A single sentence longer than the limit is its own chunk.
pub(crate) fn sentence_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for sentence in text.split_inclusive(|c: char| matches!(c, '.' | '?' | '!' | '\n')) {
        let len = sentence.chars().count();
        if current_chars + len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push_str(sentence);
        current_chars += len;
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks
}
