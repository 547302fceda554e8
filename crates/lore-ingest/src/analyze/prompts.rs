//! Prompt builders for the analysis passes.

use lore_config::TaxonomyConfig;
use lore_core::{truncate_chars, AnalysisResult};

const CLASSIFY_CHARS: usize = 6000;
const STRUCTURE_CHARS: usize = 12000;
const VERIFY_CHARS: usize = 4000;

pub(super) const SYSTEM: &str = "You are an editor curating a professional knowledge base. \
Answer with a single JSON object and nothing else.";

fn taxonomy_block(taxonomy: &TaxonomyConfig) -> String {
    let mut block = String::from("Categories and sub-categories:\n");
    for (category, subs) in &taxonomy.categories {
        block.push_str(&format!("- {}: {}\n", category, subs.join(", ")));
    }
    if !taxonomy.tags.is_empty() {
        block.push_str(&format!("Allowed tags: {}\n", taxonomy.tags.join(", ")));
    }
    if !taxonomy.tones.is_empty() {
        block.push_str(&format!("Allowed tones: {}\n", taxonomy.tones.join(", ")));
    }
    block
}

pub(super) fn classify(text: &str, source_name: &str, taxonomy: &TaxonomyConfig) -> String {
    format!(
        "Classify the following document.\n\n{}\n\
Return JSON with keys: category, sub_category, priority (high|medium|low), \
tags (list), tones (list), title (short, descriptive), summary (2-3 sentences), \
confidence (0.0-1.0).\n\nSource file: {}\n\nDocument:\n{}",
        taxonomy_block(taxonomy),
        source_name,
        truncate_chars(text, CLASSIFY_CHARS)
    )
}

pub(super) fn structure(text: &str, labels: &AnalysisResult) -> String {
    format!(
        "Restructure the document below into a knowledge entry titled \"{}\" \
(category: {}).\n\
Return JSON with keys: sections (list of {{\"heading\", \"content\"}}, at most 8) and \
qa_pairs (list of {{\"question\", \"answer\"}} covering the key practical points).\n\
Keep the original facts; do not invent details.\n\nDocument:\n{}",
        labels.title,
        labels.category,
        truncate_chars(text, STRUCTURE_CHARS)
    )
}

pub(super) fn verify(text: &str, labels: &AnalysisResult, taxonomy: &TaxonomyConfig) -> String {
    format!(
        "Review this classification of a document.\n\n{}\n\
Proposed: category={}, sub_category={}, priority={}, title=\"{}\", summary=\"{}\".\n\n\
Return JSON with keys: quality_score (0.0-1.0), corrections (object with any of \
category, sub_category, priority, title, summary that should change) and \
issues (list of short strings).\n\nDocument:\n{}",
        taxonomy_block(taxonomy),
        labels.category,
        labels.sub_category,
        labels.priority,
        labels.title,
        labels.summary,
        truncate_chars(text, VERIFY_CHARS)
    )
}

pub(super) fn describe_image(context: &str) -> String {
    format!(
        "Describe this image for a knowledge base entry. Transcribe any visible text, \
explain charts or diagrams, and keep it under 150 words.{}",
        if context.is_empty() {
            String::new()
        } else {
            format!("\n\nSurrounding document: {}", context)
        }
    )
}

pub(super) fn cleanup_transcript(chunk: &str) -> String {
    format!(
        "Clean up this speech transcript: fix punctuation, remove filler words and \
false starts, keep the wording and meaning. Return only the cleaned text.\n\n{}",
        chunk
    )
}
