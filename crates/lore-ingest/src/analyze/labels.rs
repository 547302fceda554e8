//! Validation of model-produced labels against the taxonomy.

use lore_config::TaxonomyConfig;
use lore_core::AnalysisResult;
use tracing::debug;

/// Confidence ceiling applied when the model invented a category.
const UNKNOWN_CATEGORY_CONFIDENCE: f64 = 0.4;

/// Match `value` against `candidates`: case-insensitive equality first, then
/// containment in either direction. Returns the canonical candidate.
pub fn fuzzy_match<'a, S: AsRef<str>>(value: &str, candidates: &'a [S]) -> Option<&'a str> {
    let needle = value.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let names: Vec<&'a str> = candidates.iter().map(|c| c.as_ref()).collect();

    names
        .iter()
        .find(|c| c.to_lowercase() == needle)
        .or_else(|| {
            names.iter().filter(|c| !c.is_empty()).find(|c| {
                let c = c.to_lowercase();
                c.contains(&needle) || needle.contains(&c)
            })
        })
        .copied()
}

/// Bring the labels of `result` in line with the taxonomy.
///
/// Unknown categories are replaced by the fallback category with capped
/// confidence and a review reason. Sub-categories are corrected by fuzzy
/// matching; tags and tones are filtered when an allowed list is configured.
pub fn validate_labels(result: &mut AnalysisResult, taxonomy: &TaxonomyConfig) {
    let categories = taxonomy.category_names();

    match fuzzy_match(&result.category, &categories) {
        Some(category) => result.category = category.to_string(),
        None => {
            debug!("Unknown category '{}', using fallback", result.category);
            result
                .review_reasons
                .push(format!("unknown category: {}", result.category));
            result.category = taxonomy.fallback_category.clone();
            result.confidence = result.confidence.min(UNKNOWN_CATEGORY_CONFIDENCE);
        }
    }

    let subs = taxonomy.sub_categories(&result.category);
    if !subs.is_empty() {
        result.sub_category = fuzzy_match(&result.sub_category, subs)
            .map(str::to_string)
            .unwrap_or_default();
    }

    if !taxonomy.tags.is_empty() {
        result.tags = filter_known(&result.tags, &taxonomy.tags);
    }
    if !taxonomy.tones.is_empty() {
        result.tones = filter_known(&result.tones, &taxonomy.tones);
    }

    result.confidence = result.confidence.clamp(0.0, 1.0);
}

fn filter_known(values: &[String], allowed: &[String]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for value in values {
        if let Some(canonical) = fuzzy_match(value, allowed) {
            if !kept.iter().any(|k| k == canonical) {
                kept.push(canonical.to_string());
            }
        }
    }
    kept
}

/// Replace known spelling variants with their canonical form.
pub fn normalize_terminology(text: &str, taxonomy: &TaxonomyConfig) -> String {
    taxonomy
        .terminology
        .iter()
        .filter(|(variant, _)| !variant.is_empty())
        .fold(text.to_string(), |acc, (variant, canonical)| {
            acc.replace(variant.as_str(), canonical)
        })
}
