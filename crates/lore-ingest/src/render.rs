//! Markdown rendering of knowledge entries.

use chrono::Local;
use lore_core::{AnalysisResult, IdPrefix};
use regex::Regex;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const MAX_TITLE_CHARS: usize = 50;

static SERIES_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(seminar|lecture).*?vol\.?_?(\d+).*?(\d{4})").expect("series name pattern")
});

/// Formats an analysis result as a knowledge entry.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        result: &AnalysisResult,
        entry_id: &str,
        source_name: &str,
        source_file: &str,
    ) -> String;
}

/// Frontmatter plus Markdown body.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(
        &self,
        result: &AnalysisResult,
        entry_id: &str,
        source_name: &str,
        source_file: &str,
    ) -> String {
        let mut out = String::new();

        out.push_str("---\n");
        let _ = writeln!(out, "id: {}", entry_id);
        let _ = writeln!(out, "category: {}", yaml_scalar(&result.category));
        let _ = writeln!(out, "sub_category: {}", yaml_scalar(&result.sub_category));
        let _ = writeln!(out, "source: {}", yaml_scalar(source_name));
        let _ = writeln!(out, "priority: {}", result.priority);
        let _ = writeln!(out, "tags: {}", yaml_list(&result.tags));
        let _ = writeln!(out, "tones: {}", yaml_list(&result.tones));
        let _ = writeln!(out, "confidence: {:.2}", result.confidence);
        let _ = writeln!(out, "quality_score: {:.2}", result.quality_score);
        let _ = writeln!(
            out,
            "generated_at: {}",
            yaml_scalar(&Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
        );
        let _ = writeln!(out, "source_file: {}", yaml_scalar(source_file));
        let _ = writeln!(out, "needs_review: {}", result.needs_manual_review);
        out.push_str("---\n\n");

        let _ = writeln!(out, "# {}\n", result.title);

        if !result.summary.is_empty() {
            for line in result.summary.lines() {
                let _ = writeln!(out, "> {}", line);
            }
            out.push('\n');
        }

        for section in &result.sections {
            if !section.heading.is_empty() {
                let _ = writeln!(out, "## {}\n", section.heading);
            }
            let _ = writeln!(out, "{}\n", section.content.trim());
        }

        if !result.qa_pairs.is_empty() {
            out.push_str("---\n\n## Q&A\n\n");
            for qa in &result.qa_pairs {
                let _ = writeln!(out, "### Q: {}\n", qa.question);
                let _ = writeln!(out, "{}\n", qa.answer.trim());
            }
        }

        if !result.image_descriptions.is_empty() {
            out.push_str("---\n\n## Images\n\n");
            for description in &result.image_descriptions {
                let _ = writeln!(out, "- {}", description);
            }
            out.push('\n');
        }

        out.trim_end().to_string() + "\n"
    }
}

/// Quote a scalar when plain YAML would misread it.
fn yaml_scalar(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.contains(": ")
        || value.contains(" #")
        || value.starts_with(|c: char| "[]{}&*!|>'\"%@`#,?-".contains(c) || c.is_whitespace())
        || value.ends_with(char::is_whitespace)
        || matches!(value, "true" | "false" | "null" | "yes" | "no");

    if needs_quotes {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

fn yaml_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| yaml_scalar(v)).collect();
    format!("[{}]", items.join(", "))
}

/// Make a title safe for use in a file name.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control())
        .take(MAX_TITLE_CHARS)
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<knowledge>/<prefix dir>/<entry_id>_<sanitized title>.md`
pub fn destination_path(knowledge_dir: &Path, prefix: IdPrefix, entry_id: &str, title: &str) -> PathBuf {
    knowledge_dir
        .join(prefix.knowledge_dir())
        .join(format!("{}_{}.md", entry_id, sanitize_title(title)))
}

/// Human-readable source name: recorded series like `seminar_vol5_2024`
/// become `Seminar Vol.5 (2024)`, anything else keeps its file name.
pub fn infer_source_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match SERIES_NAME.captures(&stem) {
        Some(caps) => {
            let keyword = caps[1].to_lowercase();
            let mut chars = keyword.chars();
            let keyword = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => keyword.clone(),
            };
            format!("{} Vol.{} ({})", keyword, &caps[2], &caps[3])
        }
        None => file_name,
    }
}
