//! Test doubles for the pipeline collaborators.
//!
//! These let the orchestrator run end to end without external tools, a
//! model server, or (with [`MemoryLifecycle`]) the intake directories.

use crate::analyze::{AnalyzeError, Analyzer};
use crate::error::{IngestError, IngestResult};
use crate::extract::Extractor;
use crate::lifecycle::LifecycleStore;
use async_trait::async_trait;
use lore_core::{
    AnalysisResult, ExtractedContent, FileDescriptor, FileKind, FileState, Priority, Section,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::error;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// What [`MockExtractor`] does for a given file name.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this text.
    Text(String),
    /// Return an extraction error with this message.
    Fail(String),
    /// Never complete.
    Hang,
    /// Panic inside the worker.
    Panic,
}

/// Extractor with per-file scripted behaviour.
///
/// Files without a script get a default text long enough to pass the
/// minimum-content check.
#[derive(Debug, Default)]
pub struct MockExtractor {
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, behavior: MockBehavior) -> Self {
        lock(&self.behaviors).insert(name.to_string(), behavior);
        self
    }

    pub fn fail(self, name: &str, message: &str) -> Self {
        self.with(name, MockBehavior::Fail(message.to_string()))
    }

    /// Sleep this long inside every extraction.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Highest number of extractions observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn default_text(name: &str) -> String {
        format!(
            "Notes taken from {}. The speaker explains how to prepare for a client \
             meeting, which questions to ask, and how to follow up afterwards.",
            name
        )
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(
        &self,
        path: &Path,
        kind: FileKind,
        _scratch_dir: &Path,
    ) -> IngestResult<ExtractedContent> {
        let name = file_name(path);
        let behavior = lock(&self.behaviors)
            .get(&name)
            .cloned()
            .unwrap_or_else(|| MockBehavior::Text(Self::default_text(&name)));

        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = match behavior {
            MockBehavior::Text(text) => Ok(ExtractedContent::new(path, kind, text)),
            MockBehavior::Fail(message) => Err(IngestError::Extraction {
                file: name,
                message,
            }),
            MockBehavior::Hang => std::future::pending().await,
            MockBehavior::Panic => panic!("extractor crashed on {}", name),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Analyzer with per-file scripted responses and call counting.
///
/// Scripted responses are consumed in order; once exhausted (or for files
/// without a script) a confident default result is returned.
#[derive(Debug, Default)]
pub struct MockAnalyzer {
    scripts: Mutex<HashMap<String, VecDeque<Result<AnalysisResult, AnalyzeError>>>>,
    always_transient: Mutex<HashSet<String>>,
    titles: Mutex<HashMap<String, String>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, name: &str, responses: Vec<Result<AnalysisResult, AnalyzeError>>) -> Self {
        lock(&self.scripts).insert(name.to_string(), responses.into());
        self
    }

    /// Fail `name` transiently `times` times, then succeed.
    pub fn transient_then_ok(self, name: &str, times: usize) -> Self {
        let responses = (0..times)
            .map(|i| Err(AnalyzeError::Transient(format!("timeout #{}", i + 1))))
            .collect();
        self.script(name, responses)
    }

    /// Fail every call for `name` transiently.
    pub fn always_transient(self, name: &str) -> Self {
        lock(&self.always_transient).insert(name.to_string());
        self
    }

    /// Title of the default result for `name`.
    pub fn with_title(self, name: &str, title: &str) -> Self {
        lock(&self.titles).insert(name.to_string(), title.to_string());
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        lock(&self.calls).get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// Confident classification used when nothing is scripted.
    pub fn confident_result(title: &str, text: &str) -> AnalysisResult {
        AnalysisResult {
            category: "sales".to_string(),
            sub_category: "closing".to_string(),
            priority: Priority::Medium,
            tags: vec!["follow-up".to_string()],
            tones: vec!["analytical".to_string()],
            title: title.to_string(),
            summary: format!("Summary of {}.", title),
            sections: vec![Section {
                heading: "Overview".to_string(),
                content: text.to_string(),
            }],
            qa_pairs: Vec::new(),
            image_descriptions: Vec::new(),
            confidence: 0.9,
            quality_score: 0.9,
            needs_manual_review: false,
            review_reasons: Vec::new(),
        }
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(&self, content: &ExtractedContent) -> Result<AnalysisResult, AnalyzeError> {
        let name = content.source_name();
        *lock(&self.calls).entry(name.clone()).or_insert(0) += 1;

        if lock(&self.always_transient).contains(&name) {
            return Err(AnalyzeError::Transient(format!("analysis timed out for {}", name)));
        }

        if let Some(scripted) = lock(&self.scripts).get_mut(&name).and_then(VecDeque::pop_front) {
            return scripted;
        }

        let title = lock(&self.titles)
            .get(&name)
            .cloned()
            .unwrap_or_else(|| content.source_stem());
        Ok(Self::confident_result(&title, &content.text))
    }
}

/// In-memory lifecycle store; paths are virtual under `root`.
#[derive(Debug)]
pub struct MemoryLifecycle {
    root: PathBuf,
    states: Mutex<HashMap<String, FileState>>,
}

impl MemoryLifecycle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Register `name` as a raw file and return its descriptor.
    pub fn add_raw(&self, name: &str) -> Option<FileDescriptor> {
        let path = self.path_in(FileState::Raw, name);
        let kind = FileKind::from_path(&path)?;
        lock(&self.states).insert(name.to_string(), FileState::Raw);
        Some(FileDescriptor::new(path, kind))
    }

    pub fn state_of(&self, name: &str) -> Option<FileState> {
        lock(&self.states).get(name).copied()
    }

    fn path_in(&self, state: FileState, name: &str) -> PathBuf {
        self.root.join(state.dir_name()).join(name)
    }

    fn transition(&self, name: &str, from: &[FileState], to: FileState) -> io::Result<PathBuf> {
        let mut states = lock(&self.states);
        match states.get(name) {
            Some(state) if from.contains(state) => {
                states.insert(name.to_string(), to);
                Ok(self.path_in(to, name))
            }
            other => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is {:?}, expected one of {:?}", name, other, from),
            )),
        }
    }
}

impl LifecycleStore for MemoryLifecycle {
    fn claim(&self, file: &FileDescriptor) -> IngestResult<PathBuf> {
        Ok(self.transition(&file.name(), &[FileState::Raw], FileState::Processing)?)
    }

    fn complete(&self, file: &FileDescriptor) -> IngestResult<PathBuf> {
        Ok(self.transition(&file.name(), &[FileState::Processing], FileState::Completed)?)
    }

    fn fail(&self, file: &FileDescriptor, reason: &str) -> Option<PathBuf> {
        match self.transition(
            &file.name(),
            &[FileState::Raw, FileState::Processing],
            FileState::Failed,
        ) {
            Ok(path) => Some(path),
            Err(e) => {
                error!("Could not move {} to failed/ after error '{}': {}", file.name(), reason, e);
                None
            }
        }
    }

    fn list(&self, state: FileState) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.states)
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}
