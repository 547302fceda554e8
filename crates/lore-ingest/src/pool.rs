//! Bounded worker pool.

use crate::pipeline::PipelineExecutor;
use crate::report::ReportAggregator;
use futures_util::future::join_all;
use lore_core::FileDescriptor;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// Runs the pipeline for many files with at most `workers` in flight.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self { workers }
    }

    /// Effective concurrency for `files` inputs: at least one, at most one per file.
    pub fn permits_for(&self, files: usize) -> usize {
        self.workers.clamp(1, files.max(1))
    }

    /// Process every file and record each outcome in `report`.
    ///
    /// Returns once all files reached a terminal outcome. A panicking task is
    /// recorded as a failure of its file.
    pub async fn run(
        &self,
        executor: Arc<PipelineExecutor>,
        files: Vec<FileDescriptor>,
        report: Arc<ReportAggregator>,
    ) {
        let permits = self.permits_for(files.len());
        debug!("Processing {} files with {} workers", files.len(), permits);
        let semaphore = Arc::new(Semaphore::new(permits));

        let tasks = files.into_iter().map(|file| {
            let executor = Arc::clone(&executor);
            let semaphore = Arc::clone(&semaphore);
            let report = Arc::clone(&report);
            let task_file = file.clone();

            let handle = tokio::spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => executor.process(&task_file).await,
                    Err(e) => executor.fail(&task_file, &format!("worker pool closed: {}", e)),
                };
                report.record(outcome);
            });

            async move { (file, handle.await) }
        });

        for (file, joined) in join_all(tasks).await {
            if let Err(e) = joined {
                error!("Worker for {} aborted: {}", file.name(), e);
                report.record(executor.fail(&file, &format!("worker panicked: {}", e)));
            }
        }
    }
}
