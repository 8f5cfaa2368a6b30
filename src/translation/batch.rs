/*!
 * Directory translation.
 *
 * Every supported document under an input tree is translated with the
 * same engine and written to the mirrored path under the output tree.
 * Files run in a bounded worker pool; a failed file is recorded in the
 * summary and never stops the others.
 */

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::errors::Result;
use crate::file_utils::FileManager;
use crate::logging::LogContext;
use crate::providers::Usage;
use crate::translation::engine::{TranslateOptions, TranslationEngine};

/// Outcome for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    pub tokens_used: Usage,
    pub chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Totals for a directory run; files are in discovery order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub files: Vec<FileReport>,
    pub succeeded: usize,
    pub failed: usize,
    pub tokens_used: Usage,
    /// Mean over succeeded files with a nonzero score
    pub average_quality: f64,
    #[serde(skip)]
    pub duration: Duration,
}

/// Reported after each file finishes
#[derive(Debug, Clone)]
pub struct BatchProgress<'a> {
    pub completed: usize,
    pub total: usize,
    pub file: &'a Path,
    pub success: bool,
}

/// Runs the engine over a directory tree
pub struct BatchTranslator {
    engine: Arc<TranslationEngine>,
    max_concurrent_files: usize,
    log: LogContext,
}

impl BatchTranslator {
    /// Concurrency comes from `concurrency.files` in the engine's config
    pub fn new(engine: Arc<TranslationEngine>) -> Self {
        let max_concurrent_files = engine.config().concurrency.files.max(1);
        Self {
            engine,
            max_concurrent_files,
            log: LogContext::default(),
        }
    }

    pub fn with_concurrency(mut self, files: usize) -> Self {
        self.max_concurrent_files = files.max(1);
        self
    }

    pub fn with_log(mut self, log: LogContext) -> Self {
        self.log = log;
        self
    }

    /// Documents that would be translated, honouring the configured ignores
    pub fn discover(&self, input_dir: &Path) -> Result<Vec<PathBuf>> {
        FileManager::find_documents(input_dir, &self.engine.config().ignore)
    }

    /// Translate every document under `input_dir` into `output_dir`
    pub async fn translate_directory<F>(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        options: &TranslateOptions,
        progress_callback: F,
    ) -> Result<BatchSummary>
    where
        F: Fn(BatchProgress<'_>) + Send + Sync,
    {
        let start = Instant::now();
        let files = self.discover(input_dir)?;
        let total = files.len();
        self.log.info(format!(
            "Found {} documents in {}",
            total,
            input_dir.display()
        ));

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_files));
        let completed = Arc::new(AtomicUsize::new(0));
        let progress_callback = &progress_callback;

        let mut results = stream::iter(files.iter().enumerate())
            .map(|(file_index, file)| {
                let semaphore = Arc::clone(&semaphore);
                let completed = Arc::clone(&completed);
                let output = FileManager::mirrored_output_path(input_dir, file, output_dir);

                async move {
                    let _permit = semaphore.acquire().await.ok();

                    let report = self.translate_one(file, output, options).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(BatchProgress {
                        completed: done,
                        total,
                        file,
                        success: report.success,
                    });

                    (file_index, report)
                }
            })
            .buffer_unordered(self.max_concurrent_files)
            .collect::<Vec<_>>()
            .await;

        // Sort results by file index to keep discovery order
        results.sort_by_key(|(idx, _)| *idx);
        let reports: Vec<FileReport> = results.into_iter().map(|(_, report)| report).collect();

        let summary = summarize(reports, start.elapsed());
        self.log.info(format!(
            "Directory done: {} succeeded, {} failed in {:.1}s",
            summary.succeeded,
            summary.failed,
            summary.duration.as_secs_f64()
        ));
        Ok(summary)
    }

    async fn translate_one(&self, input: &Path, output: PathBuf, options: &TranslateOptions) -> FileReport {
        let mut report = FileReport {
            input: input.to_path_buf(),
            output,
            success: false,
            quality: None,
            tokens_used: Usage::default(),
            chunks: 0,
            error: None,
        };

        let outcome = match self.engine.translate_file(input, options).await {
            Ok(result) => FileManager::write_to_file(&report.output, &result.content).map(|_| result),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                self.log.debug(format!("{} → {}", input.display(), report.output.display()));
                report.success = true;
                report.quality = Some(result.metadata.average_quality);
                report.tokens_used = result.metadata.tokens_used;
                report.chunks = result.chunks.len();
            }
            Err(e) => {
                self.log.error(format!("Failed to translate {}: {}", input.display(), e));
                report.error = Some(e.to_string());
            }
        }
        report
    }
}

fn summarize(files: Vec<FileReport>, duration: Duration) -> BatchSummary {
    let mut tokens_used = Usage::default();
    let mut qualities = Vec::new();
    let mut succeeded = 0;

    for file in files.iter().filter(|f| f.success) {
        succeeded += 1;
        tokens_used += file.tokens_used;
        if let Some(q) = file.quality.filter(|q| *q > 0.0) {
            qualities.push(q);
        }
    }

    let average_quality = if qualities.is_empty() {
        0.0
    } else {
        qualities.iter().sum::<f64>() / qualities.len() as f64
    };

    BatchSummary {
        failed: files.len() - succeeded,
        files,
        succeeded,
        tokens_used,
        average_quality,
        duration,
    }
}
