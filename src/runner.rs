//! Benchmark orchestration.
//!
//! For every configured mode: one timed batch of encrypt invocations over the
//! corpus, one timed batch of decrypt invocations over the encrypted
//! artifacts, then two lines in the report. Everything runs sequentially and
//! every invocation blocks until the tool exits.

use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::dataset::{read_corpus_meta, CorpusMeta};
use crate::error::{BenchError, Result};
use crate::harness::{measure_batch, ArtifactRetention, RunnerConfig};
use crate::report::TextReport;
use crate::tool::{resolve_tool, Invocation, InvocationOutcome, Invoker};
use crate::{CipherMode, Direction};

/// How a batch fared, judged from the exit status of each invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    Succeeded,
    PartiallyFailed {
        failed: u32,
        total: u32,
        first_error: String,
    },
    Failed {
        total: u32,
        first_error: String,
    },
}

impl BatchStatus {
    pub fn classify(outcomes: &[InvocationOutcome]) -> Self {
        let total = outcomes.len() as u32;
        let mut failures = outcomes.iter().filter(|o| !o.is_success());
        let Some(first) = failures.next() else {
            return BatchStatus::Succeeded;
        };
        let failed = 1 + failures.count() as u32;
        let first_error = first.describe();
        if failed == total {
            BatchStatus::Failed { total, first_error }
        } else {
            BatchStatus::PartiallyFailed {
                failed,
                total,
                first_error,
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchStatus::Succeeded)
    }
}

#[derive(Clone, Debug)]
pub struct BatchResult {
    pub mode: CipherMode,
    pub direction: Direction,
    pub repetitions: u32,
    pub elapsed_ms: f64,
    pub throughput_mb_s: f64,
    pub status: BatchStatus,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub started: DateTime<Local>,
    pub report_path: PathBuf,
    pub corpus: CorpusMeta,
    pub results: Vec<BatchResult>,
}

/// Transient per-repetition status line.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn stderr() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{pos}/{len}] {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    fn start_batch(&self, mode: CipherMode, direction: Direction, total: u32) {
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_message(format!("{mode} {direction}"));
    }

    fn tick(&self, repetition: u32) {
        self.bar.set_position(repetition as u64);
    }

    /// Run `f` with the bar hidden so log lines on stderr are not overdrawn.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bar.suspend(f)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Fail fast when the tool or an input file is missing.
pub fn preflight(config: &RunnerConfig) -> Result<()> {
    for (what, path) in [
        ("corpus file", &config.corpus),
        ("key file", &config.key),
        ("IV file", &config.iv),
    ] {
        if !path.is_file() {
            return Err(BenchError::MissingInput {
                what,
                path: path.clone(),
            });
        }
    }
    resolve_tool(&config.tool)?;
    Ok(())
}

/// Run every configured mode and write the report into `config.work_dir`.
pub fn run(config: &RunnerConfig, invoker: &dyn Invoker, progress: &Progress) -> Result<RunSummary> {
    config.validate()?;
    if config.preflight {
        preflight(config)?;
    }

    let corpus = read_corpus_meta(&config.corpus)?;
    let started = Local::now();
    let mut report = TextReport::create(&config.work_dir, &started, corpus.size_mb)?;
    info!(
        "benchmarking {} ({:.2} MB) with {}, {} repetitions per batch",
        corpus.path.display(),
        corpus.size_mb,
        config.tool.display(),
        config.repetitions
    );

    let mut results = Vec::with_capacity(config.modes.len() * 2);
    for &mode in &config.modes {
        let encrypt = run_batch(config, invoker, progress, mode, Direction::Encrypt, corpus.size_mb);
        report.append(&encrypt)?;
        let decrypt = run_batch(config, invoker, progress, mode, Direction::Decrypt, corpus.size_mb);
        report.append(&decrypt)?;

        if config.retention == ArtifactRetention::None {
            progress.suspend(|| remove_mode_artifacts(config, mode));
        }
        results.push(encrypt);
        results.push(decrypt);
    }
    progress.finish();

    let report_path = report.finish()?;
    info!("report written to {}", report_path.display());

    Ok(RunSummary {
        started,
        report_path,
        corpus,
        results,
    })
}

fn run_batch(
    config: &RunnerConfig,
    invoker: &dyn Invoker,
    progress: &Progress,
    mode: CipherMode,
    direction: Direction,
    size_mb: f64,
) -> BatchResult {
    let retention = config.retention;
    let work_dir = config.work_dir.as_path();
    let mut outcomes = Vec::with_capacity(config.repetitions as usize);

    progress.start_batch(mode, direction, config.repetitions);
    let measured = measure_batch(config.repetitions, |i| {
        let output = retention.artifact_path(work_dir, mode, direction, i);
        let input = match direction {
            Direction::Encrypt => config.corpus.clone(),
            Direction::Decrypt => retention.artifact_path(work_dir, mode, Direction::Encrypt, i),
        };
        let invocation = Invocation {
            tool: &config.tool,
            direction,
            input: &input,
            key: &config.key,
            iv: &config.iv,
            mode,
            output: &output,
        };
        outcomes.push(invoker.invoke(&invocation));
        progress.tick(i);
    });

    let status = BatchStatus::classify(&outcomes);
    let result = BatchResult {
        mode,
        direction,
        repetitions: measured.iters,
        elapsed_ms: measured.elapsed_ms(),
        throughput_mb_s: measured.throughput_mb_per_s(size_mb),
        status,
    };

    progress.suspend(|| match &result.status {
        BatchStatus::Succeeded => info!(
            "{mode} {direction}: {:.2} ms, {:.2} MB/s",
            result.elapsed_ms, result.throughput_mb_s
        ),
        BatchStatus::PartiallyFailed {
            failed,
            total,
            first_error,
        } => warn!("{mode} {direction}: {failed}/{total} invocations failed ({first_error})"),
        BatchStatus::Failed { total, first_error } => {
            warn!("{mode} {direction}: all {total} invocations failed ({first_error})")
        }
    });
    result
}

fn remove_mode_artifacts(config: &RunnerConfig, mode: CipherMode) {
    for direction in [Direction::Encrypt, Direction::Decrypt] {
        let path = config
            .retention
            .artifact_path(&config.work_dir, mode, direction, 1);
        remove_best_effort(&path);
    }
}

fn remove_best_effort(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove {}: {e}", path.display()),
    }
}
