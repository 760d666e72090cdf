use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::dataset::DEFAULT_CORPUS_FILE;
use crate::error::{BenchError, Result};
use crate::{CipherMode, Direction};

/// What happens to the tool's output files.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactRetention {
    /// One numbered file per repetition, all kept after the run.
    PerIteration,
    /// One file per mode and direction, overwritten each repetition and kept.
    Reused,
    /// Like `reused`, but deleted once the mode is done.
    #[default]
    None,
}

impl ArtifactRetention {
    /// Path the tool writes for `repetition` (1-based).
    pub fn artifact_path(
        &self,
        work_dir: &Path,
        mode: CipherMode,
        direction: Direction,
        repetition: u32,
    ) -> PathBuf {
        let prefix = match direction {
            Direction::Encrypt => "enc",
            Direction::Decrypt => "dec",
        };
        let name = match self {
            ArtifactRetention::PerIteration => format!("{prefix}_{mode}_{repetition}.bin"),
            ArtifactRetention::Reused | ArtifactRetention::None => format!("{prefix}_{mode}.bin"),
        };
        work_dir.join(name)
    }
}

/// Everything the runner needs; the defaults reproduce the classic layout
/// where the harness sits two directories below the tool, key and IV.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    pub tool: PathBuf,
    pub corpus: PathBuf,
    pub key: PathBuf,
    pub iv: PathBuf,
    pub modes: Vec<CipherMode>,
    pub repetitions: u32,
    pub retention: ArtifactRetention,
    /// Directory receiving artifacts and the report.
    pub work_dir: PathBuf,
    /// Check that the tool and input files exist before the first invocation.
    pub preflight: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tool: PathBuf::from("../../e1des"),
            corpus: PathBuf::from(DEFAULT_CORPUS_FILE),
            key: PathBuf::from("../../key.txt"),
            iv: PathBuf::from("../../iv.txt"),
            modes: CipherMode::ALL.to_vec(),
            repetitions: 20,
            retention: ArtifactRetention::default(),
            work_dir: PathBuf::from("."),
            preflight: true,
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.repetitions == 0 {
            return Err(BenchError::InvalidConfig(
                "repetitions must be at least 1".to_string(),
            ));
        }
        if self.modes.is_empty() {
            return Err(BenchError::InvalidConfig(
                "at least one mode is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Measured {
    pub iters: u32,
    pub total: Duration,
}

impl Measured {
    pub fn elapsed_ms(&self) -> f64 {
        self.total.as_secs_f64() * 1000.0
    }

    /// `iters * size_mb / elapsed_s`. Elapsed is clamped to one nanosecond so
    /// an implausibly fast batch still yields a finite number.
    pub fn throughput_mb_per_s(&self, size_mb: f64) -> f64 {
        throughput_mb_per_s(self.iters, size_mb, self.total)
    }
}

pub fn throughput_mb_per_s(iters: u32, size_mb: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.max(Duration::from_nanos(1)).as_secs_f64();
    (iters as f64) * size_mb / secs
}

/// Time `iters` sequential calls of `f`. The clock starts before the first
/// call and stops after the last returns; `f` receives the 1-based index.
pub fn measure_batch(iters: u32, mut f: impl FnMut(u32)) -> Measured {
    let start = Instant::now();
    for i in 1..=iters {
        f(i);
    }
    Measured {
        iters,
        total: start.elapsed(),
    }
}
