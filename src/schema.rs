use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::harness::{ArtifactRetention, RunnerConfig};
use crate::report::format_timestamp;
use crate::runner::{BatchStatus, RunSummary};
use crate::{CipherMode, Direction};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub timestamp: String,
    pub tool: String,
    pub corpus_path: String,
    pub corpus_bytes: u64,
    pub corpus_mb: f64,
    pub corpus_sha256: String,
    pub repetitions: u32,
    pub retention: ArtifactRetention,
    pub text_report: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub mode: CipherMode,
    pub direction: Direction,
    pub repetitions: u32,
    pub elapsed_ms: f64,
    pub throughput_mb_per_s: f64,
    pub failed: u32,
    pub first_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedTestReport {
    pub run: RunMeta,
    pub measurements: Vec<Measurement>,
}

impl SpeedTestReport {
    pub fn from_summary(config: &RunnerConfig, summary: &RunSummary) -> Self {
        let measurements = summary
            .results
            .iter()
            .map(|r| {
                let (failed, first_error) = match &r.status {
                    BatchStatus::Succeeded => (0, None),
                    BatchStatus::PartiallyFailed {
                        failed,
                        first_error,
                        ..
                    } => (*failed, Some(first_error.clone())),
                    BatchStatus::Failed { total, first_error } => {
                        (*total, Some(first_error.clone()))
                    }
                };
                Measurement {
                    mode: r.mode,
                    direction: r.direction,
                    repetitions: r.repetitions,
                    elapsed_ms: r.elapsed_ms,
                    throughput_mb_per_s: r.throughput_mb_s,
                    failed,
                    first_error,
                }
            })
            .collect();

        Self {
            run: RunMeta {
                schema_version: 1,
                bench_version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: format_timestamp(&summary.started),
                tool: config.tool.to_string_lossy().into_owned(),
                corpus_path: summary.corpus.path.to_string_lossy().into_owned(),
                corpus_bytes: summary.corpus.size_bytes,
                corpus_mb: summary.corpus.size_mb,
                corpus_sha256: summary.corpus.sha256.clone(),
                repetitions: config.repetitions,
                retention: config.retention,
                text_report: summary.report_path.to_string_lossy().into_owned(),
            },
            measurements,
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CorpusMeta;
    use crate::runner::BatchResult;
    use chrono::Local;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_json_carries_failures_and_modes() {
        let summary = RunSummary {
            started: Local::now(),
            report_path: PathBuf::from("test_report_x.log"),
            corpus: CorpusMeta {
                path: PathBuf::from("randomdata.txt"),
                size_bytes: 5_242_880,
                size_mb: 5.0,
                sha256: "00".repeat(32),
            },
            results: vec![
                BatchResult {
                    mode: CipherMode::Cfb,
                    direction: Direction::Encrypt,
                    repetitions: 20,
                    elapsed_ms: 1000.0,
                    throughput_mb_s: 100.0,
                    status: BatchStatus::Succeeded,
                },
                BatchResult {
                    mode: CipherMode::Cfb,
                    direction: Direction::Decrypt,
                    repetitions: 20,
                    elapsed_ms: 10.0,
                    throughput_mb_s: 10_000.0,
                    status: BatchStatus::Failed {
                        total: 20,
                        first_error: "exit status 1".to_string(),
                    },
                },
            ],
        };
        let report = SpeedTestReport::from_summary(&RunnerConfig::default(), &summary);

        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["run"]["retention"], "none");
        assert_eq!(value["run"]["corpus_bytes"], 5_242_880);
        assert_eq!(value["measurements"][0]["mode"], "CFB");
        assert_eq!(value["measurements"][0]["direction"], "encrypt");
        assert_eq!(value["measurements"][0]["failed"], 0);
        assert_eq!(value["measurements"][1]["failed"], 20);
        assert_eq!(value["measurements"][1]["first_error"], "exit status 1");
    }
}
