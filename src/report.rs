//! Plain-text speed test report.
//!
//! ```text
//! Speed Test Report: 2026-10-16-09-30-00
//! Random data size: 5.00 MB
//! ECB Encrypt: 812.40 ms, 123.09 MB/s
//! ECB Decrypt: 790.11 ms, 126.56 MB/s
//! ...
//! ```

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::runner::{BatchResult, BatchStatus};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn report_file_name(ts: &DateTime<Local>) -> String {
    format!("test_report_{}.log", format_timestamp(ts))
}

pub fn format_result_line(result: &BatchResult) -> String {
    let mut line = format!(
        "{} {}: {:.2} ms, {:.2} MB/s",
        result.mode, result.direction, result.elapsed_ms, result.throughput_mb_s
    );
    match &result.status {
        BatchStatus::Succeeded => {}
        BatchStatus::PartiallyFailed {
            failed,
            total,
            first_error,
        } => line.push_str(&format!(" [PARTIAL {failed}/{total} failed: {first_error}]")),
        BatchStatus::Failed { total, first_error } => {
            line.push_str(&format!(" [FAILED {total}/{total}: {first_error}]"))
        }
    }
    line
}

/// An open report. Lines are written as results arrive so an interrupted run
/// still leaves everything measured so far.
pub struct TextReport {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TextReport {
    /// Create `test_report_<ts>.log` in `dir`. An existing file is never
    /// reused: a numeric suffix is appended until the name is free.
    pub fn create(dir: &Path, ts: &DateTime<Local>, size_mb: f64) -> Result<Self> {
        let stamp = format_timestamp(ts);
        let (path, file) = create_unique(dir, ts)?;
        let mut report = Self {
            path,
            writer: BufWriter::new(file),
        };
        writeln!(report.writer, "Speed Test Report: {stamp}")?;
        writeln!(report.writer, "Random data size: {size_mb:.2} MB")?;
        report.writer.flush()?;
        Ok(report)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, result: &BatchResult) -> Result<()> {
        writeln!(self.writer, "{}", format_result_line(result))?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(self.path)
    }
}

fn create_unique(dir: &Path, ts: &DateTime<Local>) -> io::Result<(PathBuf, File)> {
    let mut suffix = 0u32;
    loop {
        let name = if suffix == 0 {
            report_file_name(ts)
        } else {
            format!("test_report_{}_{suffix}.log", format_timestamp(ts))
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => return Err(e),
        }
    }
}
