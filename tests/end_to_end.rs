//! Runs the real subprocess path against shell-script stand-ins for the cipher
//! tool.
#![cfg(unix)]

use cipher_speed_bench::dataset::{is_hex_corpus, write_corpus, CorpusConfig};
use cipher_speed_bench::harness::{ArtifactRetention, RunnerConfig};
use cipher_speed_bench::runner::{run, BatchStatus, Progress};
use cipher_speed_bench::tool::ProcessInvoker;
use cipher_speed_bench::CipherMode;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::{tempdir, TempDir};

const COPY_TOOL: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -p) in="$2"; shift 2 ;;
    -c) out="$2"; shift 2 ;;
    -d) shift ;;
    *) shift 2 ;;
  esac
done
cp "$in" "$out"
"#;

const FAILING_TOOL: &str = "#!/bin/sh\necho 'Error: Unable to read key file' >&2\nexit 1\n";

struct Tools {
    _dir: TempDir,
    copy: PathBuf,
    failing: PathBuf,
}

/// Scripts are written once, before any test spawns a child, so no script is
/// still open for writing when another thread execs it.
fn tools() -> &'static Tools {
    static TOOLS: OnceLock<Tools> = OnceLock::new();
    TOOLS.get_or_init(|| {
        let dir = tempdir().unwrap();
        let copy = write_script(dir.path(), "copy-tool", COPY_TOOL);
        let failing = write_script(dir.path(), "failing-tool", FAILING_TOOL);
        Tools {
            _dir: dir,
            copy,
            failing,
        }
    })
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn workspace(tool: &Path, size_mb: u64) -> (TempDir, RunnerConfig) {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("randomdata.txt");
    write_corpus(&CorpusConfig {
        size_mb,
        path: corpus.clone(),
        seed: None,
    })
    .unwrap();
    let key = dir.path().join("key.txt");
    let iv = dir.path().join("iv.txt");
    fs::write(&key, "133457799bbcdff1").unwrap();
    fs::write(&iv, "0123456789abcdef").unwrap();

    let config = RunnerConfig {
        tool: tool.to_path_buf(),
        corpus,
        key,
        iv,
        work_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    (dir, config)
}

fn bin_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .map(|e| e.path().extension().is_some_and(|x| x == "bin"))
                .unwrap_or(false)
        })
        .count()
}

fn is_result_line(line: &str) -> bool {
    let Some((head, rest)) = line.split_once(": ") else {
        return false;
    };
    let mut head = head.split(' ');
    let mode_ok = matches!(head.next(), Some("ECB" | "CBC" | "CFB" | "OFB"));
    let dir_ok = matches!(head.next(), Some("Encrypt" | "Decrypt"));
    let Some((ms, mbs)) = rest.split_once(" ms, ") else {
        return false;
    };
    let Some(mbs) = mbs.strip_suffix(" MB/s") else {
        return false;
    };
    let two_decimals = |s: &str| s.split_once('.').is_some_and(|(_, frac)| frac.len() == 2);
    mode_ok && dir_ok && two_decimals(ms) && two_decimals(mbs)
}

#[test]
fn default_campaign_produces_full_report() {
    let (dir, config) = workspace(&tools().copy, 5);
    assert_eq!(fs::metadata(&config.corpus).unwrap().len(), 5_242_880);
    assert!(is_hex_corpus(&fs::read_to_string(&config.corpus).unwrap()));

    let summary = run(&config, &ProcessInvoker, &Progress::hidden()).unwrap();

    let text = fs::read_to_string(&summary.report_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2 + 8);
    assert!(lines[0].starts_with("Speed Test Report: "));
    assert_eq!(lines[1], "Random data size: 5.00 MB");
    for line in &lines[2..] {
        assert!(is_result_line(line), "unexpected line: {line}");
    }

    assert_eq!(summary.results.len(), 8);
    for r in &summary.results {
        assert_eq!(r.status, BatchStatus::Succeeded);
        assert_eq!(r.repetitions, 20);
        assert!(r.throughput_mb_s.is_finite() && r.throughput_mb_s > 0.0);
    }
    assert_eq!(bin_files(dir.path()), 0);
}

#[test]
fn per_iteration_retention_keeps_all_artifacts() {
    let (dir, config) = workspace(&tools().copy, 1);
    let config = RunnerConfig {
        repetitions: 3,
        modes: vec![CipherMode::Ecb, CipherMode::Ofb],
        retention: ArtifactRetention::PerIteration,
        ..config
    };
    run(&config, &ProcessInvoker, &Progress::hidden()).unwrap();

    assert_eq!(bin_files(dir.path()), 2 * 3 * 2);
    let corpus = fs::read(&config.corpus).unwrap();
    assert_eq!(fs::read(dir.path().join("dec_OFB_3.bin")).unwrap(), corpus);
}

#[test]
fn failing_tool_is_surfaced_in_report() {
    let (_dir, config) = workspace(&tools().failing, 1);
    let config = RunnerConfig {
        repetitions: 2,
        modes: vec![CipherMode::Cbc],
        ..config
    };
    let summary = run(&config, &ProcessInvoker, &Progress::hidden()).unwrap();

    let text = fs::read_to_string(&summary.report_path).unwrap();
    let lines: Vec<&str> = text.lines().skip(2).collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        assert!(
            line.ends_with("[FAILED 2/2: exit status 1: Error: Unable to read key file]"),
            "{line}"
        );
    }
}

#[test]
fn back_to_back_runs_write_distinct_reports() {
    let (_dir, config) = workspace(&tools().copy, 1);
    let config = RunnerConfig {
        repetitions: 1,
        modes: vec![CipherMode::Ecb],
        ..config
    };
    let first = run(&config, &ProcessInvoker, &Progress::hidden()).unwrap();
    let second = run(&config, &ProcessInvoker, &Progress::hidden()).unwrap();
    assert_ne!(first.report_path, second.report_path);
    assert!(first.report_path.exists());
    assert!(second.report_path.exists());
}
