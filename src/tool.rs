//! Invoking the external cipher executable.
//!
//! Flag convention:
//!
//! ```text
//! -p <input>  -k <key>  -v <iv>  -m <ECB|CBC|CFB|OFB>  -c <output>  [-d]
//! ```
//!
//! `-d` is present only when decrypting. Stdout is discarded; the exit status
//! and the tail of stderr are kept so failed batches can be reported.

use log::debug;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{BenchError, Result};
use crate::{CipherMode, Direction};

/// Bytes of stderr kept per failed invocation.
const STDERR_TAIL: usize = 512;

#[derive(Clone, Debug)]
pub struct Invocation<'a> {
    pub tool: &'a Path,
    pub direction: Direction,
    pub input: &'a Path,
    pub key: &'a Path,
    pub iv: &'a Path,
    pub mode: CipherMode,
    pub output: &'a Path,
}

impl Invocation<'_> {
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(11);
        if self.direction == Direction::Decrypt {
            args.push("-d".into());
        }
        args.push("-p".into());
        args.push(self.input.into());
        args.push("-k".into());
        args.push(self.key.into());
        args.push("-v".into());
        args.push(self.iv.into());
        args.push("-m".into());
        args.push(self.mode.as_str().into());
        args.push("-c".into());
        args.push(self.output.into());
        args
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvocationOutcome {
    Success,
    /// Non-zero exit. `code` is `None` when killed by a signal.
    Failed { code: Option<i32>, stderr: String },
    /// The process could not be started at all.
    SpawnError(String),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success)
    }

    /// One-line description for reports and logs.
    pub fn describe(&self) -> String {
        match self {
            InvocationOutcome::Success => "ok".to_string(),
            InvocationOutcome::Failed { code, stderr } => {
                let status = match code {
                    Some(c) => format!("exit status {c}"),
                    None => "terminated by signal".to_string(),
                };
                let msg = stderr
                    .lines()
                    .rev()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .unwrap_or("");
                if msg.is_empty() {
                    status
                } else {
                    format!("{status}: {msg}")
                }
            }
            InvocationOutcome::SpawnError(e) => format!("spawn failed: {e}"),
        }
    }
}

/// Runs one invocation to completion.
pub trait Invoker {
    fn invoke(&self, invocation: &Invocation<'_>) -> InvocationOutcome;
}

/// Spawns the tool as a blocking child process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessInvoker;

impl Invoker for ProcessInvoker {
    fn invoke(&self, invocation: &Invocation<'_>) -> InvocationOutcome {
        let args = invocation.args();
        debug!("{} {:?}", invocation.tool.display(), args);

        let output = Command::new(invocation.tool)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();

        match output {
            Ok(out) if out.status.success() => InvocationOutcome::Success,
            Ok(out) => {
                let start = out.stderr.len().saturating_sub(STDERR_TAIL);
                InvocationOutcome::Failed {
                    code: out.status.code(),
                    stderr: String::from_utf8_lossy(&out.stderr[start..]).into_owned(),
                }
            }
            Err(e) => InvocationOutcome::SpawnError(e.to_string()),
        }
    }
}

/// Resolve the tool the way a shell would: paths with a directory component
/// must exist, bare names are searched on `PATH`.
pub fn resolve_tool(tool: &Path) -> Result<PathBuf> {
    let has_dir = tool
        .parent()
        .map(|p| !p.as_os_str().is_empty())
        .unwrap_or(false);

    if has_dir || tool.is_absolute() {
        return if tool.is_file() {
            Ok(tool.to_path_buf())
        } else {
            Err(BenchError::ToolNotFound(tool.to_path_buf()))
        };
    }

    env::var_os("PATH")
        .and_then(|paths| {
            env::split_paths(&paths)
                .map(|dir| dir.join(tool))
                .find(|candidate| candidate.is_file())
        })
        .ok_or_else(|| BenchError::ToolNotFound(tool.to_path_buf()))
}
