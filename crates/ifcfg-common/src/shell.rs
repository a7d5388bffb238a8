//! Running external tools (`configctl`, `ifconfig`) from the controllers.
//!
//! Controllers never spawn processes directly. They hand a command line to a
//! [`CommandBackend`]; production uses [`ShellBackend`], tests a recorder.
//!
//! # Example
//!
//! ```ignore
//! use ifcfg_common::shell::{self, IFCONFIG_CMD, shellquote};
//!
//! let cmd = format!("{} {} -group {}",
//!     IFCONFIG_CMD, shellquote("em0"), shellquote("dmz"));
//! let result = shell::exec(&cmd, shell::DEFAULT_COMMAND_TIMEOUT).await?;
//! ```

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{IfCfgError, IfCfgResult};

/// Path to the `ifconfig` command for interface configuration.
pub const IFCONFIG_CMD: &str = "/sbin/ifconfig";

/// Path to the `configctl` client of the configuration daemon.
pub const CONFIGCTL_CMD: &str = "/usr/local/sbin/configctl";

/// Deadline applied when the caller does not configure one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Characters that keep a special meaning inside double quotes.
static DOUBLE_QUOTE_SPECIALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Wraps `s` in double quotes so `/bin/sh` passes it as one literal word.
///
/// Interface and group names come from the configuration document, so every
/// value interpolated into a command line goes through here.
///
/// ```
/// use ifcfg_common::shell::shellquote;
///
/// assert_eq!(shellquote("em0_vlan10"), "\"em0_vlan10\"");
/// assert_eq!(shellquote("a$(reboot)"), "\"a\\$(reboot)\"");
/// ```
pub fn shellquote(s: &str) -> String {
    format!("\"{}\"", DOUBLE_QUOTE_SPECIALS.replace_all(s, r"\$1"))
}

/// Exit status and trimmed output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    /// Exit 0 with `stdout` and nothing on stderr.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Both streams joined by a newline, for log fields.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs `cmd` under `/bin/sh -c` and waits at most `timeout` for it.
///
/// A non-zero exit is still `Ok`; callers decide what a failure means. Only
/// a spawn error or an expired deadline becomes `Err`, and in the latter
/// case the child is killed.
pub async fn exec(cmd: &str, timeout: Duration) -> IfCfgResult<ExecResult> {
    tracing::debug!(command = %cmd, "Spawning");

    let child = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(output) => output.map_err(|e| IfCfgError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?,
        Err(_) => {
            tracing::warn!(command = %cmd, timeout_secs = timeout.as_secs(), "Command timed out");
            return Err(IfCfgError::CommandTimeout {
                command: cmd.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    let result = ExecResult {
        exit_code,
        stdout,
        stderr,
    };

    if result.success() {
        tracing::trace!(command = %cmd, "Exited cleanly");
    } else {
        tracing::warn!(
            command = %cmd,
            exit_code,
            output = %result.combined_output(),
            "Exited with non-zero status"
        );
    }

    Ok(result)
}

/// Where controllers send the command lines they build.
#[async_trait]
pub trait CommandBackend: Send + Sync {
    async fn run(&self, cmd: &str) -> IfCfgResult<ExecResult>;
}

/// [`CommandBackend`] that spawns real processes through `/bin/sh`.
#[derive(Debug, Clone)]
pub struct ShellBackend {
    timeout: Duration,
}

impl ShellBackend {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ShellBackend {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandBackend for ShellBackend {
    async fn run(&self, cmd: &str) -> IfCfgResult<ExecResult> {
        exec(cmd, self.timeout).await
    }
}
