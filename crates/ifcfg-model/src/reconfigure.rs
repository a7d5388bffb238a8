//! Triggers the external job that applies staged interface changes.

use std::sync::Arc;

use ifcfg_common::CommandBackend;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Status reported when a reconfigure could not run.
pub const STATUS_FAILED: &str = "failed";

/// Whether a request may change system state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestIntent {
    /// Passive read; never starts a process.
    Read,
    Write,
}

/// Envelope returned by a reconfigure action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconfigureStatus {
    pub status: String,
}

impl ReconfigureStatus {
    pub fn failed() -> Self {
        Self {
            status: STATUS_FAILED.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == STATUS_FAILED
    }
}

/// Runs `<configctl> <action>` through a [`CommandBackend`].
#[derive(Clone)]
pub struct ReconfigureInvoker {
    backend: Arc<dyn CommandBackend>,
    command: String,
}

impl std::fmt::Debug for ReconfigureInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconfigureInvoker")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl ReconfigureInvoker {
    /// `action` is passed to the daemon client verbatim, e.g.
    /// `"interface vlan configure"`.
    pub fn new(backend: Arc<dyn CommandBackend>, configctl: &str, action: &str) -> Self {
        Self {
            backend,
            command: format!("{} {}", configctl, action),
        }
    }

    /// The full command line this invoker runs.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Runs the reconfigure job and reports its normalized output.
    ///
    /// Whatever the process prints is the status, trimmed and lower-cased.
    /// A request without write intent, or a process that cannot be started
    /// or misses its deadline, yields `"failed"`.
    pub async fn apply(&self, intent: RequestIntent) -> ReconfigureStatus {
        if intent != RequestIntent::Write {
            warn!(command = %self.command, "Reconfigure refused without write intent");
            return ReconfigureStatus::failed();
        }

        match self.backend.run(&self.command).await {
            Ok(result) => {
                let status = result.stdout.trim().to_lowercase();
                info!(command = %self.command, status = %status, "Reconfigure finished");
                ReconfigureStatus { status }
            }
            Err(e) => {
                warn!(command = %self.command, error = %e, "Reconfigure did not run");
                ReconfigureStatus::failed()
            }
        }
    }
}
