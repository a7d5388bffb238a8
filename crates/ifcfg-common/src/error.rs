//! Hard failures of the interface settings crates.
//!
//! Bad operator input is not an error here: field problems are reported in
//! the `{result: "failed", validations}` envelope of a mutation. What ends up
//! in [`IfCfgError`] is either a broken environment (spawn, disk, parse) or a
//! request the caller must be told about verbatim ([`IfCfgError::InUse`],
//! [`IfCfgError::NotFound`]). The latter reach the operator as a [`Refusal`].

use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

pub type IfCfgResult<T> = Result<T, IfCfgError>;

/// Process exit status of a refused request.
///
/// Distinct from 1 (environment failure) and 2 (usage error).
pub const EXIT_REFUSED: u8 = 3;

/// `{"result": "failed", "message": ...}` printed for a refused request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refusal {
    pub result: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum IfCfgError {
    /// `/bin/sh` could not be spawned for the command.
    #[error("Cannot spawn '{command}': {source}")]
    ShellExec {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The command was killed once its deadline passed.
    #[error("'{command}' killed after {timeout_secs}s")]
    CommandTimeout { command: String, timeout_secs: u64 },

    #[error("I/O on {path} failed: {source}")]
    Storage {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The stored document is not valid JSON, or a path inside it crosses
    /// a scalar.
    #[error("Malformed configuration document: {message}")]
    Document { message: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("No schema registered for model '{model}'")]
    UnknownModel { model: String },

    #[error("No record '{id}' in {collection}")]
    NotFound { collection: String, id: String },

    /// The record is referenced elsewhere. The message is shown to the
    /// operator unchanged.
    #[error("{message}")]
    InUse { message: String },
}

impl IfCfgError {
    pub fn storage(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Storage {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn in_use(message: impl Into<String>) -> Self {
        Self::InUse {
            message: message.into(),
        }
    }

    /// Whether the message addresses the operator rather than the logs.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::InUse { .. } | Self::NotFound { .. })
    }

    /// The envelope shown to the operator, for user-facing errors only.
    pub fn refusal(&self) -> Option<Refusal> {
        self.is_user_facing().then(|| Refusal {
            result: "failed",
            message: self.to_string(),
        })
    }
}
