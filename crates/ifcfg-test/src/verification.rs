//! Verification helpers for testing settings controllers
//!
//! Provides a capturing command backend and assertion helpers for the
//! configuration document and executed commands

use async_trait::async_trait;
use ifcfg_common::{CommandBackend, ExecResult, FieldValuesExt, IfCfgError, IfCfgResult};
use ifcfg_model::ConfigDocument;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

/// Why a verification failed
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected record '{id}' not found in '{collection}'")]
    RecordNotFound { collection: String, id: String },

    #[error("Record '{id}' unexpectedly present in '{collection}'")]
    RecordPresent { collection: String, id: String },

    #[error("Expected field '{field}' not found in record '{id}'")]
    FieldNotFound { id: String, field: String },

    #[error("Value mismatch for {id}:{field}: expected '{expected}', got '{actual}'")]
    ValueMismatch {
        id: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Expected {expected} {what}, found {actual}")]
    CountMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Expected command containing '{expected}', executed: {actual:?}")]
    CommandMissing {
        expected: String,
        actual: Vec<String>,
    },

    #[error("Command containing '{unexpected}' was executed")]
    CommandPresent { unexpected: String },
}

pub type VerifyResult<T> = Result<T, VerificationError>;

/// What the mock backend does with a command
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Exit 0 with the given stdout
    Output(String),
    /// Exit with the given code and stderr
    Fail { exit_code: i32, stderr: String },
    /// Deadline passed
    Timeout,
}

/// [`CommandBackend`] that records commands instead of running them
#[derive(Debug)]
pub struct MockBackend {
    reply: Mutex<MockReply>,
    captured_commands: Mutex<Vec<String>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::replying(MockReply::Output("OK".to_string()))
    }
}

impl MockBackend {
    /// Backend answering every command with `reply`
    pub fn replying(reply: MockReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            captured_commands: Mutex::new(Vec::new()),
        }
    }

    /// Changes the reply for subsequent commands
    pub fn set_reply(&self, reply: MockReply) {
        *self.reply.lock() = reply;
    }

    pub fn captured_commands(&self) -> Vec<String> {
        self.captured_commands.lock().clone()
    }

    /// Verifier over the commands captured so far
    pub fn verifier(&self) -> CommandVerifier {
        CommandVerifier::new(self.captured_commands())
    }
}

#[async_trait]
impl CommandBackend for MockBackend {
    async fn run(&self, cmd: &str) -> IfCfgResult<ExecResult> {
        self.captured_commands.lock().push(cmd.to_string());
        info!(command = cmd, "Captured");

        match self.reply.lock().clone() {
            MockReply::Output(stdout) => Ok(ExecResult::ok(stdout)),
            MockReply::Fail { exit_code, stderr } => Ok(ExecResult {
                exit_code,
                stdout: String::new(),
                stderr,
            }),
            MockReply::Timeout => Err(IfCfgError::CommandTimeout {
                command: cmd.to_string(),
                timeout_secs: 0,
            }),
        }
    }
}

/// Assertions over the command lines a [`MockBackend`] saw, in order
pub struct CommandVerifier {
    ran: Vec<String>,
}

impl CommandVerifier {
    pub fn new(ran: Vec<String>) -> Self {
        Self { ran }
    }

    fn ran_matching(&self, needle: &str) -> bool {
        self.ran.iter().any(|line| line.contains(needle))
    }

    /// Some command line contains `expected`
    pub fn assert_command_executed(&self, expected: &str) -> VerifyResult<()> {
        if !self.ran_matching(expected) {
            return Err(VerificationError::CommandMissing {
                expected: expected.to_string(),
                actual: self.ran.clone(),
            });
        }
        Ok(())
    }

    /// No command line contains `unexpected`
    pub fn assert_command_not_executed(&self, unexpected: &str) -> VerifyResult<()> {
        if self.ran_matching(unexpected) {
            return Err(VerificationError::CommandPresent {
                unexpected: unexpected.to_string(),
            });
        }
        Ok(())
    }

    pub fn assert_command_count(&self, expected: usize) -> VerifyResult<()> {
        match self.ran.len() {
            actual if actual == expected => Ok(()),
            actual => Err(VerificationError::CountMismatch {
                what: "commands".to_string(),
                expected,
                actual,
            }),
        }
    }

    pub fn captured_commands(&self) -> &[String] {
        &self.ran
    }
}

/// Assertions over a configuration document
pub struct DocumentVerifier<'a> {
    document: &'a ConfigDocument,
}

impl<'a> DocumentVerifier<'a> {
    pub fn new(document: &'a ConfigDocument) -> Self {
        Self { document }
    }

    pub fn assert_record_exists(&self, collection: &str, id: &str) -> VerifyResult<()> {
        if self.document.contains_record(collection, id) {
            Ok(())
        } else {
            Err(VerificationError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
        }
    }

    pub fn assert_record_absent(&self, collection: &str, id: &str) -> VerifyResult<()> {
        if self.document.contains_record(collection, id) {
            Err(VerificationError::RecordPresent {
                collection: collection.to_string(),
                id: id.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// The field exists on the record and equals `expected`
    pub fn assert_field_value(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &str,
    ) -> VerifyResult<()> {
        let record = self.document.record(collection, id).ok_or_else(|| {
            VerificationError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }
        })?;

        match record.get_field(field) {
            None => Err(VerificationError::FieldNotFound {
                id: id.to_string(),
                field: field.to_string(),
            }),
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(VerificationError::ValueMismatch {
                id: id.to_string(),
                field: field.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            }),
        }
    }

    pub fn assert_record_count(&self, collection: &str, expected: usize) -> VerifyResult<()> {
        let actual = self.document.records(collection).len();
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                what: format!("records in '{}'", collection),
                expected,
                actual,
            });
        }
        Ok(())
    }
}
