//! Common infrastructure for firewall interface settings controllers.
//!
//! This crate provides shared functionality for the VLAN and interface
//! group controllers:
//!
//! - [`shell`]: Safe shell command execution with quoting and deadlines
//! - [`fields`]: Ordered field-value records
//! - [`settings`]: TOML runtime settings
//! - [`error`]: Error types for ifcfg operations
//!
//! # Example
//!
//! ```ignore
//! use ifcfg_common::{
//!     shell::{self, IFCONFIG_CMD, shellquote},
//!     IfCfgResult,
//! };
//!
//! async fn leave_group(device: &str, group: &str) -> IfCfgResult<()> {
//!     let cmd = format!("{} {} -group {}",
//!         IFCONFIG_CMD, shellquote(device), shellquote(group));
//!     let result = shell::exec(&cmd, shell::DEFAULT_COMMAND_TIMEOUT).await?;
//!     if !result.success() {
//!         tracing::warn!(device, group, output = %result.combined_output(), "ifconfig failed");
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fields;
pub mod settings;
pub mod shell;

pub use error::{IfCfgError, IfCfgResult, Refusal, EXIT_REFUSED};
pub use fields::{FieldValue, FieldValues, FieldValuesExt};
pub use settings::IfCfgSettings;
pub use shell::{CommandBackend, ExecResult, ShellBackend};
