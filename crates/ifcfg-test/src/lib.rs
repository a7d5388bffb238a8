//! Integration test infrastructure for interface settings controllers
//!
//! Provides:
//! - Configuration document fixtures (assigned interfaces, VLANs, groups)
//! - A file-backed test environment wiring both controllers together
//! - A mock command backend capturing every external command
//! - Document and command verification helpers

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;
