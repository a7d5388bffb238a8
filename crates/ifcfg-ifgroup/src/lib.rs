//! ifcfg-ifgroup - interface group settings
//!
//! Named sets of assigned interfaces, used by firewall rules to match
//! several interfaces at once.

mod ifgroup_settings;
mod schema;
mod tables;

pub use ifgroup_settings::IfGroupSettings;
pub use schema::ifgroup_schema;
pub use tables::*;
