//! ifcfg-vlan - VLAN interface settings
//!
//! Manages VLAN records in the configuration document, keeps assigned VLAN
//! devices stable, and queues retired devices for the reconfigure job.

mod naming;
mod schema;
mod tables;
mod types;
mod vlan_settings;

pub use naming::derived_name;
pub use schema::vlan_schema;
pub use tables::*;
pub use types::*;
pub use vlan_settings::VlanSettings;
