//! Derived VLAN device names.

/// Device name of the VLAN `tag` on `parent`, e.g. `em0_vlan10`.
///
/// Add, update and the reference check must all go through this function;
/// assigned interfaces refer to VLANs by this name.
pub fn derived_name(parent: &str, tag: &str) -> String {
    format!("{}_vlan{}", parent, tag)
}
