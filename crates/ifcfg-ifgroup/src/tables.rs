//! Collection, field and message constants for interface groups

/// Model name, also the prefix of validation keys
pub const IFGROUP_MODEL: &str = "ifgroup";

/// Collection holding interface group records
pub const IFGROUP_COLLECTION: &str = "ifgroups.ifgroupentry";

/// Section of assigned interfaces that group members refer to
pub const INTERFACES_SECTION: &str = "interfaces";

/// Field of an assigned interface naming its device
pub const INTERFACE_DEVICE_FIELD: &str = "if";

/// Field names
pub mod fields {
    /// Group name, also the kernel interface group
    pub const IFNAME: &str = "ifname";

    /// Space separated assigned interface keys
    pub const MEMBERS: &str = "members";

    /// Free-form description
    pub const DESCR: &str = "descr";

    /// Fields shown by search, in column order
    pub const VISIBLE: &[&str] = &[IFNAME, MEMBERS, DESCR];
}

/// Operator-facing messages
pub mod messages {
    pub const INVALID_IFNAME: &str = "Group name may only contain letters, digits and underscores, \
         must not end in a digit and must be at most 15 characters long.";
}
