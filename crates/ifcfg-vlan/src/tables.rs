//! Collection, field and message constants for VLAN settings

/// Model name, also the prefix of validation keys
pub const VLAN_MODEL: &str = "vlan";

/// Collection holding VLAN records
pub const VLAN_COLLECTION: &str = "vlans.vlan";

/// Section of assigned interfaces, keyed by interface name (lan, opt1, ...)
pub const INTERFACES_SECTION: &str = "interfaces";

/// Field of an assigned interface naming its device
pub const INTERFACE_DEVICE_FIELD: &str = "if";

/// Configd action materializing VLAN devices
pub const RECONFIGURE_ACTION: &str = "interface vlan configure";

/// Field names
pub mod fields {
    /// Parent interface
    pub const PARENT: &str = "if";

    /// 802.1Q tag
    pub const TAG: &str = "tag";

    /// Priority code point
    pub const PCP: &str = "pcp";

    /// Encapsulation protocol
    pub const PROTO: &str = "proto";

    /// Free-form description
    pub const DESCR: &str = "descr";

    /// Derived device name
    pub const VLANIF: &str = "vlanif";

    /// Fields shown by search, in column order
    pub const VISIBLE: &[&str] = &[VLANIF, PARENT, TAG, PCP, DESCR];
}

/// Operator-facing messages
pub mod messages {
    pub const TAG_ASSIGNED: &str =
        "Interface is assigned and you cannot change the VLAN tag while assigned.";

    pub const PARENT_ASSIGNED: &str =
        "Interface is assigned and you cannot change the parent while assigned.";

    pub const DELETE_ASSIGNED: &str =
        "This VLAN cannot be deleted because it is assigned as an interface.";

    pub const INVALID_PARENT: &str = "Invalid parent interface name.";

    pub const DUPLICATE_TAG: &str = "This tag is already in use on the parent interface.";
}
