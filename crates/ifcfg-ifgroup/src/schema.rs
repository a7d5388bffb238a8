//! Schema of the interface group collection

use ifcfg_model::{EntitySchema, FieldSpec};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::tables::{fields, messages, IFGROUP_COLLECTION, IFGROUP_MODEL, INTERFACES_SECTION};

/// Kernel group names: at most 15 characters, no trailing digit
static IFNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{0,14}[a-zA-Z_]$").expect("Invalid regex pattern"));

/// Builds the interface group entity schema.
pub fn ifgroup_schema() -> EntitySchema {
    EntitySchema::new(IFGROUP_MODEL, IFGROUP_COLLECTION)
        .with_field(
            FieldSpec::text(fields::IFNAME)
                .required()
                .unique()
                .with_pattern(&IFNAME_RE)
                .with_message(messages::INVALID_IFNAME),
        )
        .with_field(FieldSpec::reference_list(fields::MEMBERS, INTERFACES_SECTION))
        .with_field(FieldSpec::text(fields::DESCR).max_len(255))
}
