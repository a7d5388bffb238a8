//! Schema of the VLAN collection

use ifcfg_model::{Dependency, EntitySchema, FieldSpec, UniqueConstraint};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::tables::{
    fields, messages, INTERFACES_SECTION, INTERFACE_DEVICE_FIELD, VLAN_COLLECTION, VLAN_MODEL,
};
use crate::types::{VlanProto, MAX_TAG, MIN_TAG};

/// Device names accepted as VLAN parents (em0, igb1, lagg0, vlan0.10, ...)
static PARENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_.]{0,14}$").expect("Invalid regex pattern"));

/// Builds the VLAN entity schema.
///
/// `vlanif` is server-computed and unique; assigned interfaces reference it
/// through their `if` field.
pub fn vlan_schema() -> EntitySchema {
    EntitySchema::new(VLAN_MODEL, VLAN_COLLECTION)
        .with_field(
            FieldSpec::text(fields::PARENT)
                .required()
                .with_pattern(&PARENT_RE)
                .with_message(messages::INVALID_PARENT),
        )
        .with_field(
            FieldSpec::integer(fields::TAG, i64::from(MIN_TAG), i64::from(MAX_TAG)).required(),
        )
        .with_field(FieldSpec::integer(fields::PCP, 0, 7).default_value("0"))
        .with_field(FieldSpec::options(fields::PROTO, VlanProto::OPTIONS))
        .with_field(FieldSpec::text(fields::DESCR).max_len(255))
        .with_field(FieldSpec::text(fields::VLANIF).unique())
        .with_constraint(UniqueConstraint {
            fields: vec![fields::PARENT, fields::TAG],
            report_on: fields::TAG,
            message: messages::DUPLICATE_TAG,
        })
        .with_dependent(Dependency {
            section: INTERFACES_SECTION,
            field: INTERFACE_DEVICE_FIELD,
            key_field: fields::VLANIF,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifcfg_common::field_values;
    use ifcfg_model::{validate_record, ConfigDocument};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_order_and_defaults() {
        let defaults = vlan_schema().defaults();
        let names: Vec<&str> = defaults.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(names, vec!["if", "tag", "pcp", "proto", "descr", "vlanif"]);
        assert_eq!(defaults[2].1, "0");
    }

    #[test]
    fn test_parent_pattern() {
        let schema = vlan_schema();
        let doc = ConfigDocument::new();
        for parent in ["em0", "igb1", "lagg0", "vlan0.10", "ix0_vlan5"] {
            let record = field_values! { "if" => parent, "tag" => "5" };
            assert!(validate_record(&schema, &record, &doc, None).is_empty(), "{}", parent);
        }
        for parent in ["0em", "em 0", "em0;reboot", "a_very_long_parent_name"] {
            let record = field_values! { "if" => parent, "tag" => "5" };
            let v = validate_record(&schema, &record, &doc, None);
            assert_eq!(
                v.get("vlan.if").map(String::as_str),
                Some(messages::INVALID_PARENT),
                "{}",
                parent
            );
        }
    }

    #[test]
    fn test_tag_and_pcp_ranges() {
        let schema = vlan_schema();
        let doc = ConfigDocument::new();
        let record = field_values! {
            "if" => "em0",
            "tag" => "4095",
            "pcp" => "8",
            "proto" => "qinq",
        };
        let v = validate_record(&schema, &record, &doc, None);
        assert_eq!(
            v.get("vlan.tag").map(String::as_str),
            Some("Value should be between 1 and 4094.")
        );
        assert_eq!(
            v.get("vlan.pcp").map(String::as_str),
            Some("Value should be between 0 and 7.")
        );
        assert_eq!(v.get("vlan.proto").map(String::as_str), Some("Option not in list."));
    }

    #[test]
    fn test_depends_on_interfaces() {
        let schema = vlan_schema();
        assert_eq!(schema.dependents.len(), 1);
        assert_eq!(schema.dependents[0].section, "interfaces");
        assert_eq!(schema.dependents[0].key_field, "vlanif");
    }
}
