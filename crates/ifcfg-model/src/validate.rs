//! Generic record validation against an [`EntitySchema`].

use std::collections::BTreeMap;

use ifcfg_common::{FieldValues, FieldValuesExt};
use tracing::debug;

use crate::document::ConfigDocument;
use crate::schema::{EntitySchema, FieldKind, FieldSpec};

/// Validation messages keyed by `"{model}.{field}"`.
pub type Validations = BTreeMap<String, String>;

pub const MSG_REQUIRED: &str = "A value is required.";
pub const MSG_NOT_IN_LIST: &str = "Option not in list.";
pub const MSG_NOT_UNIQUE: &str = "Value should be unique.";
pub const MSG_INVALID_VALUE: &str = "Invalid value.";

fn is_canonical_integer(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
        && value != "-0"
}

/// Checks one non-empty value against its field kind.
fn check_kind(spec: &FieldSpec, value: &str, document: &ConfigDocument) -> Option<String> {
    match &spec.kind {
        FieldKind::Text { pattern, max_len } => {
            let too_long = max_len.is_some_and(|max| value.chars().count() > max);
            let mismatch = pattern.as_ref().is_some_and(|re| !re.is_match(value));
            if too_long && spec.message.is_none() {
                let max = max_len.unwrap_or_default();
                Some(format!("Value should not exceed {} characters.", max))
            } else if too_long || mismatch {
                Some(spec.message.unwrap_or(MSG_INVALID_VALUE).to_string())
            } else {
                None
            }
        }
        FieldKind::Integer { min, max } => {
            let in_range = is_canonical_integer(value)
                && value
                    .parse::<i64>()
                    .is_ok_and(|n| (*min..=*max).contains(&n));
            (!in_range).then(|| format!("Value should be between {} and {}.", min, max))
        }
        FieldKind::Options(options) => {
            (!options.iter().any(|option| *option == value)).then(|| MSG_NOT_IN_LIST.to_string())
        }
        FieldKind::ReferenceList { section } => {
            let known = document.section(section);
            value
                .split_whitespace()
                .find(|key| !known.is_some_and(|s| s.get(*key).is_some_and(|n| n.is_object())))
                .map(|key| format!("Unknown interface: {}.", key))
        }
    }
}

/// Validates a complete record.
///
/// `self_id` names the record being updated so uniqueness checks skip it.
pub fn validate_record(
    schema: &EntitySchema,
    record: &FieldValues,
    document: &ConfigDocument,
    self_id: Option<&str>,
) -> Validations {
    let mut validations = Validations::new();

    for (field, _) in record {
        if schema.field(field).is_none() {
            debug!(model = schema.name, field = %field, "Ignoring field not in schema");
        }
    }

    let others: Vec<(String, FieldValues)> = document
        .records(schema.collection)
        .into_iter()
        .filter(|(id, _)| Some(id.as_str()) != self_id)
        .collect();

    for spec in &schema.fields {
        let value = record.get_field_or(spec.name, "");
        let key = schema.validation_key(spec.name);

        if value.is_empty() {
            if spec.required {
                validations.insert(key, MSG_REQUIRED.to_string());
            }
            continue;
        }

        if let Some(message) = check_kind(spec, value, document) {
            validations.insert(key, message);
            continue;
        }

        if spec.unique
            && others
                .iter()
                .any(|(_, other)| other.get_field(spec.name) == Some(value))
        {
            validations.insert(key, MSG_NOT_UNIQUE.to_string());
        }
    }

    for constraint in &schema.constraints {
        let key = schema.validation_key(constraint.report_on);
        if validations.contains_key(&key) {
            continue;
        }
        let values: Vec<&str> = constraint
            .fields
            .iter()
            .map(|f| record.get_field_or(f, ""))
            .collect();
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        let clash = others.iter().any(|(_, other)| {
            constraint
                .fields
                .iter()
                .zip(&values)
                .all(|(f, v)| other.get_field_or(f, "") == *v)
        });
        if clash {
            validations.insert(key, constraint.message.to_string());
        }
    }

    validations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, UniqueConstraint};
    use ifcfg_common::field_values;
    use pretty_assertions::assert_eq;
    use regex::Regex;

    fn schema() -> EntitySchema {
        EntitySchema::new("vlan", "vlans.vlan")
            .with_field(
                FieldSpec::text("if")
                    .required()
                    .with_pattern(&Regex::new("^[a-z0-9_]+$").unwrap())
                    .with_message("Invalid parent."),
            )
            .with_field(FieldSpec::integer("tag", 1, 4094).required())
            .with_field(FieldSpec::options("proto", &["", "802.1q", "802.1ad"]))
            .with_field(FieldSpec::text("descr").max_len(8))
            .with_field(FieldSpec::text("vlanif").unique())
            .with_constraint(UniqueConstraint {
                fields: vec!["if", "tag"],
                report_on: "tag",
                message: "Tag already in use.",
            })
    }

    fn doc_with_existing() -> ConfigDocument {
        let mut doc = ConfigDocument::new();
        doc.insert_record(
            "vlans.vlan",
            "existing",
            &field_values! { "if" => "em0", "tag" => "10", "vlanif" => "em0_vlan10" },
        )
        .unwrap();
        doc.insert_record("interfaces", "lan", &field_values! { "if" => "em1" })
            .unwrap();
        doc
    }

    #[test]
    fn test_valid_record() {
        let record = field_values! { "if" => "em0", "tag" => "20", "vlanif" => "em0_vlan20" };
        assert!(validate_record(&schema(), &record, &doc_with_existing(), None).is_empty());
    }

    #[test]
    fn test_required_and_range() {
        let record = field_values! { "tag" => "4095" };
        let v = validate_record(&schema(), &record, &ConfigDocument::new(), None);
        assert_eq!(v.get("vlan.if").map(String::as_str), Some(MSG_REQUIRED));
        assert_eq!(
            v.get("vlan.tag").map(String::as_str),
            Some("Value should be between 1 and 4094.")
        );
    }

    #[test]
    fn test_non_canonical_integers_rejected() {
        for tag in ["010", "1.5", "ten", "+5", "-0"] {
            let record = field_values! { "if" => "em0", "tag" => tag };
            let v = validate_record(&schema(), &record, &ConfigDocument::new(), None);
            assert!(v.contains_key("vlan.tag"), "tag {} accepted", tag);
        }
    }

    #[test]
    fn test_pattern_options_and_length() {
        let record = field_values! {
            "if" => "em0!",
            "tag" => "5",
            "proto" => "qinq",
            "descr" => "far too long",
        };
        let v = validate_record(&schema(), &record, &ConfigDocument::new(), None);
        assert_eq!(v.get("vlan.if").map(String::as_str), Some("Invalid parent."));
        assert_eq!(v.get("vlan.proto").map(String::as_str), Some(MSG_NOT_IN_LIST));
        assert_eq!(
            v.get("vlan.descr").map(String::as_str),
            Some("Value should not exceed 8 characters.")
        );
    }

    #[test]
    fn test_unique_and_composite_constraint() {
        let record = field_values! { "if" => "em0", "tag" => "10", "vlanif" => "em0_vlan10" };
        let doc = doc_with_existing();

        let v = validate_record(&schema(), &record, &doc, None);
        assert_eq!(v.get("vlan.vlanif").map(String::as_str), Some(MSG_NOT_UNIQUE));
        assert_eq!(v.get("vlan.tag").map(String::as_str), Some("Tag already in use."));

        // updating the record itself is not a clash
        assert!(validate_record(&schema(), &record, &doc, Some("existing")).is_empty());
    }

    #[test]
    fn test_reference_list() {
        let schema = EntitySchema::new("ifgroup", "ifgroups.ifgroupentry")
            .with_field(FieldSpec::reference_list("members", "interfaces"));
        let doc = doc_with_existing();

        let ok = field_values! { "members" => "lan" };
        assert!(validate_record(&schema, &ok, &doc, None).is_empty());

        let bad = field_values! { "members" => "lan opt7" };
        let v = validate_record(&schema, &bad, &doc, None);
        assert_eq!(
            v.get("ifgroup.members").map(String::as_str),
            Some("Unknown interface: opt7.")
        );
    }
}
