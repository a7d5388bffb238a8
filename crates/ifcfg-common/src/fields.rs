//! Field-value pairs describing one configuration record.
//!
//! Records keep their fields in insertion order so a document written back
//! to disk lists them the way the operator entered them.

/// `(name, value)` of one field.
pub type FieldValue = (String, String);

/// Fields of one record, in document order.
pub type FieldValues = Vec<FieldValue>;

/// Lookups and updates by field name.
///
/// Names are matched exactly. Records are small, so every operation is a
/// linear scan.
pub trait FieldValuesExt {
    fn get_field(&self, field: &str) -> Option<&str>;

    fn get_field_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str;

    fn has_field(&self, field: &str) -> bool;

    /// Replaces the value in place, or appends the field at the end.
    fn set_field(&mut self, field: &str, value: impl Into<String>);

    /// Overlays `other` on top of `self`; values from `other` win.
    fn merge_from(&mut self, other: &FieldValues);
}

impl FieldValuesExt for FieldValues {
    fn get_field(&self, field: &str) -> Option<&str> {
        self.iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    fn get_field_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str {
        self.get_field(field).unwrap_or(default)
    }

    fn has_field(&self, field: &str) -> bool {
        self.iter().any(|(f, _)| f == field)
    }

    fn set_field(&mut self, field: &str, value: impl Into<String>) {
        let value = value.into();
        match self.iter_mut().find(|(f, _)| f == field) {
            Some((_, v)) => *v = value,
            None => self.push((field.to_string(), value)),
        }
    }

    fn merge_from(&mut self, other: &FieldValues) {
        for (field, value) in other {
            self.set_field(field, value.clone());
        }
    }
}

/// `field_values! { "if" => "em0", "tag" => 10 }`
#[macro_export]
macro_rules! field_values {
    ($($field:expr => $value:expr),* $(,)?) => {
        vec![
            $(($field.to_string(), $value.to_string()),)*
        ]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup() {
        let fvs = field_values! { "if" => "em0", "tag" => 10 };

        assert_eq!(fvs.get_field("if"), Some("em0"));
        assert_eq!(fvs.get_field("vlanif"), None);
        assert_eq!(fvs.get_field_or("pcp", "0"), "0");
        assert!(fvs.has_field("tag"));
        assert!(!fvs.has_field("descr"));
    }

    #[test]
    fn test_set_field_keeps_position() {
        let mut fvs = field_values! {
            "if" => "em0",
            "tag" => "10",
        };
        fvs.set_field("if", "em1");
        fvs.set_field("descr", "uplink");

        assert_eq!(
            fvs,
            field_values! { "if" => "em1", "tag" => "10", "descr" => "uplink" }
        );
    }

    #[test]
    fn test_merge_from_overrides_win() {
        let mut base = field_values! { "tag" => "10", "vlanif" => "bogus" };
        base.merge_from(&field_values! { "vlanif" => "em0_vlan10" });
        assert_eq!(base.get_field("vlanif"), Some("em0_vlan10"));
        assert_eq!(base.len(), 2);
    }
}
