//! Type definitions for VLAN settings

use std::fmt;
use std::str::FromStr;

use ifcfg_common::{FieldValues, FieldValuesExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::derived_name;
use crate::tables::fields;

/// Lowest valid 802.1Q VLAN id
pub const MIN_TAG: u16 = 1;

/// Highest valid 802.1Q VLAN id
pub const MAX_TAG: u16 = 4094;

/// Error parsing a VLAN tag
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("'{0}' is not a canonical decimal number")]
    NotCanonical(String),

    #[error("tag {0} is outside 1..=4094")]
    OutOfRange(u32),
}

/// Error parsing a VLAN encapsulation protocol
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a VLAN protocol (802.1q or 802.1ad)")]
pub struct ProtoError(String);

/// 802.1Q VLAN id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanTag(u16);

impl VlanTag {
    pub fn new(tag: u16) -> Result<Self, TagError> {
        if (MIN_TAG..=MAX_TAG).contains(&tag) {
            Ok(Self(tag))
        } else {
            Err(TagError::OutOfRange(u32::from(tag)))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for VlanTag {
    type Error = TagError;

    fn try_from(tag: u16) -> Result<Self, Self::Error> {
        Self::new(tag)
    }
}

impl From<VlanTag> for u16 {
    fn from(tag: VlanTag) -> Self {
        tag.0
    }
}

impl FromStr for VlanTag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = !s.is_empty()
            && s.len() <= 4
            && s.bytes().all(|b| b.is_ascii_digit())
            && !s.starts_with('0');
        if !canonical {
            return Err(TagError::NotCanonical(s.to_string()));
        }
        let value: u32 = s
            .parse()
            .map_err(|_| TagError::NotCanonical(s.to_string()))?;
        let tag = u16::try_from(value).map_err(|_| TagError::OutOfRange(value))?;
        Self::new(tag)
    }
}

impl fmt::Display for VlanTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// VLAN encapsulation protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VlanProto {
    /// Kernel default (802.1Q)
    #[default]
    #[serde(rename = "")]
    Default,
    #[serde(rename = "802.1q")]
    Dot1Q,
    /// Service VLAN for QinQ
    #[serde(rename = "802.1ad")]
    Dot1Ad,
}

impl VlanProto {
    /// Every option as stored in the document
    pub const OPTIONS: &'static [&'static str] = &["", "802.1q", "802.1ad"];

    pub fn as_str(&self) -> &'static str {
        match self {
            VlanProto::Default => "",
            VlanProto::Dot1Q => "802.1q",
            VlanProto::Dot1Ad => "802.1ad",
        }
    }
}

impl FromStr for VlanProto {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(VlanProto::Default),
            "802.1q" => Ok(VlanProto::Dot1Q),
            "802.1ad" => Ok(VlanProto::Dot1Ad),
            _ => Err(ProtoError(s.to_string())),
        }
    }
}

impl fmt::Display for VlanProto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored VLAN record, as far as the controller needs to reason about it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanEntry {
    pub parent: String,
    pub tag: String,
    pub vlanif: String,
}

impl VlanEntry {
    pub fn from_fields(record: &FieldValues) -> Self {
        Self {
            parent: record.get_field_or(fields::PARENT, "").to_string(),
            tag: record.get_field_or(fields::TAG, "").to_string(),
            vlanif: record.get_field_or(fields::VLANIF, "").to_string(),
        }
    }

    /// Applies the parent and tag of an update on top of this entry.
    ///
    /// Fields absent from the update keep their stored value.
    pub fn updated_with(&self, update: &FieldValues) -> Self {
        let parent = update.get_field_or(fields::PARENT, &self.parent).to_string();
        let tag = update.get_field_or(fields::TAG, &self.tag).to_string();
        let vlanif = derived_name(&parent, &tag);
        Self {
            parent,
            tag,
            vlanif,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifcfg_common::field_values;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tag_from_str() {
        assert_eq!("1".parse::<VlanTag>().unwrap().get(), 1);
        assert_eq!("4094".parse::<VlanTag>().unwrap().get(), 4094);
        assert_eq!("0".parse::<VlanTag>(), Err(TagError::NotCanonical("0".into())));
        assert_eq!("4095".parse::<VlanTag>(), Err(TagError::OutOfRange(4095)));
        assert!("010".parse::<VlanTag>().is_err());
        assert!("12345".parse::<VlanTag>().is_err());
        assert!("-1".parse::<VlanTag>().is_err());
        assert!("".parse::<VlanTag>().is_err());
    }

    #[test]
    fn test_tag_serde_rejects_out_of_range() {
        assert_eq!(serde_json::to_string(&VlanTag::new(10).unwrap()).unwrap(), "10");
        assert!(serde_json::from_str::<VlanTag>("0").is_err());
        assert_eq!(serde_json::from_str::<VlanTag>("42").unwrap().get(), 42);
    }

    #[test]
    fn test_proto_options() {
        for option in VlanProto::OPTIONS {
            let proto: VlanProto = option.parse().unwrap();
            assert_eq!(proto.as_str(), *option);
        }
        assert_eq!(
            "qinq".parse::<VlanProto>(),
            Err(ProtoError("qinq".to_string()))
        );
        assert_eq!(VlanProto::Dot1Ad.to_string(), "802.1ad");
    }

    #[test]
    fn test_entry_update_keeps_missing_fields() {
        let stored = VlanEntry::from_fields(&field_values! {
            "if" => "em0",
            "tag" => "10",
            "vlanif" => "em0_vlan10",
        });

        let same = stored.updated_with(&field_values! { "descr" => "guests" });
        assert_eq!(same, stored);

        let retagged = stored.updated_with(&field_values! { "tag" => "20" });
        assert_eq!(retagged.parent, "em0");
        assert_eq!(retagged.vlanif, "em0_vlan20");
    }
}
