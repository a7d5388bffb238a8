//! Hierarchical, order-preserving configuration document.
//!
//! The document is a tree of named nodes. A node is either a scalar (always
//! stored as a string) or a section of child nodes. Entity collections are
//! sections whose children are records keyed by a generated UUID:
//!
//! ```json
//! {
//!   "revision": 7,
//!   "config": {
//!     "interfaces": { "opt1": { "if": "em0_vlan10", "descr": "guests" } },
//!     "vlans": {
//!       "vlan": {
//!         "5f0c...": { "if": "em0", "tag": "10", "pcp": "0", "descr": "", "vlanif": "em0_vlan10" }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Nodes are addressed by dotted paths such as `"vlans.vlan"`. Key order is
//! preserved across load and save.

use ifcfg_common::{FieldValues, IfCfgError, IfCfgResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A section: ordered map of child nodes.
pub type Section = Map<String, Value>;

/// The whole configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Incremented on every committed write.
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    config: Section,
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Converts a record node into its scalar fields, skipping nested sections.
pub(crate) fn record_fields(node: &Section) -> FieldValues {
    node.iter()
        .filter_map(|(field, value)| scalar_text(value).map(|text| (field.clone(), text)))
        .collect()
}

impl ConfigDocument {
    /// Creates an empty document at revision 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing tree at revision 0.
    pub fn from_section(config: Section) -> Self {
        Self {
            revision: 0,
            config,
        }
    }

    /// Parses a persisted document.
    pub fn parse(text: &str) -> IfCfgResult<Self> {
        serde_json::from_str(text).map_err(|e| IfCfgError::document(e.to_string()))
    }

    /// Serializes the document for persistence.
    pub fn to_pretty_json(&self) -> IfCfgResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| IfCfgError::document(e.to_string()))
    }

    /// Returns the current revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision += 1;
    }

    /// Returns the root section.
    pub fn root(&self) -> &Section {
        &self.config
    }

    /// Looks up a node by dotted path. The empty path is not a node.
    pub fn node(&self, path: &str) -> Option<&Value> {
        let mut segments = split_path(path);
        let mut current = self.config.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Looks up a section by dotted path.
    pub fn section(&self, path: &str) -> Option<&Section> {
        if split_path(path).next().is_none() {
            return Some(&self.config);
        }
        self.node(path)?.as_object()
    }

    /// Looks up a section for mutation without creating it.
    pub fn section_mut(&mut self, path: &str) -> Option<&mut Section> {
        let mut current = &mut self.config;
        for segment in split_path(path) {
            current = current.get_mut(segment)?.as_object_mut()?;
        }
        Some(current)
    }

    /// Returns the section at `path`, creating missing intermediate sections.
    ///
    /// Fails if a scalar occupies any position along the path.
    pub fn ensure_section(&mut self, path: &str) -> IfCfgResult<&mut Section> {
        let mut current = &mut self.config;
        for segment in split_path(path) {
            let child = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Section::new()));
            current = child.as_object_mut().ok_or_else(|| {
                IfCfgError::document(format!("'{}' in path '{}' is not a section", segment, path))
            })?;
        }
        Ok(current)
    }

    /// Returns a scalar value by dotted path.
    pub fn scalar(&self, path: &str) -> Option<String> {
        scalar_text(self.node(path)?)
    }

    /// Sets a scalar value, creating intermediate sections.
    pub fn set_scalar(&mut self, path: &str, value: impl Into<String>) -> IfCfgResult<()> {
        let (parent, leaf) = match path.rsplit_once('.') {
            Some((parent, leaf)) => (parent, leaf),
            None => ("", path),
        };
        if leaf.is_empty() {
            return Err(IfCfgError::document(format!("empty node name in '{}'", path)));
        }
        self.ensure_section(parent)?
            .insert(leaf.to_string(), Value::String(value.into()));
        Ok(())
    }

    /// Lists the records of a collection in document order.
    ///
    /// A missing collection is empty. Children that are not sections are
    /// skipped.
    pub fn records(&self, collection: &str) -> Vec<(String, FieldValues)> {
        self.section(collection)
            .map(|section| {
                section
                    .iter()
                    .filter_map(|(id, node)| {
                        node.as_object().map(|record| (id.clone(), record_fields(record)))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns one record of a collection.
    pub fn record(&self, collection: &str, id: &str) -> Option<FieldValues> {
        self.section(collection)?
            .get(id)?
            .as_object()
            .map(record_fields)
    }

    /// Checks whether a collection holds a record with the given id.
    pub fn contains_record(&self, collection: &str, id: &str) -> bool {
        self.section(collection)
            .and_then(|section| section.get(id))
            .is_some_and(Value::is_object)
    }

    /// Inserts or replaces a record. A replaced record keeps its position.
    pub fn insert_record(
        &mut self,
        collection: &str,
        id: &str,
        fields: &FieldValues,
    ) -> IfCfgResult<()> {
        let record: Section = fields
            .iter()
            .map(|(field, value)| (field.clone(), Value::String(value.clone())))
            .collect();
        self.ensure_section(collection)?
            .insert(id.to_string(), Value::Object(record));
        Ok(())
    }

    /// Removes a record, keeping the order of its siblings.
    pub fn remove_record(&mut self, collection: &str, id: &str) -> Option<FieldValues> {
        let section = self.section_mut(collection)?;
        if !section.get(id).is_some_and(Value::is_object) {
            return None;
        }
        section
            .shift_remove(id)
            .and_then(|node| node.as_object().map(record_fields))
    }

    /// Generates an identifier not yet used in the collection.
    pub fn generate_id(&self, collection: &str) -> String {
        loop {
            let id = uuid::Uuid::new_v4().to_string();
            let taken = self
                .section(collection)
                .is_some_and(|section| section.contains_key(&id));
            if !taken {
                return id;
            }
        }
    }
}
