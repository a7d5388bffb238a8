//! Reference integrity for entities other collections depend on.
//!
//! An entity is "assigned" while a record in one of its schema's dependent
//! collections stores the entity's key value. Assigned entities may not be
//! deleted, and their key may not change.

use std::collections::HashMap;

use ifcfg_common::{FieldValues, FieldValuesExt, IfCfgError, IfCfgResult};
use tracing::debug;

use crate::document::ConfigDocument;
use crate::schema::{Dependency, EntitySchema};

/// Map from referenced value to the keys of the records holding it.
#[derive(Debug, Default, Clone)]
pub struct ReferenceIndex {
    key_field: &'static str,
    referrers: HashMap<String, Vec<String>>,
}

impl ReferenceIndex {
    /// Indexes one dependent collection.
    pub fn build(document: &ConfigDocument, dependency: &Dependency) -> Self {
        let mut referrers: HashMap<String, Vec<String>> = HashMap::new();
        for (key, record) in document.records(dependency.section) {
            if let Some(value) = record.get_field(dependency.field).filter(|v| !v.is_empty()) {
                referrers.entry(value.to_string()).or_default().push(key);
            }
        }
        Self {
            key_field: dependency.key_field,
            referrers,
        }
    }

    /// Field of the referenced entity this index is keyed by.
    pub fn key_field(&self) -> &'static str {
        self.key_field
    }

    pub fn is_referenced(&self, value: &str) -> bool {
        self.referrers.contains_key(value)
    }

    /// Keys of records referencing `value`, in document order.
    pub fn referrers(&self, value: &str) -> &[String] {
        self.referrers.get(value).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Guards mutations of one entity family against its dependents.
///
/// Built per request from the transaction's working document.
#[derive(Debug)]
pub struct ReferenceGuard {
    indexes: Vec<ReferenceIndex>,
}

impl ReferenceGuard {
    pub fn new(schema: &EntitySchema, document: &ConfigDocument) -> Self {
        let indexes = schema
            .dependents
            .iter()
            .map(|dependency| ReferenceIndex::build(document, dependency))
            .collect();
        Self { indexes }
    }

    /// Returns true if any dependent record references `value`.
    pub fn is_assigned(&self, value: &str) -> bool {
        !value.is_empty() && self.indexes.iter().any(|index| index.is_referenced(value))
    }

    /// All records referencing `value` across dependent collections.
    pub fn referrers(&self, value: &str) -> Vec<String> {
        self.indexes
            .iter()
            .flat_map(|index| index.referrers(value).iter().cloned())
            .collect()
    }

    /// Fails with `InUse` if the entity's key value is referenced.
    pub fn ensure_removable(&self, record: &FieldValues, message: &str) -> IfCfgResult<()> {
        for index in &self.indexes {
            let value = record.get_field_or(index.key_field(), "");
            if self.is_assigned(value) {
                debug!(value, referrers = ?self.referrers(value), "Entity still referenced");
                return Err(IfCfgError::in_use(message));
            }
        }
        Ok(())
    }

    /// Returns true if renaming `old` to `new` would orphan a reference.
    pub fn blocks_rename(&self, old: &str, new: &str) -> bool {
        old != new && self.is_assigned(old)
    }
}
