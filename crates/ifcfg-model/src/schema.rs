//! Entity schemas and the model registry.
//!
//! A schema describes one entity family explicitly: where its collection
//! lives in the document, the kind and constraints of each field, composite
//! uniqueness rules, and which other collections hold references to it.

use std::collections::HashMap;

use ifcfg_common::{FieldValues, IfCfgError, IfCfgResult};
use regex::Regex;

/// Value domain of a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Free text, optionally constrained by a pattern and a maximum length.
    Text {
        pattern: Option<Regex>,
        max_len: Option<usize>,
    },
    /// Canonical decimal integer within an inclusive range.
    Integer { min: i64, max: i64 },
    /// One of a fixed set of options.
    Options(Vec<&'static str>),
    /// Space separated list of keys that must exist in another section.
    ReferenceList { section: &'static str },
}

/// One field of an entity schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub unique: bool,
    pub default: Option<&'static str>,
    /// Replaces the generic message for pattern and length failures.
    pub message: Option<&'static str>,
}

impl FieldSpec {
    fn with_kind(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            unique: false,
            default: None,
            message: None,
        }
    }

    /// Unconstrained text field.
    pub fn text(name: &'static str) -> Self {
        Self::with_kind(
            name,
            FieldKind::Text {
                pattern: None,
                max_len: None,
            },
        )
    }

    /// Integer field within `[min, max]`.
    pub fn integer(name: &'static str, min: i64, max: i64) -> Self {
        Self::with_kind(name, FieldKind::Integer { min, max })
    }

    /// Field restricted to `options`.
    pub fn options(name: &'static str, options: &[&'static str]) -> Self {
        Self::with_kind(name, FieldKind::Options(options.to_vec()))
    }

    /// List of keys of `section`.
    pub fn reference_list(name: &'static str, section: &'static str) -> Self {
        Self::with_kind(name, FieldKind::ReferenceList { section })
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    /// Adds a pattern to a text field. Ignored for other kinds.
    pub fn with_pattern(mut self, regex: &Regex) -> Self {
        if let FieldKind::Text { pattern, .. } = &mut self.kind {
            *pattern = Some(regex.clone());
        }
        self
    }

    /// Adds a maximum length to a text field. Ignored for other kinds.
    pub fn max_len(mut self, len: usize) -> Self {
        if let FieldKind::Text { max_len, .. } = &mut self.kind {
            *max_len = Some(len);
        }
        self
    }
}

/// Combination of fields that must be unique across the collection.
#[derive(Debug, Clone)]
pub struct UniqueConstraint {
    pub fields: Vec<&'static str>,
    /// Field the validation message is attached to.
    pub report_on: &'static str,
    pub message: &'static str,
}

/// A collection whose records reference entities of this schema.
///
/// Each child of `section` is a record; its `field` holds the value of the
/// referenced entity's `key_field`.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub section: &'static str,
    pub field: &'static str,
    pub key_field: &'static str,
}

/// Explicit description of one entity family.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    /// Model name, also the prefix of validation keys.
    pub name: &'static str,
    /// Dotted path of the collection in the document.
    pub collection: &'static str,
    pub fields: Vec<FieldSpec>,
    pub constraints: Vec<UniqueConstraint>,
    pub dependents: Vec<Dependency>,
}

impl EntitySchema {
    pub fn new(name: &'static str, collection: &'static str) -> Self {
        Self {
            name,
            collection,
            fields: Vec::new(),
            constraints: Vec::new(),
            dependents: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_constraint(mut self, constraint: UniqueConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_dependent(mut self, dependency: Dependency) -> Self {
        self.dependents.push(dependency);
        self
    }

    /// Looks up a field spec by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Every schema field, in schema order, set to its default or empty.
    pub fn defaults(&self) -> FieldValues {
        self.fields
            .iter()
            .map(|f| (f.name.to_string(), f.default.unwrap_or_default().to_string()))
            .collect()
    }

    /// Key under which a validation message for `field` is reported.
    pub fn validation_key(&self, field: &str) -> String {
        format!("{}.{}", self.name, field)
    }
}

/// Registry of entity schemas by model name.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    schemas: HashMap<&'static str, EntitySchema>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema, returning the one it replaced.
    pub fn register(&mut self, schema: EntitySchema) -> Option<EntitySchema> {
        self.schemas.insert(schema.name, schema)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, schema: EntitySchema) -> Self {
        self.register(schema);
        self
    }

    /// Looks up a schema by model name.
    pub fn get(&self, name: &str) -> IfCfgResult<&EntitySchema> {
        self.schemas
            .get(name)
            .ok_or_else(|| IfCfgError::UnknownModel {
                model: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered model names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.schemas.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
