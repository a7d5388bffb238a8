//! Generic search/get/add/set/delete over one entity collection.
//!
//! Mutations run against a request-scoped [`Transaction`] and commit it
//! themselves when they succeed. Expected validation problems come back as
//! a `failed` [`MutationResult`]; only conditions that cannot be expressed
//! per field (unknown id, storage failure) are errors.

use ifcfg_common::{FieldValues, FieldValuesExt, IfCfgError, IfCfgResult};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::document::ConfigDocument;
use crate::schema::EntitySchema;
use crate::store::Transaction;
use crate::validate::{validate_record, Validations};

/// Outcome of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationStatus {
    Saved,
    Failed,
    Deleted,
}

/// Uniform result envelope of add/set/delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult {
    pub result: MutationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<Validations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

impl MutationResult {
    pub fn saved(uuid: Option<String>) -> Self {
        Self {
            result: MutationStatus::Saved,
            validations: None,
            uuid,
        }
    }

    pub fn deleted() -> Self {
        Self {
            result: MutationStatus::Deleted,
            validations: None,
            uuid: None,
        }
    }

    /// Failure without field-level detail.
    pub fn failed() -> Self {
        Self {
            result: MutationStatus::Failed,
            validations: None,
            uuid: None,
        }
    }

    /// Failure carrying field-level messages.
    pub fn invalid(validations: Validations) -> Self {
        Self {
            result: MutationStatus::Failed,
            validations: Some(validations),
            uuid: None,
        }
    }

    /// Failure with a single field-level message.
    pub fn invalid_field(key: impl Into<String>, message: impl Into<String>) -> Self {
        let mut validations = Validations::new();
        validations.insert(key.into(), message.into());
        Self::invalid(validations)
    }

    pub fn is_failed(&self) -> bool {
        self.result == MutationStatus::Failed
    }
}

/// One search row: `uuid` followed by the visible fields.
pub type Row = Map<String, Value>;

/// Parameters of a search.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Fields projected into each row.
    pub fields: Vec<String>,
    pub sort_by: Option<String>,
    /// 1-based page number.
    pub current: usize,
    /// Page size; `None` returns every row.
    pub row_count: Option<usize>,
    /// Case-insensitive filter over the visible fields.
    pub phrase: Option<String>,
}

impl SearchQuery {
    pub fn new(fields: &[&str], sort_by: &str) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            sort_by: Some(sort_by.to_string()),
            current: 1,
            row_count: None,
            phrase: None,
        }
    }

    pub fn page(mut self, current: usize, row_count: usize) -> Self {
        self.current = current.max(1);
        self.row_count = Some(row_count);
        self
    }

    pub fn phrase(mut self, phrase: impl Into<String>) -> Self {
        let phrase = phrase.into();
        self.phrase = (!phrase.trim().is_empty()).then_some(phrase);
        self
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub rows: Vec<Row>,
    /// Rows on this page.
    pub row_count: usize,
    /// Matching rows before pagination.
    pub total: usize,
    pub current: usize,
}

/// A single entity as returned by `get`.
///
/// Serializes as `{ "<model>": { field: value, ... } }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityView {
    pub model: &'static str,
    /// `None` for a fresh record filled with schema defaults.
    pub id: Option<String>,
    pub fields: FieldValues,
}

impl Serialize for EntityView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|(f, v)| (f.clone(), Value::String(v.clone())))
            .collect();
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.model, &fields)?;
        map.end()
    }
}

/// CRUD operations for the collection described by one schema.
#[derive(Debug, Clone, Copy)]
pub struct CrudService<'s> {
    schema: &'s EntitySchema,
}

impl<'s> CrudService<'s> {
    pub fn new(schema: &'s EntitySchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'s EntitySchema {
        self.schema
    }

    /// Client fields restricted to the schema.
    fn accepted(&self, fields: &FieldValues) -> FieldValues {
        fields
            .iter()
            .filter(|(f, _)| {
                let known = self.schema.field(f).is_some();
                if !known {
                    debug!(model = self.schema.name, field = %f, "Dropping unknown field");
                }
                known
            })
            .cloned()
            .collect()
    }

    /// Lists the collection projected to the query's fields.
    pub fn search(&self, document: &ConfigDocument, query: &SearchQuery) -> SearchResult {
        let needle = query.phrase.as_ref().map(|p| p.to_lowercase());

        let mut matching: Vec<(String, FieldValues)> = document
            .records(self.schema.collection)
            .into_iter()
            .filter(|(_, record)| match &needle {
                Some(needle) => query
                    .fields
                    .iter()
                    .any(|f| record.get_field_or(f, "").to_lowercase().contains(needle)),
                None => true,
            })
            .collect();

        if let Some(sort_by) = &query.sort_by {
            // stable: equal keys keep document order
            matching.sort_by(|(_, a), (_, b)| {
                a.get_field_or(sort_by, "").cmp(b.get_field_or(sort_by, ""))
            });
        }

        let total = matching.len();
        let current = query.current.max(1);
        let page: Vec<(String, FieldValues)> = match query.row_count {
            Some(size) => matching
                .into_iter()
                .skip((current - 1).saturating_mul(size))
                .take(size)
                .collect(),
            None => matching,
        };

        let rows: Vec<Row> = page
            .into_iter()
            .map(|(id, record)| {
                let mut row = Row::new();
                row.insert("uuid".to_string(), Value::String(id));
                for field in &query.fields {
                    let value = record.get_field_or(field, "").to_string();
                    row.insert(field.clone(), Value::String(value));
                }
                row
            })
            .collect();

        SearchResult {
            row_count: rows.len(),
            rows,
            total,
            current,
        }
    }

    /// Returns the entity `id`, or schema defaults when `id` is `None`.
    pub fn get(&self, document: &ConfigDocument, id: Option<&str>) -> IfCfgResult<EntityView> {
        let Some(id) = id else {
            return Ok(EntityView {
                model: self.schema.name,
                id: None,
                fields: self.schema.defaults(),
            });
        };

        let record = document
            .record(self.schema.collection, id)
            .ok_or_else(|| IfCfgError::not_found(self.schema.collection, id))?;
        let fields = self
            .schema
            .fields
            .iter()
            .map(|f| (f.name.to_string(), record.get_field_or(f.name, "").to_string()))
            .collect();

        Ok(EntityView {
            model: self.schema.name,
            id: Some(id.to_string()),
            fields,
        })
    }

    /// Validates and appends a new entity; `overrides` win over `fields`.
    #[instrument(skip_all, fields(model = self.schema.name))]
    pub fn add(
        &self,
        tx: &mut Transaction<'_>,
        fields: &FieldValues,
        overrides: &FieldValues,
    ) -> IfCfgResult<MutationResult> {
        let mut record = self.schema.defaults();
        record.merge_from(&self.accepted(fields));
        record.merge_from(overrides);

        let validations = validate_record(self.schema, &record, tx.document(), None);
        if !validations.is_empty() {
            debug!(?validations, "Rejected new entity");
            return Ok(MutationResult::invalid(validations));
        }

        let id = tx.document().generate_id(self.schema.collection);
        tx.document_mut()
            .insert_record(self.schema.collection, &id, &record)?;
        tx.commit()?;

        info!(uuid = %id, "Added entity");
        Ok(MutationResult::saved(Some(id)))
    }

    /// Validates and overwrites fields of an existing entity.
    #[instrument(skip(self, tx, fields, overrides), fields(model = self.schema.name))]
    pub fn set(
        &self,
        tx: &mut Transaction<'_>,
        id: &str,
        fields: &FieldValues,
        overrides: &FieldValues,
    ) -> IfCfgResult<MutationResult> {
        let mut record = tx
            .document()
            .record(self.schema.collection, id)
            .ok_or_else(|| IfCfgError::not_found(self.schema.collection, id))?;
        record.merge_from(&self.accepted(fields));
        record.merge_from(overrides);

        let validations = validate_record(self.schema, &record, tx.document(), Some(id));
        if !validations.is_empty() {
            debug!(?validations, "Rejected update");
            return Ok(MutationResult::invalid(validations));
        }

        tx.document_mut()
            .insert_record(self.schema.collection, id, &record)?;
        tx.commit()?;

        info!("Updated entity");
        Ok(MutationResult::saved(None))
    }

    /// Removes an entity; `failed` when it does not exist.
    #[instrument(skip(self, tx), fields(model = self.schema.name))]
    pub fn delete(&self, tx: &mut Transaction<'_>, id: &str) -> IfCfgResult<MutationResult> {
        if tx
            .document_mut()
            .remove_record(self.schema.collection, id)
            .is_none()
        {
            warn!("Entity to delete not found");
            return Ok(MutationResult::failed());
        }
        tx.commit()?;

        info!("Deleted entity");
        Ok(MutationResult::deleted())
    }
}
