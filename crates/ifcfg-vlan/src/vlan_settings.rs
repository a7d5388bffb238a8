//! VlanSettings - settings controller for VLAN interfaces
//!
//! Wraps the generic CRUD service with the VLAN policy:
//! 1. `vlanif` is always derived from parent and tag on the server
//! 2. An assigned VLAN cannot change its parent or tag, and cannot be deleted
//! 3. Every retired `vlanif` is queued for the reconfigure job

use std::sync::Arc;

use ifcfg_common::{CommandBackend, FieldValues, IfCfgError, IfCfgResult, IfCfgSettings};
use ifcfg_model::{
    ConfigStore, CrudService, EntitySchema, EntityView, ModelRegistry, MutationResult,
    PendingChangeLog, ReconfigureInvoker, ReconfigureStatus, ReferenceGuard, RequestIntent,
    SearchQuery, SearchResult,
};
use tracing::{info, instrument, warn};

use crate::schema::vlan_schema;
use crate::tables::{fields, messages, RECONFIGURE_ACTION, VLAN_COLLECTION, VLAN_MODEL};
use crate::types::VlanEntry;

/// VLAN settings controller
pub struct VlanSettings {
    store: Arc<ConfigStore>,
    schema: EntitySchema,
    pending: PendingChangeLog,
    invoker: ReconfigureInvoker,
}

impl VlanSettings {
    /// Creates a controller over an open store, with the `vlan` model of
    /// `registry` as its schema
    pub fn new(
        store: Arc<ConfigStore>,
        registry: &ModelRegistry,
        pending: PendingChangeLog,
        invoker: ReconfigureInvoker,
    ) -> IfCfgResult<Self> {
        Ok(Self {
            store,
            schema: registry.get(VLAN_MODEL)?.clone(),
            pending,
            invoker,
        })
    }

    /// Opens the store and pending log named by `settings`
    pub fn from_settings(
        settings: &IfCfgSettings,
        backend: Arc<dyn CommandBackend>,
    ) -> IfCfgResult<Self> {
        let store = Arc::new(ConfigStore::open(&settings.store.config_path)?);
        let pending = PendingChangeLog::new(&settings.pending.vlan_removed_path);
        let invoker =
            ReconfigureInvoker::new(backend, &settings.backend.configctl_cmd, RECONFIGURE_ACTION);
        let registry = ModelRegistry::new().with(vlan_schema());
        Self::new(store, &registry, pending, invoker)
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    fn crud(&self) -> CrudService<'_> {
        CrudService::new(&self.schema)
    }

    /// Lists VLANs sorted by device name
    pub fn search_item(
        &self,
        current: usize,
        row_count: Option<usize>,
        phrase: Option<&str>,
    ) -> SearchResult {
        let mut query = SearchQuery::new(fields::VISIBLE, fields::VLANIF);
        if let Some(size) = row_count {
            query = query.page(current, size);
        }
        if let Some(phrase) = phrase {
            query = query.phrase(phrase);
        }
        self.crud().search(&self.store.snapshot(), &query)
    }

    /// Returns one VLAN, or defaults for a new one
    pub fn get_item(&self, id: Option<&str>) -> IfCfgResult<EntityView> {
        self.crud().get(&self.store.snapshot(), id)
    }

    /// Adds a VLAN; any client-supplied `vlanif` is replaced
    #[instrument(skip(self, values))]
    pub fn add_item(&self, values: &FieldValues) -> IfCfgResult<MutationResult> {
        let entry = VlanEntry::default().updated_with(values);
        let overrides = vec![(fields::VLANIF.to_string(), entry.vlanif)];

        let mut tx = self.store.transaction()?;
        self.crud().add(&mut tx, values, &overrides)
    }

    /// Updates a VLAN, refusing to rename one that is assigned
    #[instrument(skip(self, values))]
    pub fn set_item(&self, id: &str, values: &FieldValues) -> IfCfgResult<MutationResult> {
        let mut tx = self.store.transaction()?;
        let stored = tx
            .document()
            .record(VLAN_COLLECTION, id)
            .map(|record| VlanEntry::from_fields(&record))
            .ok_or_else(|| IfCfgError::not_found(VLAN_COLLECTION, id))?;
        let updated = stored.updated_with(values);

        let guard = ReferenceGuard::new(&self.schema, tx.document());
        if guard.blocks_rename(&stored.vlanif, &updated.vlanif) {
            warn!(vlanif = %stored.vlanif, "Refusing to rename assigned VLAN");
            let result = if updated.tag != stored.tag {
                MutationResult::invalid_field(
                    self.schema.validation_key(fields::TAG),
                    messages::TAG_ASSIGNED,
                )
            } else {
                MutationResult::invalid_field(
                    self.schema.validation_key(fields::PARENT),
                    messages::PARENT_ASSIGNED,
                )
            };
            return Ok(result);
        }

        let overrides = vec![(fields::VLANIF.to_string(), updated.vlanif.clone())];
        let result = self.crud().set(&mut tx, id, values, &overrides)?;
        drop(tx);

        if !result.is_failed() && stored.vlanif != updated.vlanif {
            self.retire(&stored.vlanif)?;
        }
        Ok(result)
    }

    /// Deletes a VLAN that is not assigned as an interface
    #[instrument(skip(self))]
    pub fn del_item(&self, id: &str) -> IfCfgResult<MutationResult> {
        let mut tx = self.store.transaction()?;
        let Some(record) = tx.document().record(VLAN_COLLECTION, id) else {
            warn!("VLAN to delete not found");
            return Ok(MutationResult::failed());
        };

        let guard = ReferenceGuard::new(&self.schema, tx.document());
        guard.ensure_removable(&record, messages::DELETE_ASSIGNED)?;

        let result = self.crud().delete(&mut tx, id)?;
        drop(tx);

        if !result.is_failed() {
            self.retire(&VlanEntry::from_fields(&record).vlanif)?;
        }
        Ok(result)
    }

    /// Runs the VLAN reconfigure job
    pub async fn reconfigure(&self, intent: RequestIntent) -> ReconfigureStatus {
        self.invoker.apply(intent).await
    }

    /// Device names waiting to be torn down
    pub fn pending_removals(&self) -> IfCfgResult<Vec<String>> {
        self.pending.entries()
    }

    /// Consumes the queue of device names waiting to be torn down
    pub fn drain_pending_removals(&self) -> IfCfgResult<Vec<String>> {
        self.pending.drain()
    }

    fn retire(&self, vlanif: &str) -> IfCfgResult<()> {
        if vlanif.is_empty() {
            return Ok(());
        }
        self.pending.append(vlanif)?;
        info!(vlanif, "Queued VLAN device for removal");
        Ok(())
    }
}
