//! IfGroupSettings - settings controller for interface groups
//!
//! Groups are plain CRUD records, except that deleting one first detaches
//! every member device from the kernel interface group. The record is only
//! removed if it is still the one whose members were detached.

use std::sync::Arc;

use ifcfg_common::shell::shellquote;
use ifcfg_common::{CommandBackend, FieldValues, FieldValuesExt, IfCfgResult, IfCfgSettings};
use ifcfg_model::{
    ConfigDocument, ConfigStore, CrudService, EntitySchema, EntityView, ModelRegistry,
    MutationResult, SearchQuery, SearchResult,
};
use tracing::{debug, info, instrument, warn};

use crate::schema::ifgroup_schema;
use crate::tables::{
    fields, IFGROUP_COLLECTION, IFGROUP_MODEL, INTERFACES_SECTION, INTERFACE_DEVICE_FIELD,
};

/// Interface group settings controller
pub struct IfGroupSettings {
    store: Arc<ConfigStore>,
    schema: EntitySchema,
    backend: Arc<dyn CommandBackend>,
    ifconfig_cmd: String,
}

impl IfGroupSettings {
    /// Creates a controller whose schema is the `ifgroup` model of `registry`
    pub fn new(
        store: Arc<ConfigStore>,
        registry: &ModelRegistry,
        backend: Arc<dyn CommandBackend>,
        ifconfig_cmd: impl Into<String>,
    ) -> IfCfgResult<Self> {
        Ok(Self {
            store,
            schema: registry.get(IFGROUP_MODEL)?.clone(),
            backend,
            ifconfig_cmd: ifconfig_cmd.into(),
        })
    }

    /// Opens the store named by `settings`
    pub fn from_settings(
        settings: &IfCfgSettings,
        backend: Arc<dyn CommandBackend>,
    ) -> IfCfgResult<Self> {
        let store = Arc::new(ConfigStore::open(&settings.store.config_path)?);
        let registry = ModelRegistry::new().with(ifgroup_schema());
        Self::new(
            store,
            &registry,
            backend,
            settings.backend.ifconfig_cmd.clone(),
        )
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    fn crud(&self) -> CrudService<'_> {
        CrudService::new(&self.schema)
    }

    /// Lists groups sorted by name
    pub fn search_item(
        &self,
        current: usize,
        row_count: Option<usize>,
        phrase: Option<&str>,
    ) -> SearchResult {
        let mut query = SearchQuery::new(fields::VISIBLE, fields::IFNAME);
        if let Some(size) = row_count {
            query = query.page(current, size);
        }
        if let Some(phrase) = phrase {
            query = query.phrase(phrase);
        }
        self.crud().search(&self.store.snapshot(), &query)
    }

    pub fn get_item(&self, id: Option<&str>) -> IfCfgResult<EntityView> {
        self.crud().get(&self.store.snapshot(), id)
    }

    #[instrument(skip(self, values))]
    pub fn add_item(&self, values: &FieldValues) -> IfCfgResult<MutationResult> {
        let mut tx = self.store.transaction()?;
        self.crud().add(&mut tx, values, &FieldValues::new())
    }

    #[instrument(skip(self, values))]
    pub fn set_item(&self, id: &str, values: &FieldValues) -> IfCfgResult<MutationResult> {
        let mut tx = self.store.transaction()?;
        self.crud().set(&mut tx, id, values, &FieldValues::new())
    }

    /// Detaches member devices from the group, then deletes the record.
    ///
    /// A failing `ifconfig` is logged and does not stop the delete. If the
    /// record changed while the commands ran, nothing is deleted.
    #[instrument(skip(self))]
    pub async fn del_item(&self, id: &str) -> IfCfgResult<MutationResult> {
        let snapshot = self.store.snapshot();
        let Some(record) = snapshot.record(IFGROUP_COLLECTION, id) else {
            warn!("Interface group to delete not found");
            return Ok(MutationResult::failed());
        };
        let ifname = record.get_field_or(fields::IFNAME, "");

        for device in member_devices(&snapshot, &record) {
            let cmd = format!(
                "{} {} -group {}",
                self.ifconfig_cmd,
                shellquote(&device),
                shellquote(ifname)
            );
            match self.backend.run(&cmd).await {
                Ok(result) if result.success() => {
                    debug!(device = %device, group = ifname, "Detached device from group")
                }
                Ok(result) => warn!(
                    device = %device,
                    exit_code = result.exit_code,
                    output = %result.combined_output(),
                    "Failed to detach device from group"
                ),
                Err(e) => warn!(device = %device, error = %e, "Failed to detach device from group"),
            }
        }

        let mut tx = self.store.transaction()?;
        if tx.document().record(IFGROUP_COLLECTION, id).as_ref() != Some(&record) {
            warn!(group = ifname, "Interface group changed during delete, keeping it");
            return Ok(MutationResult::failed());
        }
        let result = self.crud().delete(&mut tx, id)?;
        if !result.is_failed() {
            info!(group = ifname, "Deleted interface group");
        }
        Ok(result)
    }
}

/// Devices of the group's members that resolve to an assigned interface.
fn member_devices(document: &ConfigDocument, group: &FieldValues) -> Vec<String> {
    group
        .get_field_or(fields::MEMBERS, "")
        .split_whitespace()
        .filter_map(|member| {
            let device = document
                .record(INTERFACES_SECTION, member)
                .and_then(|iface| iface.get_field(INTERFACE_DEVICE_FIELD).map(str::to_string))
                .filter(|device| !device.is_empty());
            if device.is_none() {
                debug!(member, "Group member has no device");
            }
            device
        })
        .collect()
}
