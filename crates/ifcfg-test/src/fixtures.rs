//! Test fixtures for settings controllers
//!
//! Provides reusable configuration documents and a file-backed environment
//! with both controllers wired to one store and a mock command backend

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ifcfg_common::{field_values, FieldValues, IfCfgError, IfCfgResult};
use ifcfg_ifgroup::{ifgroup_schema, IfGroupSettings, IFGROUP_COLLECTION};
use ifcfg_model::{
    ConfigDocument, ConfigStore, ModelRegistry, PendingChangeLog, ReconfigureInvoker,
};
use ifcfg_vlan::{derived_name, vlan_schema, VlanSettings, RECONFIGURE_ACTION, VLAN_COLLECTION};
use tempfile::TempDir;

use crate::verification::MockBackend;

/// Control command used by the test environment
pub const TEST_CONFIGCTL: &str = "/usr/local/sbin/configctl";

/// Interface tool used by the test environment
pub const TEST_IFCONFIG: &str = "/sbin/ifconfig";

/// Every model the controllers manage, by name
pub fn registry() -> ModelRegistry {
    ModelRegistry::new().with(vlan_schema()).with(ifgroup_schema())
}

/// Builder for configuration documents
#[derive(Debug, Default)]
pub struct ConfigFixture {
    document: ConfigDocument,
}

impl ConfigFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `device` as interface `name` (lan, wan, opt1, ...)
    pub fn with_interface(mut self, name: &str, device: &str) -> Self {
        self.insert("interfaces", name, field_values! { "if" => device });
        self
    }

    /// Adds a VLAN record under a fixed id, with its derived name
    pub fn with_vlan(mut self, id: &str, parent: &str, tag: u16) -> Self {
        let tag = tag.to_string();
        let vlanif = derived_name(parent, &tag);
        self.insert(
            VLAN_COLLECTION,
            id,
            field_values! {
                "if" => parent,
                "tag" => tag,
                "pcp" => "0",
                "proto" => "",
                "descr" => "",
                "vlanif" => vlanif,
            },
        );
        self
    }

    /// Adds an interface group record under a fixed id
    pub fn with_ifgroup(mut self, id: &str, ifname: &str, members: &[&str]) -> Self {
        self.insert(
            IFGROUP_COLLECTION,
            id,
            field_values! {
                "ifname" => ifname,
                "members" => members.join(" "),
                "descr" => "",
            },
        );
        self
    }

    /// Sets an arbitrary scalar
    pub fn with_scalar(mut self, path: &str, value: &str) -> Self {
        self.document
            .set_scalar(path, value)
            .unwrap_or_else(|e| panic!("fixture scalar {}: {}", path, e));
        self
    }

    fn insert(&mut self, collection: &str, id: &str, fields: FieldValues) {
        self.document
            .insert_record(collection, id, &fields)
            .unwrap_or_else(|e| panic!("fixture record {}.{}: {}", collection, id, e));
    }

    pub fn build(self) -> ConfigDocument {
        self.document
    }
}

/// Common document fixtures
pub mod documents {
    use super::*;

    /// Two physical interfaces, one VLAN assigned as opt1 and one unassigned
    ///
    /// - `vlan-assigned`: em0 tag 10, referenced by `opt1`
    /// - `vlan-free`: em0 tag 20
    pub fn assigned_and_free_vlan() -> ConfigDocument {
        ConfigFixture::new()
            .with_scalar("system.hostname", "fw")
            .with_interface("wan", "em1")
            .with_interface("lan", "em0")
            .with_interface("opt1", "em0_vlan10")
            .with_vlan("vlan-assigned", "em0", 10)
            .with_vlan("vlan-free", "em0", 20)
            .build()
    }
}

/// File-backed environment with both controllers sharing one store
pub struct TestEnv {
    dir: TempDir,
    pub backend: Arc<MockBackend>,
    pub vlans: VlanSettings,
    pub groups: IfGroupSettings,
}

impl TestEnv {
    /// Writes `document` to a temporary config file and opens it
    pub fn start(document: ConfigDocument) -> IfCfgResult<Self> {
        let dir = TempDir::new().map_err(|e| IfCfgError::storage("tempdir", e))?;
        let conf_dir = dir.path().join("conf");
        let config_path = conf_dir.join("config.json");
        std::fs::create_dir_all(&conf_dir).map_err(|e| IfCfgError::storage(&conf_dir, e))?;
        std::fs::write(&config_path, document.to_pretty_json()?)
            .map_err(|e| IfCfgError::storage(&config_path, e))?;

        let store = Arc::new(ConfigStore::open(&config_path)?);
        let backend = Arc::new(MockBackend::default());
        let registry = registry();
        let vlans = VlanSettings::new(
            Arc::clone(&store),
            &registry,
            PendingChangeLog::new(dir.path().join(".vlans.removed")),
            ReconfigureInvoker::new(backend.clone(), TEST_CONFIGCTL, RECONFIGURE_ACTION),
        )?;
        let groups = IfGroupSettings::new(store, &registry, backend.clone(), TEST_IFCONFIG)?;

        Ok(Self {
            dir,
            backend,
            vlans,
            groups,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("conf").join("config.json")
    }

    pub fn pending_path(&self) -> PathBuf {
        self.dir.path().join(".vlans.removed")
    }

    /// Committed document as currently held in memory
    pub fn snapshot(&self) -> ConfigDocument {
        self.vlans.store().snapshot()
    }

    /// Document as persisted on disk
    pub fn reload(&self) -> IfCfgResult<ConfigDocument> {
        Ok(ConfigStore::open(self.config_path())?.snapshot())
    }

    /// A VLAN controller over its own handle on the config file, as a
    /// separate request process would open it
    pub fn open_vlans(&self) -> IfCfgResult<VlanSettings> {
        VlanSettings::new(
            Arc::new(ConfigStore::open(self.config_path())?),
            &registry(),
            PendingChangeLog::new(self.pending_path()),
            ReconfigureInvoker::new(self.backend.clone(), TEST_CONFIGCTL, RECONFIGURE_ACTION),
        )
    }
}
