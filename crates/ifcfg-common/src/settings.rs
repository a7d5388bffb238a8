//! Runtime settings for the interface settings controllers.
//!
//! Loads and validates settings from a TOML file.
//! Default location: /usr/local/etc/ifcfg.conf
//!
//! ```toml
//! [store]
//! config_path = "/conf/config.json"
//!
//! [pending]
//! vlan_removed_path = "/tmp/.vlans.removed"
//!
//! [backend]
//! command_timeout_secs = 120
//! ```

use crate::error::{IfCfgError, IfCfgResult};
use crate::shell::{CONFIGCTL_CMD, IFCONFIG_CMD};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default settings file location.
pub const DEFAULT_SETTINGS_PATH: &str = "/usr/local/etc/ifcfg.conf";

/// Configuration document storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Path of the persisted configuration document
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,
}

/// Pending change log locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSettings {
    /// Log of retired VLAN interface names awaiting the apply step
    #[serde(default = "default_vlan_removed_path")]
    pub vlan_removed_path: PathBuf,
}

/// External process execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Configuration daemon client
    #[serde(default = "default_configctl_cmd")]
    pub configctl_cmd: String,

    /// Interface configuration tool
    #[serde(default = "default_ifconfig_cmd")]
    pub ifconfig_cmd: String,

    /// Deadline for every external command in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

/// Complete ifcfg settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IfCfgSettings {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub pending: PendingSettings,

    #[serde(default)]
    pub backend: BackendSettings,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("/conf/config.json")
}

fn default_vlan_removed_path() -> PathBuf {
    PathBuf::from("/tmp/.vlans.removed")
}

fn default_configctl_cmd() -> String {
    CONFIGCTL_CMD.to_string()
}

fn default_ifconfig_cmd() -> String {
    IFCONFIG_CMD.to_string()
}

fn default_command_timeout() -> u64 {
    120
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
        }
    }
}

impl Default for PendingSettings {
    fn default() -> Self {
        Self {
            vlan_removed_path: default_vlan_removed_path(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            configctl_cmd: default_configctl_cmd(),
            ifconfig_cmd: default_ifconfig_cmd(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl IfCfgSettings {
    /// Load settings from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> IfCfgResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let settings: Self = toml::from_str(&content).map_err(|e| {
                    IfCfgError::invalid_config(
                        path.display().to_string(),
                        format!("failed to parse settings: {}", e),
                    )
                })?;
                settings.validate()?;
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Settings file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(IfCfgError::storage(path, e)),
        }
    }

    /// Get command deadline as Duration
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.command_timeout_secs)
    }

    /// Validate settings
    pub fn validate(&self) -> IfCfgResult<()> {
        if self.backend.command_timeout_secs == 0 {
            return Err(IfCfgError::invalid_config(
                "backend.command_timeout_secs",
                "must be > 0",
            ));
        }

        if self.store.config_path.as_os_str().is_empty() {
            return Err(IfCfgError::invalid_config(
                "store.config_path",
                "must not be empty",
            ));
        }

        if self.pending.vlan_removed_path.as_os_str().is_empty() {
            return Err(IfCfgError::invalid_config(
                "pending.vlan_removed_path",
                "must not be empty",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = IfCfgSettings::default();
        assert_eq!(settings.store.config_path, PathBuf::from("/conf/config.json"));
        assert_eq!(
            settings.pending.vlan_removed_path,
            PathBuf::from("/tmp/.vlans.removed")
        );
        assert_eq!(settings.backend.configctl_cmd, CONFIGCTL_CMD);
        assert_eq!(settings.command_timeout(), Duration::from_secs(120));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_uses_defaults() {
        let toml_str = r#"
[store]
config_path = "/var/tmp/config.json"

[backend]
command_timeout_secs = 30
"#;
        let settings: IfCfgSettings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.store.config_path, PathBuf::from("/var/tmp/config.json"));
        assert_eq!(settings.command_timeout(), Duration::from_secs(30));
        // Unspecified values should use defaults
        assert_eq!(settings.backend.ifconfig_cmd, IFCONFIG_CMD);
        assert_eq!(
            settings.pending.vlan_removed_path,
            PathBuf::from("/tmp/.vlans.removed")
        );
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut settings = IfCfgSettings::default();
        settings.backend.command_timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_nonexistent_file_defaults() {
        let settings = IfCfgSettings::load_or_default("/nonexistent/ifcfg.conf").unwrap();
        assert_eq!(settings.backend.command_timeout_secs, 120);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pending]\nvlan_removed_path = \"/var/run/vlans.removed\"").unwrap();

        let settings = IfCfgSettings::load_or_default(file.path()).unwrap();
        assert_eq!(
            settings.pending.vlan_removed_path,
            PathBuf::from("/var/run/vlans.removed")
        );
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\ncommand_timeout_secs = 0").unwrap();

        assert!(matches!(
            IfCfgSettings::load_or_default(file.path()),
            Err(IfCfgError::InvalidConfig { .. })
        ));
    }
}
