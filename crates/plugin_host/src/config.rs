//! Configuration management for the plugin host.
//!
//! This module handles loading, validation, and conversion of host
//! configuration from TOML files.

use plugin_runtime::{
    is_valid_name, HostConfig, NetworkRole, PluginEntry, PluginManagerConfig, Version,
    VersionPolicy,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default tick interval for serde deserialization
fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_host_name() -> String {
    "plugin_host".to_string()
}

fn default_plugin_directory() -> String {
    "plugins".to_string()
}

fn default_delimiter() -> char {
    plugin_runtime::namespace::DEFAULT_DELIMITER
}

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host instance settings
    #[serde(default)]
    pub host: HostSettings,
    /// Plugin discovery and the plugins to load
    #[serde(default)]
    pub plugins: PluginSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Settings of the host context itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Name reported in logs
    #[serde(default = "default_host_name")]
    pub name: String,
    #[serde(default)]
    pub network_role: NetworkRole,
    /// Interval between `core.tick` events in milliseconds (0 to disable)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSettings {
    /// Directory path where plugin files are located
    #[serde(default = "default_plugin_directory")]
    pub directory: String,
    /// Separator of dotted event and service names
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Plugins loaded at startup, in order
    #[serde(default)]
    pub load: Vec<PluginLoadSettings>,
}

/// One `[[plugins.load]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginLoadSettings {
    pub name: String,
    /// Requested version, `major.minor.patch`
    pub version: String,
    /// `minimum` or `exact`; minimum when left out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_policy: Option<String>,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            name: default_host_name(),
            network_role: NetworkRole::Host,
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            directory: default_plugin_directory(),
            delimiter: default_delimiter(),
            load: Vec::new(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, writing the default
    /// configuration to `path` first when the file does not exist.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Checks every setting that would otherwise fail at run time.
    pub fn validate(&self) -> Result<(), String> {
        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LEVELS:?}",
                &self.logging.level
            ));
        }

        if self.plugins.directory.is_empty() {
            return Err("Plugin directory cannot be empty".to_string());
        }

        let delimiter = self.plugins.delimiter;
        if delimiter.is_ascii_alphanumeric() || delimiter == '_' || delimiter.is_whitespace() {
            return Err(format!("Invalid delimiter: {delimiter:?}"));
        }

        for plugin in &self.plugins.load {
            if plugin.name.is_empty()
                || plugin.name.contains(delimiter)
                || !is_valid_name(&plugin.name, delimiter)
            {
                return Err(format!("Invalid plugin name: {:?}", plugin.name));
            }
            plugin
                .version
                .parse::<Version>()
                .map_err(|e| format!("Plugin {}: {e}", plugin.name))?;
            if let Some(policy) = &plugin.version_policy {
                policy
                    .parse::<VersionPolicy>()
                    .map_err(|e| format!("Plugin {}: {e}", plugin.name))?;
            }
        }

        Ok(())
    }

    pub fn to_host_config(&self) -> HostConfig {
        HostConfig {
            name: self.host.name.clone(),
            network_role: self.host.network_role,
            delimiter: self.plugins.delimiter,
        }
    }

    pub fn to_manager_config(&self) -> PluginManagerConfig {
        PluginManagerConfig {
            search_directory: PathBuf::from(&self.plugins.directory),
        }
    }

    /// Turns the `[[plugins.load]]` list into load requests. `force_exact`
    /// overrides every configured policy.
    pub fn plugin_entries(&self, force_exact: bool) -> Result<Vec<PluginEntry>, String> {
        self.plugins
            .load
            .iter()
            .map(|plugin| {
                let version = plugin
                    .version
                    .parse::<Version>()
                    .map_err(|e| format!("Plugin {}: {e}", plugin.name))?;
                let policy = match (force_exact, &plugin.version_policy) {
                    (true, _) => VersionPolicy::Exact,
                    (false, Some(policy)) => policy.parse()?,
                    (false, None) => {
                        warn!(
                            "⚠️ No version policy for plugin {}, using {}",
                            plugin.name,
                            VersionPolicy::Minimum
                        );
                        VersionPolicy::Minimum
                    }
                };
                Ok(PluginEntry::new(plugin.name.clone(), version, policy))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use tokio::fs;

    fn entry(name: &str, version: &str, policy: Option<&str>) -> PluginLoadSettings {
        PluginLoadSettings {
            name: name.to_string(),
            version: version.to_string(),
            version_policy: policy.map(str::to_string),
        }
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.host.name, "plugin_host");
        assert_eq!(config.host.network_role, NetworkRole::Host);
        assert_eq!(config.host.tick_interval_ms, 50);
        assert_eq!(config.plugins.directory, "plugins");
        assert_eq!(config.plugins.delimiter, '.');
        assert!(config.plugins.load.is_empty());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.host.tick_interval_ms, 50);

        // The default file is written and reads back the same
        assert!(path.exists());
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.plugins.directory, config.plugins.directory);
        assert_eq!(reloaded.plugins.delimiter, '.');
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[host]
name = "server"
network_role = "client"
tick_interval_ms = 33

[plugins]
directory = "custom_plugins"
delimiter = "/"

[[plugins.load]]
name = "greeter"
version = "0.1.0"
version_policy = "exact"

[[plugins.load]]
name = "logger"
version = "1.2.0"

[logging]
level = "debug"
json_format = true
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.host.name, "server");
        assert_eq!(config.host.network_role, NetworkRole::Client);
        assert_eq!(config.host.tick_interval_ms, 33);
        assert_eq!(config.plugins.directory, "custom_plugins");
        assert_eq!(config.plugins.delimiter, '/');
        assert_eq!(config.plugins.load.len(), 2);
        assert_eq!(config.plugins.load[0], entry("greeter", "0.1.0", Some("exact")));
        assert_eq!(config.plugins.load[1].version_policy, None);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde_deserialization_with_defaults() {
        let toml_content = r#"
[plugins]
directory = "plugins"

[logging]
level = "info"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.host.tick_interval_ms, 50);
        assert_eq!(config.host.name, "plugin_host");
        assert_eq!(config.plugins.delimiter, '.');
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        for level in VALID_LEVELS {
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "{level}");
        }
    }

    #[test]
    fn test_validation_empty_plugin_directory() {
        let mut config = AppConfig::default();
        config.plugins.directory = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_plugin_entries() {
        let mut config = AppConfig::default();
        config.plugins.load = vec![entry("bad name", "1.0.0", None)];
        assert!(config.validate().is_err());

        config.plugins.load = vec![entry("dotted.name", "1.0.0", None)];
        assert!(config.validate().is_err());

        config.plugins.load = vec![entry("greeter", "1.0", None)];
        assert!(config.validate().is_err());

        config.plugins.load = vec![entry("greeter", "1.0.0", Some("newest"))];
        assert!(config.validate().is_err());

        config.plugins.load = vec![entry("greeter", "1.0.0", Some("Exact"))];
        assert!(config.validate().is_ok());

        config.plugins.delimiter = 'a';
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_plugin_entries() {
        let mut config = AppConfig::default();
        config.plugins.load = vec![
            entry("greeter", "0.1.0", None),
            entry("logger", "1.2.3", Some("exact")),
        ];

        let entries = config.plugin_entries(false).unwrap();
        assert_eq!(entries[0].version_policy, VersionPolicy::Minimum);
        assert_eq!(entries[1].version_policy, VersionPolicy::Exact);
        assert_eq!(entries[1].version, Version::new(1, 2, 3));

        let forced = config.plugin_entries(true).unwrap();
        assert!(forced
            .iter()
            .all(|e| e.version_policy == VersionPolicy::Exact));
    }

    #[test]
    fn test_conversions() {
        let mut config = AppConfig::default();
        config.host.name = "client".to_string();
        config.host.network_role = NetworkRole::Client;
        config.plugins.delimiter = ':';
        config.plugins.directory = "/opt/plugins".to_string();

        let host = config.to_host_config();
        assert_eq!(host.name, "client");
        assert_eq!(host.network_role, NetworkRole::Client);
        assert_eq!(host.delimiter, ':');
        assert_eq!(
            config.to_manager_config().search_directory,
            PathBuf::from("/opt/plugins")
        );
    }
}
