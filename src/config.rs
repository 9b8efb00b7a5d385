//! WolfSync Configuration
//!
//! This module provides configuration structures for the WolfSync
//! replication tool: the nodes to talk to, HTTP client and retry tuning,
//! and what a sync run propagates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::filter::FilterType;
use crate::model::Section;

/// Prefix marking a password that is read from the environment
const ENV_PREFIX: &str = "env:";

/// Main WolfSync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WolfSyncConfig {
    /// Authoritative node
    pub primary: NodeConfig,

    /// Nodes receiving the primary's configuration, synced in this order
    #[serde(default)]
    pub replicas: Vec<NodeConfig>,

    /// HTTP client configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Attempt budgets per operation kind
    #[serde(default)]
    pub retry: RetryConfig,

    /// What to replicate
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A node's API endpoint and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Base URL, e.g. `http://pihole.lan`
    pub url: String,

    /// Web interface password, or `env:NAME` to read it from the environment
    pub password: String,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Accept self-signed or otherwise invalid certificates
    #[serde(default)]
    pub skip_tls_verification: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between retry attempts in seconds
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

/// Attempt budgets per operation kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_auth_attempts")]
    pub authenticate: usize,

    #[serde(default = "default_auth_attempts")]
    pub delete_session: usize,

    #[serde(default = "default_write_attempts")]
    pub teleporter_push: usize,

    #[serde(default = "default_write_attempts")]
    pub config_patch: usize,

    #[serde(default = "default_write_attempts")]
    pub maintenance_job: usize,
}

/// Sync mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Teleporter export/import of the whole configuration
    Full,
    /// Per-section config patch
    #[default]
    Selective,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Full => f.write_str("full"),
            SyncMode::Selective => f.write_str("selective"),
        }
    }
}

/// What a sync run propagates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub mode: SyncMode,

    /// Rebuild gravity on every node after a successful sync
    #[serde(default)]
    pub run_gravity: bool,

    /// Seconds between runs (absent = run once)
    #[serde(default)]
    pub interval_secs: Option<u64>,

    /// Substrings marking DNS records as owned by the replica
    #[serde(default)]
    pub exclude_dns_records: Vec<String>,

    /// Teleporter import selection
    #[serde(default)]
    pub gravity: Option<GravitySettings>,

    /// Per-section config patch settings
    #[serde(default)]
    pub config: ConfigSettings,
}

/// Teleporter subsystems to import on replicas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GravitySettings {
    #[serde(default)]
    pub dhcp_leases: bool,
    #[serde(default)]
    pub group: bool,
    #[serde(default)]
    pub adlist: bool,
    #[serde(default)]
    pub adlist_by_group: bool,
    #[serde(default)]
    pub domainlist: bool,
    #[serde(default)]
    pub domainlist_by_group: bool,
    #[serde(default)]
    pub client: bool,
    #[serde(default)]
    pub client_by_group: bool,
}

/// One [`ConfigSetting`] per configuration section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSettings {
    #[serde(default)]
    pub dns: ConfigSetting,
    #[serde(default)]
    pub dhcp: ConfigSetting,
    #[serde(default)]
    pub ntp: ConfigSetting,
    #[serde(default)]
    pub resolver: ConfigSetting,
    #[serde(default)]
    pub database: ConfigSetting,
    #[serde(default)]
    pub misc: ConfigSetting,
    #[serde(default)]
    pub debug: ConfigSetting,
}

impl ConfigSettings {
    /// Setting for a section
    pub fn get(&self, section: Section) -> &ConfigSetting {
        match section {
            Section::Dns => &self.dns,
            Section::Dhcp => &self.dhcp,
            Section::Ntp => &self.ntp,
            Section::Resolver => &self.resolver,
            Section::Database => &self.database,
            Section::Misc => &self.misc,
            Section::Debug => &self.debug,
        }
    }
}

/// Enable flag plus optional key filter for one section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSetting {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub filter: Option<FilterSettings>,
}

impl ConfigSetting {
    pub fn new(enabled: bool, filter: Option<FilterSettings>) -> Self {
        Self { enabled, filter }
    }
}

/// Key filter applied to a section before it is written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub keys: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_timeout_secs() -> u64 {
    20
}

fn default_retry_delay_secs() -> u64 {
    1
}

fn default_auth_attempts() -> usize {
    3
}

fn default_write_attempts() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            skip_tls_verification: false,
            timeout_secs: default_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl ClientConfig {
    /// Get the request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            authenticate: default_auth_attempts(),
            delete_session: default_auth_attempts(),
            teleporter_push: default_write_attempts(),
            config_patch: default_write_attempts(),
            maintenance_job: default_write_attempts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl WolfSyncConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let mut config: WolfSyncConfig = toml::from_str(content)?;
        config.resolve_secrets()?;
        config.validate()?;
        Ok(config)
    }

    /// Replace `env:NAME` passwords with the variable's value
    fn resolve_secrets(&mut self) -> crate::Result<()> {
        for node in std::iter::once(&mut self.primary).chain(self.replicas.iter_mut()) {
            if let Some(name) = node.password.strip_prefix(ENV_PREFIX).map(str::to_string) {
                node.password = std::env::var(&name).map_err(|_| {
                    crate::Error::Config(format!(
                        "password for {} refers to unset environment variable {}",
                        node.url, name
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        validate_url("primary.url", &self.primary.url)?;

        if self.replicas.is_empty() {
            return Err(crate::Error::Config("at least one replica is required".into()));
        }

        for (i, replica) in self.replicas.iter().enumerate() {
            validate_url(&format!("replicas[{}].url", i), &replica.url)?;
            if replica.url.trim_end_matches('/') == self.primary.url.trim_end_matches('/') {
                return Err(crate::Error::Config(format!(
                    "replicas[{}] is the primary itself",
                    i
                )));
            }
        }

        let budgets = [
            ("retry.authenticate", self.retry.authenticate),
            ("retry.delete_session", self.retry.delete_session),
            ("retry.teleporter_push", self.retry.teleporter_push),
            ("retry.config_patch", self.retry.config_patch),
            ("retry.maintenance_job", self.retry.maintenance_job),
        ];
        for (name, attempts) in budgets {
            if attempts == 0 {
                return Err(crate::Error::Config(format!("{} must be at least 1", name)));
            }
        }

        for section in Section::ALL {
            if let Some(filter) = &self.sync.config.get(section).filter {
                if filter.keys.is_empty() {
                    return Err(crate::Error::Config(format!(
                        "sync.config.{}.filter.keys cannot be empty",
                        section
                    )));
                }
            }
        }

        if self.sync.interval_secs == Some(0) {
            return Err(crate::Error::Config("sync.interval_secs must be positive".into()));
        }

        Ok(())
    }

    /// Get the retry delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.client.retry_delay_secs)
    }

    /// Get the run interval as Duration, if runs repeat
    pub fn interval(&self) -> Option<Duration> {
        self.sync.interval_secs.map(Duration::from_secs)
    }
}

fn validate_url(field: &str, url: &str) -> crate::Result<()> {
    if url.is_empty() {
        return Err(crate::Error::Config(format!("{} cannot be empty", field)));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(crate::Error::Config(format!(
            "{} must start with http:// or https://",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[primary]
url = "http://ph1.lan"
password = "secret"

[[replicas]]
url = "http://ph2.lan"
password = "secret"
"#;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[primary]
url = "http://ph1.lan"
password = "primary-pass"

[[replicas]]
url = "http://ph2.lan"
password = "replica-pass"

[[replicas]]
url = "https://ph3.lan"
password = "replica-pass"

[client]
skip_tls_verification = true
retry_delay_secs = 2

[retry]
config_patch = 7

[sync]
mode = "selective"
run_gravity = true
exclude_dns_records = ["printer.lan"]

[sync.gravity]
adlist = true
group = true

[sync.config.dns]
enabled = true
filter = { type = "exclude", keys = ["upstreams"] }

[sync.config.dhcp]
enabled = true
"#;

        let config = WolfSyncConfig::from_str(toml).unwrap();
        assert_eq!(config.replicas.len(), 2);
        assert!(config.client.skip_tls_verification);
        assert_eq!(config.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.retry.config_patch, 7);
        assert_eq!(config.retry.authenticate, 3);
        assert_eq!(config.sync.mode, SyncMode::Selective);
        assert!(config.sync.run_gravity);
        assert_eq!(config.sync.exclude_dns_records, vec!["printer.lan".to_string()]);

        let gravity = config.sync.gravity.as_ref().unwrap();
        assert!(gravity.adlist && gravity.group);
        assert!(!gravity.dhcp_leases);

        let dns = config.sync.config.get(Section::Dns);
        assert!(dns.enabled);
        let filter = dns.filter.as_ref().unwrap();
        assert_eq!(filter.filter_type, FilterType::Exclude);
        assert_eq!(filter.keys, vec!["upstreams".to_string()]);
        assert!(config.sync.config.dhcp.enabled);
        assert!(!config.sync.config.ntp.enabled);
        assert!(config.interval().is_none());
    }

    #[test]
    fn test_defaults() {
        let config = WolfSyncConfig::from_str(MINIMAL).unwrap();
        assert_eq!(config.sync.mode, SyncMode::Selective);
        assert!(config.sync.gravity.is_none());
        assert_eq!(config.client.timeout(), Duration::from_secs(20));
        assert_eq!(config.retry.teleporter_push, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_requires_replica() {
        let toml = r#"
[primary]
url = "http://ph1.lan"
password = "secret"
"#;
        assert!(matches!(
            WolfSyncConfig::from_str(toml),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_rejects_bad_url_and_zero_budget() {
        let bad_url = MINIMAL.replace("http://ph2.lan", "ph2.lan");
        assert!(WolfSyncConfig::from_str(&bad_url).is_err());

        let zero_budget = format!("{}\n[retry]\nauthenticate = 0\n", MINIMAL);
        assert!(WolfSyncConfig::from_str(&zero_budget).is_err());
    }

    #[test]
    fn test_rejects_empty_filter_keys() {
        let toml = format!(
            "{}\n[sync.config.ntp]\nenabled = true\nfilter = {{ type = \"include\", keys = [] }}\n",
            MINIMAL
        );
        assert!(WolfSyncConfig::from_str(&toml).is_err());
    }

    #[test]
    fn test_password_from_environment() {
        std::env::set_var("WOLFSYNC_TEST_PRIMARY_PASSWORD", "from-env");
        let toml = MINIMAL.replacen(
            "password = \"secret\"",
            "password = \"env:WOLFSYNC_TEST_PRIMARY_PASSWORD\"",
            1,
        );
        let config = WolfSyncConfig::from_str(&toml).unwrap();
        assert_eq!(config.primary.password, "from-env");

        let missing = MINIMAL.replacen(
            "password = \"secret\"",
            "password = \"env:WOLFSYNC_TEST_UNSET_VARIABLE\"",
            1,
        );
        assert!(WolfSyncConfig::from_str(&missing).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wolfsync.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = WolfSyncConfig::from_file(&path).unwrap();
        assert_eq!(config.primary.url, "http://ph1.lan");
        assert!(WolfSyncConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
