//! Configuration types for the ADF system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::time::Duration;

/// Default URL used to discover the node's public address
pub const DEFAULT_RESOLVER_URL: &str = "https://api.ipify.org";

/// Main failover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverConfig {
    /// Own-address resolver configuration
    pub resolver: ResolverConfig,

    /// DNS directory configuration
    pub directory: DirectoryConfig,

    /// Health check configuration
    pub check: CheckConfig,

    /// DNS names whose pools this node belongs to
    pub records: Vec<RecordConfig>,

    /// Scheduling, timeout and retry settings
    #[serde(default)]
    pub timing: TimingConfig,
}

impl FailoverConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            directory: DirectoryConfig::default(),
            check: CheckConfig::default(),
            records: Vec::new(),
            timing: TimingConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.validate_loop()?;
        self.resolver.validate()?;
        self.directory.validate()?;
        self.check.validate()
    }

    /// Validate only the records and timing
    ///
    /// Used when the collaborators are built by the caller rather than
    /// from this configuration.
    pub fn validate_loop(&self) -> Result<(), crate::Error> {
        if self.records.is_empty() {
            return Err(crate::Error::config("No records configured"));
        }

        for record in &self.records {
            if record.name.trim().is_empty() {
                return Err(crate::Error::config("Record name cannot be empty"));
            }
        }

        self.timing.validate()
    }
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Own-address resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolverConfig {
    /// Fetch the address from a URL that answers with the bare address
    Http {
        /// URL to fetch the address from
        url: String,
        /// Accept only this IP version
        #[serde(default)]
        version: Option<IpVersion>,
    },

    /// Fixed, pre-configured address
    Static {
        /// The node's address
        address: IpAddr,
    },

    /// Custom resolver
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ResolverConfig::Http { url, .. } => {
                if url.is_empty() {
                    return Err(crate::Error::config("HTTP resolver URL cannot be empty"));
                }
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "HTTP resolver URL must use http or https: {}",
                        url
                    )));
                }
                Ok(())
            }
            ResolverConfig::Static { .. } => Ok(()),
            ResolverConfig::Custom { factory, config } => {
                validate_custom("resolver", factory, config)
            }
        }
    }

    /// Get the resolver type name
    pub fn type_name(&self) -> &str {
        match self {
            ResolverConfig::Http { .. } => "http",
            ResolverConfig::Static { .. } => "static",
            ResolverConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig::Http {
            url: DEFAULT_RESOLVER_URL.to_string(),
            version: None,
        }
    }
}

/// IP version filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 only
    V4,
    /// IPv6 only
    V6,
    /// Both IPv4 and IPv6
    Both,
}

impl IpVersion {
    /// Whether `address` is acceptable under this filter
    pub fn accepts(&self, address: &IpAddr) -> bool {
        match self {
            IpVersion::V4 => address.is_ipv4(),
            IpVersion::V6 => address.is_ipv6(),
            IpVersion::Both => true,
        }
    }
}

/// DNS directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectoryConfig {
    /// Cloudflare-hosted zone
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional, can be auto-detected)
        zone_id: Option<String>,
        /// TTL for records this node creates
        #[serde(default)]
        ttl: Option<u32>,
        /// Free-form note attached to records this node creates
        #[serde(default)]
        notes: Option<String>,
        /// Read the zone but only log intended writes
        #[serde(default)]
        dry_run: bool,
    },

    /// Amazon Route53 hosted zone
    Route53 {
        /// AWS access key ID
        access_key_id: String,
        /// AWS secret access key
        secret_access_key: String,
        /// Session token for temporary credentials
        #[serde(default)]
        session_token: Option<String>,
        /// Hosted zone ID (optional, can be auto-detected)
        #[serde(default)]
        zone_id: Option<String>,
        /// TTL for record sets this node creates
        #[serde(default)]
        ttl: Option<u32>,
        /// Comment attached to change batches
        #[serde(default)]
        notes: Option<String>,
        /// Read the zone but only log intended writes
        #[serde(default)]
        dry_run: bool,
    },

    /// In-process directory (embedding, tests)
    Memory {
        /// Initial records, keyed by name
        #[serde(default)]
        records: HashMap<String, Vec<IpAddr>>,
    },

    /// Custom directory
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl DirectoryConfig {
    /// Validate the directory configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            DirectoryConfig::Cloudflare { api_token, ttl, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if *ttl == Some(0) {
                    return Err(crate::Error::config("Record TTL must be > 0"));
                }
                Ok(())
            }
            DirectoryConfig::Route53 {
                access_key_id,
                secret_access_key,
                ttl,
                ..
            } => {
                if access_key_id.is_empty() || secret_access_key.is_empty() {
                    return Err(crate::Error::config(
                        "Route53 access key ID and secret access key cannot be empty",
                    ));
                }
                if *ttl == Some(0) {
                    return Err(crate::Error::config("Record TTL must be > 0"));
                }
                Ok(())
            }
            DirectoryConfig::Memory { .. } => Ok(()),
            DirectoryConfig::Custom { factory, config } => {
                validate_custom("directory", factory, config)
            }
        }
    }

    /// Get the directory type name
    pub fn type_name(&self) -> &str {
        match self {
            DirectoryConfig::Cloudflare { .. } => "cloudflare",
            DirectoryConfig::Route53 { .. } => "route53",
            DirectoryConfig::Memory { .. } => "memory",
            DirectoryConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig::Cloudflare {
            api_token: String::new(),
            zone_id: None,
            ttl: None,
            notes: None,
            dry_run: false,
        }
    }
}

/// Health check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckConfig {
    /// One HTTP request per check
    Http {
        /// Request method
        #[serde(default = "default_http_method")]
        method: String,
        /// Request path (including query string)
        #[serde(default = "default_http_path")]
        path: String,
        /// Port to connect to on the target
        #[serde(default = "default_http_port")]
        port: u16,
        /// Extra request headers (e.g. `Host` for virtual hosting)
        #[serde(default)]
        headers: BTreeMap<String, String>,
        /// Optional request body
        #[serde(default)]
        body: Option<String>,
        /// Status codes counted as healthy
        #[serde(default = "default_valid_status_codes")]
        valid_status_codes: Vec<u16>,
    },

    /// External command; exit status 0 is healthy
    Command {
        /// Program to run
        program: String,
        /// Arguments; `{target}` is replaced by the checked address
        #[serde(default)]
        args: Vec<String>,
    },

    /// Custom check
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl CheckConfig {
    /// Validate the check configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            CheckConfig::Http {
                method,
                path,
                port,
                valid_status_codes,
                ..
            } => {
                if method.is_empty() {
                    return Err(crate::Error::config("HTTP check method cannot be empty"));
                }
                if !path.starts_with('/') {
                    return Err(crate::Error::config(format!(
                        "HTTP check path must start with '/': {}",
                        path
                    )));
                }
                if *port == 0 {
                    return Err(crate::Error::config("HTTP check port must be > 0"));
                }
                if valid_status_codes.is_empty() {
                    return Err(crate::Error::config(
                        "HTTP check needs at least one valid status code",
                    ));
                }
                Ok(())
            }
            CheckConfig::Command { program, .. } => {
                if program.is_empty() {
                    return Err(crate::Error::config("Check command cannot be empty"));
                }
                Ok(())
            }
            CheckConfig::Custom { factory, config } => validate_custom("check", factory, config),
        }
    }

    /// Get the check type name
    pub fn type_name(&self) -> &str {
        match self {
            CheckConfig::Http { .. } => "http",
            CheckConfig::Command { .. } => "command",
            CheckConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig::Http {
            method: default_http_method(),
            path: default_http_path(),
            port: default_http_port(),
            headers: BTreeMap::new(),
            body: None,
            valid_status_codes: default_valid_status_codes(),
        }
    }
}

fn validate_custom(
    kind: &str,
    factory: &str,
    config: &serde_json::Value,
) -> Result<(), crate::Error> {
    if factory.is_empty() {
        return Err(crate::Error::config(format!(
            "Custom {} factory cannot be empty",
            kind
        )));
    }
    if config.is_null() {
        return Err(crate::Error::config(format!(
            "Custom {} config cannot be null",
            kind
        )));
    }
    Ok(())
}

fn default_http_method() -> String {
    "GET".to_string()
}

fn default_http_path() -> String {
    "/".to_string()
}

fn default_http_port() -> u16 {
    80
}

fn default_valid_status_codes() -> Vec<u16> {
    vec![200, 302]
}

/// DNS record configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// DNS name of the pool (e.g., "www.example.com")
    pub name: String,

    /// Whether this record is managed
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    /// Enable or disable the record
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

fn default_enabled() -> bool {
    true
}

/// Scheduling, timeout and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Seconds between the starts of two rounds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Hard deadline for one check attempt (in milliseconds)
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,

    /// Attempts per target per round before it is declared dead
    #[serde(default = "default_retry_limit")]
    pub retry_limit: usize,

    /// Delay before exiting after a failed self-check (in seconds)
    ///
    /// Keeps a supervisor from restarting the daemon in a tight loop.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// How long to wait for a killed check to be reaped (in milliseconds)
    #[serde(default = "default_reap_grace_ms")]
    pub reap_grace_ms: u64,

    /// Capacity of the event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl TimingConfig {
    /// Validate the timing configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Round interval must be > 0"));
        }
        if self.check_timeout_ms == 0 {
            return Err(crate::Error::config("Check timeout must be > 0"));
        }
        if self.retry_limit == 0 {
            return Err(crate::Error::config("Retry limit must be >= 1"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn reap_grace(&self) -> Duration {
        Duration::from_millis(self.reap_grace_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            check_timeout_ms: default_check_timeout_ms(),
            retry_limit: default_retry_limit(),
            cooldown_secs: default_cooldown_secs(),
            reap_grace_ms: default_reap_grace_ms(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_check_timeout_ms() -> u64 {
    2000
}

fn default_retry_limit() -> usize {
    3
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_reap_grace_ms() -> u64 {
    1000
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> FailoverConfig {
        FailoverConfig {
            resolver: ResolverConfig::Static {
                address: IpAddr::from([192, 0, 2, 1]),
            },
            directory: DirectoryConfig::Memory {
                records: HashMap::new(),
            },
            check: CheckConfig::default(),
            records: vec![RecordConfig::new("www.example.com")],
            timing: TimingConfig::default(),
        }
    }

    #[test]
    fn default_config_has_no_records() {
        let err = FailoverConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("No records configured"));
    }

    #[test]
    fn memory_config_is_valid() {
        assert!(memory_config().validate().is_ok());
    }

    #[test]
    fn zero_retry_limit_is_rejected() {
        let mut config = memory_config();
        config.timing.retry_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_cloudflare_token_is_rejected() {
        let mut config = memory_config();
        config.directory = DirectoryConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("API token"));
    }

    #[test]
    fn route53_config_needs_both_keys() {
        let directory: DirectoryConfig = serde_json::from_str(
            r#"{"type":"route53","access_key_id":"AKIDEXAMPLE","secret_access_key":""}"#,
        )
        .unwrap();
        assert_eq!(directory.type_name(), "route53");
        assert!(directory.validate().is_err());

        let directory: DirectoryConfig = serde_json::from_str(
            r#"{"type":"route53","access_key_id":"AKIDEXAMPLE","secret_access_key":"secret","ttl":30}"#,
        )
        .unwrap();
        assert!(directory.validate().is_ok());
    }

    #[test]
    fn http_check_defaults_accept_200_and_302() {
        let check: CheckConfig = serde_json::from_str(r#"{"type":"http"}"#).unwrap();
        match check {
            CheckConfig::Http {
                method,
                path,
                port,
                valid_status_codes,
                ..
            } => {
                assert_eq!(method, "GET");
                assert_eq!(path, "/");
                assert_eq!(port, 80);
                assert_eq!(valid_status_codes, vec![200, 302]);
            }
            other => panic!("unexpected check config: {:?}", other),
        }
    }

    #[test]
    fn timing_defaults_fill_missing_fields() {
        let timing: TimingConfig = serde_json::from_str(r#"{"interval_secs":30}"#).unwrap();
        assert_eq!(timing.interval(), Duration::from_secs(30));
        assert_eq!(timing.check_timeout(), Duration::from_secs(2));
        assert_eq!(timing.retry_limit, 3);
        assert_eq!(timing.cooldown(), Duration::from_secs(60));
    }

    #[test]
    fn ip_version_filter() {
        let v4 = IpAddr::from([192, 0, 2, 1]);
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert!(IpVersion::V4.accepts(&v4));
        assert!(!IpVersion::V4.accepts(&v6));
        assert!(IpVersion::V6.accepts(&v6));
        assert!(IpVersion::Both.accepts(&v4));
    }
}
