// # adfd - DNS Failover Daemon
//
// The adfd daemon is a thin integration layer around adf-core:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering collaborator implementations
// 4. Running the failover loop until a signal or a fatal condition
//
// All failover logic lives in adf-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Records
// - `ADF_RECORDS`: Comma-separated names, or `/pattern/replacement/` rules on the hostname
// - `ADF_ZONE`: Zone used to derive a name when `ADF_RECORDS` is empty
// - `ADF_HOSTNAME`: Hostname override (defaults to the system hostname)
//
// ### Own Address
// - `ADF_RESOLVER_TYPE`: http (default) or static
// - `ADF_RESOLVER_URL`: URL answering with the bare address (for http)
// - `ADF_OWN_ADDRESS`: Fixed address (for static)
//
// ### DNS Provider
// - `ADF_PROVIDER_TYPE`: cloudflare (default), route53 or memory
// - `ADF_PROVIDER_API_TOKEN`: API token (for cloudflare)
// - `ADF_AWS_ACCESS_KEY_ID`, `ADF_AWS_SECRET_ACCESS_KEY`, `ADF_AWS_SESSION_TOKEN`:
//   Route53 credentials, falling back to the standard `AWS_*` variables
// - `ADF_PROVIDER_ZONE_ID`: Zone ID or hosted zone ID (optional)
// - `ADF_RECORD_TTL`: TTL of records this node creates (default 60)
// - `ADF_RECORD_NOTES`: Comment on records this node creates (default: hostname)
//
// ### Health Check
// - `ADF_CHECK_TYPE`: http (default) or command
// - `ADF_CHECK_METHOD`, `ADF_CHECK_PATH`, `ADF_CHECK_PORT`: request line (GET / on 80)
// - `ADF_CHECK_HOST_HEADER`: Host header for virtual hosting
// - `ADF_CHECK_STATUS_CODES`: Comma-separated healthy codes (default 200,302)
// - `ADF_CHECK_COMMAND`: Command line for command checks; `{target}` is the address
//
// ### Timing
// - `ADF_INTERVAL_SECS`: Seconds between rounds (default 10)
// - `ADF_CHECK_TIMEOUT_MS`: Deadline per check attempt (default 2000)
// - `ADF_RETRY_LIMIT`: Attempts per target per round (default 3)
// - `ADF_COOLDOWN_SECS`: Pause before exiting after a failed self-check (default 60)
//
// ### Misc
// - `ADF_LOG_LEVEL`: trace, debug, info (default), warn, error
// - `ADF_MODE`: set to `dry-run` to log DNS writes instead of performing them
//
// ## Example
//
// ```bash
// export ADF_RECORDS=www.example.com
// export ADF_PROVIDER_API_TOKEN=your_token
// export ADF_CHECK_HOST_HEADER=www.example.com
//
// adfd
// ```

mod names;

use adf_core::config::{
    CheckConfig, DEFAULT_RESOLVER_URL, DirectoryConfig, FailoverConfig, RecordConfig,
    ResolverConfig, TimingConfig,
};
use adf_core::{FailoverLoop, ProviderRegistry};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::net::IpAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
/// - 3: The node failed its own health check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdfExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
    /// Self-check failed, exited after the cool-down
    SelfCheckFailure = 3,
}

impl From<AdfExitCode> for ExitCode {
    fn from(code: AdfExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl AdfExitCode {
    /// Exit code for an error returned by the daemon
    fn for_error(e: &anyhow::Error) -> Self {
        match e.downcast_ref::<adf_core::Error>() {
            Some(adf_core::Error::SelfCheckFailed { .. }) => AdfExitCode::SelfCheckFailure,
            Some(adf_core::Error::Config(_)) => AdfExitCode::ConfigError,
            _ => AdfExitCode::RuntimeError,
        }
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    records: Vec<String>,
    zone: Option<String>,
    hostname: Option<String>,
    resolver_type: String,
    resolver_url: Option<String>,
    own_address: Option<String>,
    provider_type: String,
    provider_api_token: Option<String>,
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
    aws_session_token: Option<String>,
    provider_zone_id: Option<String>,
    record_ttl: Option<u32>,
    record_notes: Option<String>,
    check_type: String,
    check_method: String,
    check_path: String,
    check_port: u16,
    check_host_header: Option<String>,
    check_status_codes: Option<String>,
    check_command: Option<String>,
    interval_secs: Option<u64>,
    check_timeout_ms: Option<u64>,
    retry_limit: Option<usize>,
    cooldown_secs: Option<u64>,
    log_level: String,
    dry_run: bool,
}

/// Parse an optional numeric variable, naming it in the error
fn parse_var<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, v, e))
        })
        .transpose()
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| env::var(key).ok())?;
        if config.hostname.is_none() {
            config.hostname = std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty());
        }
        Ok(config)
    }

    /// Load configuration through `lookup`
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            records: lookup("ADF_RECORDS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            zone: non_empty("ADF_ZONE"),
            hostname: non_empty("ADF_HOSTNAME").or_else(|| non_empty("HOSTNAME")),
            resolver_type: non_empty("ADF_RESOLVER_TYPE").unwrap_or_else(|| "http".to_string()),
            resolver_url: non_empty("ADF_RESOLVER_URL"),
            own_address: non_empty("ADF_OWN_ADDRESS"),
            provider_type: non_empty("ADF_PROVIDER_TYPE")
                .unwrap_or_else(|| "cloudflare".to_string()),
            provider_api_token: non_empty("ADF_PROVIDER_API_TOKEN"),
            aws_access_key_id: non_empty("ADF_AWS_ACCESS_KEY_ID")
                .or_else(|| non_empty("AWS_ACCESS_KEY_ID")),
            aws_secret_access_key: non_empty("ADF_AWS_SECRET_ACCESS_KEY")
                .or_else(|| non_empty("AWS_SECRET_ACCESS_KEY")),
            aws_session_token: non_empty("ADF_AWS_SESSION_TOKEN")
                .or_else(|| non_empty("AWS_SESSION_TOKEN")),
            provider_zone_id: non_empty("ADF_PROVIDER_ZONE_ID"),
            record_ttl: parse_var("ADF_RECORD_TTL", lookup("ADF_RECORD_TTL"))?,
            record_notes: non_empty("ADF_RECORD_NOTES"),
            check_type: non_empty("ADF_CHECK_TYPE").unwrap_or_else(|| "http".to_string()),
            check_method: non_empty("ADF_CHECK_METHOD").unwrap_or_else(|| "GET".to_string()),
            check_path: non_empty("ADF_CHECK_PATH").unwrap_or_else(|| "/".to_string()),
            check_port: parse_var("ADF_CHECK_PORT", lookup("ADF_CHECK_PORT"))?.unwrap_or(80),
            check_host_header: non_empty("ADF_CHECK_HOST_HEADER"),
            check_status_codes: non_empty("ADF_CHECK_STATUS_CODES"),
            check_command: non_empty("ADF_CHECK_COMMAND"),
            interval_secs: parse_var("ADF_INTERVAL_SECS", lookup("ADF_INTERVAL_SECS"))?,
            check_timeout_ms: parse_var("ADF_CHECK_TIMEOUT_MS", lookup("ADF_CHECK_TIMEOUT_MS"))?,
            retry_limit: parse_var("ADF_RETRY_LIMIT", lookup("ADF_RETRY_LIMIT"))?,
            cooldown_secs: parse_var("ADF_COOLDOWN_SECS", lookup("ADF_COOLDOWN_SECS"))?,
            log_level: non_empty("ADF_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            dry_run: lookup("ADF_MODE")
                .map(|m| m.trim().eq_ignore_ascii_case("dry-run"))
                .unwrap_or(false),
        })
    }

    /// Validate the configuration
    ///
    /// Checks what the core's own validation cannot explain in terms of
    /// environment variables: supported types, token sanity, numeric ranges.
    fn validate(&self) -> Result<()> {
        match self.provider_type.as_str() {
            "cloudflare" => {
                let Some(token) = &self.provider_api_token else {
                    anyhow::bail!(
                        "ADF_PROVIDER_API_TOKEN is required. \
                        Set it via: export ADF_PROVIDER_API_TOKEN=your_token"
                    );
                };

                // Cloudflare API tokens are 40 characters
                if token.len() < 20 {
                    anyhow::bail!(
                        "ADF_PROVIDER_API_TOKEN appears too short ({} chars). \
                        Cloudflare tokens are typically 40 characters. \
                        Verify your token is correct.",
                        token.len()
                    );
                }

                let token_lower = token.to_lowercase();
                if token_lower.contains("your_token")
                    || token_lower.contains("replace_me")
                    || token_lower.contains("example")
                {
                    anyhow::bail!(
                        "ADF_PROVIDER_API_TOKEN appears to be a placeholder. \
                        Use an actual API token from your DNS provider."
                    );
                }
            }
            "route53" => {
                if self.aws_access_key_id.is_none() || self.aws_secret_access_key.is_none() {
                    anyhow::bail!(
                        "ADF_PROVIDER_TYPE=route53 needs ADF_AWS_ACCESS_KEY_ID and \
                        ADF_AWS_SECRET_ACCESS_KEY (or AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY)"
                    );
                }
            }
            "memory" => {
                warn!("ADF_PROVIDER_TYPE=memory: DNS changes stay inside this process");
            }
            _ => anyhow::bail!(
                "ADF_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: cloudflare, route53, memory",
                self.provider_type
            ),
        }

        match self.resolver_type.as_str() {
            "http" => {
                if let Some(url) = self
                    .resolver_url
                    .as_ref()
                    .filter(|url| !url.starts_with("https://") && !url.starts_with("http://"))
                {
                    anyhow::bail!("ADF_RESOLVER_URL must use HTTP or HTTPS scheme. Got: {}", url);
                }
            }
            "static" => {
                if self.own_address.is_none() {
                    anyhow::bail!(
                        "ADF_OWN_ADDRESS is required when ADF_RESOLVER_TYPE=static. \
                        Set it via: export ADF_OWN_ADDRESS=192.0.2.10"
                    );
                }
            }
            _ => anyhow::bail!(
                "ADF_RESOLVER_TYPE '{}' is not supported. Supported types: http, static",
                self.resolver_type
            ),
        }

        match self.check_type.as_str() {
            "http" => {}
            "command" => {
                if self.check_command.is_none() {
                    anyhow::bail!(
                        "ADF_CHECK_COMMAND is required when ADF_CHECK_TYPE=command. \
                        Example: export ADF_CHECK_COMMAND='curl -fsS http://{{target}}/health'"
                    );
                }
            }
            _ => anyhow::bail!(
                "ADF_CHECK_TYPE '{}' is not supported. Supported types: http, command",
                self.check_type
            ),
        }

        if let Some(interval) = self
            .interval_secs
            .filter(|interval| !(1..=3600).contains(interval))
        {
            anyhow::bail!(
                "ADF_INTERVAL_SECS must be between 1 and 3600 seconds. Got: {}",
                interval
            );
        }

        if let Some(timeout_ms) = self
            .check_timeout_ms
            .filter(|timeout_ms| !(1..=300_000).contains(timeout_ms))
        {
            anyhow::bail!(
                "ADF_CHECK_TIMEOUT_MS must be between 1 and 300000. Got: {}",
                timeout_ms
            );
        }

        if let Some(retry_limit) = self
            .retry_limit
            .filter(|limit| !(1..=10).contains(limit))
        {
            anyhow::bail!("ADF_RETRY_LIMIT must be between 1 and 10. Got: {}", retry_limit);
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ADF_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Managed record names, derived and validated
    fn record_names(&self) -> Result<Vec<String>> {
        let names = names::derive_record_names(
            &self.records,
            self.hostname.as_deref(),
            self.zone.as_deref(),
        )?;

        for name in &names {
            validate_domain_name(name)?;
        }

        Ok(names)
    }

    /// Build the core configuration
    fn to_failover_config(&self) -> Result<FailoverConfig> {
        let resolver = match self.resolver_type.as_str() {
            "static" => {
                let address = self.own_address.as_deref().unwrap_or_default();
                ResolverConfig::Static {
                    address: IpAddr::from_str(address).with_context(|| {
                        format!("ADF_OWN_ADDRESS is not an IP address: '{}'", address)
                    })?,
                }
            }
            _ => ResolverConfig::Http {
                url: self
                    .resolver_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_RESOLVER_URL.to_string()),
                version: None,
            },
        };

        let directory = match self.provider_type.as_str() {
            "memory" => DirectoryConfig::Memory {
                records: HashMap::new(),
            },
            "route53" => DirectoryConfig::Route53 {
                access_key_id: self.aws_access_key_id.clone().unwrap_or_default(),
                secret_access_key: self.aws_secret_access_key.clone().unwrap_or_default(),
                session_token: self.aws_session_token.clone(),
                zone_id: self.provider_zone_id.clone(),
                ttl: self.record_ttl,
                notes: self.record_notes.clone().or_else(|| self.hostname.clone()),
                dry_run: self.dry_run,
            },
            _ => DirectoryConfig::Cloudflare {
                api_token: self.provider_api_token.clone().unwrap_or_default(),
                zone_id: self.provider_zone_id.clone(),
                ttl: self.record_ttl,
                notes: self.record_notes.clone().or_else(|| self.hostname.clone()),
                dry_run: self.dry_run,
            },
        };

        let check = match self.check_type.as_str() {
            "command" => {
                let command = self.check_command.as_deref().unwrap_or_default();
                let mut words = command.split_whitespace().map(str::to_string);
                CheckConfig::Command {
                    program: words.next().unwrap_or_default(),
                    args: words.collect(),
                }
            }
            _ => {
                let mut headers = BTreeMap::new();
                if let Some(host) = &self.check_host_header {
                    headers.insert("Host".to_string(), host.clone());
                }
                CheckConfig::Http {
                    method: self.check_method.clone(),
                    path: self.check_path.clone(),
                    port: self.check_port,
                    headers,
                    body: None,
                    valid_status_codes: self.status_codes()?,
                }
            }
        };

        let defaults = TimingConfig::default();
        let timing = TimingConfig {
            interval_secs: self.interval_secs.unwrap_or(defaults.interval_secs),
            check_timeout_ms: self.check_timeout_ms.unwrap_or(defaults.check_timeout_ms),
            retry_limit: self.retry_limit.unwrap_or(defaults.retry_limit),
            cooldown_secs: self.cooldown_secs.unwrap_or(defaults.cooldown_secs),
            ..defaults
        };

        let config = FailoverConfig {
            resolver,
            directory,
            check,
            records: self
                .record_names()?
                .into_iter()
                .map(RecordConfig::new)
                .collect(),
            timing,
        };
        config.validate()?;

        Ok(config)
    }

    /// Healthy status codes for HTTP checks
    fn status_codes(&self) -> Result<Vec<u16>> {
        let Some(list) = &self.check_status_codes else {
            return Ok(vec![200, 302]);
        };

        list.split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(|code| {
                code.parse::<u16>()
                    .ok()
                    .filter(|c| (100..=599).contains(c))
                    .ok_or_else(|| {
                        anyhow::anyhow!("ADF_CHECK_STATUS_CODES has an invalid code: '{}'", code)
                    })
            })
            .collect()
    }
}

/// Validate that a string is a valid domain name
///
/// This implements basic DNS domain name validation per RFC 1035.
/// It's not comprehensive but catches common errors.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return AdfExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AdfExitCode::ConfigError.into();
    }

    // Validate configuration
    let failover_config = match config.validate().and_then(|()| config.to_failover_config()) {
        Ok(failover_config) => failover_config,
        Err(e) => {
            error!("Configuration validation error: {:#}", e);
            return AdfExitCode::ConfigError.into();
        }
    };

    info!("Starting adfd daemon");
    info!(
        "Configuration loaded: {} record(s){}",
        failover_config.records.len(),
        if config.dry_run { " [DRY-RUN]" } else { "" }
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AdfExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(failover_config).await {
            Ok(()) => AdfExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                AdfExitCode::for_error(&e)
            }
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: FailoverConfig) -> Result<()> {
    // Create collaborator registry
    let registry = ProviderRegistry::with_builtins();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare directory");
        adf_provider_cloudflare::register(&registry);
    }

    #[cfg(feature = "route53")]
    {
        info!("Registering Route53 directory");
        adf_provider_route53::register(&registry);
    }

    #[cfg(feature = "http")]
    {
        info!("Registering HTTP resolver and check");
        adf_resolver_http::register(&registry);
        adf_check_http::register(&registry);
    }

    info!("Resolver type: {}", config.resolver.type_name());
    info!("Directory type: {}", config.directory.type_name());
    info!("Check type: {}", config.check.type_name());
    for record in &config.records {
        info!("Managing record: {}", record.name);
    }

    let resolver = registry.create_resolver(&config.resolver)?;
    let directory = registry.create_directory(&config.directory)?;
    let check = Arc::from(registry.create_check(&config.check)?);

    let (mut failover, mut events) = FailoverLoop::new(resolver, directory, check, config)?;

    // Keep the event channel drained
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Event: {:?}", event);
        }
    });

    let result = failover.run().await;

    drop(failover);
    let _ = event_logger.await;

    result?;
    info!("Shutting down daemon");
    Ok(())
}
