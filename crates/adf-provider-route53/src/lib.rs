// # Route53 DNS Directory
//
// This crate provides an Amazon Route53-backed DnsDirectory for the ADF system.
//
// ## Record Model
//
// Route53 keeps one record set per name and type; a round-robin pool is the
// value list of the name's A set (and AAAA set for IPv6 members):
//
// - Read lists the A/AAAA sets of the name
// - Add UPSERTs the set with the address appended, only when it is absent
// - Remove UPSERTs the set without the address, or DELETEs the set when the
//   address was its last value
//
// UPSERT replaces the value list in one change batch. Two nodes changing the
// same set at once are last-writer-wins; the loop re-reads every round.
//
// ## Trust Level: Untrusted (DNS Directory)
//
// - One API call sequence per operation, no retries
// - No caching beyond hosted zone IDs (configured, or discovered once per name)
// - No background tasks
//
// ## Security Requirements
//
// - The secret access key and session token NEVER appear in logs
// - Construction fails fast if a key is empty
//
// ## API Reference
//
// - Route53 API 2013-04-01, signed with AWS Signature Version 4
// - List Hosted Zones: GET `/2013-04-01/hostedzonesbyname?dnsname=...`
// - List Record Sets: GET `/2013-04-01/hostedzone/:id/rrset?name=...`
// - Change Record Sets: POST `/2013-04-01/hostedzone/:id/rrset`

mod sigv4;

use adf_core::ProviderRegistry;
use adf_core::config::DirectoryConfig;
use adf_core::traits::{DnsDirectory, DnsDirectoryFactory};
use adf_core::{Error, Result};
use async_trait::async_trait;
use quick_xml::escape::escape;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

use sigv4::{Credentials, RequestParts};

/// Route53 API endpoint
const ROUTE53_API_BASE: &str = "https://route53.amazonaws.com";

/// Route53 API version (path prefix and XML namespace)
const API_VERSION: &str = "2013-04-01";

/// Default TTL for record sets this node creates (in seconds)
pub const DEFAULT_TTL: u32 = 60;

/// Record sets fetched per listing; covers every type of one name
const LIST_MAX_ITEMS: &str = "10";

/// Default HTTP timeout
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListHostedZonesResponse {
    #[serde(default)]
    hosted_zones: HostedZones,
}

#[derive(Debug, Default, Deserialize)]
struct HostedZones {
    #[serde(rename = "HostedZone", default)]
    zones: Vec<HostedZone>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostedZone {
    id: String,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListRecordSetsResponse {
    #[serde(default)]
    resource_record_sets: RecordSets,
}

#[derive(Debug, Default, Deserialize)]
struct RecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    sets: Vec<RecordSet>,
}

/// One record set as listed by the API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordSet {
    name: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(rename = "TTL", default)]
    ttl: Option<u32>,
    #[serde(default)]
    resource_records: ResourceRecords,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    records: Vec<ResourceRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceRecord {
    value: String,
}

impl RecordSet {
    /// Addresses in the set, skipping values that are not addresses
    fn addresses(&self) -> Vec<IpAddr> {
        self.resource_records
            .records
            .iter()
            .filter_map(|record| record.value.trim().parse().ok())
            .collect()
    }
}

/// DNS record type for an address
fn record_type_for(address: &IpAddr) -> &'static str {
    match address {
        IpAddr::V4(_) => "A",
        IpAddr::V6(_) => "AAAA",
    }
}

/// Absolute, lowercase form of a name as Route53 reports it
fn fqdn(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.').to_ascii_lowercase())
}

/// Domains that may hold the hosted zone of a record name, longest first
fn zone_candidates(name: &str) -> Result<Vec<String>> {
    let parts: Vec<&str> = name.trim_end_matches('.').split('.').collect();
    if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
        return Err(Error::config(format!("Invalid domain name: {}", name)));
    }

    Ok((0..=parts.len() - 2)
        .map(|start| fqdn(&parts[start..].join(".")))
        .collect())
}

fn parse_xml<T: DeserializeOwned>(text: &str, context: &str) -> Result<T> {
    quick_xml::de::from_str(text).map_err(|e| {
        Error::provider("route53", format!("{}: failed to parse response: {}", context, e))
    })
}

/// ChangeResourceRecordSets request body for one change
fn change_batch_xml(
    action: &str,
    name: &str,
    record_type: &str,
    ttl: u32,
    values: &[IpAddr],
    comment: Option<&str>,
) -> String {
    let comment = comment
        .map(|c| format!("<Comment>{}</Comment>", escape(c)))
        .unwrap_or_default();
    let records: String = values
        .iter()
        .map(|value| format!("<ResourceRecord><Value>{}</Value></ResourceRecord>", value))
        .collect();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <ChangeResourceRecordSetsRequest xmlns=\"https://route53.amazonaws.com/doc/{}/\">\
         <ChangeBatch>{}<Changes><Change><Action>{}</Action><ResourceRecordSet>\
         <Name>{}</Name><Type>{}</Type><TTL>{}</TTL>\
         <ResourceRecords>{}</ResourceRecords>\
         </ResourceRecordSet></Change></Changes></ChangeBatch>\
         </ChangeResourceRecordSetsRequest>",
        API_VERSION,
        comment,
        action,
        escape(name),
        record_type,
        ttl,
        records
    )
}

/// Route53 DNS directory
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the directory will:
/// - Perform all GET requests (zone lookup, record set listing)
/// - Log the intended change batch
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation does NOT expose the secret key or session token.
pub struct Route53Directory {
    credentials: Credentials,

    /// Hosted zone ID (optional, can be auto-detected from the record name)
    zone_id: Option<String>,

    /// TTL for created record sets
    ttl: u32,

    /// Comment attached to change batches
    notes: Option<String>,

    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,

    /// API endpoint
    api_base: String,

    /// Discovered hosted zone IDs, keyed by record name
    discovered_zones: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for Route53Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Directory")
            .field("access_key_id", &self.credentials.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field(
                "session_token",
                &self.credentials.session_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("zone_id", &self.zone_id)
            .field("ttl", &self.ttl)
            .field("notes", &self.notes)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Route53Directory {
    /// Create a new Route53 directory
    ///
    /// # Parameters
    ///
    /// - `access_key_id`, `secret_access_key`: credentials allowed to list
    ///   hosted zones and change record sets
    /// - `zone_id`: Optional hosted zone ID (can be auto-detected)
    /// - `dry_run`: If true, perform GET requests but skip writes
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)` if a key is empty or the HTTP client cannot be built
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        zone_id: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Err(Error::config(
                "Route53 access key ID and secret access key cannot be empty",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials: Credentials {
                access_key_id,
                secret_access_key,
                session_token: None,
            },
            zone_id: zone_id
                .map(|id| id.trim_start_matches("/hostedzone/").to_string())
                .filter(|id| !id.is_empty()),
            ttl: DEFAULT_TTL,
            notes: None,
            client,
            dry_run,
            api_base: ROUTE53_API_BASE.to_string(),
            discovered_zones: Mutex::new(HashMap::new()),
        })
    }

    /// Use temporary credentials (instance roles, STS)
    pub fn with_session_token(mut self, session_token: Option<String>) -> Self {
        self.credentials.session_token = session_token.filter(|t| !t.is_empty());
        self
    }

    /// Set the TTL of created record sets
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the comment attached to change batches
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.is_empty());
        self
    }

    /// Point the directory at another API endpoint
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send a signed request and return the response body
    ///
    /// Maps HTTP status codes to specific errors.
    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<String>,
        context: &str,
    ) -> Result<String> {
        let query = sigv4::canonical_query(params);
        let mut url = format!("{}{}", self.api_base, path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        let url = reqwest::Url::parse(&url)
            .map_err(|e| Error::config(format!("Invalid Route53 URL {}: {}", url, e)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::config(format!("Route53 URL has no host: {}", url))),
        };

        let payload = body.unwrap_or_default();
        let signature = sigv4::sign(
            &self.credentials,
            &RequestParts {
                method: method.as_str(),
                host: &host,
                path: url.path(),
                query: &query,
                payload: payload.as_bytes(),
            },
            chrono::Utc::now(),
        )?;

        let mut request = self
            .client
            .request(method, url)
            .header("x-amz-date", &signature.amz_date)
            .header("Authorization", &signature.authorization);
        if let Some(token) = &self.credentials.session_token {
            request = request.header("x-amz-security-token", token.trim());
        }
        if !payload.is_empty() {
            request = request
                .header("Content-Type", "application/xml")
                .body(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: HTTP request failed: {}", context, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());

        if status.is_success() {
            return Ok(text);
        }

        Err(match status.as_u16() {
            401 | 403 => Error::auth(format!(
                "{}: invalid credentials or insufficient permissions. Status: {}",
                context, status
            )),
            404 => Error::not_found(format!("{}: {} - {}", context, status, text)),
            409 => Error::conflict(format!("{}: {} - {}", context, status, text)),
            429 => Error::rate_limited(format!("{}: rate limit exceeded", context)),
            400 if text.contains("<Code>Throttling</Code>") => {
                Error::rate_limited(format!("{}: throttled", context))
            }
            500..=599 => Error::provider(
                "route53",
                format!("{}: server error (transient): {} - {}", context, status, text),
            ),
            _ => Error::provider("route53", format!("{}: {} - {}", context, status, text)),
        })
    }

    /// Get the hosted zone ID for a record name
    ///
    /// If zone_id is set, returns it directly. Otherwise, looks up each
    /// enclosing domain, longest first, and remembers the first match.
    async fn get_zone_id(&self, name: &str) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured hosted zone ID");
            return Ok(zone_id.clone());
        }

        let candidates = zone_candidates(name)?;
        let key = &candidates[0];
        let cached = self
            .discovered_zones
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).cloned());
        if let Some(zone_id) = cached {
            return Ok(zone_id);
        }

        let path = format!("/{}/hostedzonesbyname", API_VERSION);
        for zone_name in &candidates {
            tracing::debug!("Looking up hosted zone for domain: {}", zone_name);

            let text = self
                .send(
                    Method::GET,
                    &path,
                    &[("dnsname", zone_name.clone()), ("maxitems", "1".to_string())],
                    None,
                    "Zone lookup",
                )
                .await?;
            let response: ListHostedZonesResponse = parse_xml(&text, "Zone lookup")?;

            // The listing starts at `dnsname`, so the first zone may be a later one
            if let Some(zone) = response
                .hosted_zones
                .zones
                .into_iter()
                .find(|zone| fqdn(&zone.name) == *zone_name)
            {
                let zone_id = zone.id.trim_start_matches("/hostedzone/").to_string();
                tracing::debug!("Found hosted zone for {}: {}", zone_name, zone_id);
                if let Ok(mut cache) = self.discovered_zones.lock() {
                    cache.insert(key.clone(), zone_id.clone());
                }
                return Ok(zone_id);
            }
        }

        Err(Error::not_found(format!(
            "No hosted zone found for {} (tried {}). Set the zone ID explicitly",
            name,
            candidates.join(", ")
        )))
    }

    /// The A/AAAA record sets of `name`
    async fn record_sets(&self, zone_id: &str, name: &str) -> Result<Vec<RecordSet>> {
        let name = fqdn(name);
        let text = self
            .send(
                Method::GET,
                &format!("/{}/hostedzone/{}/rrset", API_VERSION, zone_id),
                &[("name", name.clone()), ("maxitems", LIST_MAX_ITEMS.to_string())],
                None,
                "Record set listing",
            )
            .await?;
        let response: ListRecordSetsResponse = parse_xml(&text, "Record set listing")?;

        Ok(response
            .resource_record_sets
            .sets
            .into_iter()
            .filter(|set| fqdn(&set.name) == name)
            .filter(|set| matches!(set.record_type.as_str(), "A" | "AAAA"))
            .collect())
    }

    /// Submit one change to a record set
    async fn change(
        &self,
        zone_id: &str,
        action: &str,
        name: &str,
        record_type: &str,
        ttl: u32,
        values: &[IpAddr],
    ) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would {} {} set {} -> {:?} (ttl {})",
                action,
                record_type,
                name,
                values,
                ttl
            );
            return Ok(());
        }

        tracing::info!("{} {} set {} -> {:?}", action, record_type, name, values);
        let body = change_batch_xml(
            action,
            &fqdn(name),
            record_type,
            ttl,
            values,
            self.notes.as_deref(),
        );
        self.send(
            Method::POST,
            &format!("/{}/hostedzone/{}/rrset", API_VERSION, zone_id),
            &[],
            Some(body),
            "Record set change",
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DnsDirectory for Route53Directory {
    async fn address_records(&self, name: &str) -> Result<Vec<IpAddr>> {
        let zone_id = self.get_zone_id(name).await?;

        let addresses: Vec<IpAddr> = self
            .record_sets(&zone_id, name)
            .await?
            .iter()
            .flat_map(RecordSet::addresses)
            .collect();

        tracing::debug!("{} has {} address(es)", name, addresses.len());
        Ok(addresses)
    }

    async fn add_address_record(&self, name: &str, address: IpAddr) -> Result<()> {
        let zone_id = self.get_zone_id(name).await?;
        let record_type = record_type_for(&address);

        let current = self
            .record_sets(&zone_id, name)
            .await?
            .into_iter()
            .find(|set| set.record_type == record_type);

        let mut values = current.as_ref().map(RecordSet::addresses).unwrap_or_default();
        if values.contains(&address) {
            tracing::debug!("{} already published for {}", address, name);
            return Ok(());
        }
        values.push(address);

        let ttl = current.and_then(|set| set.ttl).unwrap_or(self.ttl);
        self.change(&zone_id, "UPSERT", name, record_type, ttl, &values)
            .await
    }

    async fn remove_address_record(&self, name: &str, address: IpAddr) -> Result<()> {
        let zone_id = self.get_zone_id(name).await?;
        let record_type = record_type_for(&address);

        let Some(current) = self
            .record_sets(&zone_id, name)
            .await?
            .into_iter()
            .find(|set| set.record_type == record_type)
        else {
            tracing::debug!("No {} set for {}, nothing to remove", record_type, name);
            return Ok(());
        };

        let values = current.addresses();
        if !values.contains(&address) {
            tracing::debug!("{} not published for {}, nothing to remove", address, name);
            return Ok(());
        }

        let ttl = current.ttl.unwrap_or(self.ttl);
        let remaining: Vec<IpAddr> = values.into_iter().filter(|v| *v != address).collect();
        if remaining.is_empty() {
            // DELETE must name the set exactly as it is
            self.change(&zone_id, "DELETE", name, record_type, ttl, &[address])
                .await
        } else {
            self.change(&zone_id, "UPSERT", name, record_type, ttl, &remaining)
                .await
        }
    }
}

/// Factory for creating Route53 directories
pub struct Route53Factory;

impl DnsDirectoryFactory for Route53Factory {
    fn create(&self, config: &DirectoryConfig) -> Result<Box<dyn DnsDirectory>> {
        match config {
            DirectoryConfig::Route53 {
                access_key_id,
                secret_access_key,
                session_token,
                zone_id,
                ttl,
                notes,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!(
                        "Route53 directory running in DRY-RUN mode - no changes will be made"
                    );
                }

                let directory = Route53Directory::new(
                    access_key_id.clone(),
                    secret_access_key.clone(),
                    zone_id.clone(),
                    *dry_run,
                )?
                .with_session_token(session_token.clone())
                .with_ttl(ttl.unwrap_or(DEFAULT_TTL))
                .with_notes(notes.clone());

                Ok(Box::new(directory))
            }
            _ => Err(Error::config("Invalid config for Route53 directory")),
        }
    }
}

/// Register the Route53 directory with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_directory("route53", Box::new(Route53Factory));
}
