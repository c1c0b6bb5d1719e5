// # Cloudflare DNS Directory
//
// This crate provides a Cloudflare-backed DnsDirectory for the ADF system.
//
// ## Record Model
//
// A round-robin pool is the set of A and AAAA records sharing one name.
// Each address is its own record:
//
// - Read lists the A/AAAA records of the name
// - Add creates one record, only when no record of the name has that content
// - Remove deletes the records whose content equals the address, and only those
//
// ## Trust Level: Untrusted (DNS Directory)
//
// - One API call sequence per operation, no retries (the loop re-reads DNS
//   every round)
// - No caching beyond zone IDs (configured, or discovered once per name)
// - No background tasks
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - API token MUST be provided via environment variables only
// - Construction fails fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use adf_core::ProviderRegistry;
use adf_core::config::DirectoryConfig;
use adf_core::traits::{DnsDirectory, DnsDirectoryFactory};
use adf_core::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// TTL of records this node creates, unless configured
pub const DEFAULT_TTL: u32 = 60;

/// Largest page the record listing endpoint serves
const PAGE_SIZE: usize = 5000;

/// Envelope of every Cloudflare API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

/// One DNS record as listed by the API
#[derive(Debug, Clone, Deserialize)]
struct DnsRecord {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
}

impl DnsRecord {
    /// The record's address, for A/AAAA records with valid content
    fn address(&self) -> Option<IpAddr> {
        match self.record_type.as_str() {
            "A" | "AAAA" => self.content.parse().ok(),
            _ => None,
        }
    }
}

/// DNS record type for an address
fn record_type(address: IpAddr) -> &'static str {
    match address {
        IpAddr::V4(_) => "A",
        IpAddr::V6(_) => "AAAA",
    }
}

/// Cloudflare DNS directory
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the directory will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended POST/DELETE
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareDirectory {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID (optional, can be auto-detected from the record name)
    zone_id: Option<String>,

    /// TTL for created records
    ttl: u32,

    /// Comment attached to created records
    notes: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,

    /// API endpoint
    api_base: String,

    /// Discovered zone IDs, keyed by record name
    discovered_zones: Mutex<HashMap<String, String>>,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareDirectory")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("ttl", &self.ttl)
            .field("notes", &self.notes)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareDirectory {
    /// Create a new Cloudflare directory
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (can be auto-detected)
    /// - `dry_run`: If true, perform GET requests but skip writes
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)` if the token is empty or the HTTP client cannot be built
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            ttl: DEFAULT_TTL,
            notes: None,
            client,
            dry_run,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            discovered_zones: Mutex::new(HashMap::new()),
        })
    }

    /// Set the TTL of created records
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the comment attached to created records
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

    /// Send a request and decode the API envelope
    ///
    /// Maps HTTP status codes to specific errors.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<Option<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: HTTP request failed: {}", context, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::auth(format!(
                    "{}: invalid API token or insufficient permissions. Status: {}",
                    context, status
                )),
                404 => Error::not_found(format!("{}: {}", context, status)),
                409 => Error::conflict(format!("{}: {} - {}", context, status, error_text)),
                429 => Error::rate_limited(format!(
                    "{}: rate limit exceeded. Status: {}",
                    context, status
                )),
                500..=599 => Error::provider(
                    "cloudflare",
                    format!("{}: server error (transient): {} - {}", context, status, error_text),
                ),
                _ => Error::provider(
                    "cloudflare",
                    format!("{}: {} - {}", context, status, error_text),
                ),
            });
        }

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            Error::provider("cloudflare", format!("{}: failed to parse response: {}", context, e))
        })?;

        if !envelope.success {
            let messages: Vec<String> = envelope
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect();
            return Err(Error::provider(
                "cloudflare",
                format!("{}: {}", context, messages.join(", ")),
            ));
        }

        Ok(envelope.result)
    }

    /// Get the zone ID for a record name
    ///
    /// If zone_id is set, returns it directly. Otherwise, queries the API
    /// for each enclosing domain, longest first, down to the last two labels.
    /// The first zone found is remembered for the name.
    async fn get_zone_id(&self, name: &str) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        let candidates = zone_candidates(name)?;
        let key = &candidates[0];
        if let Some(zone_id) = self.cached_zone(key) {
            return Ok(zone_id);
        }

        for zone_name in &candidates {
            tracing::debug!("Looking up zone ID for domain: {}", zone_name);

            let url = format!("{}/zones?name={}", self.api_base, zone_name);
            let zones: Vec<Zone> = self
                .send(self.client.get(&url), "Zone lookup")
                .await?
                .unwrap_or_default();

            if let Some(zone) = zones.into_iter().next() {
                tracing::debug!("Found zone ID for {}: {}", zone_name, zone.id);
                if let Ok(mut cache) = self.discovered_zones.lock() {
                    cache.insert(key.clone(), zone.id.clone());
                }
                return Ok(zone.id);
            }
        }

        Err(Error::not_found(format!(
            "No zone found for {} (tried {}). Set the zone ID explicitly",
            name,
            candidates.join(", ")
        )))
    }

    fn cached_zone(&self, name: &str) -> Option<String> {
        self.discovered_zones
            .lock()
            .ok()
            .and_then(|cache| cache.get(name).cloned())
    }

    /// List the records of `name` (all types)
    async fn list_records(&self, zone_id: &str, name: &str) -> Result<Vec<DnsRecord>> {
        let url = format!(
            "{}/zones/{}/dns_records?name={}&per_page={}",
            self.api_base, zone_id, name, PAGE_SIZE
        );

        Ok(self
            .send(self.client.get(&url), "Record listing")
            .await?
            .unwrap_or_default())
    }
}

/// Domains that may hold the zone of a record name, longest first
///
/// "www.example.co.uk" -> ["www.example.co.uk", "example.co.uk", "co.uk"]
fn zone_candidates(name: &str) -> Result<Vec<String>> {
    let parts: Vec<&str> = name.trim_end_matches('.').split('.').collect();
    if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
        return Err(Error::config(format!("Invalid domain name: {}", name)));
    }

    Ok((0..=parts.len() - 2)
        .map(|start| parts[start..].join(".").to_ascii_lowercase())
        .collect())
}

#[async_trait]
impl DnsDirectory for CloudflareDirectory {
    async fn address_records(&self, name: &str) -> Result<Vec<IpAddr>> {
        let name = name.trim_end_matches('.');
        let zone_id = self.get_zone_id(name).await?;

        let mut addresses = Vec::new();
        for record in self.list_records(&zone_id, name).await? {
            match record.address() {
                Some(address) => addresses.push(address),
                None if record.record_type == "A" || record.record_type == "AAAA" => {
                    tracing::warn!(
                        "Ignoring {} record {} with invalid content {:?}",
                        record.record_type,
                        record.id,
                        record.content
                    );
                }
                None => {}
            }
        }

        tracing::debug!("{} has {} address record(s)", name, addresses.len());
        Ok(addresses)
    }

    async fn add_address_record(&self, name: &str, address: IpAddr) -> Result<()> {
        let name = name.trim_end_matches('.');
        let zone_id = self.get_zone_id(name).await?;

        let existing = self.list_records(&zone_id, name).await?;
        if existing.iter().any(|record| record.address() == Some(address)) {
            tracing::debug!("{} already has a record for {}", name, address);
            return Ok(());
        }

        let mut payload = serde_json::json!({
            "type": record_type(address),
            "name": name,
            "content": address.to_string(),
            "ttl": self.ttl,
        });
        if let Some(notes) = &self.notes {
            payload["comment"] = serde_json::Value::String(notes.clone());
        }

        let url = format!("{}/zones/{}/dns_records", self.api_base, zone_id);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send POST request to {} with payload: {}", url, payload);
            return Ok(());
        }

        tracing::info!("Creating {} record {} -> {}", record_type(address), name, address);
        let _: Option<DnsRecord> = self
            .send(self.client.post(&url).json(&payload), "Record creation")
            .await?;

        Ok(())
    }

    async fn remove_address_record(&self, name: &str, address: IpAddr) -> Result<()> {
        let name = name.trim_end_matches('.');
        let zone_id = self.get_zone_id(name).await?;

        let matching: Vec<DnsRecord> = self
            .list_records(&zone_id, name)
            .await?
            .into_iter()
            .filter(|record| record.address() == Some(address))
            .collect();

        if matching.is_empty() {
            tracing::debug!("{} has no record for {}, nothing to remove", name, address);
            return Ok(());
        }

        for record in matching {
            let url = format!("{}/zones/{}/dns_records/{}", self.api_base, zone_id, record.id);

            if self.dry_run {
                tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
                continue;
            }

            tracing::info!("Deleting {} record {} -> {}", record.record_type, name, address);
            let _: Option<serde_json::Value> =
                self.send(self.client.delete(&url), "Record deletion").await?;
        }

        Ok(())
    }
}

/// Factory for creating Cloudflare directories
pub struct CloudflareFactory;

impl DnsDirectoryFactory for CloudflareFactory {
    fn create(&self, config: &DirectoryConfig) -> Result<Box<dyn DnsDirectory>> {
        match config {
            DirectoryConfig::Cloudflare {
                api_token,
                zone_id,
                ttl,
                notes,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!(
                        "Cloudflare directory running in DRY-RUN mode - no changes will be made"
                    );
                }

                let directory = CloudflareDirectory::new(api_token.clone(), zone_id.clone(), *dry_run)?
                    .with_ttl(ttl.unwrap_or(DEFAULT_TTL))
                    .with_notes(notes.clone());

                Ok(Box::new(directory))
            }
            _ => Err(Error::config("Invalid config for Cloudflare directory")),
        }
    }
}

/// Register the Cloudflare directory with a registry
///
/// # Example
///
/// ```rust
/// use adf_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// adf_provider_cloudflare::register(&registry);
/// assert!(registry.has_directory("cloudflare"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_directory("cloudflare", Box::new(CloudflareFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const NAME: &str = "www.example.com";

    /// Serves canned responses, one connection per response, recording requests
    struct MockApi {
        base: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl MockApi {
        async fn start(responses: Vec<(u16, String)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));

            let recorded = Arc::clone(&requests);
            tokio::spawn(async move {
                for (status, body) in responses {
                    let Ok((mut socket, _)) = listener.accept().await else {
                        return;
                    };
                    let request = read_request(&mut socket).await;
                    recorded.lock().unwrap().push(request);
                    let response = format!(
                        "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                }
            });

            Self { base, requests }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn directory(&self, dry_run: bool) -> CloudflareDirectory {
            CloudflareDirectory::new("test_token", Some("zone123".to_string()), dry_run)
                .unwrap()
                .with_api_base(&self.base)
        }
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            if let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    fn ok(result: serde_json::Value) -> (u16, String) {
        (
            200,
            serde_json::json!({ "success": true, "errors": [], "result": result }).to_string(),
        )
    }

    fn records() -> (u16, String) {
        ok(serde_json::json!([
            { "id": "r1", "type": "A", "content": "192.0.2.1" },
            { "id": "r2", "type": "A", "content": "192.0.2.2" },
            { "id": "r3", "type": "AAAA", "content": "2001:db8::1" },
            { "id": "r4", "type": "TXT", "content": "v=spf1 -all" },
        ]))
    }

    #[tokio::test]
    async fn lists_a_and_aaaa_records() {
        let api = MockApi::start(vec![records()]).await;

        let addresses = api.directory(false).address_records(NAME).await.unwrap();

        assert_eq!(
            addresses,
            vec![
                "192.0.2.1".parse::<IpAddr>().unwrap(),
                "192.0.2.2".parse().unwrap(),
                "2001:db8::1".parse().unwrap(),
            ]
        );
        let requests = api.requests();
        assert!(requests[0].starts_with("GET /zones/zone123/dns_records?name=www.example.com"));
        assert!(requests[0].to_ascii_lowercase().contains("authorization: bearer test_token"));
    }

    #[tokio::test]
    async fn add_creates_record_with_ttl_and_comment() {
        let api = MockApi::start(vec![
            records(),
            ok(serde_json::json!({ "id": "r9", "type": "A", "content": "192.0.2.9" })),
        ])
        .await;
        let directory = api
            .directory(false)
            .with_ttl(120)
            .with_notes(Some("node-a".to_string()));

        directory
            .add_address_record(NAME, "192.0.2.9".parse().unwrap())
            .await
            .unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].starts_with("POST /zones/zone123/dns_records "));
        let body = requests[1].split("\r\n\r\n").nth(1).unwrap();
        let payload: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(payload["type"], "A");
        assert_eq!(payload["name"], NAME);
        assert_eq!(payload["content"], "192.0.2.9");
        assert_eq!(payload["ttl"], 120);
        assert_eq!(payload["comment"], "node-a");
    }

    #[tokio::test]
    async fn add_is_skipped_when_address_is_published() {
        let api = MockApi::start(vec![records()]).await;

        api.directory(false)
            .add_address_record(NAME, "192.0.2.2".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(api.requests().len(), 1, "only the listing, no POST");
    }

    #[tokio::test]
    async fn remove_deletes_only_matching_record() {
        let api = MockApi::start(vec![records(), ok(serde_json::json!({ "id": "r2" }))]).await;

        api.directory(false)
            .remove_address_record(NAME, "192.0.2.2".parse().unwrap())
            .await
            .unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].starts_with("DELETE /zones/zone123/dns_records/r2 "));
    }

    #[tokio::test]
    async fn dry_run_skips_writes() {
        let api = MockApi::start(vec![records(), records()]).await;
        let directory = api.directory(true);

        directory
            .add_address_record(NAME, "192.0.2.9".parse().unwrap())
            .await
            .unwrap();
        directory
            .remove_address_record(NAME, "192.0.2.1".parse().unwrap())
            .await
            .unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.starts_with("GET ")));
    }

    #[tokio::test]
    async fn zone_is_discovered_from_name() {
        let api = MockApi::start(vec![
            ok(serde_json::json!([])),
            ok(serde_json::json!([{ "id": "zoneABC" }])),
            ok(serde_json::json!([])),
            ok(serde_json::json!([])),
        ])
        .await;
        let directory = CloudflareDirectory::new("test_token", None, false)
            .unwrap()
            .with_api_base(&api.base);

        let addresses = directory.address_records("www.example.com.").await.unwrap();
        assert!(addresses.is_empty());

        // Second call reuses the discovered zone
        directory.address_records("www.example.com").await.unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[0].starts_with("GET /zones?name=www.example.com "));
        assert!(requests[1].starts_with("GET /zones?name=example.com "));
        assert!(requests[2].starts_with("GET /zones/zoneABC/dns_records?name=www.example.com"));
        assert!(requests[3].starts_with("GET /zones/zoneABC/dns_records?name=www.example.com"));
    }

    #[tokio::test]
    async fn short_second_level_domain_finds_its_zone() {
        let api = MockApi::start(vec![
            ok(serde_json::json!([])),
            ok(serde_json::json!([{ "id": "zoneDE" }])),
            records(),
        ])
        .await;
        let directory = CloudflareDirectory::new("test_token", None, false)
            .unwrap()
            .with_api_base(&api.base);

        let addresses = directory.address_records("www.abc.de").await.unwrap();

        assert_eq!(addresses.len(), 3);
        let requests = api.requests();
        assert!(requests[0].starts_with("GET /zones?name=www.abc.de "));
        assert!(requests[1].starts_with("GET /zones?name=abc.de "));
        assert!(requests[2].starts_with("GET /zones/zoneDE/dns_records?name=www.abc.de"));
    }

    #[tokio::test]
    async fn missing_zone_is_not_found() {
        let api = MockApi::start(vec![ok(serde_json::json!([])), ok(serde_json::json!([]))]).await;
        let directory = CloudflareDirectory::new("test_token", None, false)
            .unwrap()
            .with_api_base(&api.base);

        let result = directory.address_records("api.xyz.io").await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(api.requests().len(), 2);
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let api = MockApi::start(vec![
            (403, r#"{"success":false}"#.to_string()),
            (429, r#"{"success":false}"#.to_string()),
            (409, r#"{"success":false}"#.to_string()),
        ])
        .await;
        let directory = api.directory(false);

        let auth = directory.address_records(NAME).await;
        assert!(matches!(auth, Err(Error::Authentication(_))));

        let limited = directory.address_records(NAME).await;
        assert!(matches!(limited, Err(Error::RateLimited(_))));

        let conflict = directory.address_records(NAME).await;
        assert!(matches!(conflict, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_an_error() {
        let api = MockApi::start(vec![(
            200,
            r#"{"success":false,"errors":[{"code":1003,"message":"Invalid zone"}],"result":null}"#
                .to_string(),
        )])
        .await;

        let result = api.directory(false).address_records(NAME).await;
        match result {
            Err(e) => assert!(e.to_string().contains("Invalid zone")),
            Ok(addresses) => panic!("expected an error, got {:?}", addresses),
        }
    }

    #[test]
    fn empty_token_is_rejected() {
        let result = CloudflareDirectory::new("", None, false);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn zone_candidates_run_longest_first() {
        assert_eq!(
            zone_candidates("www.example.com").unwrap(),
            vec!["www.example.com", "example.com"]
        );
        assert_eq!(zone_candidates("example.com.").unwrap(), vec!["example.com"]);
        assert_eq!(
            zone_candidates("www.abc.de").unwrap(),
            vec!["www.abc.de", "abc.de"]
        );
        assert_eq!(
            zone_candidates("www.example.co.uk").unwrap(),
            vec!["www.example.co.uk", "example.co.uk", "co.uk"]
        );
        assert!(zone_candidates("localhost").is_err());
        assert!(zone_candidates("bad..example.com").is_err());
    }

    #[test]
    fn test_factory_creation() {
        let factory = CloudflareFactory;

        let config = DirectoryConfig::Cloudflare {
            api_token: "test_token".to_string(),
            zone_id: Some("test_zone".to_string()),
            ttl: None,
            notes: None,
            dry_run: false,
        };
        assert!(factory.create(&config).is_ok());

        let config = DirectoryConfig::Cloudflare {
            api_token: String::new(),
            zone_id: None,
            ttl: None,
            notes: None,
            dry_run: false,
        };
        assert!(factory.create(&config).is_err());
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let directory = CloudflareDirectory::new("secret_token_12345", None, false).unwrap();

        let debug_str = format!("{:?}", directory);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("CloudflareDirectory"));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[test]
    fn created_records_default_to_short_ttl() {
        let directory = CloudflareDirectory::new("token", None, false).unwrap();
        assert_eq!(directory.ttl, DEFAULT_TTL);
        assert!(!directory.is_dry_run());
    }
}
