// # HTTP Address Resolver
//
// This crate provides an HTTP-based own-address resolver for the ADF system.
//
// ## Purpose
//
// A node behind NAT does not know the address its peers and clients reach
// it on. This resolver asks an external "what is my IP" service, which
// answers with the bare address as plain text.
//
// ## Architecture
//
// One GET per call, no caching: the failover loop resolves once per round
// and must see an address change on the next round.

use adf_core::ProviderRegistry;
use adf_core::config::{DEFAULT_RESOLVER_URL, IpVersion, ResolverConfig};
use adf_core::traits::{AddressResolver, AddressResolverFactory};
use adf_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Request timeout for the address service
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Known services answering with the caller's address as plain text
pub const KNOWN_SERVICES: &[&str] = &[
    DEFAULT_RESOLVER_URL,     // IPv4 only
    "https://api64.ipify.org", // IPv6 when available
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
    EC2_METADATA_URL,
];

/// EC2 instance metadata endpoint for the instance's public IPv4 address
pub const EC2_METADATA_URL: &str = "http://169.254.169.254/latest/meta-data/public-ipv4";

/// HTTP-based own-address resolver
pub struct HttpAddressResolver {
    /// URL to fetch the address from
    url: String,

    /// Accepted IP version (None = both)
    version: Option<IpVersion>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressResolver {
    /// Create a new HTTP address resolver
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch the address from (e.g., "https://api.ipify.org")
    /// - `version`: IP version to accept (None = both)
    pub fn new(url: impl Into<String>, version: Option<IpVersion>) -> Self {
        Self {
            url: url.into(),
            version,
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// The service URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for HttpAddressResolver {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLVER_URL, None)
    }
}

/// Parse a service answer, applying the version filter
fn parse_address(body: &str, version: Option<IpVersion>) -> Result<IpAddr> {
    let text = body.trim();

    let address: IpAddr = text
        .parse()
        .map_err(|_| Error::address_resolver(format!("Invalid IP address: {:?}", text)))?;

    match version {
        Some(version) if !version.accepts(&address) => Err(Error::address_resolver(format!(
            "Expected {:?} address, got: {}",
            version, address
        ))),
        _ => Ok(address),
    }
}

#[async_trait::async_trait]
impl AddressResolver for HttpAddressResolver {
    async fn own_address(&self) -> Result<IpAddr> {
        tracing::debug!("Fetching own address from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::address_resolver(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::address_resolver(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::address_resolver(format!("Failed to read response: {}", e)))?;

        parse_address(&body, self.version)
    }
}

/// Factory for creating HTTP address resolvers
pub struct HttpResolverFactory;

impl AddressResolverFactory for HttpResolverFactory {
    fn create(&self, config: &ResolverConfig) -> Result<Box<dyn AddressResolver>> {
        match config {
            ResolverConfig::Http { url, version } => {
                Ok(Box::new(HttpAddressResolver::new(url.clone(), *version)))
            }
            _ => Err(Error::config("Invalid config for HTTP resolver")),
        }
    }
}

/// Register the HTTP resolver with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_resolver("http", Box::new(HttpResolverFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response, returning the base URL
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        format!("http://{}/", addr)
    }

    #[test]
    fn parses_trimmed_address() {
        let address = parse_address("198.51.100.4\n", None).unwrap();
        assert_eq!(address, IpAddr::from([198, 51, 100, 4]));
    }

    #[test]
    fn rejects_garbage() {
        let result = parse_address("<html>rate limited</html>", None);
        assert!(matches!(result, Err(Error::AddressResolver(_))));
    }

    #[test]
    fn version_filter_applies() {
        assert!(parse_address("2001:db8::1", Some(IpVersion::V4)).is_err());
        assert!(parse_address("2001:db8::1", Some(IpVersion::V6)).is_ok());
        assert!(parse_address("192.0.2.1", Some(IpVersion::Both)).is_ok());
    }

    #[tokio::test]
    async fn resolves_from_service() {
        let url = serve_once("200 OK", "203.0.113.9\n").await;
        let resolver = HttpAddressResolver::new(url, Some(IpVersion::V4));

        let address = resolver.own_address().await.unwrap();
        assert_eq!(address, IpAddr::from([203, 0, 113, 9]));
    }

    #[tokio::test]
    async fn http_error_is_a_resolver_error() {
        let url = serve_once("503 Service Unavailable", "").await;
        let resolver = HttpAddressResolver::new(url, None);

        let result = resolver.own_address().await;
        assert!(matches!(result, Err(Error::AddressResolver(_))));
    }

    #[test]
    fn test_factory_creation() {
        let factory = HttpResolverFactory;

        let config = ResolverConfig::Http {
            url: DEFAULT_RESOLVER_URL.to_string(),
            version: None,
        };
        assert!(factory.create(&config).is_ok());

        let config = ResolverConfig::Static {
            address: IpAddr::from([192, 0, 2, 1]),
        };
        assert!(factory.create(&config).is_err());
    }

    #[test]
    fn known_services_are_http_urls() {
        for url in KNOWN_SERVICES {
            let config = ResolverConfig::Http {
                url: url.to_string(),
                version: None,
            };
            assert!(config.validate().is_ok(), "{}", url);
        }
    }

    #[test]
    fn registers_under_http() {
        let registry = ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_resolver("http"));
    }
}
