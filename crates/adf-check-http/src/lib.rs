// # HTTP Health Check
//
// This crate provides an HTTP health check for the ADF system.
//
// ## Semantics
//
// One request per check, sent straight to the target address (not through
// DNS, which would land on a random pool member). The target is healthy
// when the response status is one of the configured codes; redirects are
// not followed, so a 302 counts as its own answer.
//
// Transport failures (connection refused, reset, TLS) are returned as
// errors, which the executor classifies as a failed attempt. There is no
// client timeout here: the deadline belongs to the executor.

use adf_core::ProviderRegistry;
use adf_core::config::CheckConfig;
use adf_core::traits::{HealthCheck, HealthCheckFactory};
use adf_core::{Error, Result};

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

/// Health check sending one HTTP request to the target
#[derive(Debug, Clone)]
pub struct HttpCheck {
    method: Method,
    path: String,
    port: u16,
    headers: HeaderMap,
    body: Option<String>,
    valid_status_codes: Vec<u16>,
    client: reqwest::Client,
}

impl HttpCheck {
    /// Create a new HTTP check
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)` if the method or a header is not valid HTTP
    pub fn new(
        method: &str,
        path: impl Into<String>,
        port: u16,
        headers: &BTreeMap<String, String>,
        body: Option<String>,
        valid_status_codes: Vec<u16>,
    ) -> Result<Self> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::config(format!("Invalid HTTP method: {}", method)))?;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::config(format!("Invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::config(format!("Invalid value for header {}", name)))?;
            header_map.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            method,
            path: path.into(),
            port,
            headers: header_map,
            body,
            valid_status_codes,
            client,
        })
    }

    /// URL for one request against `target`
    fn url_for(&self, target: IpAddr) -> String {
        format!("http://{}{}", SocketAddr::new(target, self.port), self.path)
    }
}

#[async_trait::async_trait]
impl HealthCheck for HttpCheck {
    async fn check(&self, target: IpAddr) -> Result<bool> {
        let url = self.url_for(target);

        let mut request = self
            .client
            .request(self.method.clone(), &url)
            .headers(self.headers.clone());
        if let Some(body) = &self.body {
            request = request.body(body.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::health_check(format!("{} {} failed: {}", self.method, url, e)))?;

        let status = response.status().as_u16();
        let healthy = self.valid_status_codes.contains(&status);
        if !healthy {
            tracing::debug!("{} {} answered {}", self.method, url, status);
        }
        Ok(healthy)
    }

    fn describe(&self) -> String {
        format!("HTTP {} {} on port {}", self.method, self.path, self.port)
    }
}

/// Factory for creating HTTP checks
pub struct HttpCheckFactory;

impl HealthCheckFactory for HttpCheckFactory {
    fn create(&self, config: &CheckConfig) -> Result<Box<dyn HealthCheck>> {
        match config {
            CheckConfig::Http {
                method,
                path,
                port,
                headers,
                body,
                valid_status_codes,
            } => Ok(Box::new(HttpCheck::new(
                method,
                path.clone(),
                *port,
                headers,
                body.clone(),
                valid_status_codes.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for HTTP check")),
        }
    }
}

/// Register the HTTP check with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_check("http", Box::new(HttpCheckFactory));
}
