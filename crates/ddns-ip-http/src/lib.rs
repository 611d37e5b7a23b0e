// # HTTP IP Source
//
// This crate provides the HTTP side of the DDNS agent:
//
// - [`ReqwestTransport`]: the shared HTTP client (no redirect following,
//   Basic auth for updates, rebuildable after a failed cycle)
// - [`HttpIpSource`]: public IP lookup over an ordered list of plain-text
//   "what is my IP" services
//
// ## Fallback
//
// Endpoints are tried in configuration order. The first one answering 2xx
// with a body that parses as an address (after trimming) wins. A failing
// endpoint is logged and the next one is tried; the lookup fails only when
// every endpoint failed.

mod transport;

pub use transport::{DEFAULT_HTTP_TIMEOUT, ReqwestTransport};

use async_trait::async_trait;
use ddns_core::config::DEFAULT_IP_LOOKUP_ENDPOINTS;
use ddns_core::{Error, HttpTransport, IpSource, IpVersion, Result};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP-based IP source with ordered endpoint fallback
pub struct HttpIpSource {
    /// Lookup URLs, tried in order
    endpoints: Vec<String>,

    /// Address family accepted from the endpoints
    version: IpVersion,

    /// Shared HTTP transport
    transport: Arc<dyn HttpTransport>,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `endpoints`: lookup URLs (e.g. "http://icanhazip.com"), tried in order
    /// - `version`: address family to accept
    /// - `transport`: HTTP transport, usually shared with the provider
    pub fn new(endpoints: Vec<String>, version: IpVersion, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            endpoints,
            version,
            transport,
        }
    }

    /// Source over the built-in endpoint list
    pub fn with_default_endpoints(transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(
            DEFAULT_IP_LOOKUP_ENDPOINTS
                .iter()
                .map(|url| url.to_string())
                .collect(),
            IpVersion::Both,
            transport,
        )
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Query a single endpoint
    async fn query(&self, url: &str) -> Result<IpAddr> {
        let response = self.transport.get(url).await?;

        if !response.is_success() {
            return Err(Error::http_status(response.status, url));
        }

        let text = response.body.trim();
        if text.is_empty() {
            return Err(Error::resolution(format!("empty response from {}", url)));
        }

        let ip: IpAddr = text
            .parse()
            .map_err(|e| Error::resolution(format!("invalid IP '{}' from {}: {}", text, url, e)))?;

        if !self.version.accepts(&ip) {
            return Err(Error::resolution(format!(
                "{} returned {} which does not match {:?}",
                url, ip, self.version
            )));
        }

        Ok(ip)
    }
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn resolve(&self) -> Result<IpAddr> {
        let mut last_error = None;

        for url in &self.endpoints {
            match self.query(url).await {
                Ok(ip) => {
                    debug!("Resolved {} from {}", ip, url);
                    return Ok(ip);
                }
                Err(e) => {
                    warn!("IP lookup via {} failed: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(Error::resolution(match last_error {
            Some(e) => format!(
                "all {} lookup endpoints failed (last: {})",
                self.endpoints.len(),
                e
            ),
            None => "no lookup endpoints configured".to_string(),
        }))
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
