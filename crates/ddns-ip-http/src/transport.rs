// # Reqwest Transport
//
// `HttpTransport` implementation on top of `reqwest`.
//
// - Redirects are never followed (`redirect::Policy::none()`); the 3xx
//   response and its `Location` header are handed back to the caller
// - Every request has a timeout
// - `rebuild()` swaps in a brand-new client, dropping pooled connections

use async_trait::async_trait;
use ddns_core::{Credentials, Error, HttpResponse, HttpTransport, Result};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use std::sync::RwLock;
use std::time::Duration;

/// User agent sent with every request
const USER_AGENT: &str = concat!("ddns/", env!("CARGO_PKG_VERSION"));

/// Default HTTP timeout for requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed transport
#[derive(Debug)]
pub struct ReqwestTransport {
    client: RwLock<reqwest::Client>,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: RwLock::new(build_client(timeout)?),
            timeout,
        })
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current client (cheap clone of a shared handle)
    fn client(&self) -> Result<reqwest::Client> {
        self.client
            .read()
            .map(|client| client.clone())
            .map_err(|_| Error::transport("HTTP client lock poisoned"))
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))
}

async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let body = response
        .text()
        .await
        .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

    Ok(HttpResponse {
        status,
        location,
        body,
    })
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client()?
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("GET {} failed: {}", url, e)))?;

        into_response(response).await
    }

    async fn post(&self, url: &str, body: String, credentials: &Credentials) -> Result<HttpResponse> {
        let response = self
            .client()?
            .post(url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::transport(format!("POST {} failed: {}", url, e)))?;

        into_response(response).await
    }

    fn rebuild(&self) -> Result<()> {
        let fresh = build_client(self.timeout)?;
        let mut client = self
            .client
            .write()
            .map_err(|_| Error::transport("HTTP client lock poisoned"))?;
        *client = fresh;
        tracing::debug!("HTTP client rebuilt");
        Ok(())
    }
}
