// # HTTP Transport Trait
//
// The HTTP client is an external collaborator: it sends a request and hands
// back status, redirect target and body. Implementations MUST NOT follow
// redirects on their own; a 3xx answer is returned as-is so the caller can
// log it (dy.fi and similar providers use redirects as soft errors).
//
// The transport is the one piece of shared mutable state in the agent. After
// a failed cycle the engine calls `rebuild()`, which replaces the underlying
// client wholesale instead of trying to repair it.

use async_trait::async_trait;

use crate::config::Credentials;

/// Response as seen by sources and providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// `Location` header, if any
    pub location: Option<String>,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            location: None,
            body: body.into(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 3xx
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Minimal HTTP client capability
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Unauthenticated GET
    async fn get(&self, url: &str) -> Result<HttpResponse, crate::Error>;

    /// POST with HTTP Basic authentication and a plain-text body
    async fn post(
        &self,
        url: &str,
        body: String,
        credentials: &Credentials,
    ) -> Result<HttpResponse, crate::Error>;

    /// Drop the current connection state and start from a fresh client
    fn rebuild(&self) -> Result<(), crate::Error>;
}
