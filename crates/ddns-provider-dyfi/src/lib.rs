// # dy.fi DNS Provider
//
// This crate provides the dy.fi provider implementation for the DDNS agent.
//
// ## Protocol
//
// - One POST per host to `<update_url>?hostname=<host>.dy.fi`
// - HTTP Basic authentication with the account e-mail and password
// - The request body is the request URL as `text/plain`; dy.fi ignores it
// - dy.fi takes the address from the connection, so it is not sent
// - Redirects are not followed; a 3xx is logged with its `Location`
//
// ## Answers
//
// The body is trimmed and compared case-insensitively:
//
// | Body            | Result                          |
// |-----------------|---------------------------------|
// | `nochg`         | success                         |
// | `good <ip>`     | success                         |
// | empty           | `Error::EmptyResponse`          |
// | anything else   | answered, `success == false`    |
//
// Retry, backoff and scheduling are owned by `DdnsEngine`.

use async_trait::async_trait;
use ddns_core::config::{DEFAULT_UPDATE_URL, DYFI_DOMAIN_SUFFIX};
use ddns_core::{Credentials, DnsProvider, Error, HttpTransport, Result, UpdateOutcome};
use std::net::IpAddr;
use std::sync::Arc;

/// dy.fi DNS provider
pub struct DyfiProvider {
    /// Update endpoint without query
    update_url: String,

    /// Shared HTTP transport
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for DyfiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DyfiProvider")
            .field("update_url", &self.update_url)
            .finish_non_exhaustive()
    }
}

impl DyfiProvider {
    /// Create a provider posting to `update_url`
    pub fn new(update_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            update_url: update_url.into(),
            transport,
        }
    }

    /// Provider using the public dy.fi endpoint
    pub fn with_default_url(transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(DEFAULT_UPDATE_URL, transport)
    }

    pub fn base_url(&self) -> &str {
        &self.update_url
    }
}

/// Append `.dy.fi` unless the name already is `dy.fi` or a name under it
///
/// The check is case-insensitive and label-aligned (`buddy.fi` is not under
/// `dy.fi`); the name is otherwise kept as given.
pub fn normalize_hostname(hostname: &str) -> String {
    let hostname = hostname.trim();
    let lower = hostname.to_ascii_lowercase();
    let under_dyfi = lower == DYFI_DOMAIN_SUFFIX
        || lower
            .strip_suffix(DYFI_DOMAIN_SUFFIX)
            .is_some_and(|rest| rest.ends_with('.'));

    if under_dyfi {
        hostname.to_string()
    } else {
        format!("{}.{}", hostname, DYFI_DOMAIN_SUFFIX)
    }
}

/// `<base>?hostname=<hostname>`, query-encoded
pub fn update_url(base: &str, hostname: &str) -> Result<String> {
    reqwest::Url::parse_with_params(base, &[("hostname", hostname)])
        .map(String::from)
        .map_err(|e| Error::config(format!("Invalid update URL '{}': {}", base, e)))
}

/// Interpret a dy.fi answer for `hostname`
pub fn classify_response(hostname: &str, body: &str) -> Result<UpdateOutcome> {
    let answer = body.trim_end();
    if answer.is_empty() {
        return Err(Error::empty_response(hostname));
    }

    let lower = answer.to_ascii_lowercase();
    let success = lower == "nochg" || lower.starts_with("good");

    Ok(UpdateOutcome::new(hostname, success, answer))
}

#[async_trait]
impl DnsProvider for DyfiProvider {
    async fn update_host(&self, hostname: &str, ip: IpAddr, credentials: &Credentials) -> Result<UpdateOutcome> {
        let hostname = normalize_hostname(hostname);
        let url = update_url(&self.update_url, &hostname)?;

        tracing::debug!("Sending update for {} ({})", hostname, ip);

        let response = self.transport.post(&url, url.clone(), credentials).await?;

        if response.is_redirect() {
            tracing::warn!(
                "dy.fi redirected update of {} to {}",
                hostname,
                response.location.as_deref().unwrap_or("<no location>")
            );
            return Err(Error::http_status(response.status, url));
        }

        if !response.is_success() {
            return Err(Error::http_status(response.status, url));
        }

        classify_response(&hostname, &response.body)
    }

    fn provider_name(&self) -> &'static str {
        "dyfi"
    }
}
