// # DNS Provider Trait
//
// Defines the interface for pushing an address to a dynamic-DNS provider.
//
// ## Implementations
//
// - dy.fi: `ddns-provider-dyfi` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{Credentials, DnsProvider};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let credentials = Credentials::new("me@example.com", "secret");
//
//     let outcome = provider
//         .update_host("myhome", "192.0.2.1".parse()?, &credentials)
//         .await?;
//     println!("{} -> {}", outcome.hostname, outcome.raw_response);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

use crate::config::Credentials;

/// Result of a single host update that reached the provider
///
/// `success == false` means the provider answered but rejected the update
/// (e.g. `badauth`, `nohost`). Transport failures and empty answers are
/// reported as errors instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Host name as sent to the provider (normalized)
    pub hostname: String,
    /// Whether the provider accepted the update
    pub success: bool,
    /// Response body, trailing whitespace removed
    pub raw_response: String,
}

impl UpdateOutcome {
    pub fn new(hostname: impl Into<String>, success: bool, raw_response: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            success,
            raw_response: raw_response.into(),
        }
    }
}

/// Trait for DNS provider implementations
///
/// # Rules
///
/// - One HTTP request per call; no retry or backoff (owned by `DdnsEngine`)
/// - No state between calls
/// - Credentials are passed in, never logged
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Update one host record
    ///
    /// # Parameters
    ///
    /// - `hostname`: Host name as configured (the provider normalizes it)
    /// - `ip`: The address just resolved
    /// - `credentials`: Account credentials
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateOutcome)`: The provider answered (accepted or not)
    /// - `Err(Error::Transport | Error::HttpStatus)`: The request failed
    /// - `Err(Error::EmptyResponse)`: The provider answered with nothing
    async fn update_host(
        &self,
        hostname: &str,
        ip: IpAddr,
        credentials: &Credentials,
    ) -> Result<UpdateOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
