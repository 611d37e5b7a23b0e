// # IP Source Trait
//
// Defines the interface for finding the caller's current public address.
//
// ## Implementations
//
// - HTTP lookup chain: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let current_ip = source.resolve().await?;
//     println!("Public IP: {}", current_ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP source implementations
///
/// A source answers one question: what is the public address right now.
/// Scheduling, retries across cycles and backoff belong to `DdnsEngine`.
///
/// # Fallback
///
/// A source backed by several lookup services tries them in order and
/// returns the first usable answer. It fails only when every service failed.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current IP address
    /// - `Err(Error::Resolution)`: Every configured lookup failed
    async fn resolve(&self) -> Result<IpAddr, crate::Error>;

    /// Name used in logs
    fn source_name(&self) -> &'static str {
        "ip-source"
    }
}
