//! Core traits for the DDNS agent
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Resolve the current public IP address
//! - [`DnsProvider`]: Update one host record via the provider API
//! - [`StateStore`]: Persist the last update timestamp across restarts
//! - [`HttpTransport`]: Shared HTTP client used by sources and providers

pub mod ip_source;
pub mod dns_provider;
pub mod state_store;
pub mod transport;

pub use ip_source::IpSource;
pub use dns_provider::{DnsProvider, UpdateOutcome};
pub use state_store::StateStore;
pub use transport::{HttpResponse, HttpTransport};
