//! Configuration types for the DDNS agent
//!
//! The configuration is a JSON document (`settings.json` by default). When the
//! file does not exist it is created from [`DdnsConfig::default()`] so the
//! agent can still start. Keys are snake_case; the PascalCase keys written by
//! older releases (`Username`, `DomainName`, ...) are accepted as aliases, and
//! a single `DomainName` string is read as a one-element host list.

use serde::{Deserialize, Deserializer, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Domain suffix owned by the dy.fi provider
pub const DYFI_DOMAIN_SUFFIX: &str = "dy.fi";

/// dy.fi update endpoint
pub const DEFAULT_UPDATE_URL: &str = "https://www.dy.fi/nic/update";

/// Plain-text "echo my IP" services, queried in order
pub const DEFAULT_IP_LOOKUP_ENDPOINTS: &[&str] = &[
    "http://icanhazip.com",
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
];

/// Time between two scheduler checks
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60 * 60;

/// Time spent in backoff after a failed cycle
pub const DEFAULT_ERROR_BACKOFF_SECS: u64 = 60 * 60;

/// Resolution attempts made before the main loop starts
pub const DEFAULT_STARTUP_RESOLVE_ATTEMPTS: usize = 5;

/// Delay before each startup resolution attempt
pub const DEFAULT_STARTUP_RETRY_DELAY_SECS: u64 = 1;

/// Per-request HTTP timeout
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Account credentials for the update endpoint
///
/// The Debug implementation intentionally does NOT expose the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account username (dy.fi uses the e-mail address)
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create a credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Main DDNS configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DdnsConfig {
    /// Account username
    #[serde(alias = "Username")]
    pub username: String,

    /// Account password
    #[serde(alias = "Password")]
    pub password: String,

    /// Hostnames to keep updated (`foo` and `foo.dy.fi` are equivalent)
    #[serde(
        alias = "Hostnames",
        alias = "DomainName",
        alias = "domain_name",
        deserialize_with = "one_or_many"
    )]
    pub hostnames: Vec<String>,

    /// Days between forced updates when the IP does not change
    #[serde(alias = "UpdateIntervalDays")]
    pub update_interval_days: u32,

    /// Force an update on the first cycle after startup
    #[serde(alias = "UpdateNow")]
    pub update_now: bool,

    /// Append log lines to a file as well as the console
    #[serde(alias = "UseLogFile")]
    pub use_log_file: bool,

    /// Lookup endpoints, tried in order
    pub ip_lookup_endpoints: Vec<String>,

    /// Address family accepted from the lookup endpoints
    pub ip_version: IpVersion,

    /// Provider update endpoint
    pub update_url: String,

    /// Scheduler settings
    pub engine: EngineConfig,
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self {
            username: "my.email@email.com".to_string(),
            password: "passw0rd".to_string(),
            hostnames: vec!["address.dy.fi".to_string()],
            update_interval_days: 6,
            update_now: true,
            use_log_file: true,
            ip_lookup_endpoints: DEFAULT_IP_LOOKUP_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ip_version: IpVersion::default(),
            update_url: DEFAULT_UPDATE_URL.to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl std::fmt::Debug for DdnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DdnsConfig")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("hostnames", &self.hostnames)
            .field("update_interval_days", &self.update_interval_days)
            .field("update_now", &self.update_now)
            .field("use_log_file", &self.use_log_file)
            .field("ip_lookup_endpoints", &self.ip_lookup_endpoints)
            .field("ip_version", &self.ip_version)
            .field("update_url", &self.update_url)
            .field("engine", &self.engine)
            .finish()
    }
}

impl DdnsConfig {
    /// Load the configuration file, creating it from defaults if it is absent
    ///
    /// Returns the configuration and whether the file was just created, so
    /// the caller can report it once logging is up.
    ///
    /// A file that exists but cannot be parsed is a fatal configuration
    /// error: the agent does not silently fall back to defaults and overwrite
    /// what the user wrote.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok((config, true));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read configuration {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = serde_json::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse configuration {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok((config, false))
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| {
            Error::config(format!(
                "Failed to write configuration {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::config("username cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(Error::config("password cannot be empty"));
        }

        if self.hostnames.is_empty() {
            return Err(Error::config("No hostnames configured"));
        }
        for hostname in &self.hostnames {
            validate_hostname(hostname)?;
        }

        if self.update_interval_days == 0 {
            return Err(Error::config("update_interval_days must be at least 1"));
        }

        if self.ip_lookup_endpoints.is_empty() {
            return Err(Error::config("At least one IP lookup endpoint is required"));
        }
        for endpoint in &self.ip_lookup_endpoints {
            validate_http_url(endpoint)?;
        }
        validate_http_url(&self.update_url)?;

        self.engine.validate()
    }

    /// Credential pair used for the update endpoint
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    /// Interval between scheduled updates
    pub fn update_interval(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.update_interval_days))
    }
}

/// Accepts either `"host"` or `["host", ...]`
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(host) => vec![host],
        OneOrMany::Many(hosts) => hosts,
    })
}

fn validate_http_url(url: &str) -> Result<()> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(Error::config(format!(
            "URL must use HTTP or HTTPS scheme. Got: {}",
            url
        )));
    }
    Ok(())
}

/// Validate that a string is a usable host name
///
/// Basic RFC 1035 checks: overall length, label length, characters and
/// hyphen placement.
pub fn validate_hostname(hostname: &str) -> Result<()> {
    if hostname.is_empty() {
        return Err(Error::config("Hostname cannot be empty"));
    }

    if hostname.len() > 253 {
        return Err(Error::config(format!(
            "Hostname too long: {} chars (max 253). Got: {}",
            hostname.len(),
            hostname
        )));
    }

    for label in hostname.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Hostname has empty label: '{}'",
                hostname
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Hostname label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "Hostname label contains invalid characters: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Hostname label cannot start or end with hyphen: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// IP version accepted from lookup endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 only
    V4,
    /// IPv6 only
    V6,
    /// Both IPv4 and IPv6
    #[default]
    Both,
}

impl IpVersion {
    /// Whether `ip` is acceptable under this filter
    pub fn accepts(&self, ip: &IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
            IpVersion::Both => true,
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sleep between two checks (in seconds)
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Sleep after a failed cycle (in seconds)
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Resolution attempts before entering the main loop
    #[serde(default = "default_startup_resolve_attempts")]
    pub startup_resolve_attempts: usize,

    /// Delay before each startup resolution attempt (in seconds)
    #[serde(default = "default_startup_retry_delay_secs")]
    pub startup_retry_delay_secs: u64,

    /// Per-request HTTP timeout (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            startup_resolve_attempts: default_startup_resolve_attempts(),
            startup_retry_delay_secs: default_startup_retry_delay_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl EngineConfig {
    /// Validate the engine configuration
    ///
    /// Zero-length sleeps are rejected so the loop can never spin.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            return Err(Error::config("check_interval_secs must be > 0"));
        }
        if self.error_backoff_secs == 0 {
            return Err(Error::config("error_backoff_secs must be > 0"));
        }
        if self.startup_resolve_attempts == 0 {
            return Err(Error::config("startup_resolve_attempts must be >= 1"));
        }
        if self.http_timeout_secs == 0 {
            return Err(Error::config("http_timeout_secs must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn startup_retry_delay(&self) -> Duration {
        Duration::from_secs(self.startup_retry_delay_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn default_check_interval_secs() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_error_backoff_secs() -> u64 {
    DEFAULT_ERROR_BACKOFF_SECS
}

fn default_startup_resolve_attempts() -> usize {
    DEFAULT_STARTUP_RESOLVE_ATTEMPTS
}

fn default_startup_retry_delay_secs() -> u64 {
    DEFAULT_STARTUP_RETRY_DELAY_SECS
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_event_channel_capacity() -> usize {
    100
}
