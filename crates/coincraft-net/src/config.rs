//! Hub configuration loaded from environment variables.
//!
//! All settings have defaults so two instances on one machine work with
//! zero configuration.

use std::time::Duration;

use coincraft_shared::constants::{DEFAULT_HUB_URL, POLL_INTERVAL_MS};

/// Whether this instance runs the broadcast relay or only connects to
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubRole {
    /// Serve if the configured endpoint is a loopback address.
    Auto,
    /// Always bind the relay.
    Server,
    /// Never bind; some other instance (or host) serves.
    Client,
}

impl HubRole {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "server" => Some(Self::Server),
            "client" => Some(Self::Client),
            _ => None,
        }
    }
}

/// Notification hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// WebSocket endpoint of the relay.
    /// Env: `COINCRAFT_HUB_URL`
    /// Default: `ws://127.0.0.1:8123`
    pub endpoint: String,

    /// Server/client role.
    /// Env: `COINCRAFT_HUB_ROLE` (`auto` / `server` / `client`)
    /// Default: `auto` (loopback heuristic)
    pub role: HubRole,

    /// Poll interval for the re-fetch fallback.
    /// Env: `COINCRAFT_POLL_MS`
    /// Default: 2000 ms
    pub poll_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_HUB_URL.to_string(),
            role: HubRole::Auto,
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }
}

impl HubConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("COINCRAFT_HUB_URL") {
            if !url.is_empty() {
                config.endpoint = url;
            }
        }

        if let Ok(role) = std::env::var("COINCRAFT_HUB_ROLE") {
            match HubRole::parse(&role) {
                Some(parsed) => config.role = parsed,
                None => {
                    tracing::warn!(value = %role, "Invalid COINCRAFT_HUB_ROLE, using auto");
                }
            }
        }

        if let Ok(ms) = std::env::var("COINCRAFT_POLL_MS") {
            match ms.parse::<u64>() {
                Ok(parsed) if parsed > 0 => config.poll_interval = Duration::from_millis(parsed),
                _ => {
                    tracing::warn!(value = %ms, "Invalid COINCRAFT_POLL_MS, using default");
                }
            }
        }

        config
    }

    /// Whether this instance should bind the relay.
    pub fn should_serve(&self) -> bool {
        match self.role {
            HubRole::Server => true,
            HubRole::Client => false,
            HubRole::Auto => self.endpoint_is_loopback(),
        }
    }

    /// `host:port` to bind when serving, derived from the endpoint.
    pub fn bind_addr(&self) -> Option<String> {
        host_port(&self.endpoint).map(|(host, port)| {
            let host = if host == "localhost" { "127.0.0.1" } else { host };
            format!("{host}:{port}")
        })
    }

    fn endpoint_is_loopback(&self) -> bool {
        matches!(
            host_port(&self.endpoint),
            Some(("127.0.0.1" | "localhost" | "[::1]", _))
        )
    }
}

/// Split `ws://host:port[/...]` into host and port.
fn host_port(url: &str) -> Option<(&str, u16)> {
    let rest = url
        .strip_prefix("ws://")
        .or_else(|| url.strip_prefix("wss://"))?;
    let authority = rest.split('/').next()?;
    let (host, port) = authority.rsplit_once(':')?;
    let port = port.parse().ok()?;
    if host.is_empty() {
        return None;
    }
    Some((host, port))
}
