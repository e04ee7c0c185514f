//! Configuration for the receiver.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use mirror_core::config::DEFAULT_MAX_CONNECTIONS;
use mirror_core::{FeedEndpointFactory, HardwareAddress, SessionConfig};
use mirror_core::endpoint::codec::MAX_FEED_PAYLOAD;
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Identity published to senders.
    pub device: DeviceConfig,
    /// Network settings.
    pub network: NetworkConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Frame statistics.
    pub stats: StatsConfig,
}

/// Device identity and decoder preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name shown in the sender's device picker.
    pub name: String,
    /// Six-octet hardware address, e.g. `48:5D:60:7C:EE:22`.
    pub hw_addr: HardwareAddress,
    /// Trade reordering depth for output latency.
    pub low_latency: bool,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to listen on.
    pub bind: IpAddr,
    /// TCP port for the feed endpoint (0 = pick any free port).
    pub port: u16,
    /// Maximum concurrent sender connections.
    pub max_connections: usize,
    /// Largest accepted access unit in bytes.
    pub max_payload: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

/// Frame statistics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Log a progress line every N frames (0 = never).
    pub report_every: u64,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            name: session.name,
            hw_addr: session.hw_addr,
            low_latency: session.low_latency,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_payload: MAX_FEED_PAYLOAD,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { report_every: 100 }
    }
}

// ── Loading ──────────────────────────────────────────────────────

/// Why [`ReceiverConfig::load`] returned the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFallback {
    /// No readable file at `path`.
    Missing { path: String },
    /// The file at `path` did not parse.
    Invalid { path: String, reason: String },
}

impl std::fmt::Display for LoadFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { path } => write!(f, "no config at {path}; using defaults"),
            Self::Invalid { path, reason } => {
                write!(f, "invalid config {path}: {reason}; using defaults")
            }
        }
    }
}

impl ReceiverConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// The second value says why defaults were used, so the caller can
    /// report it once logging is up.
    pub fn load(path: &Path) -> (Self, Option<LoadFallback>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(cfg) => (cfg, None),
                Err(e) => (
                    Self::default(),
                    Some(LoadFallback::Invalid {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    }),
                ),
            },
            Err(_) => (
                Self::default(),
                Some(LoadFallback::Missing {
                    path: path.display().to_string(),
                }),
            ),
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Render the default configuration as TOML (for `--gen-config`).
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }

    /// Session settings without callbacks; the caller attaches those.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig::new(self.device.name.clone())
            .with_hw_addr(self.device.hw_addr)
            .with_low_latency(self.device.low_latency)
            .with_max_connections(self.network.max_connections.max(1))
    }

    pub fn to_endpoint_factory(&self) -> FeedEndpointFactory {
        FeedEndpointFactory {
            addr: self.network.bind,
            port: self.network.port,
            max_payload: self.network.max_payload.clamp(1, MAX_FEED_PAYLOAD),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
