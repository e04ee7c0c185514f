//! Session configuration.
//!
//! [`SessionConfig`] is an immutable snapshot handed to
//! [`MirrorSession`](crate::MirrorSession) at construction. Callbacks
//! run synchronously on the endpoint's delivery thread.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::decoder::SharedFrame;
use crate::session::LogLevel;

/// Receives each decoded frame with the presentation timestamp of the
/// access unit that produced it.
pub type FrameCallback = Arc<dyn Fn(SharedFrame, i64) + Send + Sync>;

/// Receives endpoint log events on the normalized scale.
pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Connection limit handed to the endpoint unless overridden.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

// ── HardwareAddress ──────────────────────────────────────────────

/// Six-byte MAC-style device identifier.
///
/// Parses and prints as `48:5D:60:7C:EE:22`; `-` is accepted as a
/// separator when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardwareAddress(pub [u8; 6]);

impl HardwareAddress {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for HardwareAddress {
    fn default() -> Self {
        Self([0x48, 0x5D, 0x60, 0x7C, 0xEE, 0x22])
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Why a hardware address string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareAddressError {
    #[error("expected 6 octets, got {0}")]
    Length(usize),
    #[error("invalid octet `{0}`")]
    Octet(String),
}

impl FromStr for HardwareAddress {
    type Err = HardwareAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(HardwareAddressError::Length(parts.len()));
        }
        let mut out = [0u8; 6];
        for (slot, part) in out.iter_mut().zip(&parts) {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(HardwareAddressError::Octet(part.to_string()));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| HardwareAddressError::Octet(part.to_string()))?;
        }
        Ok(Self(out))
    }
}

impl Serialize for HardwareAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HardwareAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ── SessionConfig ────────────────────────────────────────────────

/// Everything a session needs from the application.
#[derive(Clone)]
pub struct SessionConfig {
    /// Name the receiver is advertised under.
    pub name: String,
    pub hw_addr: HardwareAddress,
    /// Ask the decoder for low-delay output.
    pub low_latency: bool,
    /// Concurrent sender connections the endpoint accepts.
    pub max_connections: usize,
    pub on_video_data: Option<FrameCallback>,
    /// Stored for API parity; no audio path is decoded yet.
    pub on_audio_data: Option<FrameCallback>,
    pub log_callback: Option<LogCallback>,
}

impl SessionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_hw_addr(mut self, hw_addr: HardwareAddress) -> Self {
        self.hw_addr = hw_addr;
        self
    }

    pub fn with_low_latency(mut self, low_latency: bool) -> Self {
        self.low_latency = low_latency;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn on_video_data<F>(mut self, f: F) -> Self
    where
        F: Fn(SharedFrame, i64) + Send + Sync + 'static,
    {
        self.on_video_data = Some(Arc::new(f));
        self
    }

    pub fn on_audio_data<F>(mut self, f: F) -> Self
    where
        F: Fn(SharedFrame, i64) + Send + Sync + 'static,
    {
        self.on_audio_data = Some(Arc::new(f));
        self
    }

    pub fn on_log<F>(mut self, f: F) -> Self
    where
        F: Fn(LogLevel, &str) + Send + Sync + 'static,
    {
        self.log_callback = Some(Arc::new(f));
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "AirplayServer".into(),
            hw_addr: HardwareAddress::default(),
            low_latency: false,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            on_video_data: None,
            on_audio_data: None,
            log_callback: None,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("name", &self.name)
            .field("hw_addr", &self.hw_addr.to_string())
            .field("low_latency", &self.low_latency)
            .field("max_connections", &self.max_connections)
            .field("on_video_data", &self.on_video_data.is_some())
            .field("on_audio_data", &self.on_audio_data.is_some())
            .field("log_callback", &self.log_callback.is_some())
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
