//! Service advertisement capability.
//!
//! An advertiser publishes two discovery records for the receiver: the
//! primary record at the endpoint's bound port and a companion record
//! at `port + 1`. How they reach the network (mDNS responder, Bonjour
//! service, nothing at all) is up to the implementation.

pub mod local;

use crate::error::DiscoveryError;

pub use local::{LocalAdvertiser, LocalAdvertiserFactory};

/// Service type of the primary record.
pub const PRIMARY_SERVICE: &str = "_raop._tcp";

/// Service type of the companion record.
pub const COMPANION_SERVICE: &str = "_airplay._tcp";

// ── DiscoveryRecord ──────────────────────────────────────────────

/// A published name/port/metadata tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRecord {
    pub service_type: &'static str,
    pub instance: String,
    pub port: u16,
    pub txt: Vec<(String, String)>,
}

impl DiscoveryRecord {
    /// Value of TXT key `key`, if present.
    pub fn txt_value(&self, key: &str) -> Option<&str> {
        self.txt
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// TXT entries in DNS wire form: each `key=value` prefixed by its
    /// length byte. Entries longer than 255 bytes are truncated.
    pub fn txt_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (key, value) in &self.txt {
            let entry = format!("{key}={value}");
            let bytes = &entry.as_bytes()[..entry.len().min(255)];
            out.push(bytes.len() as u8);
            out.extend_from_slice(bytes);
        }
        out
    }
}

// ── Traits ───────────────────────────────────────────────────────

/// Publishes the receiver's reachability.
pub trait ServiceAdvertiser: Send {
    fn register_primary(&mut self, port: u16) -> Result<(), DiscoveryError>;

    fn register_companion(&mut self, port: u16) -> Result<(), DiscoveryError>;

    fn unregister_primary(&mut self);

    fn unregister_companion(&mut self);

    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Hardware identifier the records are keyed on.
    fn hw_addr(&self) -> &[u8];

    /// Records currently published.
    fn records(&self) -> Vec<DiscoveryRecord> {
        Vec::new()
    }

    /// Release the advertiser.
    fn destroy(self: Box<Self>) {}
}

/// Creates service advertisers.
pub trait AdvertiserFactory: Send + Sync {
    fn init(&self, name: &str, hw_addr: &[u8]) -> Result<Box<dyn ServiceAdvertiser>, DiscoveryError>;
}
