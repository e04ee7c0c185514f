//! In-process advertiser.
//!
//! Builds and tracks the discovery records a network responder would
//! publish, and reports them through `tracing`. Useful on hosts with no
//! responder and for inspecting what would be announced.

use tracing::info;

use crate::discovery::{
    AdvertiserFactory, COMPANION_SERVICE, DiscoveryRecord, PRIMARY_SERVICE, ServiceAdvertiser,
};
use crate::error::DiscoveryError;

/// Expected hardware identifier length (MAC-style).
pub const HW_ADDR_LEN: usize = 6;

const FEATURES: &str = "0x5A7FFFF7,0x1E";
const MODEL: &str = "AppleTV2,1";
const SOURCE_VERSION: &str = "220.68";

// ── LocalAdvertiserFactory ───────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAdvertiserFactory;

impl AdvertiserFactory for LocalAdvertiserFactory {
    fn init(&self, name: &str, hw_addr: &[u8]) -> Result<Box<dyn ServiceAdvertiser>, DiscoveryError> {
        Ok(Box::new(LocalAdvertiser::new(name, hw_addr)?))
    }
}

// ── LocalAdvertiser ──────────────────────────────────────────────

#[derive(Debug)]
pub struct LocalAdvertiser {
    name: String,
    hw_addr: Vec<u8>,
    primary: Option<DiscoveryRecord>,
    companion: Option<DiscoveryRecord>,
}

impl LocalAdvertiser {
    pub fn new(name: &str, hw_addr: &[u8]) -> Result<Self, DiscoveryError> {
        if hw_addr.len() != HW_ADDR_LEN {
            return Err(DiscoveryError::HwAddrLen(hw_addr.len()));
        }
        Ok(Self {
            name: name.to_string(),
            hw_addr: hw_addr.to_vec(),
            primary: None,
            companion: None,
        })
    }

    /// Companion TXT record in DNS wire form.
    pub fn airplay_txt(&self) -> Vec<u8> {
        self.companion_record(0).txt_bytes()
    }

    fn hw_hex(&self, separator: &str) -> String {
        self.hw_addr
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn primary_record(&self, port: u16) -> DiscoveryRecord {
        let txt = [
            ("txtvers", "1"),
            ("ch", "2"),
            ("cn", "0,1,2,3"),
            ("da", "true"),
            ("et", "0,3,5"),
            ("vv", "2"),
            ("ft", FEATURES),
            ("am", MODEL),
            ("md", "0,1,2"),
            ("rhd", "5.6.0.0"),
            ("pw", "false"),
            ("sr", "44100"),
            ("ss", "16"),
            ("sv", "false"),
            ("tp", "UDP"),
            ("sf", "0x4"),
            ("vs", SOURCE_VERSION),
            ("vn", "65537"),
        ];
        DiscoveryRecord {
            service_type: PRIMARY_SERVICE,
            instance: format!("{}@{}", self.hw_hex(""), self.name),
            port,
            txt: owned(&txt),
        }
    }

    fn companion_record(&self, port: u16) -> DiscoveryRecord {
        let device_id = self.hw_hex(":");
        let txt = [
            ("deviceid", device_id.as_str()),
            ("features", FEATURES),
            ("flags", "0x4"),
            ("model", MODEL),
            ("pw", "false"),
            ("rhd", "5.6.0.0"),
            ("srcvers", SOURCE_VERSION),
            ("vv", "2"),
        ];
        DiscoveryRecord {
            service_type: COMPANION_SERVICE,
            instance: self.name.clone(),
            port,
            txt: owned(&txt),
        }
    }
}

fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl ServiceAdvertiser for LocalAdvertiser {
    fn register_primary(&mut self, port: u16) -> Result<(), DiscoveryError> {
        let record = self.primary_record(port);
        info!("publishing {} `{}` on port {port}", record.service_type, record.instance);
        self.primary = Some(record);
        Ok(())
    }

    fn register_companion(&mut self, port: u16) -> Result<(), DiscoveryError> {
        let record = self.companion_record(port);
        info!("publishing {} `{}` on port {port}", record.service_type, record.instance);
        self.companion = Some(record);
        Ok(())
    }

    fn unregister_primary(&mut self) {
        if let Some(record) = self.primary.take() {
            info!("withdrawing {} `{}`", record.service_type, record.instance);
        }
    }

    fn unregister_companion(&mut self) {
        if let Some(record) = self.companion.take() {
            info!("withdrawing {} `{}`", record.service_type, record.instance);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn hw_addr(&self) -> &[u8] {
        &self.hw_addr
    }

    fn records(&self) -> Vec<DiscoveryRecord> {
        self.primary.iter().chain(self.companion.iter()).cloned().collect()
    }
}

// ── Tests ────────────────────────────────────────────────────────
