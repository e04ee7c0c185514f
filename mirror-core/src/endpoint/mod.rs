//! Protocol endpoint capability.
//!
//! The endpoint accepts sender connections and pushes compressed video
//! into the session through an [`EndpointEvents`] callback table. Its
//! wire protocol is its own business; the session only sees the small
//! surface below.
//!
//! ```text
//! EndpointFactory::init(max_connections, events) ──► ProtocolEndpoint
//!        set_discovery ─► start (bound port) ─► … ─► stop ─► destroy
//!
//! worker thread ── on_connection_init / on_video_access_unit /
//!                  on_log / on_connection_destroy ──► EndpointEvents
//! ```

pub mod codec;
pub mod feed;

use std::sync::Arc;

use bytes::Bytes;

use crate::discovery::ServiceAdvertiser;
use crate::error::EndpointError;

pub use codec::{FeedCodec, FeedPacket};
pub use feed::{FeedEndpoint, FeedEndpointFactory};

/// Syslog-style severities used by endpoints when reporting log events.
pub mod severity {
    pub const EMERGENCY: i32 = 0;
    pub const ALERT: i32 = 1;
    pub const CRITICAL: i32 = 2;
    pub const ERROR: i32 = 3;
    pub const WARNING: i32 = 4;
    pub const NOTICE: i32 = 5;
    pub const INFO: i32 = 6;
    pub const DEBUG: i32 = 7;
}

// ── AccessUnit ───────────────────────────────────────────────────

/// One compressed video payload as delivered by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessUnit {
    pub data: Bytes,
    /// Presentation timestamp, passed through to decoded frames.
    pub pts: i64,
}

// ── NtpReference ─────────────────────────────────────────────────

/// Sender and receiver wall clocks sampled when a unit arrived, both in
/// microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NtpReference {
    pub remote_micros: u64,
    pub local_micros: u64,
}

impl NtpReference {
    /// Receiver clock minus sender clock.
    pub fn offset_micros(&self) -> i64 {
        self.local_micros as i64 - self.remote_micros as i64
    }
}

// ── Traits ───────────────────────────────────────────────────────

/// Callback table registered with an endpoint.
///
/// Invoked synchronously on the endpoint's delivery thread; a slow
/// implementation stalls delivery for the whole session.
pub trait EndpointEvents: Send + Sync {
    fn on_connection_init(&self) {}

    fn on_connection_destroy(&self) {}

    fn on_video_access_unit(&self, ntp: &NtpReference, unit: &AccessUnit);

    /// `severity` uses the scale in [`severity`].
    fn on_log(&self, severity: i32, message: &str);
}

/// A connection-accepting protocol endpoint.
pub trait ProtocolEndpoint: Send {
    /// Give the endpoint access to the device identity it advertises.
    fn set_discovery(&mut self, advertiser: &dyn ServiceAdvertiser);

    /// Bind and start accepting. Returns the bound port.
    fn start(&mut self) -> Result<u16, EndpointError>;

    /// Stop accepting and close every connection. Idempotent.
    fn stop(&mut self);

    /// Liveness as reported by the endpoint itself, when it can tell.
    fn is_running(&self) -> Option<bool> {
        None
    }

    /// Release the endpoint.
    fn destroy(self: Box<Self>) {}
}

/// Creates protocol endpoints.
pub trait EndpointFactory: Send + Sync {
    fn init(
        &self,
        max_connections: usize,
        events: Arc<dyn EndpointEvents>,
    ) -> Result<Box<dyn ProtocolEndpoint>, EndpointError>;
}
