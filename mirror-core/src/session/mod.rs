//! Session manager.
//!
//! Brings up the decode pipeline, the protocol endpoint and the service
//! advertiser in a fixed order, and tears them down in reverse:
//!
//! 1. open the H.264 decode pipeline
//! 2. initialise the protocol endpoint with the session's callback table
//! 3. initialise the service advertiser with name and hardware address
//! 4. start the endpoint on an ephemeral port
//! 5. publish the primary record at `port` and the companion at `port + 1`
//!
//! Construction either returns an `Active` session or fails after
//! releasing every step that had already succeeded. The session spawns
//! no threads of its own; frames are decoded and delivered on the
//! endpoint's thread.

mod level;
mod phase;
mod resources;
mod router;

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::decoder::pipeline::PipelineStats;
use crate::decoder::{CodecId, CodecRegistry, DecodePipeline, DecoderOptions};
use crate::discovery::{AdvertiserFactory, DiscoveryRecord, LocalAdvertiserFactory};
use crate::endpoint::{EndpointEvents, EndpointFactory, FeedEndpointFactory};
use crate::error::SessionError;

pub use level::LogLevel;
pub use phase::SessionPhase;

use resources::SessionResources;
use router::SessionRouter;

// ── Backends ─────────────────────────────────────────────────────

/// The external capabilities a session is built from.
#[derive(Clone)]
pub struct Backends {
    pub codecs: CodecRegistry,
    pub endpoint: Arc<dyn EndpointFactory>,
    pub advertiser: Arc<dyn AdvertiserFactory>,
}

impl Default for Backends {
    /// Compiled-in decoders, the TCP feed endpoint on an ephemeral port
    /// and the in-process advertiser.
    fn default() -> Self {
        Self {
            codecs: CodecRegistry::default(),
            endpoint: Arc::new(FeedEndpointFactory::default()),
            advertiser: Arc::new(LocalAdvertiserFactory),
        }
    }
}

// ── RunState ─────────────────────────────────────────────────────

/// Locally tracked running flag toggled by `start` / `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    NotStarted = 0,
    Running = 1,
    Stopped = 2,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopped,
            _ => Self::NotStarted,
        }
    }
}

// ── MirrorSession ────────────────────────────────────────────────

/// A mirroring receiver session.
///
/// # Lifetime
///
/// The endpoint is already listening when construction returns.
/// [`start`](Self::start) and [`stop`](Self::stop) only toggle the flag
/// reported by [`is_running`](Self::is_running); halting delivery takes
/// [`shutdown`](Self::shutdown) or dropping the session, which blocks
/// until every resource has been released.
pub struct MirrorSession {
    config: SessionConfig,
    phase: SessionPhase,
    run_state: AtomicU8,
    port: u16,
    resources: SessionResources,
}

impl MirrorSession {
    /// Build a session on the default [`Backends`].
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        Self::with_backends(config, Backends::default())
    }

    /// Build a session on explicit capabilities.
    pub fn with_backends(config: SessionConfig, backends: Backends) -> Result<Self, SessionError> {
        let mut phase = SessionPhase::default();
        phase.begin_initialize()?;

        match Self::acquire(&config, &backends) {
            Ok((resources, port)) => {
                phase.activate()?;
                info!("session `{}` active on port {port}", config.name);
                Ok(Self {
                    config,
                    phase,
                    run_state: AtomicU8::new(RunState::NotStarted as u8),
                    port,
                    resources,
                })
            }
            Err(e) => {
                warn!("session `{}` failed to start: {e}", config.name);
                Err(e)
            }
        }
    }

    /// Steps 1–5. An early return drops `resources`, which unwinds
    /// whatever was acquired so far.
    fn acquire(
        config: &SessionConfig,
        backends: &Backends,
    ) -> Result<(SessionResources, u16), SessionError> {
        let mut resources = SessionResources::default();

        let pipeline = DecodePipeline::initialize(
            &backends.codecs,
            CodecId::H264,
            DecoderOptions {
                low_latency: config.low_latency,
            },
        )?;
        let router = Arc::new(SessionRouter::new(pipeline, config));
        resources.router = Some(Arc::clone(&router));

        let events: Arc<dyn EndpointEvents> = router;
        let endpoint = backends
            .endpoint
            .init(config.max_connections, events)
            .map_err(SessionError::EndpointInit)?;
        let endpoint = resources.endpoint.insert(endpoint);

        let advertiser = backends
            .advertiser
            .init(&config.name, config.hw_addr.as_bytes())
            .map_err(SessionError::AdvertiserInit)?;
        let advertiser = resources.advertiser.insert(advertiser);

        endpoint.set_discovery(&**advertiser);

        let port = endpoint.start().map_err(SessionError::EndpointBind)?;
        resources.endpoint_started = true;

        advertiser
            .register_primary(port)
            .map_err(|source| SessionError::RegisterPrimary { port, source })?;
        resources.primary_registered = true;

        let companion_port = port.wrapping_add(1);
        advertiser
            .register_companion(companion_port)
            .map_err(|source| SessionError::RegisterCompanion {
                port: companion_port,
                source,
            })?;
        resources.companion_registered = true;

        Ok((resources, port))
    }

    // ── Running flag ─────────────────────────────────────────────

    pub fn start(&self) {
        if !self.phase.is_active() {
            warn!("start ignored: session is {}", self.phase);
            return;
        }
        self.run_state.store(RunState::Running as u8, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.run_state.store(RunState::Stopped as u8, Ordering::SeqCst);
    }

    pub fn run_state(&self) -> RunState {
        RunState::from_u8(self.run_state.load(Ordering::SeqCst))
    }

    /// `true` while started and the endpoint (when it can tell) reports
    /// itself alive.
    pub fn is_running(&self) -> bool {
        if self.run_state() != RunState::Running {
            return false;
        }
        match &self.resources.endpoint {
            Some(endpoint) => endpoint.is_running().unwrap_or(true),
            None => false,
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Port the endpoint is bound to. The companion record uses `port + 1`.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Records currently published by the advertiser.
    pub fn discovery_records(&self) -> Vec<DiscoveryRecord> {
        self.resources
            .advertiser
            .as_ref()
            .map(|a| a.records())
            .unwrap_or_default()
    }

    /// Decode counters, or `None` once the decoder has been released.
    pub fn decoder_stats(&self) -> Option<PipelineStats> {
        self.resources
            .router
            .as_ref()
            .filter(|r| r.decoder_active())
            .map(|r| r.stats())
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Stop and release everything. Blocks until the endpoint has shut
    /// down. Calling it again is a no-op.
    pub fn shutdown(&mut self) {
        if self.phase.begin_stop().is_err() {
            return;
        }
        self.stop();
        info!("session `{}` shutting down", self.config.name);
        self.resources.release();
        debug_assert!(self.resources.is_empty());
        // Stopping → Destroyed cannot fail.
        let _ = self.phase.finish();
    }
}

impl Drop for MirrorSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for MirrorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorSession")
            .field("name", &self.config.name)
            .field("phase", &self.phase)
            .field("run_state", &self.run_state())
            .field("port", &self.port)
            .finish()
    }
}
