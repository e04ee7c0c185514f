//! Error types for the mirroring session.
//!
//! Only construction can fail from the caller's point of view
//! ([`SessionError`]). Per-packet decode failures ([`DecodeError`]) are
//! absorbed by the pipeline and teardown never reports errors.

use thiserror::Error;

use crate::decoder::CodecId;

// ── SessionError ─────────────────────────────────────────────────

/// Construction-fatal failures, one variant per startup step.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No decoder for the codec is registered.
    #[error("cannot find {0} decoder")]
    DecoderUnavailable(CodecId),

    /// The decoder context could not be allocated.
    #[error("failed to allocate video decoder context: {0}")]
    DecoderAllocFailed(DecodeError),

    /// The decoder context could not be opened.
    #[error("failed to open {codec} decoder: {source}")]
    DecoderOpenFailed {
        codec: CodecId,
        #[source]
        source: DecodeError,
    },

    /// The protocol endpoint refused to initialise.
    #[error("failed to initialize protocol endpoint: {0}")]
    EndpointInit(#[source] EndpointError),

    /// The service advertiser refused to initialise.
    #[error("failed to initialize service advertiser: {0}")]
    AdvertiserInit(#[source] DiscoveryError),

    /// The protocol endpoint could not bind a listening port.
    #[error("failed to start protocol endpoint: {0}")]
    EndpointBind(#[source] EndpointError),

    /// The primary discovery record could not be published.
    #[error("failed to register primary discovery record on port {port}: {source}")]
    RegisterPrimary {
        port: u16,
        #[source]
        source: DiscoveryError,
    },

    /// The companion discovery record could not be published.
    #[error("failed to register companion discovery record on port {port}: {source}")]
    RegisterCompanion {
        port: u16,
        #[source]
        source: DiscoveryError,
    },

    /// A lifecycle transition was attempted from the wrong phase.
    #[error("invalid session transition: {0}")]
    InvalidTransition(&'static str),
}

// ── DecodeError ──────────────────────────────────────────────────

/// Errors reported by a decoder backend.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The backend could not allocate its state.
    #[error("allocation failed: {0}")]
    Alloc(String),

    /// The backend could not be opened with the given options.
    #[error("open failed: {0}")]
    Open(String),

    /// The bitstream could not be decoded.
    #[error("invalid bitstream: {0}")]
    InvalidData(String),

    /// Catch-all for backend-specific failures.
    #[error("{0}")]
    Backend(String),
}

// ── EndpointError ────────────────────────────────────────────────

/// Errors reported by a protocol endpoint.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The TCP/IO layer reported an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame declared a payload larger than the configured maximum.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// `start` was called on an endpoint that is already listening.
    #[error("endpoint already started")]
    AlreadyStarted,

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for EndpointError {
    fn from(s: &str) -> Self {
        EndpointError::Other(s.to_string())
    }
}

// ── DiscoveryError ───────────────────────────────────────────────

/// Errors reported by a service advertiser.
///
/// The numeric codes are the advertiser's native failure codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("invalid hardware address length: {0}")]
    HwAddrLen(usize),

    #[error("out of memory")]
    OutOfMemory,

    #[error("discovery library not found")]
    LibNotFound,

    #[error("discovery procedure not found")]
    ProcNotFound,

    /// Publishing a record failed with a backend status code.
    #[error("registration failed with status {0}")]
    Registration(i32),
}

impl DiscoveryError {
    /// Native failure code.
    pub fn code(&self) -> i32 {
        match self {
            Self::HwAddrLen(_) => 1,
            Self::OutOfMemory => 2,
            Self::LibNotFound => 3,
            Self::ProcNotFound => 4,
            Self::Registration(status) => *status,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
