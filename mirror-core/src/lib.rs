//! # mirror-core
//!
//! Receiver-side session for screen mirroring.
//!
//! This crate contains:
//! - **Session**: `MirrorSession` wires a decoder, a protocol endpoint and a
//!   service advertiser together with all-or-nothing startup
//! - **Decoder**: `DecodePipeline` turns H.264 access units into frames
//!   through a pluggable `VideoDecoder` (FFmpeg behind the `ffmpeg` feature)
//! - **Endpoint**: `ProtocolEndpoint` capability plus a TCP feed endpoint
//!   framed by `FeedCodec`
//! - **Discovery**: `ServiceAdvertiser` capability plus an in-process
//!   advertiser that builds the primary and companion records
//! - **Timestamp**: NTP ⇄ microsecond conversion and byte-order readers
//! - **Error**: typed, `thiserror`-based errors per layer

pub mod config;
pub mod decoder;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod session;
pub mod timestamp;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use config::{FrameCallback, HardwareAddress, LogCallback, SessionConfig};
pub use decoder::{
    CodecId, CodecRegistry, DecodePipeline, DecoderFactory, DecoderOptions, FrameView,
    PixelFormat, Plane, PlaneView, SharedFrame, VideoDecoder, VideoFrame,
};
pub use discovery::{
    AdvertiserFactory, COMPANION_SERVICE, DiscoveryRecord, LocalAdvertiserFactory,
    PRIMARY_SERVICE, ServiceAdvertiser,
};
pub use endpoint::{
    AccessUnit, EndpointEvents, EndpointFactory, FeedCodec, FeedEndpointFactory, FeedPacket,
    NtpReference, ProtocolEndpoint,
};
pub use error::{DecodeError, DiscoveryError, EndpointError, SessionError};
pub use session::{Backends, LogLevel, MirrorSession, RunState, SessionPhase};
