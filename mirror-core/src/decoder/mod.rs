//! Video decoding.
//!
//! The codec itself is an opaque capability: a [`DecoderFactory`]
//! registered in a [`CodecRegistry`] hands out [`VideoDecoder`]
//! contexts. [`DecodePipeline`] drives one context for the lifetime of
//! a session.
//!
//! | Module     | Purpose                                           |
//! |------------|---------------------------------------------------|
//! | `frame`    | Decoded picture type shared with the application  |
//! | `pipeline` | Access unit in, zero or more shared frames out    |
//! | `ffmpeg`   | libavcodec H.264 backend (feature `ffmpeg`)       |

pub mod frame;
pub mod pipeline;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::DecodeError;

pub use frame::{FrameView, PixelFormat, Plane, PlaneView, SharedFrame, VideoFrame};
pub use pipeline::DecodePipeline;

// ── CodecId ──────────────────────────────────────────────────────

/// Compressed video formats a decoder can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    H264,
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H264 => write!(f, "H.264"),
        }
    }
}

// ── DecoderOptions ───────────────────────────────────────────────

/// Parameters applied when a decoder context is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Prefer output latency over reordering depth.
    pub low_latency: bool,
}

// ── Traits ───────────────────────────────────────────────────────

/// A streaming decoder context.
///
/// The context buffers internally: one packet may yield zero, one or
/// several frames, and frames may lag the packets that produced them.
pub trait VideoDecoder: Send {
    /// Open the context. Called exactly once before any packet.
    fn open(&mut self, options: &DecoderOptions) -> Result<(), DecodeError>;

    /// Feed one compressed access unit.
    fn send_packet(&mut self, data: &[u8], pts: i64) -> Result<(), DecodeError>;

    /// Pull the next ready frame, if any.
    ///
    /// The returned view borrows the decoder's internal buffer and is
    /// only valid until the next call on this context.
    fn receive_frame(&mut self) -> Result<Option<FrameView<'_>>, DecodeError>;
}

/// Locates and allocates decoder contexts for one codec.
pub trait DecoderFactory: Send + Sync {
    /// Codec handled by this factory.
    fn codec(&self) -> CodecId;

    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// Allocate an unopened decoder context.
    fn alloc_context(&self) -> Result<Box<dyn VideoDecoder>, DecodeError>;
}

// ── CodecRegistry ────────────────────────────────────────────────

/// Decoders available to the runtime, keyed by codec.
#[derive(Clone)]
pub struct CodecRegistry {
    decoders: HashMap<CodecId, Arc<dyn DecoderFactory>>,
}

impl CodecRegistry {
    /// A registry with no decoders.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register `factory`, replacing any previous decoder for its codec.
    pub fn register(&mut self, factory: Arc<dyn DecoderFactory>) -> &mut Self {
        self.decoders.insert(factory.codec(), factory);
        self
    }

    /// Look up the decoder registered for `codec`.
    pub fn find_decoder(&self, codec: CodecId) -> Option<Arc<dyn DecoderFactory>> {
        self.decoders.get(&codec).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl Default for CodecRegistry {
    /// The decoders compiled into this build.
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();
        #[cfg(feature = "ffmpeg")]
        {
            if ffmpeg::FfmpegH264Factory::available() {
                registry.register(Arc::new(ffmpeg::FfmpegH264Factory));
            }
        }
        registry
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.decoders.iter().map(|(codec, factory)| (codec, factory.name())))
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
