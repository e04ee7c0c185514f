//! Access units in, decoded frames out.
//!
//! A [`DecodePipeline`] owns exactly one decoder context for its whole
//! life. Bad packets are expected on a live network link: they are
//! dropped and counted, never reported as errors.

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::decoder::{CodecId, CodecRegistry, DecoderOptions, SharedFrame, VideoDecoder};
use crate::error::SessionError;

// ── PipelineStats ────────────────────────────────────────────────

/// Counters since the pipeline was initialised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Access units handed to [`DecodePipeline::submit`].
    pub packets_submitted: u64,
    /// Access units rejected (empty, or refused by the decoder).
    pub packets_dropped: u64,
    /// Frames produced across all submissions.
    pub frames_decoded: u64,
}

// ── DecodePipeline ───────────────────────────────────────────────

/// Drives a single decoder context.
///
/// `submit` takes `&mut self`, so concurrent submissions are ruled out
/// by ownership; the session serialises access behind a mutex.
pub struct DecodePipeline {
    codec: CodecId,
    backend: String,
    context: Option<Box<dyn VideoDecoder>>,
    stats: PipelineStats,
}

impl DecodePipeline {
    /// Locate a decoder for `codec`, allocate its context and open it.
    pub fn initialize(
        registry: &CodecRegistry,
        codec: CodecId,
        options: DecoderOptions,
    ) -> Result<Self, SessionError> {
        let factory = registry
            .find_decoder(codec)
            .ok_or(SessionError::DecoderUnavailable(codec))?;

        let mut context = factory
            .alloc_context()
            .map_err(SessionError::DecoderAllocFailed)?;

        context
            .open(&options)
            .map_err(|source| SessionError::DecoderOpenFailed { codec, source })?;

        info!(
            "{codec} decoder `{}` opened (low_latency={})",
            factory.name(),
            options.low_latency
        );

        Ok(Self {
            codec,
            backend: factory.name().to_string(),
            context: Some(context),
            stats: PipelineStats::default(),
        })
    }

    /// Feed one access unit and drain every frame the decoder is ready
    /// to emit.
    ///
    /// Each frame is copied out of the decoder before the next one is
    /// pulled. Returns an empty vector for empty input, for a packet
    /// the decoder refuses, or when the decoder is still buffering.
    pub fn submit(&mut self, access_unit: &[u8], pts: i64) -> Vec<SharedFrame> {
        let mut frames = Vec::new();
        let Some(context) = self.context.as_mut() else {
            return frames;
        };

        self.stats.packets_submitted += 1;

        if access_unit.is_empty() {
            self.stats.packets_dropped += 1;
            return frames;
        }

        if let Err(e) = context.send_packet(access_unit, pts) {
            debug!("dropping access unit (pts={pts}, {} bytes): {e}", access_unit.len());
            self.stats.packets_dropped += 1;
            return frames;
        }

        loop {
            match context.receive_frame() {
                Ok(Some(view)) => frames.push(Arc::new(view.to_frame())),
                Ok(None) => break,
                Err(e) => {
                    debug!("decoder error while draining (pts={pts}): {e}");
                    break;
                }
            }
        }

        self.stats.frames_decoded += frames.len() as u64;
        trace!("pts={pts}: {} frame(s)", frames.len());
        frames
    }

    /// Release the decoder context. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.context.take().is_some() {
            debug!("{} decoder `{}` released", self.codec, self.backend);
        }
    }

    /// Whether the decoder context is still held.
    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn codec(&self) -> CodecId {
        self.codec
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }
}

impl Drop for DecodePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Tests ────────────────────────────────────────────────────────
