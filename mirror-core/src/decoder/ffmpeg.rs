//! libavcodec H.264 backend.
//!
//! Decoded pictures live in a reusable `AVFrame` owned by the context and
//! are handed out as a [`FrameView`] over its planes; the pipeline makes
//! the one owned copy.

use ffmpeg_next as ffmpeg;
use tracing::warn;

use crate::decoder::{
    CodecId, DecoderFactory, DecoderOptions, FrameView, PixelFormat, PlaneView, VideoDecoder,
};
use crate::error::DecodeError;

// ── FfmpegH264Factory ────────────────────────────────────────────

/// Registers libavcodec's native H.264 decoder.
pub struct FfmpegH264Factory;

impl FfmpegH264Factory {
    /// Whether the linked libavcodec provides an H.264 decoder.
    pub fn available() -> bool {
        if let Err(e) = ffmpeg::init() {
            warn!("ffmpeg init failed: {e}");
            return false;
        }
        ffmpeg::decoder::find(ffmpeg::codec::Id::H264).is_some()
    }
}

impl DecoderFactory for FfmpegH264Factory {
    fn codec(&self) -> CodecId {
        CodecId::H264
    }

    fn name(&self) -> &str {
        "libavcodec-h264"
    }

    fn alloc_context(&self) -> Result<Box<dyn VideoDecoder>, DecodeError> {
        ffmpeg::init().map_err(|e| DecodeError::Alloc(e.to_string()))?;
        ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Info);

        let codec = ffmpeg::decoder::find(ffmpeg::codec::Id::H264)
            .ok_or_else(|| DecodeError::Alloc("no H.264 decoder in libavcodec".into()))?;

        Ok(Box::new(FfmpegH264Decoder {
            unopened: Some(ffmpeg::codec::context::Context::new_with_codec(codec)),
            decoder: None,
            raw: ffmpeg::frame::Video::empty(),
        }))
    }
}

// ── FfmpegH264Decoder ────────────────────────────────────────────

struct FfmpegH264Decoder {
    unopened: Option<ffmpeg::codec::context::Context>,
    decoder: Option<ffmpeg::decoder::Video>,
    raw: ffmpeg::frame::Video,
}

impl VideoDecoder for FfmpegH264Decoder {
    fn open(&mut self, options: &DecoderOptions) -> Result<(), DecodeError> {
        let mut context = self
            .unopened
            .take()
            .ok_or_else(|| DecodeError::Open("context already opened".into()))?;

        if options.low_latency {
            context.set_flags(ffmpeg::codec::Flags::LOW_DELAY);
        }

        let decoder = context
            .decoder()
            .video()
            .map_err(|e| DecodeError::Open(e.to_string()))?;
        self.decoder = Some(decoder);
        Ok(())
    }

    fn send_packet(&mut self, data: &[u8], pts: i64) -> Result<(), DecodeError> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| DecodeError::Backend("decoder not opened".into()))?;

        let mut packet = ffmpeg::Packet::copy(data);
        packet.set_pts(Some(pts));
        decoder
            .send_packet(&packet)
            .map_err(|e| DecodeError::InvalidData(e.to_string()))
    }

    fn receive_frame(&mut self) -> Result<Option<FrameView<'_>>, DecodeError> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(None);
        };

        // EAGAIN, EOF and decode errors all end the drain.
        match decoder.receive_frame(&mut self.raw) {
            Ok(()) => Ok(Some(view_frame(&self.raw))),
            Err(_) => Ok(None),
        }
    }
}

fn view_frame(raw: &ffmpeg::frame::Video) -> FrameView<'_> {
    let format = match raw.format() {
        ffmpeg::format::Pixel::YUV420P | ffmpeg::format::Pixel::YUVJ420P => PixelFormat::Yuv420p,
        ffmpeg::format::Pixel::NV12 => PixelFormat::Nv12,
        _ => PixelFormat::Other,
    };

    let planes = (0..raw.planes())
        .map(|i| PlaneView {
            stride: raw.stride(i),
            data: raw.data(i),
        })
        .collect();

    FrameView {
        width: raw.width(),
        height: raw.height(),
        format,
        planes,
        pts: raw.pts().unwrap_or_default(),
    }
}
