//! Decoded picture types.
//!
//! A [`VideoFrame`] is always independently owned: the pipeline copies
//! every picture out of the decoder before handing it on, and wraps it
//! in a [`SharedFrame`] so the pipeline and the application can hold it
//! at the same time. The buffer is released when the last `Arc` drops.

use std::sync::Arc;

/// Reference-counted decoded frame delivered to the application.
pub type SharedFrame = Arc<VideoFrame>;

// ── PixelFormat ──────────────────────────────────────────────────

/// Memory layout of the decoded planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar Y, U, V with 2x2 chroma subsampling.
    Yuv420p,
    /// Y plane followed by an interleaved UV plane.
    Nv12,
    /// Any layout this crate does not interpret.
    Other,
}

// ── Plane ────────────────────────────────────────────────────────

/// One image plane: `stride` bytes per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub stride: usize,
    pub data: Vec<u8>,
}

impl Plane {
    /// Row `y` including any padding bytes.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.stride]
    }
}

// ── VideoFrame ───────────────────────────────────────────────────

/// A decoded image plus the presentation timestamp of the access unit
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub planes: Vec<Plane>,
    /// Presentation timestamp as supplied by the protocol layer.
    pub pts: i64,
}

impl VideoFrame {
    /// Total bytes held across all planes.
    pub fn byte_len(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }

    /// Borrow this frame as a [`FrameView`].
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            format: self.format,
            planes: self
                .planes
                .iter()
                .map(|p| PlaneView {
                    stride: p.stride,
                    data: &p.data,
                })
                .collect(),
            pts: self.pts,
        }
    }
}

// ── FrameView ────────────────────────────────────────────────────

/// One plane of a picture still owned by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneView<'a> {
    pub stride: usize,
    pub data: &'a [u8],
}

/// A picture still owned by the decoder, valid until the next call on
/// its context. [`to_frame`](Self::to_frame) is the only copy made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameView<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub planes: Vec<PlaneView<'a>>,
    pub pts: i64,
}

impl FrameView<'_> {
    /// Copy the picture into an independently owned [`VideoFrame`].
    pub fn to_frame(&self) -> VideoFrame {
        VideoFrame {
            width: self.width,
            height: self.height,
            format: self.format,
            planes: self
                .planes
                .iter()
                .map(|p| Plane {
                    stride: p.stride,
                    data: p.data.to_vec(),
                })
                .collect(),
            pts: self.pts,
        }
    }
}
