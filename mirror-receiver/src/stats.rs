//! Frame counting and throughput reporting.
//!
//! [`FrameStats`] is shared between the session's delivery thread, which
//! calls [`record`](FrameStats::record) once per frame, and the main
//! task, which reads a [`Summary`] on exit.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use mirror_core::VideoFrame;
use tracing::info;

/// Snapshot of the counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub frames: u64,
    pub bytes: u64,
    pub elapsed: Duration,
    /// Geometry of the most recent frame.
    pub last_size: Option<(u32, u32)>,
}

impl Summary {
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.frames as f64 / secs } else { 0.0 }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {:.1} fps, {} bytes in {:.1}s",
            self.frames,
            self.fps(),
            self.bytes,
            self.elapsed.as_secs_f64()
        )?;
        if let Some((w, h)) = self.last_size {
            write!(f, ", last frame {w}x{h}")?;
        }
        Ok(())
    }
}

pub struct FrameStats {
    report_every: u64,
    frames: AtomicU64,
    bytes: AtomicU64,
    /// Arrival time of the first frame, and the latest geometry.
    timing: Mutex<Timing>,
}

#[derive(Default)]
struct Timing {
    first_frame: Option<Instant>,
    last_size: Option<(u32, u32)>,
}

impl FrameStats {
    /// `report_every = 0` disables periodic reports.
    pub fn new(report_every: u64) -> Self {
        Self {
            report_every,
            frames: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            timing: Mutex::new(Timing::default()),
        }
    }

    /// Count one decoded frame, logging a progress line every
    /// `report_every` frames.
    pub fn record(&self, frame: &VideoFrame) {
        self.bytes.fetch_add(frame.byte_len() as u64, Ordering::Relaxed);
        let count = self.frames.fetch_add(1, Ordering::Relaxed) + 1;

        if let Ok(mut timing) = self.timing.lock() {
            timing.first_frame.get_or_insert_with(Instant::now);
            timing.last_size = Some((frame.width, frame.height));
        }

        if self.report_every > 0 && count % self.report_every == 0 {
            info!(pts = frame.pts, "{}", self.summary());
        }
    }

    pub fn summary(&self) -> Summary {
        let (elapsed, last_size) = match self.timing.lock() {
            Ok(timing) => (
                timing.first_frame.map(|t| t.elapsed()).unwrap_or_default(),
                timing.last_size,
            ),
            Err(_) => (Duration::ZERO, None),
        };
        Summary {
            frames: self.frames.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            elapsed,
            last_size,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
