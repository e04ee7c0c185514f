//! Endpoint callback table for a session.
//!
//! Routes access units through the decode pipeline and on to the
//! application, and maps endpoint log severities onto [`LogLevel`].
//! Everything here runs on the endpoint's delivery thread.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::config::{FrameCallback, LogCallback, SessionConfig};
use crate::decoder::DecodePipeline;
use crate::decoder::pipeline::PipelineStats;
use crate::endpoint::{AccessUnit, EndpointEvents, NtpReference};
use crate::session::LogLevel;

pub(crate) struct SessionRouter {
    pipeline: Mutex<DecodePipeline>,
    on_video: Option<FrameCallback>,
    on_log: Option<LogCallback>,
}

impl SessionRouter {
    pub(crate) fn new(pipeline: DecodePipeline, config: &SessionConfig) -> Self {
        Self {
            pipeline: Mutex::new(pipeline),
            on_video: config.on_video_data.clone(),
            on_log: config.log_callback.clone(),
        }
    }

    fn pipeline(&self) -> MutexGuard<'_, DecodePipeline> {
        self.pipeline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Release the decoder. Later access units decode to nothing.
    pub(crate) fn shutdown_decoder(&self) {
        self.pipeline().shutdown();
    }

    pub(crate) fn decoder_active(&self) -> bool {
        self.pipeline().is_initialized()
    }

    pub(crate) fn stats(&self) -> PipelineStats {
        self.pipeline().stats()
    }
}

impl EndpointEvents for SessionRouter {
    fn on_connection_init(&self) {
        debug!("sender connection opened");
    }

    fn on_connection_destroy(&self) {
        debug!("sender connection closed");
    }

    fn on_video_access_unit(&self, ntp: &NtpReference, unit: &AccessUnit) {
        let frames = self.pipeline().submit(&unit.data, unit.pts);
        trace!(
            pts = unit.pts,
            clock_offset_us = ntp.offset_micros(),
            frames = frames.len(),
            "access unit decoded"
        );

        let Some(callback) = &self.on_video else {
            return;
        };
        for frame in frames {
            callback(frame, unit.pts);
        }
    }

    fn on_log(&self, severity: i32, message: &str) {
        if let Some(callback) = &self.on_log {
            callback(LogLevel::from_endpoint_severity(severity), message);
        }
    }
}
