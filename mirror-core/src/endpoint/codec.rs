//! Framing for the feed endpoint.
//!
//! ## Wire format
//!
//! ```text
//! payload_len:  u32 LE  (4)
//! sent_at:      NTP     (8)   sender wall clock, 1900 epoch, big-endian
//! pts:          i64 LE  (8)
//! payload:      [u8]    (payload_len)
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::endpoint::AccessUnit;
use crate::error::EndpointError;
use crate::timestamp::{
    NTP_TIMESTAMP_LEN, decode_ntp_to_micros, encode_micros_to_ntp, read_u32_le, read_u64_le,
    write_u32_le,
};

// ── Constants ────────────────────────────────────────────────────

/// Encoded header size.
pub const FEED_HEADER_LEN: usize = 4 + NTP_TIMESTAMP_LEN + 8;

/// Default upper bound on a single access unit.
pub const MAX_FEED_PAYLOAD: usize = 8 * 1024 * 1024;

// ── FeedPacket ───────────────────────────────────────────────────

/// One framed access unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPacket {
    /// Sender wall clock in microseconds since the Unix epoch.
    pub sent_at_micros: u64,
    pub unit: AccessUnit,
}

// ── FeedCodec ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FeedCodec {
    max_payload: usize,
}

impl FeedCodec {
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self { max_payload }
    }
}

impl Default for FeedCodec {
    fn default() -> Self {
        Self::with_max_payload(MAX_FEED_PAYLOAD)
    }
}

impl Decoder for FeedCodec {
    type Item = FeedPacket;
    type Error = EndpointError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FEED_HEADER_LEN {
            return Ok(None);
        }

        let payload_len = read_u32_le(src, 0) as usize;
        if payload_len > self.max_payload {
            return Err(EndpointError::PayloadTooLarge {
                size: payload_len,
                max: self.max_payload,
            });
        }

        let frame_len = FEED_HEADER_LEN + payload_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let sent_at_micros = decode_ntp_to_micros(src, 4);
        let pts = read_u64_le(src, 4 + NTP_TIMESTAMP_LEN) as i64;
        src.advance(FEED_HEADER_LEN);
        let data = src.split_to(payload_len).freeze();

        Ok(Some(FeedPacket {
            sent_at_micros,
            unit: AccessUnit { data, pts },
        }))
    }
}

impl Encoder<FeedPacket> for FeedCodec {
    type Error = EndpointError;

    fn encode(&mut self, item: FeedPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload_len = item.unit.data.len();
        if payload_len > self.max_payload {
            return Err(EndpointError::PayloadTooLarge {
                size: payload_len,
                max: self.max_payload,
            });
        }

        let mut header = [0u8; FEED_HEADER_LEN];
        write_u32_le(&mut header, 0, payload_len as u32);
        encode_micros_to_ntp(&mut header, 4, item.sent_at_micros);
        header[4 + NTP_TIMESTAMP_LEN..].copy_from_slice(&item.unit.pts.to_le_bytes());

        dst.reserve(FEED_HEADER_LEN + payload_len);
        dst.extend_from_slice(&header);
        dst.extend_from_slice(&item.unit.data);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
