//! Byte-level helpers for the protocol boundary.
//!
//! Fixed-width integer and float extraction at arbitrary offsets, plus
//! conversion between the 8-byte NTP wire timestamp and microseconds
//! since the Unix epoch.
//!
//! ## NTP layout
//!
//! ```text
//! seconds:   u32 BE (4)   seconds since 1900-01-01
//! fraction:  u32 BE (4)   binary fraction of a second (1 / 2^32)
//! ```
//!
//! All readers require `offset + width <= buf.len()` and panic on an
//! out-of-range slice access otherwise.

use std::time::{SystemTime, UNIX_EPOCH};

// ── Constants ────────────────────────────────────────────────────

/// Seconds between 1900-01-01 (NTP epoch) and 1970-01-01 (Unix epoch).
pub const SECONDS_FROM_1900_TO_1970: u64 = 2_208_988_800;

/// Encoded size of an NTP timestamp.
pub const NTP_TIMESTAMP_LEN: usize = 8;

const MICROS_PER_SECOND: u64 = 1_000_000;

// ── Little-endian readers ────────────────────────────────────────

pub fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(array4(buf, offset))
}

pub fn read_u64_le(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(array8(buf, offset))
}

/// IEEE-754 single precision stored little-endian.
pub fn read_f32_le(buf: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32_le(buf, offset))
}

// ── Big-endian readers ───────────────────────────────────────────

pub fn read_u16_be(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

pub fn read_u32_be(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(array4(buf, offset))
}

pub fn read_u64_be(buf: &[u8], offset: usize) -> u64 {
    u64::from_be_bytes(array8(buf, offset))
}

// ── Writers ──────────────────────────────────────────────────────

/// Write `value` least-significant byte first.
pub fn write_u32_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_u32_be(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

// ── NTP conversion ───────────────────────────────────────────────

/// Read an NTP timestamp at `offset` and return microseconds since the
/// Unix epoch.
///
/// Timestamps before 1970 wrap, matching the unsigned arithmetic of the
/// wire format.
pub fn decode_ntp_to_micros(buf: &[u8], offset: usize) -> u64 {
    let seconds = u64::from(read_u32_be(buf, offset)).wrapping_sub(SECONDS_FROM_1900_TO_1970);
    let fraction = u64::from(read_u32_be(buf, offset + 4));
    seconds
        .wrapping_mul(MICROS_PER_SECOND)
        .wrapping_add((fraction * MICROS_PER_SECOND) >> 32)
}

/// Write `micros` (since the Unix epoch) as an NTP timestamp at `offset`.
///
/// The seconds field is truncated to 32 bits; the fraction is truncated
/// towards zero, so a round trip may lose up to one microsecond.
pub fn encode_micros_to_ntp(buf: &mut [u8], offset: usize, micros: u64) {
    let seconds = micros / MICROS_PER_SECOND + SECONDS_FROM_1900_TO_1970;
    let residual = micros % MICROS_PER_SECOND;
    let fraction = (residual << 32) / MICROS_PER_SECOND;

    write_u32_be(buf, offset, seconds as u32);
    write_u32_be(buf, offset + 4, fraction as u32);
}

/// Current wall-clock time in microseconds since the Unix epoch.
///
/// Returns 0 if the system clock reads before 1970.
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

// ── Internal ─────────────────────────────────────────────────────

fn array4(buf: &[u8], offset: usize) -> [u8; 4] {
    [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]]
}

fn array8(buf: &[u8], offset: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&buf[offset..offset + 8]);
    out
}

// ── Tests ────────────────────────────────────────────────────────
