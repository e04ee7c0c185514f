//! # mirror-receiver — Screen-Mirroring Receiver
//!
//! Runs one [`mirror_core::MirrorSession`] in the foreground: the
//! session listens for a sender, decodes its H.264 stream and hands
//! every frame to a [`stats::FrameStats`] counter that reports progress
//! through `tracing`.
//!
//! Settings come from a TOML file ([`config::ReceiverConfig`]) with
//! command-line overrides for the device identity.

pub mod config;
pub mod stats;
