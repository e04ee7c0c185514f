//! mirror-receiver — entry point.
//!
//! ```text
//! mirror-receiver                    Run with mirror-receiver.toml (or defaults)
//! mirror-receiver --config <path>    Load a custom config TOML
//! mirror-receiver --gen-config       Write default config to stdout
//! mirror-receiver --name <name>      Override the advertised name
//! mirror-receiver --hw-addr <addr>   Override the hardware address
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use mirror_core::{Backends, HardwareAddress, LogLevel, MirrorSession, SessionError};
use mirror_receiver::config::ReceiverConfig;
use mirror_receiver::stats::FrameStats;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mirror-receiver", about = "Screen-mirroring receiver")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "mirror-receiver.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Name to advertise (overrides the config file).
    #[arg(long)]
    name: Option<String>,

    /// Hardware address, e.g. 48:5D:60:7C:EE:22 (overrides the config file).
    #[arg(long)]
    hw_addr: Option<HardwareAddress>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", ReceiverConfig::default_toml()?);
        return Ok(());
    }

    let (mut config, fallback) = ReceiverConfig::load(&cli.config);
    if let Some(name) = cli.name {
        config.device.name = name;
    }
    if let Some(hw_addr) = cli.hw_addr {
        config.device.hw_addr = hw_addr;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("mirror-receiver v{}", env!("CARGO_PKG_VERSION"));
    match &fallback {
        Some(reason) => warn!("{reason}"),
        None => info!("config: {}", cli.config.display()),
    }
    info!("device: {} ({})", config.device.name, config.device.hw_addr);

    let stats = Arc::new(FrameStats::new(config.stats.report_every));
    let sink = Arc::clone(&stats);
    let session_config = config
        .to_session_config()
        .on_video_data(move |frame, _pts| sink.record(&frame))
        .on_log(forward_log);

    let backends = Backends {
        endpoint: Arc::new(config.to_endpoint_factory()),
        ..Backends::default()
    };

    let mut session = match MirrorSession::with_backends(session_config, backends) {
        Ok(session) => session,
        Err(e) => {
            error!("cannot start session: {e}");
            if let Some(hint) = startup_hint(&e) {
                error!("{hint}");
            }
            return Err(e.into());
        }
    };
    session.start();
    info!("listening on port {}, waiting for a sender", session.port());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            _ = ticker.tick() => {
                if !session.is_running() {
                    warn!("session stopped running");
                    break;
                }
            }
        }
    }

    session.stop();
    // Joins the endpoint thread.
    tokio::task::block_in_place(|| session.shutdown());

    info!("final: {}", stats.summary());
    Ok(())
}

/// Extra advice for startup failures the user can fix at build time.
fn startup_hint(err: &SessionError) -> Option<&'static str> {
    match err {
        SessionError::DecoderUnavailable(_) if !cfg!(feature = "ffmpeg") => Some(
            "this build has no H.264 decoder; rebuild with `cargo build --features ffmpeg`",
        ),
        _ => None,
    }
}

/// Forward session log events into tracing.
fn forward_log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Error => error!(target: "mirror::endpoint", "{message}"),
        LogLevel::Warning => warn!(target: "mirror::endpoint", "{message}"),
        LogLevel::Info => info!(target: "mirror::endpoint", "{message}"),
        LogLevel::Debug => debug!(target: "mirror::endpoint", "{message}"),
    }
}

// ── Tests ────────────────────────────────────────────────────────
