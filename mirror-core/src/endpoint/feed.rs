//! TCP feed endpoint.
//!
//! A minimal protocol endpoint for senders that push pre-framed access
//! units (see [`codec`](crate::endpoint::codec)). It owns one worker
//! thread running a current-thread Tokio runtime, so every callback for
//! a session is delivered from that single thread.
//!
//! The listener is bound synchronously in [`start`](FeedEndpoint::start)
//! so the caller learns the port before any sender can connect.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinSet;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::discovery::ServiceAdvertiser;
use crate::endpoint::{
    EndpointEvents, EndpointFactory, FeedCodec, NtpReference, ProtocolEndpoint, severity,
};
use crate::error::EndpointError;
use crate::timestamp::now_micros;

// ── FeedEndpointFactory ──────────────────────────────────────────

/// Creates [`FeedEndpoint`]s bound to `addr:port` (port 0 = ephemeral).
#[derive(Debug, Clone)]
pub struct FeedEndpointFactory {
    pub addr: IpAddr,
    pub port: u16,
    pub max_payload: usize,
}

impl Default for FeedEndpointFactory {
    fn default() -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            max_payload: super::codec::MAX_FEED_PAYLOAD,
        }
    }
}

impl EndpointFactory for FeedEndpointFactory {
    fn init(
        &self,
        max_connections: usize,
        events: Arc<dyn EndpointEvents>,
    ) -> Result<Box<dyn ProtocolEndpoint>, EndpointError> {
        if max_connections == 0 {
            return Err("max_connections must be at least 1".into());
        }
        Ok(Box::new(FeedEndpoint {
            bind: SocketAddr::new(self.addr, self.port),
            max_connections,
            max_payload: self.max_payload,
            events,
            identity: None,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }))
    }
}

// ── FeedEndpoint ─────────────────────────────────────────────────

pub struct FeedEndpoint {
    bind: SocketAddr,
    max_connections: usize,
    max_payload: usize,
    events: Arc<dyn EndpointEvents>,
    /// `name (hw addr)` of the advertised device, once known.
    identity: Option<String>,
    running: Arc<AtomicBool>,
    worker: Option<Worker>,
}

struct Worker {
    shutdown: watch::Sender<bool>,
    thread: JoinHandle<()>,
}

/// State shared by every task on the worker thread.
struct WorkerContext {
    events: Arc<dyn EndpointEvents>,
    identity: String,
    max_connections: usize,
    max_payload: usize,
}

impl WorkerContext {
    fn log(&self, level: i32, message: &str) {
        debug!(severity = level, "{message}");
        self.events.on_log(level, message);
    }
}

impl ProtocolEndpoint for FeedEndpoint {
    fn set_discovery(&mut self, advertiser: &dyn ServiceAdvertiser) {
        let hw = advertiser
            .hw_addr()
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":");
        self.identity = Some(format!("{} ({hw})", advertiser.name()));
    }

    fn start(&mut self) -> Result<u16, EndpointError> {
        if self.worker.is_some() {
            return Err(EndpointError::AlreadyStarted);
        }

        let listener = StdTcpListener::bind(self.bind)?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let ctx = Arc::new(WorkerContext {
            events: Arc::clone(&self.events),
            identity: self.identity.clone().unwrap_or_else(|| "unnamed device".into()),
            max_connections: self.max_connections,
            max_payload: self.max_payload,
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let running = Arc::clone(&self.running);

        running.store(true, Ordering::SeqCst);
        let spawned = std::thread::Builder::new()
            .name(format!("mirror-feed-{port}"))
            .spawn(move || {
                runtime.block_on(serve(listener, ctx, shutdown_rx));
                running.store(false, Ordering::SeqCst);
            });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        info!("feed endpoint listening on port {port}");
        self.worker = Some(Worker {
            shutdown: shutdown_tx,
            thread,
        });
        Ok(port)
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.shutdown.send(true);
        if worker.thread.join().is_err() {
            warn!("feed worker panicked during shutdown");
        }
        self.running.store(false, Ordering::SeqCst);
        info!("feed endpoint stopped");
    }

    fn is_running(&self) -> Option<bool> {
        Some(self.running.load(Ordering::SeqCst))
    }
}

impl Drop for FeedEndpoint {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Worker ───────────────────────────────────────────────────────

async fn serve(
    listener: StdTcpListener,
    ctx: Arc<WorkerContext>,
    mut shutdown: watch::Receiver<bool>,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(l) => l,
        Err(e) => {
            ctx.log(severity::ERROR, &format!("cannot register listener: {e}"));
            return;
        }
    };

    let slots = Arc::new(Semaphore::new(ctx.max_connections));
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        ctx.log(severity::WARNING, &format!("accept error: {e}"));
                        continue;
                    }
                };
                let Ok(permit) = Arc::clone(&slots).try_acquire_owned() else {
                    ctx.log(
                        severity::WARNING,
                        &format!("rejecting {peer}: {} connections already open", ctx.max_connections),
                    );
                    continue;
                };
                connections.spawn(handle_connection(stream, peer, Arc::clone(&ctx), permit));
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    connections.shutdown().await;
}

/// Fires `on_connection_destroy` however the connection task ends,
/// including abort on shutdown.
struct ConnectionGuard {
    events: Arc<dyn EndpointEvents>,
}

impl ConnectionGuard {
    fn open(events: &Arc<dyn EndpointEvents>) -> Self {
        events.on_connection_init();
        Self {
            events: Arc::clone(events),
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.events.on_connection_destroy();
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<WorkerContext>,
    _permit: OwnedSemaphorePermit,
) {
    let _guard = ConnectionGuard::open(&ctx.events);
    ctx.log(
        severity::INFO,
        &format!("{peer} connected to {}", ctx.identity),
    );

    let mut frames = FramedRead::new(stream, FeedCodec::with_max_payload(ctx.max_payload));
    while let Some(result) = frames.next().await {
        match result {
            Ok(packet) => {
                let ntp = NtpReference {
                    remote_micros: packet.sent_at_micros,
                    local_micros: now_micros(),
                };
                ctx.events.on_video_access_unit(&ntp, &packet.unit);
            }
            Err(e) => {
                ctx.log(severity::ERROR, &format!("closing {peer}: {e}"));
                break;
            }
        }
    }

    ctx.log(severity::INFO, &format!("{peer} disconnected"));
}

// ── Tests ────────────────────────────────────────────────────────
