//! Integration tests — session startup and rollback, teardown order and
//! frame delivery, against scripted capabilities and over a real TCP
//! feed connection on localhost.

use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;

use mirror_core::{
    AccessUnit, AdvertiserFactory, Backends, CodecId, CodecRegistry, DecodeError,
    DecoderFactory, DecoderOptions, DiscoveryError, EndpointError, EndpointEvents,
    EndpointFactory, FeedCodec, FeedEndpointFactory, FeedPacket, FrameView, LocalAdvertiserFactory,
    LogLevel, MirrorSession, NtpReference, PixelFormat, Plane, ProtocolEndpoint, RunState,
    ServiceAdvertiser, SessionConfig, SessionError, SessionPhase, VideoDecoder, VideoFrame,
};

const TIMEOUT: Duration = Duration::from_secs(5);
const SCRIPTED_PORT: u16 = 7000;

// ── Journal ──────────────────────────────────────────────────────

/// Ordered record of every capability call made by a session.
#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    fn position(&self, entry: &str) -> usize {
        self.entries()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("`{entry}` never happened: {:?}", self.entries()))
    }
}

// ── Scripted decoder ─────────────────────────────────────────────

/// Every non-empty packet decodes to one 2x2 frame. Packets starting
/// with `0xFF` are refused.
struct ScriptedDecoder {
    journal: Journal,
    pending: Option<VideoFrame>,
    current: Option<VideoFrame>,
}

impl VideoDecoder for ScriptedDecoder {
    fn open(&mut self, _options: &DecoderOptions) -> Result<(), DecodeError> {
        self.journal.push("decoder.open");
        Ok(())
    }

    fn send_packet(&mut self, data: &[u8], pts: i64) -> Result<(), DecodeError> {
        if data.first() == Some(&0xFF) {
            return Err(DecodeError::InvalidData("corrupt access unit".into()));
        }
        self.pending = Some(VideoFrame {
            width: 2,
            height: 2,
            format: PixelFormat::Yuv420p,
            planes: vec![Plane {
                stride: 2,
                data: vec![data[0]; 4],
            }],
            pts,
        });
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Option<FrameView<'_>>, DecodeError> {
        match self.pending.take() {
            Some(frame) => {
                self.current = Some(frame);
                Ok(self.current.as_ref().map(VideoFrame::view))
            }
            None => Ok(None),
        }
    }
}

impl Drop for ScriptedDecoder {
    fn drop(&mut self) {
        self.journal.push("decoder.release");
    }
}

struct ScriptedDecoderFactory {
    journal: Journal,
    fail_alloc: bool,
}

impl DecoderFactory for ScriptedDecoderFactory {
    fn codec(&self) -> CodecId {
        CodecId::H264
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn alloc_context(&self) -> Result<Box<dyn VideoDecoder>, DecodeError> {
        if self.fail_alloc {
            return Err(DecodeError::Alloc("no memory".into()));
        }
        self.journal.push("decoder.alloc");
        Ok(Box::new(ScriptedDecoder {
            journal: self.journal.clone(),
            pending: None,
            current: None,
        }))
    }
}

// ── Scripted endpoint ────────────────────────────────────────────

#[derive(Default)]
struct ScriptedEndpointFactory {
    journal: Journal,
    fail_init: bool,
    fail_start: bool,
    /// Liveness reported by every endpoint this factory creates.
    alive: Arc<AtomicBool>,
    /// Callback table handed over by the last session.
    events: Mutex<Option<Arc<dyn EndpointEvents>>>,
}

impl ScriptedEndpointFactory {
    fn events(&self) -> Arc<dyn EndpointEvents> {
        self.events.lock().unwrap().clone().expect("no endpoint initialised")
    }
}

impl EndpointFactory for ScriptedEndpointFactory {
    fn init(
        &self,
        max_connections: usize,
        events: Arc<dyn EndpointEvents>,
    ) -> Result<Box<dyn ProtocolEndpoint>, EndpointError> {
        if self.fail_init {
            return Err("scripted init failure".into());
        }
        self.journal.push(format!("endpoint.init:{max_connections}"));
        *self.events.lock().unwrap() = Some(events);
        Ok(Box::new(ScriptedEndpoint {
            journal: self.journal.clone(),
            fail_start: self.fail_start,
            alive: Arc::clone(&self.alive),
        }))
    }
}

struct ScriptedEndpoint {
    journal: Journal,
    fail_start: bool,
    alive: Arc<AtomicBool>,
}

impl ProtocolEndpoint for ScriptedEndpoint {
    fn set_discovery(&mut self, advertiser: &dyn ServiceAdvertiser) {
        self.journal
            .push(format!("endpoint.set_discovery:{}", advertiser.name()));
    }

    fn start(&mut self) -> Result<u16, EndpointError> {
        if self.fail_start {
            return Err(EndpointError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "scripted bind failure",
            )));
        }
        self.journal.push("endpoint.start");
        self.alive.store(true, Ordering::SeqCst);
        Ok(SCRIPTED_PORT)
    }

    fn stop(&mut self) {
        self.journal.push("endpoint.stop");
        self.alive.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> Option<bool> {
        Some(self.alive.load(Ordering::SeqCst))
    }

    fn destroy(self: Box<Self>) {
        self.journal.push("endpoint.destroy");
    }
}

// ── Scripted advertiser ──────────────────────────────────────────

#[derive(Default)]
struct ScriptedAdvertiserFactory {
    journal: Journal,
    fail_init: bool,
    fail_primary: bool,
    fail_companion: bool,
}

impl AdvertiserFactory for ScriptedAdvertiserFactory {
    fn init(&self, name: &str, hw_addr: &[u8]) -> Result<Box<dyn ServiceAdvertiser>, DiscoveryError> {
        if self.fail_init {
            return Err(DiscoveryError::LibNotFound);
        }
        self.journal.push("advertiser.init");
        Ok(Box::new(ScriptedAdvertiser {
            journal: self.journal.clone(),
            name: name.to_string(),
            hw_addr: hw_addr.to_vec(),
            fail_primary: self.fail_primary,
            fail_companion: self.fail_companion,
        }))
    }
}

struct ScriptedAdvertiser {
    journal: Journal,
    name: String,
    hw_addr: Vec<u8>,
    fail_primary: bool,
    fail_companion: bool,
}

impl ServiceAdvertiser for ScriptedAdvertiser {
    fn register_primary(&mut self, port: u16) -> Result<(), DiscoveryError> {
        if self.fail_primary {
            return Err(DiscoveryError::Registration(-65537));
        }
        self.journal.push(format!("advertiser.register_primary:{port}"));
        Ok(())
    }

    fn register_companion(&mut self, port: u16) -> Result<(), DiscoveryError> {
        if self.fail_companion {
            return Err(DiscoveryError::Registration(-65540));
        }
        self.journal.push(format!("advertiser.register_companion:{port}"));
        Ok(())
    }

    fn unregister_primary(&mut self) {
        self.journal.push("advertiser.unregister_primary");
    }

    fn unregister_companion(&mut self) {
        self.journal.push("advertiser.unregister_companion");
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn hw_addr(&self) -> &[u8] {
        &self.hw_addr
    }

    fn destroy(self: Box<Self>) {
        self.journal.push("advertiser.destroy");
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// All three capabilities scripted and sharing one journal.
struct Harness {
    journal: Journal,
    fail_alloc: bool,
    endpoint: Arc<ScriptedEndpointFactory>,
    advertiser: ScriptedAdvertiserFactory,
}

impl Harness {
    fn new() -> Self {
        let journal = Journal::default();
        Self {
            endpoint: Arc::new(ScriptedEndpointFactory {
                journal: journal.clone(),
                ..Default::default()
            }),
            advertiser: ScriptedAdvertiserFactory {
                journal: journal.clone(),
                ..Default::default()
            },
            fail_alloc: false,
            journal,
        }
    }

    fn endpoint_mut(&mut self) -> &mut ScriptedEndpointFactory {
        Arc::get_mut(&mut self.endpoint).expect("endpoint factory shared")
    }

    fn codecs(&self) -> CodecRegistry {
        let mut codecs = CodecRegistry::empty();
        codecs.register(Arc::new(ScriptedDecoderFactory {
            journal: self.journal.clone(),
            fail_alloc: self.fail_alloc,
        }));
        codecs
    }

    fn backends(&mut self) -> Backends {
        let advertiser = std::mem::take(&mut self.advertiser);
        self.advertiser = ScriptedAdvertiserFactory {
            journal: self.journal.clone(),
            ..Default::default()
        };
        Backends {
            codecs: self.codecs(),
            endpoint: Arc::clone(&self.endpoint) as Arc<dyn EndpointFactory>,
            advertiser: Arc::new(advertiser),
        }
    }

    fn build(&mut self, config: SessionConfig) -> Result<MirrorSession, SessionError> {
        let backends = self.backends();
        MirrorSession::with_backends(config, backends)
    }
}

fn unit(data: &'static [u8], pts: i64) -> AccessUnit {
    AccessUnit {
        data: Bytes::from_static(data),
        pts,
    }
}

fn ntp() -> NtpReference {
    NtpReference {
        remote_micros: 0,
        local_micros: 0,
    }
}

/// Assert every acquired resource was released exactly once.
fn assert_released_once(journal: &Journal) {
    for entry in [
        "decoder.release",
        "endpoint.destroy",
        "advertiser.destroy",
    ] {
        let expected = usize::from(journal.entries().iter().any(|e| {
            let acquired = match entry {
                "decoder.release" => "decoder.alloc",
                "endpoint.destroy" => "endpoint.init",
                _ => "advertiser.init",
            };
            e.starts_with(acquired)
        }));
        assert_eq!(journal.count(entry), expected, "{entry}: {:?}", journal.entries());
    }
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn test_startup_order_and_ports() {
    let mut harness = Harness::new();
    let session = harness
        .build(SessionConfig::new("Living Room").with_max_connections(4))
        .unwrap();

    assert_eq!(session.phase(), SessionPhase::Active);
    assert_eq!(session.port(), SCRIPTED_PORT);
    assert_eq!(
        harness.journal.entries(),
        vec![
            "decoder.alloc",
            "decoder.open",
            "endpoint.init:4",
            "advertiser.init",
            "endpoint.set_discovery:Living Room",
            "endpoint.start",
            "advertiser.register_primary:7000",
            "advertiser.register_companion:7001",
        ]
    );
}

#[test]
fn test_missing_decoder_fails_before_anything_else() {
    let config = SessionConfig::default();
    let backends = Backends {
        codecs: CodecRegistry::empty(),
        ..Harness::new().backends()
    };

    let err = MirrorSession::with_backends(config, backends).unwrap_err();
    assert!(matches!(err, SessionError::DecoderUnavailable(CodecId::H264)));
}

#[test]
fn test_decoder_alloc_failure() {
    let mut harness = Harness::new();
    harness.fail_alloc = true;

    let err = harness.build(SessionConfig::default()).unwrap_err();
    assert!(matches!(err, SessionError::DecoderAllocFailed(_)));
    assert!(harness.journal.entries().is_empty());
}

#[test]
fn test_endpoint_init_failure_releases_decoder() {
    let mut harness = Harness::new();
    harness.endpoint_mut().fail_init = true;

    let err = harness.build(SessionConfig::default()).unwrap_err();
    assert!(matches!(err, SessionError::EndpointInit(_)));
    assert_eq!(harness.journal.count("decoder.release"), 1);
    assert_released_once(&harness.journal);
}

#[test]
fn test_advertiser_init_failure_rolls_back() {
    let mut harness = Harness::new();
    harness.advertiser.fail_init = true;

    let err = harness.build(SessionConfig::default()).unwrap_err();
    assert!(matches!(err, SessionError::AdvertiserInit(DiscoveryError::LibNotFound)));
    assert_eq!(harness.journal.count("endpoint.stop"), 0);
    assert_eq!(harness.journal.count("endpoint.destroy"), 1);
    assert_released_once(&harness.journal);
}

#[test]
fn test_bind_failure_rolls_back_without_stop() {
    let mut harness = Harness::new();
    harness.endpoint_mut().fail_start = true;

    let err = harness.build(SessionConfig::default()).unwrap_err();
    assert!(matches!(err, SessionError::EndpointBind(_)));
    assert_eq!(harness.journal.count("endpoint.stop"), 0);
    assert_released_once(&harness.journal);
}

#[test]
fn test_primary_registration_failure_rolls_back() {
    let mut harness = Harness::new();
    harness.advertiser.fail_primary = true;

    let err = harness.build(SessionConfig::default()).unwrap_err();
    match err {
        SessionError::RegisterPrimary { port, .. } => assert_eq!(port, SCRIPTED_PORT),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.journal.count("endpoint.stop"), 1);
    assert_eq!(harness.journal.count("advertiser.unregister_primary"), 0);
    assert_released_once(&harness.journal);
}

#[test]
fn test_companion_registration_failure_withdraws_primary() {
    let mut harness = Harness::new();
    harness.advertiser.fail_companion = true;

    let err = harness.build(SessionConfig::default()).unwrap_err();
    match err {
        SessionError::RegisterCompanion { port, .. } => assert_eq!(port, SCRIPTED_PORT + 1),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.journal.count("endpoint.stop"), 1);
    assert_eq!(harness.journal.count("advertiser.unregister_primary"), 1);
    assert_eq!(harness.journal.count("advertiser.unregister_companion"), 0);
    assert_released_once(&harness.journal);
}

#[test]
fn test_local_advertiser_publishes_both_records() {
    let backends = Backends {
        advertiser: Arc::new(LocalAdvertiserFactory),
        ..Harness::new().backends()
    };
    assert!(matches!(
        LocalAdvertiserFactory.init("x", &[1, 2, 3]),
        Err(DiscoveryError::HwAddrLen(3))
    ));

    let session = MirrorSession::with_backends(SessionConfig::default(), backends).unwrap();
    let records = session.discovery_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].port, SCRIPTED_PORT);
    assert_eq!(records[1].port, SCRIPTED_PORT + 1);
    assert_eq!(records[1].txt_value("deviceid"), Some("48:5D:60:7C:EE:22"));
}

// ── Running flag ─────────────────────────────────────────────────

#[test]
fn test_is_running_follows_start_stop_and_endpoint() {
    let mut harness = Harness::new();
    let session = harness.build(SessionConfig::default()).unwrap();

    assert_eq!(session.run_state(), RunState::NotStarted);
    assert!(!session.is_running());

    session.start();
    assert!(session.is_running());

    // Endpoint died on its own.
    harness.endpoint.alive.store(false, Ordering::SeqCst);
    assert!(!session.is_running());
    harness.endpoint.alive.store(true, Ordering::SeqCst);
    assert!(session.is_running());

    session.stop();
    assert_eq!(session.run_state(), RunState::Stopped);
    assert!(!session.is_running());

    session.start();
    assert!(session.is_running());
}

// ── Teardown ─────────────────────────────────────────────────────

#[test]
fn test_teardown_order() {
    let mut harness = Harness::new();
    let mut session = harness.build(SessionConfig::default()).unwrap();
    session.start();
    session.shutdown();

    assert_eq!(session.phase(), SessionPhase::Destroyed);
    assert!(!session.is_running());
    assert!(session.decoder_stats().is_none());

    let j = &harness.journal;
    assert!(j.position("endpoint.stop") < j.position("endpoint.destroy"));
    assert!(j.position("endpoint.destroy") < j.position("advertiser.unregister_primary"));
    assert!(j.position("advertiser.unregister_primary") < j.position("advertiser.unregister_companion"));
    assert!(j.position("advertiser.unregister_companion") < j.position("advertiser.destroy"));
    assert!(j.position("advertiser.destroy") < j.position("decoder.release"));

    // Second shutdown and the drop after it release nothing twice.
    session.shutdown();
    drop(session);
    assert_eq!(j.count("endpoint.stop"), 1);
    assert_released_once(j);
}

#[test]
fn test_drop_tears_down() {
    let mut harness = Harness::new();
    let session = harness.build(SessionConfig::default()).unwrap();
    drop(session);

    assert_eq!(harness.journal.count("endpoint.stop"), 1);
    assert_eq!(harness.journal.count("advertiser.unregister_companion"), 1);
    assert_released_once(&harness.journal);
}

#[test]
fn test_start_after_shutdown_is_ignored() {
    let mut harness = Harness::new();
    let mut session = harness.build(SessionConfig::default()).unwrap();
    session.shutdown();
    session.start();
    assert_eq!(session.run_state(), RunState::Stopped);
}

// ── Delivery ─────────────────────────────────────────────────────

#[test]
fn test_access_unit_delivers_frame_with_pts() {
    let (tx, rx) = mpsc::channel();
    let config = SessionConfig::default().on_video_data(move |frame, pts| {
        tx.send((Arc::downgrade(&frame), frame.width, frame.pts, pts)).unwrap();
    });

    let mut harness = Harness::new();
    let session = harness.build(config).unwrap();
    let events = harness.endpoint.events();

    events.on_video_access_unit(&ntp(), &unit(b"\x01\x02", 90_000));

    let (weak, width, frame_pts, pts): (Weak<VideoFrame>, _, _, _) = rx.try_recv().unwrap();
    assert_eq!(width, 2);
    assert_eq!(pts, 90_000);
    assert_eq!(frame_pts, 90_000);
    // The callback kept no reference, so the frame is already gone.
    assert!(weak.upgrade().is_none());

    let stats = session.decoder_stats().unwrap();
    assert_eq!(stats.packets_submitted, 1);
    assert_eq!(stats.frames_decoded, 1);
}

#[test]
fn test_frame_outlives_callback_when_retained() {
    let kept = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&kept);
    let config = SessionConfig::default().on_video_data(move |frame, _| {
        sink.lock().unwrap().push(frame);
    });

    let mut harness = Harness::new();
    let _session = harness.build(config).unwrap();
    let events = harness.endpoint.events();
    events.on_video_access_unit(&ntp(), &unit(b"\x07", 1));

    let frames = kept.lock().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].planes[0].data, vec![7; 4]);
}

#[test]
fn test_bad_access_units_are_dropped_silently() {
    let (tx, rx) = mpsc::channel::<i64>();
    let config = SessionConfig::default().on_video_data(move |_, pts| {
        tx.send(pts).unwrap();
    });

    let mut harness = Harness::new();
    let session = harness.build(config).unwrap();
    let events = harness.endpoint.events();

    events.on_video_access_unit(&ntp(), &unit(b"", 1));
    events.on_video_access_unit(&ntp(), &unit(b"\xFF\x00", 2));
    events.on_video_access_unit(&ntp(), &unit(b"\x01", 3));

    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![3]);
    let stats = session.decoder_stats().unwrap();
    assert_eq!(stats.packets_submitted, 3);
    assert_eq!(stats.packets_dropped, 2);
}

#[test]
fn test_no_video_callback_still_decodes() {
    let mut harness = Harness::new();
    let session = harness.build(SessionConfig::default()).unwrap();
    harness
        .endpoint
        .events()
        .on_video_access_unit(&ntp(), &unit(b"\x01", 1));
    assert_eq!(session.decoder_stats().unwrap().frames_decoded, 1);
}

#[test]
fn test_access_unit_after_shutdown_decodes_nothing() {
    let (tx, rx) = mpsc::channel::<i64>();
    let config = SessionConfig::default().on_video_data(move |_, pts| {
        let _ = tx.send(pts);
    });

    let mut harness = Harness::new();
    let mut session = harness.build(config).unwrap();
    let events = harness.endpoint.events();
    session.shutdown();

    events.on_video_access_unit(&ntp(), &unit(b"\x01", 1));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_log_severity_mapping_through_session() {
    let (tx, rx) = mpsc::channel();
    let config = SessionConfig::default().on_log(move |level, message| {
        tx.send((level, message.to_string())).unwrap();
    });

    let mut harness = Harness::new();
    let _session = harness.build(config).unwrap();
    let events = harness.endpoint.events();

    for severity in [0, 3, 4, 5, 6, 7, 42] {
        events.on_log(severity, &format!("s{severity}"));
    }

    let got: Vec<_> = rx.try_iter().collect();
    assert_eq!(
        got,
        vec![
            (LogLevel::Error, "s0".to_string()),
            (LogLevel::Error, "s3".to_string()),
            (LogLevel::Warning, "s4".to_string()),
            (LogLevel::Info, "s5".to_string()),
            (LogLevel::Info, "s6".to_string()),
            (LogLevel::Debug, "s7".to_string()),
            (LogLevel::Info, "s42".to_string()),
        ]
    );
}

// ── Feed endpoint over TCP ───────────────────────────────────────

fn loopback_feed(max_payload: usize) -> Backends {
    Backends {
        codecs: Harness::new().codecs(),
        endpoint: Arc::new(FeedEndpointFactory {
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            max_payload,
        }),
        advertiser: Arc::new(LocalAdvertiserFactory),
    }
}

fn encode(data: &'static [u8], pts: i64) -> BytesMut {
    let mut buf = BytesMut::new();
    FeedCodec::default()
        .encode(
            FeedPacket {
                sent_at_micros: mirror_core::timestamp::now_micros(),
                unit: unit(data, pts),
            },
            &mut buf,
        )
        .unwrap();
    buf
}

/// Wait for a log line at `level` containing `needle`.
fn wait_for_log(rx: &mpsc::Receiver<(LogLevel, String)>, level: LogLevel, needle: &str) {
    loop {
        let (got, message) = rx
            .recv_timeout(TIMEOUT)
            .unwrap_or_else(|_| panic!("no {level} log containing `{needle}`"));
        if got == level && message.contains(needle) {
            return;
        }
    }
}

#[test]
fn test_feed_end_to_end() {
    let (tx, rx) = mpsc::channel();
    let config = SessionConfig::new("Feed Test").on_video_data(move |frame, pts| {
        let _ = tx.send((frame.planes[0].data[0], pts));
    });

    let mut session =
        MirrorSession::with_backends(config, loopback_feed(1024)).unwrap();
    session.start();
    assert!(session.is_running());

    let records = session.discovery_records();
    assert_eq!(records[0].port, session.port());
    assert_eq!(records[1].port, session.port().wrapping_add(1));

    let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, session.port())).unwrap();
    let mut wire = encode(b"\x11\x00", 100);
    wire.extend_from_slice(&encode(b"\x22\x00", 200));
    stream.write_all(&wire).unwrap();

    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), (0x11, 100));
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), (0x22, 200));

    session.shutdown();
    assert!(!session.is_running());
}

#[test]
fn test_feed_oversized_payload_closes_connection() {
    let (tx, rx) = mpsc::channel();
    let config = SessionConfig::default().on_log(move |level, message| {
        let _ = tx.send((level, message.to_string()));
    });

    let session = MirrorSession::with_backends(config, loopback_feed(4)).unwrap();
    let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, session.port())).unwrap();
    stream.write_all(&encode(b"\x01\x02\x03\x04\x05\x06", 1)).unwrap();

    wait_for_log(&rx, LogLevel::Error, "closing");
    wait_for_log(&rx, LogLevel::Info, "disconnected");
}

#[test]
fn test_feed_connection_limit() {
    let (tx, rx) = mpsc::channel();
    let config = SessionConfig::default()
        .with_max_connections(1)
        .on_log(move |level, message| {
            let _ = tx.send((level, message.to_string()));
        });

    let session = MirrorSession::with_backends(config, loopback_feed(1024)).unwrap();

    let _first = TcpStream::connect((Ipv4Addr::LOCALHOST, session.port())).unwrap();
    wait_for_log(&rx, LogLevel::Info, "connected");

    let _second = TcpStream::connect((Ipv4Addr::LOCALHOST, session.port())).unwrap();
    wait_for_log(&rx, LogLevel::Warning, "rejecting");
}
