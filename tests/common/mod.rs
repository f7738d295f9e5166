//! Shared test utilities

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use beacon_enclosure::{AudioData, Config, Connectivity, Frame, PairingStatus};

/// Connectivity answer controlled by the test
#[derive(Default)]
pub struct FakeNet {
    connected: AtomicBool,
    checks: AtomicUsize,
}

impl FakeNet {
    pub fn new(connected: bool) -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(connected),
            checks: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connectivity for FakeNet {
    async fn is_connected(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.connected.load(Ordering::SeqCst)
    }
}

/// Pairing flag controlled by the test
#[derive(Default)]
pub struct FakePairing(AtomicBool);

impl FakePairing {
    pub fn new(paired: bool) -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(paired)))
    }

    pub fn set(&self, paired: bool) {
        self.0.store(paired, Ordering::SeqCst);
    }
}

impl PairingStatus for FakePairing {
    fn has_been_paired(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Config rooted in `dir` with every delay shortened for tests
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.identity_path = dir.join("identity2.json");
    config.enclosure.resources_dir = dir.join("ui");
    config.enclosure.framebuffer = dir.join("fb0");
    config.enclosure.startup_delay = Duration::ZERO;
    config.enclosure.onboarding_pause = Duration::ZERO;
    config.enclosure.speech_start_timeout = Duration::from_millis(200);
    config.enclosure.speech_end_timeout = Duration::from_secs(2);
    config
}

/// Write a distinct payload for every frame into the resources dir
pub fn write_frames(config: &Config) {
    let dir = &config.enclosure.resources_dir;
    std::fs::create_dir_all(dir).expect("failed to create resources dir");
    for frame in [Frame::WifiConnect, Frame::ChooseNetwork, Frame::WifiSuccess] {
        std::fs::write(dir.join(frame.file_name()), frame_bytes(frame))
            .expect("failed to write frame");
    }
}

/// Payload written for `frame` by [`write_frames`]
pub fn frame_bytes(frame: Frame) -> Vec<u8> {
    let mut bytes = frame.file_name().as_bytes().to_vec();
    bytes.extend((0..=255_u8).cycle().take(4096));
    bytes
}

/// Serve `router` on an ephemeral local port
pub async fn spawn_server(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test server");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server failed");
    });
    addr
}

/// Half a second of 440 Hz tone
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn tone(sample_rate: u32) -> AudioData {
    let count = sample_rate as usize / 2;
    let samples = (0..count)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (8000.0 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()) as i16
        })
        .collect();
    AudioData::new(samples, sample_rate)
}

/// Sample rate declared in a WAV header
pub fn wav_rate(wav: &[u8]) -> u32 {
    hound::WavReader::new(std::io::Cursor::new(wav))
        .expect("not a wav")
        .spec()
        .sample_rate
}
