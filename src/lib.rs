//! Beacon Enclosure - framebuffer and connectivity handling for voice devices
//!
//! This library provides:
//! - The enclosure event router (Wi-Fi setup frames, offline notices, first-boot onboarding)
//! - A message bus abstraction with an in-process bus and a websocket client
//! - The speech-to-text factory with its pairing gate and default fallback
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Message Bus                        │
//! │   system.wifi.*  │  enclosure.notify.*  │  speak    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Enclosure Router                      │
//! │   Frames  │  Debounced notices  │  Onboarding       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │      Framebuffer  │  Connectivity  │  Identity       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod bus;
pub mod config;
pub mod dialog;
pub mod enclosure;
pub mod error;
pub mod identity;
pub mod net;
pub mod stt;

pub use bus::{BusClient, LocalBus, Message, MessageBus};
pub use config::Config;
pub use enclosure::{EnclosureContext, EnclosureRouter, Frame};
pub use error::{Error, Result};
pub use identity::{IdentityFile, PairingStatus};
pub use net::{Connectivity, NetworkChecker};
pub use stt::{AudioData, StrategyKind, Stt, SttStrategy};
