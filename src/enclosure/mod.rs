//! Enclosure event router
//!
//! Reacts to Wi-Fi setup events by drawing pre-rendered frames to the
//! framebuffer, and tells the user when the device is offline.
//!
//! Handlers run one at a time from [`EnclosureRouter::run`], which owns the
//! debounce state. Handler errors are logged and the loop keeps going.

pub mod bootstrap;
mod frame;
mod notify;

pub use frame::{Frame, FrameWriter, draw_file};
pub use notify::{NOT_CONNECTED_UTTERANCE, NoInternetNotifier, Notice};

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::Result;
use crate::bus::{Message, MessageBus, events};
use crate::config::{Config, EnclosureConfig};
use crate::dialog::DialogRenderer;
use crate::identity::PairingStatus;
use crate::net::Connectivity;

/// Collaborators shared by the router and the bootstrap task
#[derive(Clone)]
pub struct EnclosureContext {
    pub bus: Arc<dyn MessageBus>,
    pub net: Arc<dyn Connectivity>,
    pub pairing: Arc<dyn PairingStatus>,
    pub dialogs: DialogRenderer,
    pub lang: String,
    pub config: EnclosureConfig,
}

impl EnclosureContext {
    /// Build a context from configuration and injected collaborators
    #[must_use]
    pub fn new(
        config: &Config,
        bus: Arc<dyn MessageBus>,
        net: Arc<dyn Connectivity>,
        pairing: Arc<dyn PairingStatus>,
    ) -> Self {
        Self {
            bus,
            net,
            pairing,
            dialogs: DialogRenderer::new(config.enclosure.dialog_dir.clone(), &config.lang),
            lang: config.lang.clone(),
            config: config.enclosure.clone(),
        }
    }
}

/// Dispatches bus events to the enclosure handlers
pub struct EnclosureRouter {
    ctx: EnclosureContext,
    frames: FrameWriter,
    notifier: NoInternetNotifier,
    rx: broadcast::Receiver<Message>,
}

impl EnclosureRouter {
    /// Create a router; it is subscribed to the bus from this point on
    #[must_use]
    pub fn new(ctx: EnclosureContext) -> Self {
        let frames = FrameWriter::new(
            ctx.config.resources_dir.clone(),
            ctx.config.framebuffer.clone(),
        );
        let notifier = NoInternetNotifier::new(ctx.config.notify_window);
        let rx = ctx.bus.subscribe();

        Self {
            ctx,
            frames,
            notifier,
            rx,
        }
    }

    /// Startup check: schedule onboarding if the device is offline
    pub async fn start(&self) -> Option<JoinHandle<()>> {
        if self.ctx.net.is_connected().await {
            return None;
        }
        tracing::info!(
            delay = ?self.ctx.config.startup_delay,
            "offline at startup, scheduling network check"
        );
        Some(bootstrap::schedule(self.ctx.clone()))
    }

    /// Dispatch messages until the bus closes
    pub async fn run(mut self) {
        loop {
            let message = match self.rx.recv().await {
                Ok(message) => message,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "enclosure fell behind the bus");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            if let Err(e) = self.handle(&message).await {
                tracing::error!(
                    msg_type = %message.msg_type,
                    error = %e,
                    "enclosure handler failed"
                );
            }
        }
        tracing::info!("message bus closed, enclosure router stopping");
    }

    /// Handle one message; unrelated event types are ignored
    ///
    /// # Errors
    ///
    /// Returns error if a frame cannot be drawn or a notice cannot be emitted
    pub async fn handle(&mut self, message: &Message) -> Result<()> {
        match message.msg_type.as_str() {
            events::NO_INTERNET => self.on_no_internet().await,
            events::AP_UP => self.on_ap_up().await,
            events::AP_DEVICE_CONNECTED => self.on_device_connected().await,
            events::AP_DEVICE_DISCONNECTED => self.on_ap_disconnected().await,
            events::AP_CONNECTION_SUCCESS => self.on_ap_success().await,
            _ => Ok(()),
        }
    }

    /// Access point is up
    ///
    /// # Errors
    ///
    /// Returns error if the frame cannot be drawn
    pub async fn on_ap_up(&self) -> Result<()> {
        tracing::info!("wifi access point up");
        self.frames.draw(Frame::WifiConnect).await
    }

    /// A client joined the access point
    ///
    /// # Errors
    ///
    /// Returns error if the frame cannot be drawn
    pub async fn on_device_connected(&self) -> Result<()> {
        tracing::info!("client connected to access point");
        self.frames.draw(Frame::ChooseNetwork).await
    }

    /// The client left the access point; back to the connect prompt
    ///
    /// # Errors
    ///
    /// Returns error if the frame cannot be drawn
    pub async fn on_ap_disconnected(&self) -> Result<()> {
        tracing::info!("client disconnected from access point");
        self.frames.draw(Frame::WifiConnect).await
    }

    /// The device joined the selected network
    ///
    /// # Errors
    ///
    /// Returns error if the frame cannot be drawn
    pub async fn on_ap_success(&self) -> Result<()> {
        tracing::info!("wifi connection established");
        self.frames.draw(Frame::WifiSuccess).await
    }

    /// Something reported lost connectivity
    ///
    /// # Errors
    ///
    /// Returns error if the notice cannot be emitted
    pub async fn on_no_internet(&mut self) -> Result<()> {
        // One last check in case the connection came back
        let connected = self.ctx.net.is_connected().await;
        let paired = !connected && self.ctx.pairing.has_been_paired();

        let Some(notice) = self
            .notifier
            .decide(Instant::now(), connected, paired, &self.ctx.lang)
        else {
            return Ok(());
        };

        tracing::info!(?notice, "notifying user of missing internet connection");
        self.ctx.bus.emit(notice.into_message())
    }

    /// Debounce state, for inspection
    #[must_use]
    pub const fn notifier(&self) -> &NoInternetNotifier {
        &self.notifier
    }
}
