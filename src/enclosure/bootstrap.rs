//! First-boot connectivity check and onboarding

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::EnclosureContext;
use super::notify::Notice;
use crate::Result;
use crate::bus::{self, Message, events};
use crate::config::EnclosureConfig;

/// Dialog spoken at the start of onboarding
pub const INTRO_DIALOG: &str = "mycroft.intro";

const INTRO_FALLBACK: &str = "Hello, I'm your new voice assistant. \
     Before we get started I need to connect to the Internet. \
     Let's set up your wifi.";

/// Spoken at boot by a paired device that is offline
pub const BOOT_NOT_CONNECTED_UTTERANCE: &str = "This unit is not connected to the Internet. \
     Either plug in a network cable or set up your wifi connection.";

/// Run [`net_check`] after the configured startup delay
///
/// The delay gives the other assistant services time to join the bus so the
/// prompts are actually heard.
pub fn schedule(ctx: EnclosureContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(ctx.config.startup_delay).await;
        if let Err(e) = net_check(&ctx).await {
            tracing::error!(error = %e, "startup network check failed");
        }
    })
}

/// Check connectivity and prompt the user if the device is offline
///
/// A paired device only gets a spoken warning. On first boot the microphone
/// is muted until pairing completes, the intro is spoken, and guided Wi-Fi
/// setup is requested once playback finishes.
///
/// # Errors
///
/// Returns error if a bus message cannot be emitted
pub async fn net_check(ctx: &EnclosureContext) -> Result<()> {
    tracing::info!("checking internet connection");
    if ctx.net.is_connected().await {
        tracing::debug!("connected, nothing to do");
        return Ok(());
    }

    if ctx.pairing.has_been_paired() {
        ctx.bus.emit(Message::speak(BOOT_NOT_CONNECTED_UTTERANCE))?;
        return Ok(());
    }

    tracing::info!("first boot without network, starting onboarding");

    // No listening during the out-of-box experience
    ctx.bus.emit(Message::new(events::MIC_MUTE))?;

    let unmute_bus = Arc::clone(&ctx.bus);
    drop(bus::once(ctx.bus.as_ref(), events::PAIRED, move |_| {
        tracing::info!("pairing complete, unmuting microphone");
        if let Err(e) = unmute_bus.emit(Message::new(events::MIC_UNMUTE)) {
            tracing::warn!(error = %e, "failed to unmute microphone");
        }
    }));

    let mut rx = ctx.bus.subscribe();
    let intro = ctx.dialogs.get(INTRO_DIALOG, INTRO_FALLBACK);
    ctx.bus.emit(Message::speak(&intro))?;
    wait_while_speaking(&mut rx, &ctx.config).await;

    tokio::time::sleep(ctx.config.onboarding_pause).await;

    let setup = Notice::WifiSetup {
        allow_timeout: Some(false),
        lang: ctx.lang.clone(),
    };
    ctx.bus.emit(setup.into_message())?;
    Ok(())
}

/// Block until the audio service reports the current utterance finished
///
/// Returns early if playback never starts within the start timeout.
async fn wait_while_speaking(rx: &mut broadcast::Receiver<Message>, config: &EnclosureConfig) {
    if bus::wait_for(rx, events::AUDIO_OUTPUT_START, Some(config.speech_start_timeout))
        .await
        .is_none()
    {
        tracing::debug!("no speech playback observed");
        return;
    }

    if bus::wait_for(rx, events::AUDIO_OUTPUT_END, Some(config.speech_end_timeout))
        .await
        .is_none()
    {
        tracing::warn!("speech playback did not finish in time");
    }
}
