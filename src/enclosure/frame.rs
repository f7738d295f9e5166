//! Framebuffer drawing

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::Result;

/// Pre-rendered frames shown during Wi-Fi setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Prompt to join the device's access point
    WifiConnect,
    /// A client joined the access point; choose a network
    ChooseNetwork,
    /// The device joined the chosen network
    WifiSuccess,
}

impl Frame {
    /// Resource file name of this frame
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::WifiConnect => "0-wifi-connect.fb",
            Self::ChooseNetwork => "2-wifi-choose-network.fb",
            Self::WifiSuccess => "3-wifi-success.fb",
        }
    }

    /// Parse a frame from its short name (`connect`, `choose-network`, `success`)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "connect" | "wifi-connect" => Some(Self::WifiConnect),
            "choose-network" | "choose" => Some(Self::ChooseNetwork),
            "success" | "wifi-success" => Some(Self::WifiSuccess),
            _ => None,
        }
    }
}

/// Writes frames from a resource directory to a framebuffer device
#[derive(Debug, Clone)]
pub struct FrameWriter {
    resources_dir: PathBuf,
    device: PathBuf,
}

impl FrameWriter {
    #[must_use]
    pub const fn new(resources_dir: PathBuf, device: PathBuf) -> Self {
        Self {
            resources_dir,
            device,
        }
    }

    /// Path of a frame's resource file
    #[must_use]
    pub fn resource_path(&self, frame: Frame) -> PathBuf {
        self.resources_dir.join(frame.file_name())
    }

    /// Draw `frame` to the device
    ///
    /// # Errors
    ///
    /// Returns error if the resource cannot be read or the device written
    pub async fn draw(&self, frame: Frame) -> Result<()> {
        let path = self.resource_path(frame);
        draw_file(&path, &self.device).await?;
        tracing::info!(frame = ?frame, device = %self.device.display(), "frame drawn");
        Ok(())
    }
}

/// Copy `file_path` verbatim to the framebuffer device `dev`
///
/// # Errors
///
/// Returns error if the file cannot be read or the device cannot be written
pub async fn draw_file(file_path: &Path, dev: &Path) -> Result<()> {
    let image = tokio::fs::read(file_path).await?;

    let mut fb = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dev)
        .await?;
    fb.write_all(&image).await?;
    fb.flush().await?;

    tracing::debug!(
        src = %file_path.display(),
        dev = %dev.display(),
        bytes = image.len(),
        "wrote frame"
    );
    Ok(())
}
