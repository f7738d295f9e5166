//! TOML configuration file loading
//!
//! Supports `~/.config/omni/beacon/enclosure.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::SttConfig;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct EnclosureConfigFile {
    /// Language code used for dialogs and setup requests (e.g. "en-us")
    pub lang: Option<String>,

    /// Path to the device identity file
    pub identity_path: Option<String>,

    /// Message bus connection
    #[serde(default)]
    pub bus: BusFileConfig,

    /// Framebuffer and onboarding settings
    #[serde(default)]
    pub enclosure: EnclosureFileConfig,

    /// Connectivity check settings
    #[serde(default)]
    pub network: NetworkFileConfig,

    /// Backend server settings
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Speech-to-text selection and per-module settings
    pub stt: Option<SttConfig>,
}

/// Message bus configuration
#[derive(Debug, Default, Deserialize)]
pub struct BusFileConfig {
    /// Websocket URL (e.g. "ws://127.0.0.1:8181/core")
    pub url: Option<String>,
}

/// Enclosure configuration
#[derive(Debug, Default, Deserialize)]
pub struct EnclosureFileConfig {
    pub resources_dir: Option<String>,
    pub framebuffer: Option<String>,
    pub dialog_dir: Option<String>,
    pub startup_delay_secs: Option<u64>,
    pub notify_window_secs: Option<u64>,
    pub onboarding_pause_ms: Option<u64>,
    pub speech_start_timeout_secs: Option<u64>,
    pub speech_end_timeout_secs: Option<u64>,
}

/// Connectivity check configuration
#[derive(Debug, Default, Deserialize)]
pub struct NetworkFileConfig {
    /// DNS servers checked with a TCP connect (e.g. "8.8.8.8:53")
    pub dns_hosts: Option<Vec<String>>,

    /// URL fetched when no DNS server answers
    pub http_url: Option<String>,

    pub timeout_secs: Option<u64>,
}

/// Backend server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub url: Option<String>,
    pub version: Option<String>,
}

/// Load the TOML config file from `path`, or the standard path when `None`
///
/// Returns `EnclosureConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> EnclosureConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return EnclosureConfigFile::default();
    };

    if !path.exists() {
        return EnclosureConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                EnclosureConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            EnclosureConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the content is not valid TOML for this schema
pub fn parse_config_file(content: &str) -> crate::Result<EnclosureConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/omni/beacon/enclosure.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("omni")
            .join("beacon")
            .join("enclosure.toml")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let fc = parse_config_file(
            r#"
            lang = "en-gb"

            [enclosure]
            framebuffer = "/dev/fb1"
            notify_window_secs = 45

            [stt]
            module = "kaldi"

            [stt.kaldi]
            uri = "http://localhost:8080/client/dynamic/recognize"
            "#,
        )
        .unwrap();

        assert_eq!(fc.lang.as_deref(), Some("en-gb"));
        assert_eq!(fc.enclosure.framebuffer.as_deref(), Some("/dev/fb1"));
        assert_eq!(fc.enclosure.notify_window_secs, Some(45));
        assert!(fc.bus.url.is_none());

        let stt = fc.stt.unwrap();
        assert_eq!(stt.module, "kaldi");
        assert_eq!(
            stt.module_config("kaldi")["uri"],
            "http://localhost:8080/client/dynamic/recognize"
        );
    }

    #[test]
    fn empty_file_is_default() {
        let fc = parse_config_file("").unwrap();
        assert!(fc.lang.is_none());
        assert!(fc.stt.is_none());
    }

    #[test]
    fn invalid_file_is_an_error() {
        assert!(parse_config_file("lang = [").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let fc = load_config_file(Some(&dir.path().join("absent.toml")));
        assert!(fc.lang.is_none());
    }
}
