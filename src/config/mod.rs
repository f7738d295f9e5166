//! Configuration management for the Beacon enclosure

pub mod file;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default STT module name in shipped configuration
pub const DEFAULT_STT_MODULE: &str = "mycroft";

/// Default language code
const DEFAULT_LANG: &str = "en-us";

/// Beacon enclosure configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Language code for dialogs and setup requests
    pub lang: String,

    /// Path to the device identity file (pairing state and access token)
    pub identity_path: PathBuf,

    /// Message bus connection
    pub bus: BusConfig,

    /// Framebuffer and onboarding settings
    pub enclosure: EnclosureConfig,

    /// Connectivity check settings
    pub network: NetworkConfig,

    /// Backend server used by the hosted STT strategies
    pub server: ServerConfig,

    /// Speech-to-text configuration
    pub stt: SttConfig,
}

/// Message bus configuration
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Websocket URL of the message bus service
    pub url: String,
}

/// Enclosure configuration
#[derive(Debug, Clone)]
pub struct EnclosureConfig {
    /// Directory holding the pre-rendered `.fb` frames
    pub resources_dir: PathBuf,

    /// Framebuffer device frames are written to
    pub framebuffer: PathBuf,

    /// Optional directory of `<lang>/<name>.dialog` files
    pub dialog_dir: Option<PathBuf>,

    /// Delay before the startup connectivity check runs
    pub startup_delay: Duration,

    /// Minimum interval between two "no internet" notifications
    pub notify_window: Duration,

    /// Pause between the intro dialog and the Wi-Fi setup request
    pub onboarding_pause: Duration,

    /// How long to wait for speech playback to begin
    pub speech_start_timeout: Duration,

    /// How long to wait for speech playback to end
    pub speech_end_timeout: Duration,
}

impl Default for EnclosureConfig {
    fn default() -> Self {
        Self {
            resources_dir: PathBuf::from("/opt/mycroft/skills/skill-mark-2-pi.mycroftai/ui"),
            framebuffer: PathBuf::from("/dev/fb0"),
            dialog_dir: None,
            startup_delay: Duration::from_secs(5),
            notify_window: Duration::from_secs(30),
            onboarding_pause: Duration::from_secs(2),
            speech_start_timeout: Duration::from_secs(5),
            speech_end_timeout: Duration::from_secs(60),
        }
    }
}

/// Connectivity check configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// DNS servers checked with a plain TCP connect
    pub dns_hosts: Vec<String>,

    /// URL fetched when none of the DNS servers answer
    pub http_url: String,

    /// Per-check timeout
    pub timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            dns_hosts: vec!["8.8.8.8:53".to_string(), "8.8.4.4:53".to_string()],
            http_url: "http://www.google.com".to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

/// Backend server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL (e.g. `https://api.mycroft.ai`)
    pub url: String,

    /// API version path segment
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "https://api.mycroft.ai".to_string(),
            version: "v1".to_string(),
        }
    }
}

/// Speech-to-text configuration
///
/// Mirrors the `[stt]` table: `module` selects the strategy, and every other
/// sub-table is handed untouched to the strategy of the same name.
#[derive(Debug, Clone, Deserialize)]
pub struct SttConfig {
    /// Selected strategy name; defaults to [`DEFAULT_STT_MODULE`]
    #[serde(default = "default_stt_module")]
    pub module: String,

    /// Language override for STT; defaults to the top-level language
    #[serde(default)]
    pub lang: Option<String>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Per-module settings, keyed by module name
    #[serde(flatten)]
    pub modules: HashMap<String, serde_json::Value>,
}

fn default_stt_module() -> String {
    DEFAULT_STT_MODULE.to_string()
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            module: default_stt_module(),
            lang: None,
            timeout_secs: None,
            modules: HashMap::new(),
        }
    }
}

impl SttConfig {
    /// Settings sub-table for a module, or `Null` when absent
    #[must_use]
    pub fn module_config(&self, name: &str) -> &serde_json::Value {
        self.modules.get(name).unwrap_or(&serde_json::Value::Null)
    }

    /// Request timeout applied to STT HTTP clients
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lang: DEFAULT_LANG.to_string(),
            identity_path: default_identity_path(),
            bus: BusConfig {
                url: "ws://127.0.0.1:8181/core".to_string(),
            },
            enclosure: EnclosureConfig::default(),
            network: NetworkConfig::default(),
            server: ServerConfig::default(),
            stt: SttConfig::default(),
        }
    }
}

/// Default identity file: `~/.local/share/omni/beacon/identity/identity2.json`
fn default_identity_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/omni/beacon/identity/identity2.json"),
        |d| {
            d.data_dir()
                .join("omni")
                .join("beacon")
                .join("identity")
                .join("identity2.json")
        },
    )
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// `path` overrides the standard config file location.
    #[must_use]
    pub fn load(path: Option<&Path>) -> Self {
        let fc = file::load_config_file(path);
        let mut config = Self::from_file(fc);
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Build configuration from a parsed config file overlaid on defaults
    #[must_use]
    pub fn from_file(fc: file::EnclosureConfigFile) -> Self {
        let defaults = Self::default();
        let enclosure_defaults = defaults.enclosure;
        let network_defaults = defaults.network;
        let fe = fc.enclosure;

        let enclosure = EnclosureConfig {
            resources_dir: fe
                .resources_dir
                .map_or(enclosure_defaults.resources_dir, PathBuf::from),
            framebuffer: fe
                .framebuffer
                .map_or(enclosure_defaults.framebuffer, PathBuf::from),
            dialog_dir: fe.dialog_dir.map(PathBuf::from),
            startup_delay: fe
                .startup_delay_secs
                .map_or(enclosure_defaults.startup_delay, Duration::from_secs),
            notify_window: fe
                .notify_window_secs
                .map_or(enclosure_defaults.notify_window, Duration::from_secs),
            onboarding_pause: fe
                .onboarding_pause_ms
                .map_or(enclosure_defaults.onboarding_pause, Duration::from_millis),
            speech_start_timeout: fe
                .speech_start_timeout_secs
                .map_or(enclosure_defaults.speech_start_timeout, Duration::from_secs),
            speech_end_timeout: fe
                .speech_end_timeout_secs
                .map_or(enclosure_defaults.speech_end_timeout, Duration::from_secs),
        };

        let network = NetworkConfig {
            dns_hosts: fc.network.dns_hosts.unwrap_or(network_defaults.dns_hosts),
            http_url: fc.network.http_url.unwrap_or(network_defaults.http_url),
            timeout: fc
                .network
                .timeout_secs
                .map_or(network_defaults.timeout, Duration::from_secs),
        };

        let server = ServerConfig {
            url: fc.server.url.unwrap_or(defaults.server.url),
            version: fc.server.version.unwrap_or(defaults.server.version),
        };

        Self {
            lang: fc.lang.unwrap_or(defaults.lang),
            identity_path: fc
                .identity_path
                .map_or(defaults.identity_path, PathBuf::from),
            bus: BusConfig {
                url: fc.bus.url.unwrap_or(defaults.bus.url),
            },
            enclosure,
            network,
            server,
            stt: fc.stt.unwrap_or(defaults.stt),
        }
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(lang) = lookup("BEACON_LANG") {
            self.lang = lang;
        }
        if let Some(url) = lookup("BEACON_BUS_URL") {
            self.bus.url = url;
        }
        if let Some(module) = lookup("BEACON_STT_MODULE") {
            self.stt.module = module;
        }
        if let Some(url) = lookup("BEACON_SERVER_URL") {
            self.server.url = url;
        }
        if let Some(dev) = lookup("BEACON_FRAMEBUFFER") {
            self.enclosure.framebuffer = PathBuf::from(dev);
        }
        if let Some(dir) = lookup("BEACON_RESOURCES_DIR") {
            self.enclosure.resources_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("BEACON_IDENTITY_PATH") {
            self.identity_path = PathBuf::from(path);
        }
    }

    /// Language used for STT requests
    #[must_use]
    pub fn stt_lang(&self) -> &str {
        self.stt.lang.as_deref().unwrap_or(&self.lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_layout() {
        let config = Config::default();
        assert_eq!(config.enclosure.framebuffer, PathBuf::from("/dev/fb0"));
        assert_eq!(config.enclosure.notify_window, Duration::from_secs(30));
        assert_eq!(config.enclosure.startup_delay, Duration::from_secs(5));
        assert_eq!(config.stt.module, DEFAULT_STT_MODULE);
        assert_eq!(config.stt_lang(), "en-us");
    }

    #[test]
    fn stt_table_without_module_uses_default() {
        let fc = file::parse_config_file("[stt]\nlang = \"de-de\"\n").unwrap();
        let config = Config::from_file(fc);

        assert_eq!(config.stt.module, DEFAULT_STT_MODULE);
        assert_eq!(config.stt_lang(), "de-de");
    }

    #[test]
    fn file_overlays_defaults() {
        let fc = file::parse_config_file(
            r#"
            lang = "de-de"

            [enclosure]
            startup_delay_secs = 0

            [stt]
            module = "wit"
            lang = "en-us"
            "#,
        )
        .unwrap();

        let config = Config::from_file(fc);
        assert_eq!(config.lang, "de-de");
        assert_eq!(config.enclosure.startup_delay, Duration::ZERO);
        assert_eq!(config.enclosure.framebuffer, PathBuf::from("/dev/fb0"));
        assert_eq!(config.stt.module, "wit");
        assert_eq!(config.stt_lang(), "en-us");
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "BEACON_STT_MODULE" => Some("kaldi".to_string()),
            "BEACON_FRAMEBUFFER" => Some("/dev/fb1".to_string()),
            _ => None,
        });
        assert_eq!(config.stt.module, "kaldi");
        assert_eq!(config.enclosure.framebuffer, PathBuf::from("/dev/fb1"));
        assert_eq!(config.lang, "en-us");
    }

    #[test]
    fn missing_module_config_is_null() {
        let config = Config::default();
        assert!(config.stt.module_config("kaldi").is_null());
    }
}
