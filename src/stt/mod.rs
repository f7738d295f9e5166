//! Speech-to-text strategies and the factory that selects one
//!
//! The configured `stt.module` picks a [`StrategyKind`]. If that strategy
//! cannot be built, [`create`] falls back once to the default cloud
//! strategy; a failure of the default itself is returned to the caller.
//!
//! Every [`Stt::execute`] call passes through [`requires_pairing`], so an
//! unpaired device hears how to pair instead of a transport error.

mod audio;
mod backend;
mod hosted;
mod remote;

pub use audio::AudioData;
pub use backend::BackendApi;
pub use hosted::{CLOUD_SAMPLE_RATE, CloudStt, HostedDeepSpeechStt};
pub use remote::{DeepSpeechServerStt, KaldiStt, WIT_SPEECH_URL, WitStt};

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::{Config, SttConfig};
use crate::{Error, Result};

/// Returned in place of a transcription when the backend rejects the device
pub const PAIRING_PHRASE: &str = "pair my device";

/// A speech-to-text backend
#[async_trait]
pub trait SttStrategy: Send + Sync {
    /// Transcribe `audio`; `language` overrides the configured language
    async fn execute(&self, audio: &AudioData, language: Option<&str>) -> Result<String>;
}

/// Known STT strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Device backend cloud STT
    Mycroft,
    /// Device backend hosted DeepSpeech
    MycroftDeepSpeech,
    /// Self-hosted DeepSpeech server
    DeepSpeechServer,
    /// Kaldi GStreamer server
    Kaldi,
    /// Wit.ai
    Wit,
}

impl StrategyKind {
    /// Strategy used when the configured one cannot be built
    pub const DEFAULT: Self = Self::Mycroft;

    pub const ALL: [Self; 5] = [
        Self::Mycroft,
        Self::MycroftDeepSpeech,
        Self::DeepSpeechServer,
        Self::Kaldi,
        Self::Wit,
    ];

    /// Name used for this strategy in configuration
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mycroft => "mycroft",
            Self::MycroftDeepSpeech => "mycroft_deepspeech",
            Self::DeepSpeechServer => "deepspeech_server",
            Self::Kaldi => "kaldi",
            Self::Wit => "wit",
        }
    }

    /// Construct the strategy from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the strategy's settings are missing or invalid
    pub fn build(self, config: &Config) -> Result<Box<dyn SttStrategy>> {
        Ok(match self {
            Self::Mycroft => Box::new(CloudStt::new(config)?),
            Self::MycroftDeepSpeech => Box::new(HostedDeepSpeechStt::new(config)?),
            Self::DeepSpeechServer => Box::new(DeepSpeechServerStt::new(config)?),
            Self::Kaldi => Box::new(KaldiStt::new(config)?),
            Self::Wit => Box::new(WitStt::new(config)?),
        })
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownStrategy(s.to_string()))
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Replace an unauthorized failure with [`PAIRING_PHRASE`]
///
/// # Errors
///
/// Passes through every error that is not a 401
pub fn requires_pairing(result: Result<String>) -> Result<String> {
    match result {
        Err(e) if e.is_unauthorized() => {
            tracing::warn!("access denied by STT backend, device is not paired");
            Ok(PAIRING_PHRASE.to_string())
        }
        other => other,
    }
}

/// A ready-to-use STT strategy
pub struct Stt {
    kind: StrategyKind,
    strategy: Box<dyn SttStrategy>,
}

impl Stt {
    #[must_use]
    pub fn new(kind: StrategyKind, strategy: Box<dyn SttStrategy>) -> Self {
        Self { kind, strategy }
    }

    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Transcribe audio
    ///
    /// # Errors
    ///
    /// Returns error on transport failure (other than 401) or unsupported language
    pub async fn execute(&self, audio: &AudioData, language: Option<&str>) -> Result<String> {
        requires_pairing(self.strategy.execute(audio, language).await)
    }
}

/// Build the configured STT strategy, falling back to the default once
///
/// # Errors
///
/// Returns error if the configured module is the default and cannot be
/// built, or if the fallback fails as well
pub fn create(config: &Config) -> Result<Stt> {
    let module = config.stt.module.as_str();

    let attempt = module
        .parse::<StrategyKind>()
        .and_then(|kind| kind.build(config).map(|strategy| Stt::new(kind, strategy)));

    match attempt {
        Ok(stt) => {
            tracing::info!(module = %stt.kind(), "STT strategy ready");
            Ok(stt)
        }
        Err(e) => {
            tracing::error!(module, error = %e, "failed to create STT strategy");
            if module == StrategyKind::DEFAULT.name() {
                return Err(e);
            }
            tracing::info!(module = %StrategyKind::DEFAULT, "falling back to default STT");
            let kind = StrategyKind::DEFAULT;
            Ok(Stt::new(kind, kind.build(config)?))
        }
    }
}

/// Turn a non-success response into [`Error::HttpStatus`]
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::HttpStatus { status, body })
}

pub(crate) fn http_client(config: &SttConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(config.timeout()).build()?)
}

/// Deserialize the settings table for `module`, defaulting when absent
pub(crate) fn module_settings<T>(config: &SttConfig, module: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match config.module_config(module) {
        serde_json::Value::Null => Ok(T::default()),
        value => serde_json::from_value(value.clone())
            .map_err(|e| Error::Config(format!("invalid stt.{module} settings: {e}"))),
    }
}
