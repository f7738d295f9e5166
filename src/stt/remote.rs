//! Built-in STT strategies that talk to third-party or self-hosted services

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use super::{AudioData, SttStrategy, ensure_success, http_client, module_settings};
use crate::config::Config;
use crate::{Error, Result};

/// Default Wit.ai speech endpoint
pub const WIT_SPEECH_URL: &str = "https://api.wit.ai/speech";

#[derive(Debug, Default, Deserialize)]
struct UriSettings {
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Credential {
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WitSettings {
    uri: Option<String>,
    #[serde(default)]
    credential: Credential,
}

/// Kaldi GStreamer server response
#[derive(Deserialize)]
struct KaldiResponse {
    #[serde(default)]
    hypotheses: Vec<KaldiHypothesis>,
}

#[derive(Deserialize)]
struct KaldiHypothesis {
    utterance: String,
}

/// Wit.ai response; older API versions use `_text`
#[derive(Deserialize)]
struct WitResponse {
    text: Option<String>,
    #[serde(rename = "_text")]
    legacy_text: Option<String>,
}

fn required_uri(config: &Config, module: &str) -> Result<url::Url> {
    let settings: UriSettings = module_settings(&config.stt, module)?;
    let uri = settings
        .uri
        .ok_or_else(|| Error::Config(format!("stt.{module}.uri is required")))?;
    url::Url::parse(&uri).map_err(|e| Error::Config(format!("invalid stt.{module}.uri: {e}")))
}

/// Self-hosted DeepSpeech server, plain text response
pub struct DeepSpeechServerStt {
    client: reqwest::Client,
    uri: url::Url,
}

impl DeepSpeechServerStt {
    /// # Errors
    ///
    /// Returns error if `stt.deepspeech_server.uri` is missing or invalid
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http_client(&config.stt)?,
            uri: required_uri(config, "deepspeech_server")?,
        })
    }
}

#[async_trait]
impl SttStrategy for DeepSpeechServerStt {
    async fn execute(&self, audio: &AudioData, _language: Option<&str>) -> Result<String> {
        let response = self
            .client
            .post(self.uri.clone())
            .header(CONTENT_TYPE, "audio/wav")
            .body(audio.wav_data()?)
            .send()
            .await?;

        let text = ensure_success(response).await?.text().await?;
        Ok(text.trim().to_string())
    }
}

/// Kaldi GStreamer server
pub struct KaldiStt {
    client: reqwest::Client,
    uri: url::Url,
}

impl KaldiStt {
    /// # Errors
    ///
    /// Returns error if `stt.kaldi.uri` is missing or invalid
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: http_client(&config.stt)?,
            uri: required_uri(config, "kaldi")?,
        })
    }
}

#[async_trait]
impl SttStrategy for KaldiStt {
    async fn execute(&self, audio: &AudioData, _language: Option<&str>) -> Result<String> {
        let response = self
            .client
            .post(self.uri.clone())
            .header(CONTENT_TYPE, "audio/wav")
            .body(audio.wav_data()?)
            .send()
            .await?;

        let body: KaldiResponse = ensure_success(response).await?.json().await?;
        Ok(body
            .hypotheses
            .into_iter()
            .next()
            .map(|h| h.utterance)
            .unwrap_or_default())
    }
}

/// Wit.ai speech API
pub struct WitStt {
    client: reqwest::Client,
    uri: url::Url,
    token: String,
}

impl WitStt {
    /// # Errors
    ///
    /// Returns error if `stt.wit.credential.token` is missing or the URI is invalid
    pub fn new(config: &Config) -> Result<Self> {
        let settings: WitSettings = module_settings(&config.stt, "wit")?;

        let token = settings
            .credential
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Config("stt.wit.credential.token is required".to_string()))?;
        let uri = settings.uri.as_deref().unwrap_or(WIT_SPEECH_URL);
        let uri = url::Url::parse(uri)
            .map_err(|e| Error::Config(format!("invalid stt.wit.uri: {e}")))?;

        Ok(Self {
            client: http_client(&config.stt)?,
            uri,
            token,
        })
    }
}

#[async_trait]
impl SttStrategy for WitStt {
    async fn execute(&self, audio: &AudioData, _language: Option<&str>) -> Result<String> {
        let response = self
            .client
            .post(self.uri.clone())
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "audio/wav")
            .body(audio.wav_data()?)
            .send()
            .await?;

        let body: WitResponse = ensure_success(response).await?.json().await?;
        body.text
            .or(body.legacy_text)
            .ok_or_else(|| Error::Stt("wit response carried no text".to_string()))
    }
}
