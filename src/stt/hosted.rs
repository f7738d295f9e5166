//! STT strategies served by the device backend

use std::future::Future;

use async_trait::async_trait;

use super::backend::BackendApi;
use super::{AudioData, SttStrategy, http_client};
use crate::config::Config;
use crate::identity::IdentityFile;
use crate::{Error, Result};

/// Sample rate the cloud recognizer is tuned for
pub const CLOUD_SAMPLE_RATE: u32 = 16_000;

/// Default cloud STT
///
/// Sends audio resampled to [`CLOUD_SAMPLE_RATE`] first; if that request
/// fails for any reason other than authorization, retries once with the
/// audio at its original rate.
pub struct CloudStt {
    api: BackendApi,
    lang: String,
}

impl CloudStt {
    /// # Errors
    ///
    /// Returns error if the server URL is invalid or the HTTP client cannot be built
    pub fn new(config: &Config) -> Result<Self> {
        let api = BackendApi::new(
            &config.server,
            "stt",
            IdentityFile::new(config.identity_path.clone()),
            http_client(&config.stt)?,
        )?;
        Ok(Self {
            api,
            lang: config.stt_lang().to_string(),
        })
    }

    async fn transcribe(&self, wav: Vec<u8>, lang: &str) -> Result<String> {
        let candidates = self.api.stt(wav, lang, 1).await?;
        Ok(candidates.into_iter().next().unwrap_or_default())
    }
}

#[async_trait]
impl SttStrategy for CloudStt {
    async fn execute(&self, audio: &AudioData, language: Option<&str>) -> Result<String> {
        let lang = language.unwrap_or(&self.lang);

        transcribe_with_fallback(
            audio.wav_data_at(CLOUD_SAMPLE_RATE),
            || audio.wav_data(),
            |wav| self.transcribe(wav, lang),
        )
        .await
    }
}

/// Transcribe the resampled encoding, falling back to the original one
///
/// The fallback runs when resampling or the request fails, except on 401.
async fn transcribe_with_fallback<F, Fut>(
    resampled: Result<Vec<u8>>,
    original: impl FnOnce() -> Result<Vec<u8>>,
    transcribe: F,
) -> Result<String>
where
    F: Fn(Vec<u8>) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let first = match resampled {
        Ok(wav) => transcribe(wav).await,
        Err(e) => Err(e),
    };

    match first {
        Err(e) if !e.is_unauthorized() => {
            tracing::warn!(error = %e, "resampled request failed, retrying at original rate");
            transcribe(original()?).await
        }
        result => result,
    }
}

/// Backend-hosted DeepSpeech, English only
pub struct HostedDeepSpeechStt {
    api: BackendApi,
    lang: String,
}

impl HostedDeepSpeechStt {
    /// # Errors
    ///
    /// Returns error if the server URL is invalid or the HTTP client cannot be built
    pub fn new(config: &Config) -> Result<Self> {
        let api = BackendApi::new(
            &config.server,
            "deepspeech",
            IdentityFile::new(config.identity_path.clone()),
            http_client(&config.stt)?,
        )?;
        Ok(Self {
            api,
            lang: config.stt_lang().to_string(),
        })
    }
}

#[async_trait]
impl SttStrategy for HostedDeepSpeechStt {
    async fn execute(&self, audio: &AudioData, language: Option<&str>) -> Result<String> {
        let lang = language.unwrap_or(&self.lang);
        if !lang.to_lowercase().starts_with("en") {
            return Err(Error::UnsupportedLanguage(format!(
                "{lang} (DeepSpeech is currently English only)"
            )));
        }

        let candidates = self.api.stt(audio.wav_data()?, lang, 1).await?;
        Ok(candidates.into_iter().next().unwrap_or_default())
    }
}
