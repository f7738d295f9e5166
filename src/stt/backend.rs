//! Client for the hosted STT endpoints of the device backend

use reqwest::header::CONTENT_TYPE;

use super::ensure_success;
use crate::config::ServerConfig;
use crate::identity::IdentityFile;
use crate::{Error, Result};

/// Posts audio to `{server}/{version}/{path}` and returns the candidates
pub struct BackendApi {
    client: reqwest::Client,
    endpoint: url::Url,
    identity: IdentityFile,
}

impl BackendApi {
    /// Create a client for the backend STT endpoint at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the server URL is invalid or the HTTP client cannot be built
    pub fn new(
        server: &ServerConfig,
        path: &str,
        identity: IdentityFile,
        client: reqwest::Client,
    ) -> Result<Self> {
        let raw = format!(
            "{}/{}/{}",
            server.url.trim_end_matches('/'),
            server.version.trim_matches('/'),
            path
        );
        let endpoint = url::Url::parse(&raw)
            .map_err(|e| Error::Config(format!("invalid server url {}: {e}", server.url)))?;

        Ok(Self {
            client,
            endpoint,
            identity,
        })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Transcribe WAV audio, returning up to `limit` candidates
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or an
    /// unparseable response
    pub async fn stt(&self, wav: Vec<u8>, lang: &str, limit: u32) -> Result<Vec<String>> {
        tracing::debug!(
            endpoint = %self.endpoint,
            audio_bytes = wav.len(),
            lang,
            "starting backend transcription"
        );

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .query(&[("lang", lang), ("limit", &limit.to_string())])
            .header(CONTENT_TYPE, "audio/wav")
            .body(wav);

        if let Some(token) = self.identity.access_token() {
            request = request.bearer_auth(token);
        }

        let response = ensure_success(request.send().await?).await?;
        let candidates: Vec<String> = response.json().await?;

        tracing::info!(candidates = candidates.len(), "transcription complete");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn identity() -> IdentityFile {
        IdentityFile::new(PathBuf::from("/nonexistent/identity2.json"))
    }

    #[test]
    fn builds_versioned_endpoint() {
        let server = ServerConfig {
            url: "https://api.example.com/".to_string(),
            version: "v1".to_string(),
        };
        let api = BackendApi::new(&server, "stt", identity(), reqwest::Client::new()).unwrap();
        assert_eq!(api.endpoint().as_str(), "https://api.example.com/v1/stt");
    }

    #[test]
    fn rejects_invalid_server_url() {
        let server = ServerConfig {
            url: "not a url".to_string(),
            version: "v1".to_string(),
        };
        assert!(matches!(
            BackendApi::new(&server, "stt", identity(), reqwest::Client::new()),
            Err(Error::Config(_))
        ));
    }
}
