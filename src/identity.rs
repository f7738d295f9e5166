//! Device identity and pairing status
//!
//! The identity file is written by the pairing flow once the device has been
//! registered to an account. Its presence with a non-empty `uuid` is what
//! "paired" means to the rest of the enclosure.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Answers "has this device completed first-time pairing"
pub trait PairingStatus: Send + Sync {
    fn has_been_paired(&self) -> bool;
}

/// Stored device identity
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Identity {
    /// Device UUID assigned by the backend
    #[serde(default)]
    pub uuid: String,

    /// Bearer token for backend requests
    #[serde(default)]
    pub access: String,

    /// Token used to refresh `access`
    #[serde(default)]
    pub refresh: String,

    /// Expiry of `access`, seconds since the epoch
    #[serde(default)]
    pub expires: f64,
}

impl Identity {
    /// Whether this identity belongs to a paired device
    #[must_use]
    pub fn is_paired(&self) -> bool {
        !self.uuid.is_empty()
    }
}

/// Identity stored as JSON on disk, re-read on every query
///
/// The pairing flow runs in another process, so nothing is cached here.
#[derive(Debug, Clone)]
pub struct IdentityFile {
    path: PathBuf,
}

impl IdentityFile {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the identity, `None` if the file does not exist yet
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(&self) -> Result<Option<Identity>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let identity = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid device identity: {e}")))?;
        Ok(Some(identity))
    }

    /// Current access token, if the device has one
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.load()
            .ok()
            .flatten()
            .map(|identity| identity.access)
            .filter(|token| !token.is_empty())
    }
}

impl PairingStatus for IdentityFile {
    fn has_been_paired(&self) -> bool {
        match self.load() {
            Ok(identity) => identity.is_some_and(|i| i.is_paired()),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read identity");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_unpaired() {
        let dir = tempfile::tempdir().unwrap();
        let file = IdentityFile::new(dir.path().join("identity2.json"));
        assert!(!file.has_been_paired());
        assert!(file.access_token().is_none());
    }

    #[test]
    fn uuid_marks_device_paired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity2.json");
        std::fs::write(
            &path,
            r#"{"uuid": "1234", "access": "tok", "refresh": "ref", "expires": 1700000000.5}"#,
        )
        .unwrap();

        let file = IdentityFile::new(path);
        assert!(file.has_been_paired());
        assert_eq!(file.access_token().as_deref(), Some("tok"));
    }

    #[test]
    fn empty_uuid_is_unpaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity2.json");
        std::fs::write(&path, r#"{"uuid": "", "access": ""}"#).unwrap();

        let file = IdentityFile::new(path);
        assert!(!file.has_been_paired());
        assert!(file.access_token().is_none());
    }

    #[test]
    fn corrupt_file_is_unpaired() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity2.json");
        std::fs::write(&path, "{not json").unwrap();

        let file = IdentityFile::new(path);
        assert!(file.load().is_err());
        assert!(!file.has_been_paired());
    }
}
