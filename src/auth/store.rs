//! Durable storage for the persisted token pair.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// On-disk representation of a token pair.
///
/// This is the only state the library persists. The file is rewritten
/// wholesale after every successful code exchange or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// The bearer access token
    pub access_token: String,
    /// The refresh token used to mint new access tokens
    pub refresh_token: String,
    /// When the access token stops being accepted
    pub access_expires_at: DateTime<Utc>,
    /// When the refresh token stops being accepted
    pub refresh_expires_at: DateTime<Utc>,
    /// When this file was written
    pub written_at: DateTime<Utc>,
}

/// File-backed storage for a [`PersistedSession`].
///
/// A missing or unreadable file is reported as "no session" rather than
/// an error; callers treat that identically to "never authenticated".
/// Saves go through a sibling temp file and a rename, so a crash mid-write
/// never leaves a half-written file at the configured path.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted session, if any.
    pub fn load(&self) -> Option<PersistedSession> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to read token file; treating as unauthenticated"
                );
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "token file is corrupted; treating as unauthenticated"
                );
                None
            }
        }
    }

    /// Write the session atomically.
    ///
    /// The token file is restricted to owner read/write on Unix before it
    /// is moved into place.
    pub fn save(&self, session: &PersistedSession) -> Result<()> {
        let json = serde_json::to_vec_pretty(session)?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        fs::write(&tmp, &json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "tokens saved");
        Ok(())
    }
}
