//! Login credentials and the calls that obtain or revoke them
//!
//! The chat endpoint needs a bearer token plus the session uuid the server
//! issued at login. Both are kept in a small JSON file so separate CLI
//! invocations share one login.

use crate::config::{endpoints, ApiConfig};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Login failed with status: {0}")]
    LoginFailed(u16),

    #[error("Invalid server response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Credential store error: {0}")]
    StoreError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// What the server handed out at login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub uuid: String,
    pub username: String,
    /// Expiry as unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_date: Option<i64>,
}

impl Credentials {
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        self.expired_date.is_some_and(|exp| exp <= now_secs)
    }

    /// Token and uuid present and not expired
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty()
            && !self.uuid.is_empty()
            && !self.is_expired_at(Utc::now().timestamp())
    }
}

/// Source of the current credentials
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Option<Credentials>;
}

impl CredentialProvider for Option<Credentials> {
    fn credentials(&self) -> Option<Credentials> {
        self.clone()
    }
}

/// File-backed credential storage
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    current: RwLock<Option<Credentials>>,
}

impl CredentialStore {
    /// Open the store, reading existing credentials if the file is there
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let path = path.as_ref().to_path_buf();
        let current = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Credentials>(&content) {
                Ok(creds) => Some(creds),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable credentials at {:?}: {}", path, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, credentials: Credentials) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&credentials)?)?;

        if let Ok(mut current) = self.current.write() {
            *current = Some(credentials);
        }
        Ok(())
    }

    /// Forget stored credentials, on disk and in memory
    pub fn clear(&self) -> Result<(), AuthError> {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Drop credentials that are no longer usable
    pub fn purge_expired(&self) -> Result<bool, AuthError> {
        match self.credentials() {
            Some(creds) if !creds.is_usable() => {
                tracing::info!("Stored credentials for {} expired", creds.username);
                self.clear()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl CredentialProvider for CredentialStore {
    fn credentials(&self) -> Option<Credentials> {
        self.current.read().ok().and_then(|c| c.clone())
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expired_date: Option<i64>,
    uuid: String,
}

#[derive(Serialize)]
struct LogoutRequest<'a> {
    uuid: &'a str,
}

/// Client for the login and logout endpoints
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    api: ApiConfig,
    timeout: Duration,
}

impl AuthClient {
    pub fn new(api: ApiConfig, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api,
            timeout,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Credentials, AuthError> {
        let url = self.api.url(endpoints::LOGIN);
        tracing::debug!("POST {} as {}", url, username);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Server returned {}: {}", status, body);
            return Err(AuthError::LoginFailed(status.as_u16()));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Err(AuthError::InvalidResponse("empty response from server".to_string()));
        }
        let login: LoginResponse = serde_json::from_str(&text)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(Credentials {
            access_token: login.access_token,
            refresh_token: login.refresh_token,
            uuid: login.uuid,
            username: username.to_string(),
            expired_date: login.expired_date,
        })
    }

    /// Tell the server the session is over. Server-side failures are only
    /// logged; callers clear local state either way.
    pub async fn logout(&self, credentials: &Credentials) -> Result<(), AuthError> {
        let url = self.api.url(endpoints::LOGOUT);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(&credentials.access_token)
            .json(&LogoutRequest { uuid: &credentials.uuid })
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!("Logout API error: {}", response.status());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credentials {
        Credentials {
            access_token: "tok".to_string(),
            refresh_token: Some("refresh".to_string()),
            uuid: "0b6f7c1e".to_string(),
            username: "alice".to_string(),
            expired_date: None,
        }
    }

    #[test]
    fn test_usability() {
        let creds = sample();
        assert!(creds.is_usable());

        let mut expired = sample();
        expired.expired_date = Some(Utc::now().timestamp() - 10);
        assert!(!expired.is_usable());
        assert!(expired.is_expired_at(Utc::now().timestamp()));

        let mut no_uuid = sample();
        no_uuid.uuid.clear();
        assert!(!no_uuid.is_usable());
    }

    #[test]
    fn test_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = CredentialStore::open(&path).unwrap();
        assert!(store.credentials().is_none());

        store.save(sample()).unwrap();
        assert_eq!(store.credentials(), Some(sample()));

        let reopened = CredentialStore::open(&path).unwrap();
        assert_eq!(reopened.credentials(), Some(sample()));

        reopened.clear().unwrap();
        assert!(reopened.credentials().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_purge_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(dir.path().join("credentials.json")).unwrap();

        let mut creds = sample();
        creds.expired_date = Some(1);
        store.save(creds).unwrap();

        assert!(store.purge_expired().unwrap());
        assert!(store.credentials().is_none());
        assert!(!store.purge_expired().unwrap());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = CredentialStore::open(&path).unwrap();
        assert!(store.credentials().is_none());
    }
}
