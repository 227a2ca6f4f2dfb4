//! Client-side session: bearer token plus the username shown on the dashboard.
//!
//! The store is the only place the token lives. It is created empty or loaded
//! from the session file, begun at login, invalidated on a 401 and ended at logout.
//! Every transition is written back to the file when one is configured.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Session shared by the API client and the screens.
pub type SharedSession = Arc<Mutex<SessionStore>>;

#[derive(Debug)]
pub enum SessionError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Io { path, source } => write!(f, "session file {}: {}", path.display(), source),
            SessionError::Json { path, source } => {
                write!(f, "session file {} is not valid JSON: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Io { source, .. } => Some(source),
            SessionError::Json { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    state: SessionState,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Store that never touches the filesystem.
    pub fn in_memory() -> Self {
        SessionStore::default()
    }

    /// Load the persisted session at `path`, or start empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => SessionState::default(),
            Ok(s) => serde_json::from_str(&s).map_err(|source| SessionError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => SessionState::default(),
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        debug!(
            "Session loaded from {} (token={})",
            path.display(),
            if state.auth_token.is_some() { "present" } else { "absent" }
        );
        Ok(SessionStore {
            state,
            path: Some(path),
        })
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn token(&self) -> Option<&str> {
        self.state.auth_token.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.state.username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.auth_token.is_some()
    }

    /// Login: record the token and the user it belongs to.
    pub fn begin(&mut self, token: impl Into<String>, username: impl Into<String>) -> Result<(), SessionError> {
        self.state.auth_token = Some(token.into());
        self.state.username = Some(username.into());
        self.persist()
    }

    /// Store a token without touching the username, as the login endpoint does.
    pub fn set_token(&mut self, token: impl Into<String>) -> Result<(), SessionError> {
        self.state.auth_token = Some(token.into());
        self.persist()
    }

    /// The server rejected the token. Drop it but keep the username for the greeting.
    pub fn invalidate(&mut self) -> Result<(), SessionError> {
        if self.state.auth_token.take().is_some() {
            debug!("Session token cleared after unauthorized response");
        }
        self.persist()
    }

    /// Logout.
    pub fn end(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::default();
        self.persist()
    }

    fn persist(&self) -> Result<(), SessionError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let body = serde_json::to_string_pretty(&self.state).map_err(|source| SessionError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(path, body).map_err(|source| SessionError::Io {
            path: path.clone(),
            source,
        })
    }
}

/// Lock the shared session, recovering the data if a previous holder panicked.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, SessionStore> {
    match session.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Session lock was poisoned; continuing with last known state");
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("homiease-session-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join("session.json")
    }

    #[test]
    fn missing_file_starts_logged_out() {
        let path = scratch_file("missing");
        let _ = fs::remove_file(&path);
        let store = SessionStore::open(&path).unwrap();
        assert!(!store.is_authenticated());
        assert_eq!(store.username(), None);
    }

    #[test]
    fn lifecycle_is_persisted() {
        let path = scratch_file("lifecycle");
        let _ = fs::remove_file(&path);

        let mut store = SessionStore::open(&path).unwrap();
        store.begin("tok-1", "elefkapo").unwrap();

        let reloaded = SessionStore::open(&path).unwrap();
        assert_eq!(reloaded.token(), Some("tok-1"));
        assert_eq!(reloaded.username(), Some("elefkapo"));

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["authToken"], "tok-1");

        store.invalidate().unwrap();
        let reloaded = SessionStore::open(&path).unwrap();
        assert_eq!(reloaded.token(), None);
        assert_eq!(reloaded.username(), Some("elefkapo"));

        store.end().unwrap();
        let reloaded = SessionStore::open(&path).unwrap();
        assert_eq!(reloaded.username(), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = scratch_file("corrupt");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(SessionStore::open(&path), Err(SessionError::Json { .. })));
    }
}
