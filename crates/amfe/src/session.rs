//! Persisted login session.
//!
//! The session is a single JSON file holding `{token, user}`. It is written
//! on login and removed on logout or whenever the backend rejects the token.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::accounts::User;
use crate::error::{Error, Result};

/// A logged-in user and their bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token sent with every request.
    pub token: String,
    /// The account the token belongs to.
    pub user: User,
}

impl Session {
    /// Value of the `Authorization` header.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// File-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Use the session file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session.
    ///
    /// A missing file means nobody is logged in. A file without a token is
    /// treated the same way.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<Session>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session: Session = serde_json::from_str(&raw)?;
        if session.token.is_empty() {
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Read the stored session, failing if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSession`] when nobody is logged in.
    pub fn require(&self) -> Result<Session> {
        self.load()?.ok_or(Error::NoSession)
    }

    /// Store a session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its directory cannot be written.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        info!(user = %session.user.username, "session stored");
        Ok(())
    }

    /// Forget the stored session. Clearing an absent session is fine.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::Role;

    fn temp_store(name: &str) -> SessionStore {
        let dir = std::env::temp_dir().join(format!("amfe_session_{}_{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        SessionStore::new(dir.join("session.json"))
    }

    fn session() -> Session {
        Session {
            token: "tok".to_string(),
            user: User {
                id: 1,
                username: "admin".to_string(),
                email: "admin@example.org".to_string(),
                role: Role::Admin,
            },
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let store = temp_store("missing");
        assert!(store.load().unwrap().is_none());
        assert!(matches!(store.require(), Err(Error::NoSession)));
    }

    #[test]
    fn test_save_load_clear() {
        let store = temp_store("cycle");
        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing twice is fine
        store.clear().unwrap();

        if let Some(parent) = store.path().parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn test_empty_token_is_no_session() {
        let store = temp_store("empty_token");
        let mut s = session();
        s.token = String::new();
        store.save(&s).unwrap();
        assert!(store.load().unwrap().is_none());

        if let Some(parent) = store.path().parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn test_stored_shape() {
        let json = serde_json::to_value(session()).unwrap();
        assert_eq!(json["token"], "tok");
        assert_eq!(json["user"]["role"], "admin");
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(session().bearer(), "Bearer tok");
    }
}
