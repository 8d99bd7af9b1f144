//! Session context
//!
//! Holds the bearer credential of the signed-in user. The context is an
//! explicit object handed to whoever needs a credential; its lifecycle is
//! anonymous -> authenticated -> anonymous. The credential is cached in a
//! file so a restart keeps the user signed in.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Opaque bearer token issued by the backend
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read credential file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write credential file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Where the credential survives restarts
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: Option<PathBuf>,
}

impl CredentialStore {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A store that keeps nothing between runs
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn load(&self) -> Result<Option<Credential>, SessionError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Credential::new(token)))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SessionError::Read {
                path: path.clone(),
                source,
            }),
        }
    }

    pub async fn save(&self, credential: &Credential) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SessionError::Write {
                    path: path.clone(),
                    source,
                })?;
        }

        tokio::fs::write(path, credential.token())
            .await
            .map_err(|source| SessionError::Write {
                path: path.clone(),
                source,
            })
    }

    pub async fn clear(&self) -> Result<(), SessionError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Write {
                path: path.clone(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Credential),
}

pub struct SessionContext {
    store: CredentialStore,
    state: RwLock<SessionState>,
}

impl SessionContext {
    pub fn anonymous(store: CredentialStore) -> Self {
        Self {
            store,
            state: RwLock::new(SessionState::Anonymous),
        }
    }

    /// Start from whatever credential the store still holds
    pub async fn restore(store: CredentialStore) -> Result<Self, SessionError> {
        let state = match store.load().await? {
            Some(credential) => {
                info!("Restored saved credential");
                SessionState::Authenticated(credential)
            }
            None => {
                debug!("No saved credential, starting anonymous");
                SessionState::Anonymous
            }
        };

        Ok(Self {
            store,
            state: RwLock::new(state),
        })
    }

    pub async fn login(&self, credential: Credential) -> Result<(), SessionError> {
        self.store.save(&credential).await?;
        *self.state.write().await = SessionState::Authenticated(credential);
        info!("Session authenticated");
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        self.store.clear().await?;
        *self.state.write().await = SessionState::Anonymous;
        info!("Session ended");
        Ok(())
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn credential(&self) -> Option<Credential> {
        match &*self.state.read().await {
            SessionState::Authenticated(credential) => Some(credential.clone()),
            SessionState::Anonymous => None,
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(*self.state.read().await, SessionState::Authenticated(_))
    }
}
