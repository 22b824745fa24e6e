//! Session context: the auth token and its lifecycle
//!
//! Every authenticated call site receives a [`Session`] instead of reaching
//! for global storage. The token is read from the backing [`TokenStore`] on
//! each call, written on login/register ([`Session::begin`]) and removed on
//! logout ([`Session::end`]).

use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Persistent home of the auth token
pub trait TokenStore: Send + Sync {
    /// Current token, if any
    fn load(&self) -> Option<String>;
    /// Replace the stored token
    fn save(&self, token: &str) -> Result<()>;
    /// Forget the stored token
    fn clear(&self) -> Result<()>;
}

/// Token kept in a single file on disk
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store backed by `path`; the file need not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process token store
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Ok(mut t) = self.token.write() {
            *t = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut t) = self.token.write() {
            *t = None;
        }
        Ok(())
    }
}

/// Explicit session context shared by all network call sites
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
}

impl Session {
    /// Wrap a token store
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Session persisted to a token file
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileTokenStore::new(path)))
    }

    /// Session that lives only in memory
    pub fn in_memory(token: Option<&str>) -> Self {
        let store = match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::new(),
        };
        Self::new(Arc::new(store))
    }

    /// The stored token, read fresh from the store
    pub fn token(&self) -> Option<String> {
        self.store.load()
    }

    /// Whether a token is present
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Start a session after a successful login or registration
    pub fn begin(&self, token: &str) -> Result<()> {
        self.store.save(token)?;
        tracing::info!("Session started");
        Ok(())
    }

    /// End the session
    pub fn end(&self) -> Result<()> {
        self.store.clear()?;
        tracing::info!("Session ended");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
