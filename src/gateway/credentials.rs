use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

/// Holder of the bearer token attached to every outgoing request.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: String);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: RwLock<Option<String>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentials {
    fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_token(&self, token: String) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
    }

    fn clear(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Token persisted to disk so separate CLI invocations share one session.
#[derive(Debug)]
pub struct FileCredentials {
    path: PathBuf,
    cached: MemoryCredentials,
}

impl FileCredentials {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = match std::fs::read_to_string(&path) {
            Ok(contents) if !contents.trim().is_empty() => {
                MemoryCredentials::with_token(contents.trim())
            }
            _ => MemoryCredentials::new(),
        };
        Self { path, cached }
    }
}

impl CredentialStore for FileCredentials {
    fn token(&self) -> Option<String> {
        self.cached.token()
    }

    fn set_token(&self, token: String) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Could not create token directory {}: {}", parent.display(), e);
            }
        }
        if let Err(e) = write_private(&self.path, &token) {
            warn!("Could not persist session token to {}: {}", self.path.display(), e);
        }
        self.cached.set_token(token);
    }

    fn clear(&self) {
        self.cached.clear();
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Could not remove session token {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Writes the token readable by the owner only. An existing file is narrowed too.
fn write_private(path: &Path, token: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(token.as_bytes())
}
