//! Credential storage
//!
//! All reads and writes of the credential pair go through [`TokenStore`].
//! Implementations must make `set` and `clear` visible to every subsequent
//! `get` from any task.

use hrdesk_core::CredentialPair;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Storage key of the access credential
pub const ACCESS_KEY: &str = "access";
/// Storage key of the refresh credential
pub const REFRESH_KEY: &str = "refresh";

/// Holder of the current credential pair
pub trait TokenStore: Send + Sync {
    /// Current pair, or `None` when signed out
    fn get(&self) -> Option<CredentialPair>;

    /// Replace the stored pair
    fn set(&self, pair: CredentialPair);

    /// Forget both credentials
    fn clear(&self);

    /// Current access credential
    fn access_token(&self) -> Option<String> {
        self.get().map(|pair| pair.access)
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pair: RwLock<Option<CredentialPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: RwLock::new(Some(pair)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<CredentialPair> {
        self.pair
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, pair: CredentialPair) {
        *self.pair.write().unwrap_or_else(PoisonError::into_inner) = Some(pair);
    }

    fn clear(&self) {
        *self.pair.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Store for contexts without client-local storage: always empty
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTokenStore;

impl TokenStore for NullTokenStore {
    fn get(&self) -> Option<CredentialPair> {
        None
    }

    fn set(&self, _pair: CredentialPair) {}

    fn clear(&self) {}
}

/// On-disk layout of the credential file
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedCredentials {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

/// Store persisted as a JSON file, surviving process restarts.
///
/// The file is read once on open; afterwards the in-memory copy is
/// authoritative and every change is written through.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cache: RwLock<Option<CredentialPair>>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading any complete pair found there
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = RwLock::new(load(&path));
        Self { path, cache }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, pair: Option<&CredentialPair>) {
        let result = match pair {
            Some(pair) => write(&self.path, pair),
            None => match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };

        if let Err(error) = result {
            warn!(path = %self.path.display(), %error, "failed to persist credentials");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<CredentialPair> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, pair: CredentialPair) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(Some(&pair));
        *cache = Some(pair);
    }

    fn clear(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(None);
        *cache = None;
    }
}

fn load(path: &Path) -> Option<CredentialPair> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to read credentials");
            return None;
        }
    };

    match serde_json::from_str::<PersistedCredentials>(&content) {
        Ok(PersistedCredentials {
            access: Some(access),
            refresh: Some(refresh),
        }) => Some(CredentialPair { access, refresh }),
        Ok(_) => {
            debug!(path = %path.display(), "incomplete credentials on disk, starting signed out");
            None
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "unreadable credentials file, starting signed out");
            None
        }
    }
}

/// Write via a temporary file and rename so readers never see a torn file
fn write(path: &Path, pair: &CredentialPair) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_vec_pretty(&PersistedCredentials {
        access: Some(pair.access.clone()),
        refresh: Some(pair.refresh.clone()),
    })?;

    let tmp = path.with_extension("json.tmp");
    {
        use std::io::Write;

        let mut options = std::fs::OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp)?;
        file.write_all(&content)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

/// Write both keys of `pair`; if either write fails, both keys are removed
/// so a half-written pair is never left behind
#[cfg(any(target_arch = "wasm32", test))]
fn write_keys<E>(
    pair: &CredentialPair,
    mut set: impl FnMut(&str, &str) -> Result<(), E>,
    mut remove: impl FnMut(&str),
) -> Result<(), E> {
    let result = set(ACCESS_KEY, &pair.access).and_then(|()| set(REFRESH_KEY, &pair.refresh));
    if result.is_err() {
        remove(ACCESS_KEY);
        remove(REFRESH_KEY);
    }
    result
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserTokenStore;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{ACCESS_KEY, REFRESH_KEY, TokenStore};
    use hrdesk_core::CredentialPair;
    use web_sys::Storage;

    /// `localStorage`-backed store. Without a window (server rendering) it
    /// reads as empty and ignores writes.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct BrowserTokenStore;

    fn local_storage() -> Option<Storage> {
        web_sys::window().and_then(|w| w.local_storage().ok().flatten())
    }

    fn remove(storage: &Storage, key: &str) {
        if let Err(error) = storage.remove_item(key) {
            warn!(key, ?error, "failed to remove credential from localStorage");
        }
    }

    impl TokenStore for BrowserTokenStore {
        fn get(&self) -> Option<CredentialPair> {
            let storage = local_storage()?;
            let access = storage.get_item(ACCESS_KEY).ok().flatten()?;
            let refresh = storage.get_item(REFRESH_KEY).ok().flatten()?;
            Some(CredentialPair { access, refresh })
        }

        fn set(&self, pair: CredentialPair) {
            let Some(storage) = local_storage() else {
                return;
            };

            let written = super::write_keys(
                &pair,
                |key, value| storage.set_item(key, value),
                |key| remove(&storage, key),
            );
            if let Err(error) = written {
                warn!(?error, "failed to persist credentials to localStorage");
            }
        }

        fn clear(&self) {
            if let Some(storage) = local_storage() {
                remove(&storage, ACCESS_KEY);
                remove(&storage, REFRESH_KEY);
            }
        }
    }
}
