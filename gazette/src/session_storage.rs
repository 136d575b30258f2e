//! The one piece of client state that survives a restart: whether the user has
//! signed in before. No token is ever written.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

pub trait SessionStorage: Send + Sync {
    fn has_session(&self) -> bool;

    /// Failures are logged; the flag is only a hint for silent restore.
    fn set_has_session(&self, value: bool);
}

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    flag: AtomicBool,
}

impl MemorySessionStorage {
    pub fn new(has_session: bool) -> Self {
        Self {
            flag: AtomicBool::new(has_session),
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn has_session(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn set_has_session(&self, value: bool) {
        self.flag.store(value, Ordering::SeqCst);
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFlag {
    has_session: bool,
}

/// Keeps the flag in a small JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn has_session(&self) -> bool {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str::<SessionFlag>(&content).ok())
            .map(|flag| flag.has_session)
            .unwrap_or(false)
    }

    fn set_has_session(&self, value: bool) {
        let flag = SessionFlag { has_session: value };
        let result = serde_json::to_string(&flag)
            .map_err(std::io::Error::from)
            .and_then(|content| std::fs::write(&self.path, content));
        if let Err(error) = result {
            warn!(path = %self.path.display(), %error, "could not persist session flag");
        }
    }
}
