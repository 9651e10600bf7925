//! In-memory registry of shared files

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::ShareError;
use crate::share_id::ShareId;

/// A file registered for sharing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareEntry {
    /// Identifier handed out in the share URL
    pub id: ShareId,
    /// Absolute path captured at registration time
    pub file_path: PathBuf,
}

impl ShareEntry {
    /// Base name of the shared file, used for titles and downloads
    pub fn file_name(&self) -> String {
        file_name_of(&self.file_path)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Check that `path` names an existing regular file and make it absolute
fn validate_file(path: &Path) -> Result<PathBuf, ShareError> {
    if path.as_os_str().is_empty() {
        return Err(ShareError::InvalidPath(PathBuf::new()));
    }

    let is_file = std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
    if !is_file {
        return Err(ShareError::InvalidPath(path.to_path_buf()));
    }

    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Entries in registration order; revoked slots become `None`
#[derive(Default)]
struct Entries {
    slots: Vec<Option<ShareEntry>>,
    index: HashMap<ShareId, usize>,
}

impl Entries {
    fn tombstones(&self) -> usize {
        self.slots.len() - self.index.len()
    }

    /// Drop revoked slots and rebuild the index, keeping order
    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some(entry) = entry {
                self.index.insert(entry.id, slot);
            }
        }
    }
}

/// Registry mapping share ids to file paths
///
/// Cloning is cheap and every clone sees the same entries.
#[derive(Clone, Default)]
pub struct ShareRegistry {
    entries: Arc<RwLock<Entries>>,
}

impl ShareRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and mint a new share id for it
    ///
    /// The same path may be registered any number of times; each call
    /// returns an independent id. Filesystem checks run on the blocking
    /// thread pool.
    ///
    /// # Arguments
    /// * `path` - File to share; relative paths are resolved against the
    ///   current directory
    ///
    /// # Returns
    /// * `Ok(ShareId)` - Fresh id for the new entry
    /// * `Err(ShareError::InvalidPath)` - `path` is empty or is not an
    ///   existing regular file; the registry is left untouched
    pub async fn register(&self, path: impl AsRef<Path>) -> Result<ShareId, ShareError> {
        let requested = path.as_ref().to_path_buf();
        let file_path = tokio::task::spawn_blocking(move || validate_file(&requested))
            .await
            .map_err(|e| ShareError::Io(std::io::Error::other(e)))??;

        let id = ShareId::generate();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let slot = entries.slots.len();
        tracing::info!("Registered share {} for {}", id, file_path.display());
        entries.slots.push(Some(ShareEntry { id, file_path }));
        entries.index.insert(id, slot);

        Ok(id)
    }

    /// Look up the path behind a share id
    ///
    /// Does not check that the file still exists.
    ///
    /// # Arguments
    /// * `id` - Share id to resolve
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Path captured at registration
    /// * `Err(ShareError::NotFound)` - Id was never issued or was revoked
    pub fn lookup(&self, id: &ShareId) -> Result<PathBuf, ShareError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .index
            .get(id)
            .and_then(|slot| entries.slots[*slot].as_ref())
            .map(|entry| entry.file_path.clone())
            .ok_or(ShareError::NotFound)
    }

    /// Revoke a share
    ///
    /// # Arguments
    /// * `id` - Share id to remove
    ///
    /// # Returns
    /// * `true` if the id was registered, `false` if it was unknown or
    ///   already revoked
    pub fn revoke(&self, id: &ShareId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let Some(slot) = entries.index.remove(id) else {
            return false;
        };
        entries.slots[slot] = None;

        if entries.tombstones() > entries.index.len() {
            entries.compact();
        }

        tracing::info!("Revoked share {}", id);
        true
    }

    /// All live entries in registration order
    pub fn list(&self) -> Vec<ShareEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.slots.iter().flatten().cloned().collect()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
