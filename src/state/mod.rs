use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;

/// Keys of items already announced, oldest first.
///
/// A key is `"{name} {year}"` for a movie, `"{series} Season {nn}"` for a
/// season and `"{series} S{nn}E{nn}"` for an episode. The set is capped:
/// marking beyond `max_entries` drops the oldest key, so a long-running
/// instance can re-announce something only after a hundred newer additions.
///
/// One lock guards both the in-memory queue and the backing file, so
/// check-then-mark races between webhook tasks collapse to a single winner.
pub struct NotifiedStore {
    keys: Mutex<VecDeque<String>>,
    path: PathBuf,
    max_entries: usize,
}

impl NotifiedStore {
    /// Open the store, loading any previously persisted keys.
    ///
    /// A missing file is a fresh start; an unreadable one is logged and
    /// treated the same way rather than blocking startup.
    pub fn load(path: PathBuf, max_entries: usize) -> Arc<Self> {
        let store = Arc::new(Self {
            keys: Mutex::new(VecDeque::new()),
            path,
            max_entries,
        });

        if let Err(e) = store.load_from_file() {
            tracing::warn!("Failed to load notified keys: {}", e);
        }

        store
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.lock().iter().any(|k| k == key)
    }

    /// Record a key as announced and persist the set.
    ///
    /// Re-marking an existing key is a no-op. When the cap is exceeded the
    /// oldest key is evicted first.
    pub fn mark(&self, key: &str) {
        let mut keys = self.keys.lock();
        if keys.iter().any(|k| k == key) {
            return;
        }

        keys.push_back(key.to_string());
        while keys.len() > self.max_entries {
            if let Some(evicted) = keys.pop_front() {
                tracing::info!("Notified set full, evicting oldest key: {}", evicted);
            }
        }

        if let Err(e) = save_to_file(&self.path, &keys) {
            tracing::error!("Failed to persist notified keys: {}", e);
        }
    }

    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }

    fn load_from_file(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let loaded: Vec<String> = serde_json::from_str(&content)?;

        let mut keys = self.keys.lock();
        *keys = VecDeque::from(loaded);
        while keys.len() > self.max_entries {
            keys.pop_front();
        }

        Ok(())
    }
}

fn save_to_file(path: &Path, keys: &VecDeque<String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(&keys.iter().collect::<Vec<_>>())?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Item ids with a classification task currently running.
///
/// Emby fires its webhook several times for one addition; only the task that
/// wins `try_begin` proceeds, the rest drop the event.
#[derive(Default)]
pub struct InFlight {
    ids: Mutex<HashSet<String>>,
}

impl InFlight {
    /// Claim an item id. Returns false when a task already holds it.
    pub fn try_begin(&self, id: &str) -> bool {
        self.ids.lock().insert(id.to_string())
    }

    /// Release an item id once its task is done, whatever the outcome.
    pub fn finish(&self, id: &str) {
        self.ids.lock().remove(id);
    }
}
