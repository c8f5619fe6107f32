//! Durable key-value store shared by the wizard and the playback protocol.
//!
//! The store is the only channel between independently loaded pages. Every
//! read and write is a separate operation with last-writer-wins semantics;
//! nothing here pretends to be transactional.

mod memory;

pub use memory::MemoryStore;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::log_warn;

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "[Store]";

pub mod keys {
    pub const RELEASES: &str = "sedonaReleases";
    pub const JOURNAL_ENTRIES: &str = "journalEntries";
    pub const MUSIC_CURRENT_TIME: &str = "musicCurrentTime";
    pub const MUSIC_ENABLED: &str = "backgroundMusicEnabled";
    pub const MUSIC_SHOULD_CONTINUE: &str = "musicShouldContinue";
    pub const MUSIC_PAUSED: &str = "musicPaused";
}

/// Origin-scoped string store that survives reloads.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Reads a string-encoded boolean (`'true'` / `'false'`).
///
/// Unreadable keys and any other value count as absent.
pub fn read_flag(store: &dyn DurableStore, key: &str) -> Option<bool> {
    match store.get(key) {
        Ok(Some(value)) => match value.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Ok(None) => None,
        Err(err) => {
            log_warn!("failed to read {key}: {err:#}");
            None
        }
    }
}

pub fn write_flag(store: &dyn DurableStore, key: &str, value: bool) {
    if let Err(err) = store.set(key, if value { "true" } else { "false" }) {
        log_warn!("failed to write {key}: {err:#}");
    }
}

/// Loads a JSON array as raw values. A missing key, an unavailable store or a
/// parse failure all yield an empty collection.
fn read_raw_list(store: &dyn DurableStore, key: &str) -> Vec<Value> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            log_warn!("store unavailable reading {key}, treating as empty: {err:#}");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Value>>(&raw) {
        Ok(items) => items,
        Err(err) => {
            log_warn!("corrupt list under {key}, treating as empty: {err}");
            Vec::new()
        }
    }
}

/// Typed view of a stored list. Entries that don't match `T` are skipped.
pub fn read_list<T: DeserializeOwned>(store: &dyn DurableStore, key: &str) -> Vec<T> {
    read_raw_list(store, key)
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

/// Appends one item to the list under `key` and returns the new length.
///
/// Existing entries are written back untouched, including ones this version
/// can't parse.
pub fn append_to_list<T: Serialize>(
    store: &dyn DurableStore,
    key: &str,
    item: &T,
) -> Result<usize> {
    let mut items = read_raw_list(store, key);
    let encoded_item = serde_json::to_value(item)
        .with_context(|| format!("failed to encode entry for {key}"))?;
    items.push(encoded_item);
    let encoded = serde_json::to_string(&items)?;
    store
        .set(key, &encoded)
        .with_context(|| format!("failed to write {key}"))?;
    Ok(items.len())
}

/// Last raw entry of a list, for callers that only need one field.
pub(crate) fn last_raw_entry(store: &dyn DurableStore, key: &str) -> Option<Value> {
    read_raw_list(store, key).pop()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::DurableStore;
    use anyhow::{bail, Result};

    /// Store whose every operation fails, as when storage is disabled.
    pub struct UnavailableStore;

    impl DurableStore for UnavailableStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            bail!("storage disabled")
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            bail!("storage disabled")
        }

        fn remove(&self, _key: &str) -> Result<()> {
            bail!("storage disabled")
        }
    }
}
