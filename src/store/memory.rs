use std::{collections::HashMap, sync::RwLock};

use anyhow::{anyhow, Result};

use super::DurableStore;

/// Process-local store. Used by tests and by headless hosts that don't need
/// persistence across restarts.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.data.read().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.data.write().map_err(|_| anyhow!("memory store poisoned"))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.data.write().map_err(|_| anyhow!("memory store poisoned"))?;
        guard.remove(key);
        Ok(())
    }
}
