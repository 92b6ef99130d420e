//! Browser `localStorage` backend.
//! Persistent across page reloads. Synchronous, string values only.

use chatpad_core::ports::StoragePort;
use chatpad_types::{ChatError, Result};

const PROBE_KEY: &str = "__chatpad_probe__";

pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// Open `window.localStorage` and check that it accepts writes.
    /// Some private-browsing modes expose the object but throw on `setItem`.
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ChatError::Storage("No window object".to_string()))?;

        let storage = window
            .local_storage()
            .map_err(|e| ChatError::Storage(format!("{:?}", e)))?
            .ok_or_else(|| ChatError::Storage("localStorage not available".to_string()))?;

        storage
            .set_item(PROBE_KEY, "1")
            .and_then(|_| storage.remove_item(PROBE_KEY))
            .map_err(|e| ChatError::Storage(format!("localStorage not writable: {:?}", e)))?;

        Ok(Self { storage })
    }
}

impl StoragePort for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| ChatError::Storage(format!("{:?}", e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| ChatError::Storage(format!("{:?}", e)))
    }

    fn backend_name(&self) -> &str {
        "localStorage"
    }
}
