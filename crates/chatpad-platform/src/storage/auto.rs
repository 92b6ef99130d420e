//! Pick the storage backend and read the startup configuration.
//!
//! Priority for `Auto`: localStorage → Memory (fallback).

use std::rc::Rc;
use chatpad_core::ports::StoragePort;
use chatpad_types::config::{AppConfig, StorageBackendType, StorageConfig, APP_CONFIG_KEY};
use super::{LocalStorage, MemoryStorage};

/// Open the configured backend. Returns a trait object so callers are
/// backend-agnostic; never fails, memory is the last resort.
pub fn open_storage(config: &StorageConfig) -> Rc<dyn StoragePort> {
    match config.backend {
        StorageBackendType::Memory => {
            log::info!("Storage backend: memory (configured)");
            Rc::new(MemoryStorage::new())
        }
        StorageBackendType::LocalStorage => match LocalStorage::open() {
            Ok(local) => {
                log::info!("Storage backend: localStorage (configured)");
                Rc::new(local)
            }
            Err(e) => {
                log::error!(
                    "localStorage was configured but is unavailable ({}); nothing will persist",
                    e
                );
                Rc::new(MemoryStorage::new())
            }
        },
        StorageBackendType::Auto => auto_detect_storage(),
    }
}

/// Try localStorage first (persistent), fall back to memory.
pub fn auto_detect_storage() -> Rc<dyn StoragePort> {
    match LocalStorage::open() {
        Ok(local) => {
            log::info!("Storage backend: localStorage");
            Rc::new(local)
        }
        Err(e) => {
            log::warn!("localStorage unavailable ({}), falling back to memory", e);
            Rc::new(MemoryStorage::new())
        }
    }
}

/// Read the `AppConfig` override stored under `chatpad-config`.
/// Absent or unreadable entries give the default configuration.
pub fn load_app_config(storage: &dyn StoragePort) -> AppConfig {
    match storage.get(APP_CONFIG_KEY) {
        Ok(Some(raw)) => match serde_json::from_str::<AppConfig>(&raw) {
            Ok(config) => {
                log::info!("Config restored from {}", storage.backend_name());
                config
            }
            Err(e) => {
                log::warn!("Ignoring stored config: {}", e);
                AppConfig::default()
            }
        },
        Ok(None) => AppConfig::default(),
        Err(e) => {
            log::warn!("Failed to read stored config: {}", e);
            AppConfig::default()
        }
    }
}
