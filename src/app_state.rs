// Application state management

use std::sync::{Arc, Mutex};

use crate::config::{Config, StoreBackend};
use crate::engine::LedgerEngine;
use crate::error::LedgerError;
use crate::store::{EntityStore, MemoryStore, SledStore};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub engine: LedgerEngine,
    activity: Mutex<Vec<String>>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, LedgerError> {
        let store: Arc<dyn EntityStore> = match config.backend {
            StoreBackend::Sled => {
                tracing::info!("Opening sled store at {}", config.data_dir.display());
                Arc::new(SledStore::open(&config.data_dir)?)
            }
            StoreBackend::Memory => {
                tracing::info!("Using in-memory store, state is not persisted");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(store))
    }

    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            engine: LedgerEngine::new(store),
            activity: Mutex::new(Vec::new()),
        }
    }

    /// Append one line to the bounded activity feed
    pub fn log_activity(&self, emoji: &str, action: &str, details: &str) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let entry = format!("[{}] {} {} | {}", timestamp, emoji, action, details);
        tracing::info!("{}", entry);
        if let Ok(mut activity) = self.activity.lock() {
            activity.push(entry);
            if activity.len() > 1000 {
                activity.remove(0);
            }
        }
    }

    pub fn recent_activity(&self) -> Vec<String> {
        self.activity
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}
