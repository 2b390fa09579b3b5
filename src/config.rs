// Runtime configuration loaded from the environment

use std::net::SocketAddr;
use std::path::PathBuf;

/// Which ledger store backend to run on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Persistent sled database under the data directory
    Sled,
    /// In-process store, state is lost on shutdown
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub backend: StoreBackend,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let bind = std::env::var("STACK_BIND")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 4000)));

        let data_dir = std::env::var("STACK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let backend = match std::env::var("STACK_STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Sled,
        };

        Self {
            bind,
            data_dir,
            backend,
        }
    }
}
