pub mod disk;
pub mod memory;

use crate::core::cache::KeyValueStore;
use crate::core::config::AppConfig;
use disk::DiskStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::warn;

/// The store a run works against.
pub struct OpenedStore {
    pub store: Arc<dyn KeyValueStore>,
    /// False when the data only lives as long as the process, in which case
    /// the daily query counter resets on every run.
    pub persistent: bool,
}

/// Opens the persistent store under the configured data directory. Falls
/// back to an in-memory store when the disk store cannot be opened, e.g.
/// while another process holds it.
pub fn open_store(config: &AppConfig) -> OpenedStore {
    let opened = config
        .default_data_path()
        .and_then(|path| DiskStore::open(&path));

    match opened {
        Ok(store) => OpenedStore {
            store: Arc::new(store),
            persistent: true,
        },
        Err(e) => {
            warn!(error = %e, "Persistent store unavailable, using memory store");
            OpenedStore {
                store: Arc::new(MemoryStore::new()),
                persistent: false,
            }
        }
    }
}
