//! Pipeline configuration and its persistence

mod store;
mod types;

pub use store::{ConfigStore, OpenStore, SqliteConfigStore, StorageError, StorageResult};
pub use types::{
    upgrade, ConfigError, EnhancementConfig, FallbackBehavior, PerformanceMode, CONFIG_VERSION,
    DEFAULT_STAGE_TIMEOUT_MS,
};
