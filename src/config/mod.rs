//! Configuration schema and loading.

pub mod loader;
pub mod schema;

pub use loader::{get_config_path, get_data_dir, load_config, save_config};
pub use schema::{Config, DefaultsConfig, HistoryConfig, IdentityConfig, ProviderConfig};
