pub mod http_client;
mod schema;

pub use http_client::DEFAULT_SERVER_URL;
pub use schema::{run_get, run_upload, run_versions};

use crate::config::ServerConfig;
use crate::store::{SqliteStore, Store};

/// Open the catalog in the data directory, creating it and the schema if needed.
pub fn init_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    std::fs::create_dir_all(&config.data_dir)?;
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    Ok(store)
}
