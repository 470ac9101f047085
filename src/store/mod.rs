mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the catalog index interface.
///
/// Lookups return `Ok(None)` when the row is absent. Nothing here deletes or
/// updates a schema version once recorded.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Application operations
    fn ensure_application(&self, name: &str) -> Result<i64>;
    fn find_application(&self, name: &str) -> Result<Option<Application>>;

    // Service operations
    fn ensure_service(&self, name: &str, application_id: i64) -> Result<i64>;
    fn find_service(&self, name: &str, application_id: i64) -> Result<Option<Service>>;

    // Schema version operations
    fn next_version(&self, scope: Scope) -> Result<i64>;

    /// Inserts one row. A version already taken in `scope` is [`crate::error::Error::Conflict`].
    fn record_version(
        &self,
        filename: &str,
        checksum: &str,
        version: i64,
        scope: Scope,
        path: &str,
    ) -> Result<i64>;

    fn resolve_version(
        &self,
        scope: Scope,
        selector: VersionSelector,
    ) -> Result<Option<SchemaVersion>>;

    /// All versions in `scope`, newest first.
    fn list_versions(&self, scope: Scope) -> Result<Vec<SchemaVersion>>;
}
