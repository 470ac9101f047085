//! The versioning engine: ingestion and resolution on top of the catalog
//! index ([`crate::store`]) and the blob tree ([`crate::blob`]).

pub mod document;
mod ingest;
mod resolve;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::blob::{BlobError, ContentStore};
use crate::error::Error;
use crate::store::Store;

pub struct Registry {
    store: Arc<dyn Store>,
    content: ContentStore,
    /// Serializes version allocation: read max, write blob, insert row.
    write_lock: Mutex<()>,
}

impl Registry {
    pub fn new(store: Arc<dyn Store>, content: ContentStore) -> Self {
        Self {
            store,
            content,
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}

/// Trims a service name; blank means the app-level scope.
fn normalize_service(service: Option<&str>) -> Option<&str> {
    service.map(str::trim).filter(|s| !s.is_empty())
}

impl From<BlobError> for Error {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::InvalidPath(message) => Error::InvalidInput(message),
            BlobError::Occupied(path) => Error::Conflict(format!("{path} already exists")),
            BlobError::NotFound => Error::Io(std::io::ErrorKind::NotFound.into()),
            BlobError::Io(e) => Error::Io(e),
        }
    }
}
