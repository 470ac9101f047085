pub mod path;
mod storage;

pub use storage::{APP_LEVEL_DIR, BlobError, ContentStore};
