pub mod dto;
pub mod response;
mod router;
mod schemas;

pub use router::{AppState, create_router};
pub use schemas::MAX_UPLOAD_SIZE;
