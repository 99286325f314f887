//! HTTP server and reclamation sweep for Wisp.

pub mod error;
pub mod handlers;
pub mod ratelimit;
pub mod routes;
pub mod state;
pub mod sweep;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
