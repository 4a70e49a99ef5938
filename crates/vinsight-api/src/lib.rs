//! HTTP API for uploading videos, running analyses and serving keyframes.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use response::{ApiResponse, Envelope};
pub use routes::create_router;
pub use state::AppState;
