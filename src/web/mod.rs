//! Stats HTTP service for tagwatch.
//!
//! Serves collector status and tag reports as JSON. The service reads the
//! store and never writes to it.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_health_router, create_router};
pub use server::StatsServer;
