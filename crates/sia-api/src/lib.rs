//! # sia-api
//!
//! HTTP surface of the explorer:
//! - element, chain, address, and transaction queries over the core
//! - vectorized batch endpoints
//! - passthrough to the external transaction pool and syncer
//!
//! All responses are JSON. Errors are HTTP 400 with a plain-text body;
//! basic authentication guards every route.

mod error;
pub mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, Syncer, TransactionPool};
