//! HTTP API layer for qanda.
//!
//! - **Endpoints**: users, questions, answers, votes and tags under `/api`
//! - **Extractors**: authenticated and optional users
//! - **Middleware**: bearer-token authentication
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
