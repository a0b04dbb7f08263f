//! HTTP API.
//!
//! - `routes`: shared state, router assembly, server startup
//! - `tasks` / `subtasks` / `boards`: Kanban endpoints
//! - `status`: agent status probe endpoint
//! - `error`: JSON error responses

mod boards;
mod error;
pub mod routes;
mod status;
mod subtasks;
mod tasks;

pub use error::{ApiError, ApiJson};
pub use routes::{router, serve, AppState};
