//! clara-api: HTTP API for Clara
//!
//! Serves the web chat page and REST endpoints for chat, voice, memory,
//! status and model management. Built with axum.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod page;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{build_router, start_server, AppState};
