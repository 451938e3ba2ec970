//! HTTP API server for external control
//!
//! This module provides a REST API for controlling the recording session:
//! - POST /session/start - Start the recording session
//! - POST /session/stop - Stop the recording session
//! - GET /session - State, transcript, and counters
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
