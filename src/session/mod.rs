//! Recording session lifecycle
//!
//! This module provides the `SessionController` actor that manages:
//! - The session state machine (idle, starting, active, stopping)
//! - Audio capture ownership and chunk forwarding to the STT stream
//! - Partial vs. final transcript reconciliation
//! - Unified teardown across the two independently-failing resources
//! - Session statistics and observer events

pub mod config;
pub mod controller;
pub mod events;
pub mod stats;
pub mod transcript;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use events::{SessionError, SessionEvent, SessionState, StartReason};
pub use stats::{SessionSnapshot, SessionStats};
pub use transcript::Transcript;
