pub mod config;
pub mod event;
pub mod handle_session;
pub mod reconcile;
pub mod state;
pub mod state_handler;
pub mod timing;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// A span of wall-clock time in milliseconds.
pub type DurationMs = i64;
