//! Source-side session machinery
//!
//! `session` is the sans-IO WFD state machine; `server` wraps it in the
//! tokio listener and per-connection tasks; `events` is the notification
//! bridge toward the surrounding media pipeline.

pub mod config;
pub mod events;
pub mod server;
pub mod session;
