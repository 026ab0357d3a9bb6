//! Test-only helpers shared across crate unit tests.
//!
//! This module is only compiled for unit tests and provides small doubles
//! for the crate's injected seams so individual test files stay focused.

mod collecting_status;
mod scripted_transport;

pub use collecting_status::CollectingStatus;
pub use scripted_transport::{CapturedRequest, ScriptedTransport};
