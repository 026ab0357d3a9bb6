#![allow(dead_code, unused_imports)]

pub mod mock_server;
pub mod status;

pub use mock_server::{CapturedRequest, expect_requests, spawn_retry_server, tcp_listener};
pub use status::RecordingStatus;
