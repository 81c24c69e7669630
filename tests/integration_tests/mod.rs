//! Integration tests module
//!
//! End-to-end tests for the relay, including:
//! - Welcome, paced thoughts and fan-out to several viewers
//! - Upstream HTTP source behaviour
//! - Source failures, origin rejection and disconnects

pub mod fixtures;
pub mod live_stream_test;
pub mod source_test;
