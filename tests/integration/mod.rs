//! Integration tests for the loading screen pipeline
//!
//! These tests drive the public API end to end: frames written through
//! the transport's frame writer, decoded by the display client over a
//! real OS pipe, and full session lifecycles.

pub mod helpers;
pub mod pipe_display;
pub mod session_end_to_end;
