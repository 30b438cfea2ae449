pub mod api;
pub mod config;
pub mod display;
pub mod host;
pub mod ipc;
pub mod memory;
pub mod process;
pub mod progress;
pub mod session;
