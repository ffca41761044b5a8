//! HTTP API module.
//!
//! This module provides the HTTP server, the API types and the pipeline
//! log stream.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{router, start_server};
pub use types::*;
pub use logs::*;
