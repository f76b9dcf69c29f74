//! Command implementations for the CLI
//!
//! - serve: Run the demo server
//! - send: Ship one event through the configured transport
//! - config: Configuration display and validation

pub mod config;
pub mod send;
pub mod serve;
