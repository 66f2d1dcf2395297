//! Runner protocol client: session setup, control commands, update frames,
//! and the background status listener.
//!
//! The canonical execution path serializes the graph to JSON and dispatches
//! it to a long-running runner process over TCP; the runner streams back
//! `#`-delimited node IDs as it executes. This module owns everything on the
//! client side of that boundary.

pub mod command;
pub mod config;
pub mod history;
mod listener;
pub mod session;
pub mod wire;

pub use command::RunnerCommand;
pub use config::SessionConfig;
pub use history::{ExecutionHistory, SessionShared, StatusUpdate};
pub use session::{RunnerSession, SessionError};
