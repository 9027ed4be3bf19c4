//! API Module
//!
//! Console surface of the app.
//!
//! Structure:
//! - commands.rs: command parsing + execution against `LoopControl`
//! - shell.rs: stdin / Ctrl+C / mailbox event loop

pub mod commands;
pub mod shell;

pub use shell::{run, ExitReason};
