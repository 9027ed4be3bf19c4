//! Logic Module - Business Logic & Engines
//!
//! Chứa các engines xử lý: Policy, Probe, Actuator, Fixer loop.
//!
//! ## Layout
//! - `policy/` - Whitelist rules, matching, decision
//! - `actuator/` - HTTP endpoint + keyboard shortcut transports
//! - `fixer/` - Control loop with conflict back-off

// Core modules
pub mod config;
pub mod control;
pub mod processes;
pub mod probe;
pub mod watch;

// Engines
pub mod policy;
pub mod actuator;
pub mod fixer;

// Platform
pub mod win32;
