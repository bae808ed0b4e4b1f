//! Core domain + application logic for the JNTUK results watcher.
//!
//! This crate is intentionally messenger-agnostic: Telegram lives behind the
//! `MessagingPort` trait implemented in the adapter crate.

pub mod config;
pub mod domain;
pub mod errors;
pub mod fetch;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod state;
pub mod watch;

pub use errors::{Error, Result};
