//! Translation server that keeps a single engine resident in memory.
//!
//! Requests are routed to a registered language-pair model, directly or by
//! pivoting through a hub language. Only one engine instance exists at a
//! time; switching pairs evicts the resident engine and loads the next one,
//! with concurrent loads of the same pair collapsed into one.

pub mod activity;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod language;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod server;
pub mod slot;
pub mod translator;

pub use error::{Result, TranslateError};
