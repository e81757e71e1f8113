//! Core domain for the Telegram file client.
//!
//! This crate is HTTP-agnostic: the envelope codec, error taxonomy, progress
//! monitor and transfer supervision live here, the `reqwest` adapter lives in
//! `tgfile-client` behind the [`ports::FileBot`] port.

pub mod config;
pub mod domain;
pub mod envelope;
pub mod errors;
pub mod logging;
pub mod models;
pub mod ports;
pub mod progress;
pub mod session;
pub mod transfer;

pub use errors::{Error, Result};
