//! Testing utilities for mediaflow sources.
//!
//! This module provides:
//! - A scripted transport that replays responses and records requests
//! - Response fixtures for AniList and AniDB parsers

pub mod fixtures;
mod transport;

pub use transport::ScriptedTransport;
