//! Cooperative cancellation for long-running fetches.
//!
//! A [`CancellationToken`] is checked between pages and raced against every
//! suspension point (rate-limit waits and in-flight requests).

mod token;

pub use token::CancellationToken;
