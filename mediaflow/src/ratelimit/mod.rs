//! Per-domain client-side rate limiting.
//!
//! A [`RateLimiterRegistry`] is an explicit, shareable handle holding one
//! [`RateLimitState`] per domain. [`RateLimitedTransport`] wraps any
//! [`Transport`](crate::transport::Transport) and spaces dispatches to the
//! same domain by at least its configured interval. Different domains never
//! delay each other.

mod registry;
mod transport;

pub use registry::{RateLimitState, RateLimiterRegistry};
pub use transport::{Dispatched, RateLimitedTransport};
