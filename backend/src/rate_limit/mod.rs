//! Per-client request rate limiting.
//!
//! `limiter` holds the sliding-window state and its periodic sweep;
//! `middleware` applies it to every inbound request before any handler runs.

pub mod limiter;
pub mod middleware;

pub use limiter::RateLimiter;
