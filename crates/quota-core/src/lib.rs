//! Shared plumbing for quota services: tracing setup, health probes,
//! the HTTP middleware stack and serde helpers.

pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
