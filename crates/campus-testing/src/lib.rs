//! Test utilities for Campus services.
//!
//! Import in `#[cfg(test)]` blocks and `tests/` targets only, never in production code.

pub mod auth;
