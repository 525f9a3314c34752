//! Auth types shared across Campus services.
//!
//! Provides JWT issuing/validation and the bearer-token `Principal` extractor.

pub mod principal;
pub mod token;
