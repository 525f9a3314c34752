pub mod access;
pub mod auth;
pub mod conversion;
pub mod credentials;
pub mod enrollment;
pub mod institution;
pub mod simplified;
pub mod status;
