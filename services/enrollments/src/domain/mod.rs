pub mod access;
pub mod conversion;
pub mod repository;
pub mod types;
