//! CLI command implementations.

pub mod broadcast;
pub mod distribution;
pub mod init;
pub mod mapping;
pub mod route;
