// ABOUTME: Library root for ferry - injects local content into running containers.
// ABOUTME: The main binary is in main.rs.

pub mod archive;
pub mod config;
pub mod error;
pub mod inject;
pub mod runtime;
pub mod types;
