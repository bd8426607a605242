// Domain module - Configuration and error types
pub mod config;
pub mod error;
