pub mod config;
pub mod db;
pub mod error;

// Search index
pub mod indexer;

// HTTP API
pub mod api;

// Command line
pub mod cli;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
