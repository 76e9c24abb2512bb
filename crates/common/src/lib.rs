//! FuelForge Common Library
//!
//! Shared code for the FuelForge services including:
//! - Configuration management
//! - Error types and handling
//! - Session storage (in-memory and Redis)
//! - Metrics and logging setup

pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod session;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use session::{MemorySessionStore, RedisSessionStore, SessionStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "fuelforge_session";

/// Only files with this extension are accepted for upload
pub const ALLOWED_EXTENSION: &str = "pdf";
