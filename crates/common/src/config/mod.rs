//! Configuration management for FuelForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Filesystem layout (uploads, knowledge base, logs)
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session storage configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// OCR fallback configuration
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Invoice accounting codes
    #[serde(default)]
    pub invoice: InvoiceConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum multipart body size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory receiving uploaded PDFs
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    /// Directory holding VendorLookup.csv and FinancialCalendar.csv
    #[serde(default = "default_knowledge_dir")]
    pub knowledge_dir: PathBuf,

    /// Directory for the processor log file
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Redis URL; sessions stay in memory when unset
    pub redis_url: Option<String>,

    /// Session TTL in seconds
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    /// Key prefix for Redis namespacing
    #[serde(default = "default_session_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OcrConfig {
    /// Run Tesseract on pages without a text layer
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Tesseract executable
    #[serde(default = "default_tesseract_cmd")]
    pub tesseract_cmd: String,

    /// Tesseract language pack
    #[serde(default = "default_ocr_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON console logging
    #[serde(default)]
    pub json_logging: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceConfig {
    /// Vendor name used when the invoice does not name one
    #[serde(default = "default_vendor_name")]
    pub vendor_name: String,

    /// Vendor number used when the lookup has no entry
    #[serde(default = "default_vendor_no")]
    pub vendor_no: String,

    #[serde(default = "default_trailer_gl")]
    pub trailer_gl: u32,

    #[serde(default = "default_trailer_store")]
    pub trailer_store: u32,

    #[serde(default = "default_shunt_gl")]
    pub shunt_gl: u32,

    #[serde(default = "default_shunt_store")]
    pub shunt_store: u32,

    /// Value of the "Uploading WK" column
    #[serde(default = "default_uploading_week")]
    pub uploading_week: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default)]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_request_timeout() -> u64 { 120 }
fn default_max_upload_bytes() -> usize { 64 * 1024 * 1024 }
fn default_uploads_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_knowledge_dir() -> PathBuf { PathBuf::from("knowledge") }
fn default_logs_dir() -> PathBuf { PathBuf::from("logs") }
fn default_session_ttl() -> u64 { 3600 }
fn default_session_prefix() -> String { "fuelforge".to_string() }
fn default_enabled() -> bool { true }
fn default_tesseract_cmd() -> String { "tesseract".to_string() }
fn default_ocr_language() -> String { "eng".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_vendor_name() -> String { "BP AUSTRALIA".to_string() }
fn default_vendor_no() -> String { "96029099".to_string() }
fn default_trailer_gl() -> u32 { 640520 }
fn default_trailer_store() -> u32 { 8409 }
fn default_shunt_gl() -> u32 { 432211 }
fn default_shunt_store() -> u32 { 8682 }
fn default_uploading_week() -> String { "WK 01".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            knowledge_dir: default_knowledge_dir(),
            logs_dir: default_logs_dir(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: default_session_ttl(),
            key_prefix: default_session_prefix(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            tesseract_cmd: default_tesseract_cmd(),
            language: default_ocr_language(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            vendor_name: default_vendor_name(),
            vendor_no: default_vendor_no(),
            trailer_gl: default_trailer_gl(),
            trailer_store: default_trailer_store(),
            shunt_gl: default_shunt_gl(),
            shunt_store: default_shunt_store(),
            uploading_week: default_uploading_week(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__SERVER__PORT=5001
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get session TTL as Duration
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session.ttl_secs)
    }

    pub fn vendor_lookup_path(&self) -> PathBuf {
        self.storage.knowledge_dir.join("VendorLookup.csv")
    }

    pub fn financial_calendar_path(&self) -> PathBuf {
        self.storage.knowledge_dir.join("FinancialCalendar.csv")
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.storage.logs_dir.join("processor.log")
    }
}
