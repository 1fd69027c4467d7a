//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Request body limit in MB (default: 15)
    pub body_limit_mb: usize,
    /// Maximum size per uploaded file in MB (default: 5)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 60)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Root directory for stored photo/document artifacts (default: ./uploads)
    pub upload_dir: PathBuf,
    /// Directory holding the recognition model (default: ./models)
    pub model_dir: PathBuf,
    /// Gemini API key (evaluator degrades to human review when unset)
    pub gemini_api_key: Option<String>,
    /// Gemini model name (default: gemini-2.5-flash)
    pub gemini_model: String,
    /// Evaluator call timeout in seconds (default: 30)
    pub evaluator_timeout_secs: u64,
    /// Webhook notification timeout in seconds (default: 10)
    pub notify_timeout_secs: u64,
    /// Review-team webhook pinged on human escalation (optional)
    pub review_webhook_url: Option<String>,
    /// Public base URL used in review links (default: http://localhost:3000)
    pub public_base_url: String,
    /// Whether a reviewer may re-decide an already-terminal dossier (default: true)
    pub allow_redecision: bool,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            body_limit_mb: 15,
            max_file_size_mb: 5,
            timeout_secs: 60,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            upload_dir: PathBuf::from("./uploads"),
            model_dir: PathBuf::from("./models"),
            gemini_api_key: None,
            gemini_model: veriface_core::evaluator::DEFAULT_GEMINI_MODEL.to_string(),
            evaluator_timeout_secs: 30,
            notify_timeout_secs: 10,
            review_webhook_url: None,
            public_base_url: "http://localhost:3000".to_string(),
            allow_redecision: true,
            database_max_connections: 20,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let body_limit_mb = std::env::var("BODY_LIMIT_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.body_limit_mb);

        let max_file_size_mb = std::env::var("MAX_FILE_SIZE_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_file_size_mb);

        let timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_secs);

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limit_per_sec = std::env::var("RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_per_sec);

        let rate_limit_burst = std::env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_burst);

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir);

        let model_dir = std::env::var("MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_dir);

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model);

        let evaluator_timeout_secs = std::env::var("EVALUATOR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.evaluator_timeout_secs);

        let notify_timeout_secs = std::env::var("NOTIFY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.notify_timeout_secs);

        let review_webhook_url = std::env::var("REVIEW_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.is_empty() && u != "undefined");

        let public_base_url =
            std::env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url);

        let allow_redecision = std::env::var("ALLOW_REDECISION")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(defaults.allow_redecision);

        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.database_max_connections);

        Self {
            port,
            host,
            body_limit_mb,
            max_file_size_mb,
            timeout_secs,
            rate_limit_enabled,
            rate_limit_per_sec,
            rate_limit_burst,
            upload_dir,
            model_dir,
            gemini_api_key,
            gemini_model,
            evaluator_timeout_secs,
            notify_timeout_secs,
            review_webhook_url,
            public_base_url,
            allow_redecision,
            database_max_connections,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Maximum file size in bytes
    pub fn max_file_size(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}
