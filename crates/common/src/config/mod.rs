//! Configuration management for the journalclub core
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Listing source configuration
    #[serde(default)]
    pub listing: ListingConfig,

    /// Local-author matcher configuration
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Meeting schedule configuration
    #[serde(default)]
    pub meeting: MeetingConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingConfig {
    /// Base URL that relative listing links are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Number of leading external ids hashed into the batch fingerprint
    #[serde(default = "default_fingerprint_width")]
    pub fingerprint_width: usize,
}

/// Thresholds for the two-stage local-author match.
///
/// The first-initial stage is strict to keep common surnames from matching;
/// the full-name stage is looser because listing spellings vary (initials,
/// middle names, transliterations). Both stages must accept a position.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatcherConfig {
    /// Minimum 0-100 similarity for the first-initial + last-name stage
    #[serde(default = "default_firstname_threshold")]
    pub firstname_threshold: f64,

    /// Minimum 0-100 similarity for the full-name stage
    #[serde(default = "default_fullname_threshold")]
    pub fullname_threshold: f64,

    /// Author positions at or past this index classify the paper as collab
    #[serde(default = "default_primary_position_cutoff")]
    pub primary_position_cutoff: usize,

    /// Fraction of matched positions with special affiliations above which
    /// the paper is marked as other-affiliation
    #[serde(default = "default_affiliation_majority")]
    pub affiliation_majority: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MeetingConfig {
    /// Local wall-clock time voting opens, "HH:MM"
    #[serde(default = "default_voting_start")]
    pub voting_start: String,

    /// Local wall-clock time voting closes, "HH:MM"
    #[serde(default = "default_voting_end")]
    pub voting_end: String,

    /// Weekdays on which the meeting happens
    #[serde(default = "default_meeting_days")]
    pub days: Vec<String>,

    /// Maximum days a paper may stay reserved
    #[serde(default = "default_reserve_days")]
    pub reserve_days: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_base_url() -> String { "https://arxiv.org".to_string() }
fn default_fingerprint_width() -> usize { 5 }
fn default_firstname_threshold() -> f64 { 93.0 }
fn default_fullname_threshold() -> f64 { 72.0 }
fn default_primary_position_cutoff() -> usize { 8 }
fn default_affiliation_majority() -> f64 { 0.5 }
fn default_voting_start() -> String { "21:00".to_string() }
fn default_voting_end() -> String { "10:29".to_string() }
fn default_meeting_days() -> Vec<String> {
    ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}
fn default_reserve_days() -> u32 { 5 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "journalclub".to_string() }

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            fingerprint_width: default_fingerprint_width(),
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            firstname_threshold: default_firstname_threshold(),
            fullname_threshold: default_fullname_threshold(),
            primary_position_cutoff: default_primary_position_cutoff(),
            affiliation_majority: default_affiliation_majority(),
        }
    }
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            voting_start: default_voting_start(),
            voting_end: default_voting_end(),
            days: default_meeting_days(),
            reserve_days: default_reserve_days(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__DATABASE__URL=postgres://...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/journalclub".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            listing: ListingConfig::default(),
            matcher: MatcherConfig::default(),
            meeting: MeetingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
