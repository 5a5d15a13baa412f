use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_RATE_PER_KM: f64 = 0.5;
const DEFAULT_STORE_COORDS_TTL_SECS: u64 = 3_600;
const DEFAULT_FEE_TTL_SECS: u64 = 86_400;
const DEFAULT_FEE_CACHE_CAPACITY: usize = 1_000;
const DEFAULT_FEE_CACHE_EVICT_BATCH: usize = 100;
const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_IMPORT_MAX_BYTES: usize = 2 * 1024 * 1024;
const DEV_DEFAULT_JWT_SECRET: &str =
    "pharmahub_development_only_jwt_secret_0123456789_abcdefghijklmnopqrstuvwxyz";

/// Delivery fee calculation settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Fee charged per kilometre of road-free (great-circle) distance
    #[serde(default = "default_rate_per_km")]
    #[validate(custom = "validate_rate_per_km")]
    pub rate_per_km: f64,

    /// How long cached store coordinates stay fresh
    #[serde(default = "default_store_coords_ttl_secs")]
    pub store_coords_ttl_secs: u64,

    /// How long a computed fee for a coordinate pair stays fresh
    #[serde(default = "default_fee_ttl_secs")]
    pub fee_ttl_secs: u64,

    /// Fee cache entries above which eviction kicks in
    #[serde(default = "default_fee_cache_capacity")]
    pub fee_cache_capacity: usize,

    /// Number of soonest-to-expire entries dropped per eviction
    #[serde(default = "default_fee_cache_evict_batch")]
    pub fee_cache_evict_batch: usize,
}

impl DeliveryConfig {
    pub fn store_coords_ttl(&self) -> Duration {
        Duration::from_secs(self.store_coords_ttl_secs)
    }

    pub fn fee_ttl(&self) -> Duration {
        Duration::from_secs(self.fee_ttl_secs)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            rate_per_km: default_rate_per_km(),
            store_coords_ttl_secs: default_store_coords_ttl_secs(),
            fee_ttl_secs: default_fee_ttl_secs(),
            fee_cache_capacity: default_fee_cache_capacity(),
            fee_cache_evict_batch: default_fee_cache_evict_batch(),
        }
    }
}

/// File upload settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    /// Maximum accepted upload size in bytes
    #[serde(default = "default_upload_max_bytes")]
    pub max_bytes: usize,

    /// MIME types accepted for image uploads, verified against magic bytes
    #[serde(default = "default_allowed_image_types")]
    pub allowed_image_types: Vec<String>,

    /// Maximum accepted CSV import size in bytes
    #[serde(default = "default_import_max_bytes")]
    pub import_max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_upload_max_bytes(),
            allowed_image_types: default_allowed_image_types(),
            import_max_bytes: default_import_max_bytes(),
        }
    }
}

/// Object storage settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Storage backend: "local" or "s3"
    #[serde(default = "default_storage_backend")]
    #[validate(custom = "validate_storage_backend")]
    pub backend: String,

    /// Root directory for the local backend
    #[serde(default = "default_storage_local_root")]
    pub local_root: String,

    /// Bucket name for the s3 backend
    #[serde(default)]
    pub s3_bucket: Option<String>,

    /// Region for the s3 backend
    #[serde(default)]
    pub s3_region: Option<String>,

    /// Endpoint override for S3-compatible stores (MinIO etc.)
    #[serde(default)]
    pub s3_endpoint: Option<String>,

    #[serde(default)]
    pub s3_access_key: Option<String>,

    #[serde(default)]
    pub s3_secret_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            local_root: default_storage_local_root(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
        }
    }
}

/// Outbound email settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// Email backend: "log" or "http"
    #[serde(default = "default_email_backend")]
    #[validate(custom = "validate_email_backend")]
    pub backend: String,

    /// HTTP API endpoint for the http backend
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_email_from")]
    pub from_address: String,

    #[serde(default)]
    pub from_name: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            backend: default_email_backend(),
            endpoint: None,
            api_key: None,
            from_address: default_email_from(),
            from_name: None,
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key (minimum 64 characters)
    #[validate(length(min = 64), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Customer token lifetime in seconds
    pub jwt_expiration: usize,

    /// Admin token lifetime in seconds
    #[serde(default = "default_admin_jwt_expiration")]
    pub admin_jwt_expiration: usize,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated list of allowed CORS origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Explicit opt-in to permissive CORS outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    #[serde(default)]
    pub cors_allow_credentials: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Capacity of the in-process event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// JWT issuer name
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Stock level at or below which a product counts as low-stock in reports
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,

    /// Legal order status transitions, keyed by current status.
    /// Overridable per deployment; unknown status names are rejected at startup.
    #[serde(default = "default_order_transitions")]
    pub order_transitions: HashMap<String, Vec<String>>,

    /// Delivery fee calculation settings
    #[serde(default)]
    #[validate]
    pub delivery: DeliveryConfig,

    /// File upload settings
    #[serde(default)]
    #[validate]
    pub uploads: UploadConfig,

    /// Object storage settings
    #[serde(default)]
    #[validate]
    pub storage: StorageConfig,

    /// Outbound email settings
    #[serde(default)]
    #[validate]
    pub email: EmailConfig,
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Creates a new configuration with defaults for everything not passed in
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            admin_jwt_expiration: default_admin_jwt_expiration(),
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            low_stock_threshold: default_low_stock_threshold(),
            order_transitions: default_order_transitions(),
            delivery: DeliveryConfig::default(),
            uploads: UploadConfig::default(),
            storage: StorageConfig::default(),
            email: EmailConfig::default(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if self.storage.backend.eq_ignore_ascii_case("s3") {
            let missing = self.storage.s3_bucket.is_none()
                || self.storage.s3_region.is_none()
                || self.storage.s3_access_key.is_none()
                || self.storage.s3_secret_key.is_none();
            if missing {
                let mut err = ValidationError::new("s3_credentials_required");
                err.message = Some(
                    "storage.backend=s3 requires s3_bucket, s3_region, s3_access_key and s3_secret_key".into(),
                );
                errors.add("storage", err);
            }
        }

        if self.email.backend.eq_ignore_ascii_case("http") && self.email.endpoint.is_none() {
            let mut err = ValidationError::new("email_endpoint_required");
            err.message = Some("email.backend=http requires email.endpoint".into());
            errors.add("email", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_admin_jwt_expiration() -> usize {
    28_800 // 8 hours
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_auth_issuer() -> String {
    "pharmahub-api".to_string()
}

fn default_auth_audience() -> String {
    "pharmahub".to_string()
}

fn default_low_stock_threshold() -> i32 {
    10
}

fn default_rate_per_km() -> f64 {
    DEFAULT_RATE_PER_KM
}

fn default_store_coords_ttl_secs() -> u64 {
    DEFAULT_STORE_COORDS_TTL_SECS
}

fn default_fee_ttl_secs() -> u64 {
    DEFAULT_FEE_TTL_SECS
}

fn default_fee_cache_capacity() -> usize {
    DEFAULT_FEE_CACHE_CAPACITY
}

fn default_fee_cache_evict_batch() -> usize {
    DEFAULT_FEE_CACHE_EVICT_BATCH
}

fn default_upload_max_bytes() -> usize {
    DEFAULT_UPLOAD_MAX_BYTES
}

fn default_import_max_bytes() -> usize {
    DEFAULT_IMPORT_MAX_BYTES
}

fn default_allowed_image_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/webp".to_string(),
    ]
}

fn default_storage_backend() -> String {
    "local".to_string()
}

fn default_storage_local_root() -> String {
    "data/uploads".to_string()
}

fn default_email_backend() -> String {
    "log".to_string()
}

fn default_email_from() -> String {
    "orders@pharmahub.example".to_string()
}

/// Default legal transitions for the order lifecycle.
/// Cancellation is allowed until the order leaves the warehouse.
fn default_order_transitions() -> HashMap<String, Vec<String>> {
    let mut transitions = HashMap::new();
    transitions.insert(
        "new".to_string(),
        vec!["confirmed".to_string(), "cancelled".to_string()],
    );
    transitions.insert(
        "confirmed".to_string(),
        vec!["packing".to_string(), "cancelled".to_string()],
    );
    transitions.insert(
        "packing".to_string(),
        vec!["ready".to_string(), "cancelled".to_string()],
    );
    transitions.insert(
        "ready".to_string(),
        vec!["dispatched".to_string(), "cancelled".to_string()],
    );
    transitions.insert(
        "dispatched".to_string(),
        vec!["delivered".to_string(), "cancelled".to_string()],
    );
    transitions.insert("delivered".to_string(), Vec::new());
    transitions.insert("cancelled".to_string(), Vec::new());
    transitions
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    // Enforce minimum length (should be 64+ for HS256)
    if trimmed.len() < 64 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must be at least 64 characters for adequate security".into());
        return Err(err);
    }

    // Reject known insecure defaults and obvious placeholders
    const DISALLOWED: [&str; 3] = [
        "CHANGE_THIS_SECRET_IN_PRODUCTION",
        "your-secret-key",
        "default-secret-key",
    ];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be overridden with a secure random value".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    // Check for minimum character diversity
    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must have at least 10 unique characters for adequate entropy".into());
        return Err(err);
    }

    Ok(())
}

fn validate_rate_per_km(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || rate < 0.0 {
        let mut err = ValidationError::new("rate_per_km");
        err.message = Some("delivery.rate_per_km must be a finite non-negative value".into());
        return Err(err);
    }
    Ok(())
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_storage_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "local" | "s3" => Ok(()),
        _ => {
            let mut err = ValidationError::new("storage_backend");
            err.message = Some("Must be one of: local, s3".into());
            Err(err)
        }
    }
}

fn validate_email_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "log" | "http" => Ok(()),
        _ => {
            let mut err = ValidationError::new("email_backend");
            err.message = Some("Must be one of: log, http".into());
            Err(err)
        }
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("pharmahub_api={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Docker config (config/docker.toml) if DOCKER env var is set
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // NOTE: jwt_secret has no default - it MUST be provided via environment variable
    // or config file. This prevents accidental use of insecure defaults in production.
    let mut builder = Config::builder()
        .set_default("database_url", "sqlite://pharmahub.db?mode=rwc")?
        .set_default("jwt_expiration", 86_400)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    if env::var("DOCKER").is_ok() {
        info!("Docker environment detected");
        builder =
            builder.add_source(File::with_name(&format!("{}/docker", CONFIG_DIR)).required(false));
    }

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // Check for jwt_secret before deserialization to provide a clear error message
    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET environment variable with a secure random string (minimum 64 characters).");
        error!("Generate a secure secret with: openssl rand -base64 64");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite://pharmahub.db?mode=memory".into(),
            "test_secret_long_enough_for_validation_0123456789_abcdefghijklmnop".into(),
            3600,
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://portal.example.com".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn s3_backend_requires_credentials() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        cfg.storage.backend = "s3".into();
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.storage.s3_bucket = Some("pharmahub-media".into());
        cfg.storage.s3_region = Some("eu-central-1".into());
        cfg.storage.s3_access_key = Some("AKIAEXAMPLE".into());
        cfg.storage.s3_secret_key = Some("secret".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn default_transitions_cover_full_lifecycle() {
        let transitions = default_order_transitions();
        assert_eq!(transitions["new"], vec!["confirmed", "cancelled"]);
        assert_eq!(transitions["ready"], vec!["dispatched", "cancelled"]);
        assert_eq!(transitions["dispatched"], vec!["delivered", "cancelled"]);
        assert!(transitions["delivered"].is_empty());
        assert!(transitions["cancelled"].is_empty());
    }

    #[test]
    fn weak_jwt_secrets_are_rejected() {
        assert!(validate_jwt_secret("short").is_err());
        assert!(validate_jwt_secret(&"a".repeat(80)).is_err());
        assert!(
            validate_jwt_secret("test_secret_long_enough_for_validation_0123456789_abcdefghijklmnop")
                .is_ok()
        );
    }
}
