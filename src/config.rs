//! Layered application settings.
//!
//! Sources, lowest priority first: built-in defaults, `config/default.toml`,
//! `config/{RUN_ENV}.toml`, then `APP__SECTION__KEY` environment variables
//! (for example `APP__AUTH__JWT_SECRET` or `APP__SERVER__PORT`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{collections::HashSet, env, path::Path, time::Duration};
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

const CONFIG_DIR: &str = "config";
const DEFAULT_RUN_ENV: &str = "development";

/// Secret shipped in `config/default.toml`; refused outside development.
pub const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// `development`, `test`, `staging` or `production`
    #[serde(default = "default_run_env")]
    pub environment: String,
    #[validate]
    #[serde(default)]
    pub server: ServerSettings,
    #[validate]
    #[serde(default)]
    pub database: DatabaseSettings,
    #[validate]
    pub auth: AuthSettings,
    #[validate]
    #[serde(default)]
    pub logging: LogSettings,
    #[validate]
    #[serde(default)]
    pub uploads: UploadSettings,
    #[validate]
    #[serde(default)]
    pub business: BusinessSettings,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// Comma separated list of browser origins
    pub cors_allowed_origins: Option<String>,
    pub cors_allow_any_origin: bool,
    pub cors_allow_credentials: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
        }
    }
}

impl ServerSettings {
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSettings {
    #[validate(length(min = 1))]
    pub url: String,
    /// Apply pending migrations at startup
    pub auto_migrate: bool,
    #[validate(range(min = 1, max = 512))]
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    /// Applied to every pooled SQLite connection
    pub sqlite_busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://asbm_erp.db?mode=rwc".into(),
            auto_migrate: true,
            max_connections: 16,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            acquire_timeout_secs: 8,
            sqlite_busy_timeout_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AuthSettings {
    #[validate(custom = "validate_jwt_secret")]
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    #[serde(default = "default_access_ttl")]
    #[validate(range(min = 60, max = 86400))]
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_ttl")]
    #[validate(range(min = 3600, max = 2592000))]
    pub refresh_ttl_secs: u64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
}

impl AuthSettings {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
            issuer: default_issuer(),
            audience: default_audience(),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    #[validate(custom = "validate_log_level")]
    pub level: String,
    /// Emit one JSON object per event
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct UploadSettings {
    /// Root for profile pictures, product images, HR documents and resources
    #[validate(length(min = 1))]
    pub dir: String,
    #[validate(range(min = 1))]
    pub max_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: "uploads".into(),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct BusinessSettings {
    /// Fraction added on top of each order line, e.g. `0.15`
    #[validate(range(min = 0.0, max = 1.0))]
    pub tax_rate: f64,
    #[validate(length(min = 1, max = 8))]
    pub currency: String,
}

impl Default for BusinessSettings {
    fn default() -> Self {
        Self {
            tax_rate: 0.15,
            currency: "ETB".into(),
        }
    }
}

impl AppConfig {
    /// Defaults for every section around the given database and signing secret
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            environment: default_run_env(),
            server: ServerSettings::default(),
            database: DatabaseSettings {
                url: database_url.into(),
                ..DatabaseSettings::default()
            },
            auth: AuthSettings::new(jwt_secret),
            logging: LogSettings::default(),
            uploads: UploadSettings::default(),
            business: BusinessSettings::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Without explicit origins, CORS is only opened in development or on request
    pub fn permissive_cors(&self) -> bool {
        self.is_development() || self.server.cors_allow_any_origin
    }

    /// Rules that span sections or depend on the environment
    fn check_environment_rules(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let origins = self.server.cors_origins();

        if origins.is_empty() && !self.permissive_cors() {
            errors.add(
                "server",
                invalid(
                    "cors_origins_required",
                    "set APP__SERVER__CORS_ALLOWED_ORIGINS or APP__SERVER__CORS_ALLOW_ANY_ORIGIN=true",
                ),
            );
        }

        if self.is_production() {
            let wildcard = origins.iter().any(|origin| origin == "*");
            if wildcard {
                errors.add(
                    "server",
                    invalid("cors_wildcard", "wildcard origins are refused in production"),
                );
            }
            if self.server.cors_allow_credentials && (wildcard || self.server.cors_allow_any_origin) {
                errors.add(
                    "server",
                    invalid(
                        "cors_credentials",
                        "credentials cannot be shared with any-origin CORS",
                    ),
                );
            }
        }

        if !self.is_development() && self.auth.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            errors.add(
                "auth",
                invalid(
                    "jwt_secret_dev_default",
                    "the bundled development secret is only accepted in development",
                ),
            );
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn default_run_env() -> String {
    DEFAULT_RUN_ENV.into()
}

fn default_access_ttl() -> u64 {
    3600
}

fn default_refresh_ttl() -> u64 {
    7 * 24 * 3600
}

fn default_issuer() -> String {
    "asbm-erp".into()
}

fn default_audience() -> String {
    "asbm-erp-clients".into()
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(invalid(
            "log_level",
            "expected one of trace, debug, info, warn, error",
        )),
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    const PLACEHOLDERS: [&str; 3] = [
        "CHANGE_THIS_SECRET_IN_PRODUCTION",
        "your-secret-key",
        "default-secret-key",
    ];
    const WEAK_FRAGMENTS: [&str; 4] = ["changeme", "password", "12345", "abcdef"];

    let secret = secret.trim();
    let lower = secret.to_ascii_lowercase();
    let distinct = secret.chars().collect::<HashSet<_>>().len();

    let problem = if secret.len() < 64 {
        Some("must be at least 64 characters")
    } else if PLACEHOLDERS.iter().any(|p| secret.eq_ignore_ascii_case(p)) {
        Some("is a placeholder value")
    } else if WEAK_FRAGMENTS.iter().any(|f| lower.contains(f)) {
        Some("contains a guessable fragment")
    } else if distinct < 10 {
        Some("needs at least 10 distinct characters")
    } else {
        None
    };

    match problem {
        Some(message) => Err(invalid("jwt_secret", message)),
        None => Ok(()),
    }
}

/// Reads and validates settings for the environment named by `RUN_ENV` (or `APP_ENV`)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_RUN_ENV.to_string());
    info!(environment = %run_env, "Loading configuration");

    if !Path::new(CONFIG_DIR).is_dir() {
        info!("No '{}' directory; using defaults and environment variables", CONFIG_DIR);
    }

    let settings = Config::builder()
        .set_default("environment", run_env.clone())?
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_env}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if settings.get_string("auth.jwt_secret").is_err() {
        error!("auth.jwt_secret is not configured");
        return Err(ConfigError::NotFound(
            "auth.jwt_secret is required; set APP__AUTH__JWT_SECRET".into(),
        )
        .into());
    }

    let app_config: AppConfig = settings.try_deserialize()?;
    app_config
        .validate()
        .and_then(|_| app_config.check_environment_rules())
        .map_err(|e| {
            error!("Configuration rejected: {}", e);
            AppConfigError::Validation(e)
        })?;

    info!("Configuration loaded");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const STRONG_SECRET: &str =
        "Xq7r!Lm2pZ9vK4tW8yB3nF6hJ1sD5gC0aE-uR_iO.oP~Qw#Tz%Vy&Ux*Nk@Mj^Hb";

    fn production() -> AppConfig {
        let mut cfg = AppConfig::new("sqlite::memory:", STRONG_SECRET);
        cfg.environment = "production".into();
        cfg
    }

    #[test]
    fn defaults_pass_field_validation() {
        assert!(AppConfig::new("sqlite::memory:", STRONG_SECRET).validate().is_ok());
    }

    #[test]
    fn production_needs_origins_or_opt_in() {
        let mut cfg = production();
        assert!(cfg.check_environment_rules().is_err());

        cfg.server.cors_allowed_origins = Some("https://erp.asbm.example".into());
        assert!(cfg.check_environment_rules().is_ok());

        cfg.server.cors_allowed_origins = None;
        cfg.server.cors_allow_any_origin = true;
        assert!(cfg.check_environment_rules().is_ok());
    }

    #[test]
    fn production_refuses_wildcards_and_credentialed_any_origin() {
        let mut cfg = production();
        cfg.server.cors_allowed_origins = Some("https://erp.asbm.example, *".into());
        assert!(cfg.check_environment_rules().is_err());

        let mut cfg = production();
        cfg.server.cors_allow_any_origin = true;
        cfg.server.cors_allow_credentials = true;
        assert!(cfg.check_environment_rules().is_err());
    }

    #[test]
    fn dev_secret_only_in_development() {
        let mut cfg = production();
        cfg.server.cors_allowed_origins = Some("https://erp.asbm.example".into());
        cfg.auth.jwt_secret = DEV_DEFAULT_JWT_SECRET.into();
        assert!(cfg.check_environment_rules().is_err());

        cfg.environment = "development".into();
        assert!(cfg.check_environment_rules().is_ok());
    }

    #[test]
    fn origins_are_trimmed() {
        let mut server = ServerSettings::default();
        server.cors_allowed_origins = Some(" https://a.example , ,https://b.example".into());
        assert_eq!(server.cors_origins(), ["https://a.example", "https://b.example"]);
    }

    #[rstest]
    #[case::too_short("short-secret")]
    #[case::repeated(&"a".repeat(80))]
    #[case::weak_fragment("password_password_password_password_password_password_password_pw")]
    #[case::low_entropy(&"ab".repeat(40))]
    fn weak_secrets_are_rejected(#[case] secret: &str) {
        assert!(validate_jwt_secret(secret).is_err());
    }

    #[test]
    fn dev_default_secret_is_well_formed() {
        assert!(validate_jwt_secret(DEV_DEFAULT_JWT_SECRET).is_ok());
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(0.15, true)]
    #[case(1.5, false)]
    #[case(-0.1, false)]
    fn tax_rate_bounds(#[case] rate: f64, #[case] ok: bool) {
        let business = BusinessSettings {
            tax_rate: rate,
            ..BusinessSettings::default()
        };
        assert_eq!(business.validate().is_ok(), ok);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        assert!(validate_log_level("verbose").is_err());
        assert!(validate_log_level("DEBUG").is_ok());
    }
}
