use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::net::IpAddr;

pub const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Upper bound for `ACCESS_COOKIE_MAX_AGE_HOURS`: one year.
pub const MAX_COOKIE_MAX_AGE_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct ParticipationConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub captcha: CaptchaConfig,
    pub location: LocationConfig,
    pub cookies: CookieConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct CaptchaConfig {
    pub enabled: bool,
    pub secret_key: Secret<String>,
    /// Public key handed to the browser widget.
    pub site_key: String,
    pub verify_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationBackend {
    /// Country pre-resolved by the edge network in a trusted header.
    Header,
    /// Local MaxMind `.mmdb` lookup keyed by client IP.
    Database,
}

#[derive(Debug, Clone)]
pub struct LocationConfig {
    pub backend: LocationBackend,
    pub country_header: String,
    pub city_header: String,
    pub database_path: String,
    /// Development only: substitute `test_ip` for private/loopback clients.
    pub allow_test_ip_fallback: bool,
    pub test_ip: IpAddr,
}

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub enabled: bool,
    pub max_age_hours: i64,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub verify_attempts: u32,
    pub verify_window_seconds: u64,
    /// Key on `X-Forwarded-For`/`X-Real-IP` instead of the socket peer. Only
    /// safe behind a proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

impl ParticipationConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;
        let captcha_enabled = parse_flag("CAPTCHA_ENABLED", true)?;

        let config = ParticipationConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("participation-service"), false)?,
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            captcha: CaptchaConfig {
                enabled: captcha_enabled,
                secret_key: Secret::new(if captcha_enabled {
                    get_env("RECAPTCHA_SECRET_KEY", None, is_prod)?
                } else {
                    String::new()
                }),
                site_key: get_env("RECAPTCHA_SITE_KEY", Some(""), false)?,
                verify_url: get_env(
                    "RECAPTCHA_VERIFY_URL",
                    Some(DEFAULT_RECAPTCHA_VERIFY_URL),
                    false,
                )?,
                timeout_seconds: parse_env("CAPTCHA_TIMEOUT_SECONDS", 10)?,
            },
            location: LocationConfig {
                backend: get_env("LOCATION_BACKEND", Some("header"), false)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                country_header: get_env(
                    "LOCATION_COUNTRY_HEADER",
                    Some("x-vercel-ip-country"),
                    false,
                )?
                .to_lowercase(),
                city_header: get_env("LOCATION_CITY_HEADER", Some("x-vercel-ip-city"), false)?
                    .to_lowercase(),
                database_path: get_env(
                    "GEOIP_DATABASE_PATH",
                    Some("GeoLite2-Country.mmdb"),
                    false,
                )?,
                allow_test_ip_fallback: parse_flag("ALLOW_TEST_IP_FALLBACK", false)?,
                test_ip: parse_env("TEST_FALLBACK_IP", IpAddr::from([8, 8, 8, 8]))?,
            },
            cookies: CookieConfig {
                enabled: parse_flag("ISSUE_ACCESS_COOKIES", true)?,
                max_age_hours: parse_env("ACCESS_COOKIE_MAX_AGE_HOURS", 24)?,
            },
            rate_limit: RateLimitConfig {
                verify_attempts: parse_env("RATE_LIMIT_VERIFY_ATTEMPTS", 10)?,
                verify_window_seconds: parse_env("RATE_LIMIT_VERIFY_WINDOW_SECONDS", 60)?,
                trust_forwarded_headers: parse_flag("RATE_LIMIT_TRUST_FORWARDED_HEADERS", false)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_prod(&self) -> bool {
        self.environment == Environment::Prod
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.is_prod() && self.location.allow_test_ip_fallback {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ALLOW_TEST_IP_FALLBACK must not be enabled in production"
            )));
        }

        if self.captcha.enabled && self.captcha.secret_key.expose_secret().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RECAPTCHA_SECRET_KEY is required when CAPTCHA_ENABLED=true"
            )));
        }

        if self.cookies.max_age_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ACCESS_COOKIE_MAX_AGE_HOURS must be positive"
            )));
        }

        if self.cookies.max_age_hours > MAX_COOKIE_MAX_AGE_HOURS {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ACCESS_COOKIE_MAX_AGE_HOURS must be at most {}",
                MAX_COOKIE_MAX_AGE_HOURS
            )));
        }

        if self.location.backend == LocationBackend::Header && self.location.country_header.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "LOCATION_COUNTRY_HEADER must be set for the header backend"
            )));
        }

        if self.is_prod() && !self.captcha.enabled {
            tracing::warn!("CAPTCHA is disabled in production");
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(key: &str, default: bool) -> Result<bool, AppError> {
    parse_env(key, default)
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for LocationBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "header" => Ok(LocationBackend::Header),
            "database" => Ok(LocationBackend::Database),
            _ => Err(format!("Invalid location backend: {}", s)),
        }
    }
}

impl LocationBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationBackend::Header => "header",
            LocationBackend::Database => "database",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ParticipationConfig {
        ParticipationConfig {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "participation-service".to_string(),
            service_version: "test".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            captcha: CaptchaConfig {
                enabled: true,
                secret_key: Secret::new("secret".to_string()),
                site_key: "site".to_string(),
                verify_url: DEFAULT_RECAPTCHA_VERIFY_URL.to_string(),
                timeout_seconds: 10,
            },
            location: LocationConfig {
                backend: LocationBackend::Database,
                country_header: "x-vercel-ip-country".to_string(),
                city_header: "x-vercel-ip-city".to_string(),
                database_path: "GeoLite2-Country.mmdb".to_string(),
                allow_test_ip_fallback: true,
                test_ip: IpAddr::from([8, 8, 8, 8]),
            },
            cookies: CookieConfig {
                enabled: true,
                max_age_hours: 24,
            },
            rate_limit: RateLimitConfig {
                verify_attempts: 10,
                verify_window_seconds: 60,
                trust_forwarded_headers: false,
            },
        }
    }

    #[test]
    fn test_ip_fallback_allowed_in_dev() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_ip_fallback_rejected_in_prod() {
        let mut config = config();
        config.environment = Environment::Prod;
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));

        config.location.allow_test_ip_fallback = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn captcha_requires_secret() {
        let mut config = config();
        config.captcha.secret_key = Secret::new(String::new());
        assert!(config.validate().is_err());

        config.captcha.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cookie_lifetime_must_be_positive() {
        let mut config = config();
        config.cookies.max_age_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn cookie_lifetime_is_capped() {
        let mut config = config();
        config.cookies.max_age_hours = MAX_COOKIE_MAX_AGE_HOURS;
        assert!(config.validate().is_ok());

        config.cookies.max_age_hours = MAX_COOKIE_MAX_AGE_HOURS + 1;
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));

        config.cookies.max_age_hours = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_backends() {
        assert_eq!("Header".parse::<LocationBackend>(), Ok(LocationBackend::Header));
        assert_eq!("database".parse::<LocationBackend>(), Ok(LocationBackend::Database));
        assert!("geoip".parse::<LocationBackend>().is_err());
    }
}
