use std::{env, net::SocketAddr, num::NonZeroU32};

use chrono::Duration;
use dotenv::dotenv;
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::error::ConfigError;

pub const SECRET_MIN_LENGTH: usize = 64;
pub const DEFAULT_BCRYPT_COST: u32 = 12;
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;
/// Upper bound for any configured token lifetime.
pub const MAX_TTL_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue {
                name: "APP_ENV",
                value: value.to_string(),
            }),
        }
    }
}

/// Where the order-tracking signing secret came from.
#[derive(Debug, Clone)]
pub enum TrackingSecretSource {
    Dedicated(SecretString),
    /// `ORDER_TRACKING_SECRET` was unset; the access-token secret is reused.
    FallbackToAccess,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub tracking_secret: TrackingSecretSource,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub tracking_ttl: Duration,
}

impl JwtConfig {
    /// The secret tracking tokens are signed with, after applying the fallback.
    pub fn effective_tracking_secret(&self) -> &SecretString {
        match &self.tracking_secret {
            TrackingSecretSource::Dedicated(secret) => secret,
            TrackingSecretSource::FallbackToAccess => &self.access_secret,
        }
    }
}

/// `max` requests per client within `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max: NonZeroU32,
    pub window: std::time::Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Shared by registration and login.
    pub auth: RateLimit,
    pub refresh: RateLimit,
}

const AUTH_RATE_LIMIT: RateLimit = RateLimit {
    max: NonZeroU32::new(5).unwrap(),
    window: std::time::Duration::from_secs(15 * 60),
};

const REFRESH_RATE_LIMIT: RateLimit = RateLimit {
    max: NonZeroU32::new(120).unwrap(),
    window: std::time::Duration::from_secs(60),
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
    pub rate_limits: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match get("APP_ENV") {
            Some(value) => Environment::parse(&value)?,
            None => Environment::Development,
        };

        let access_secret = required_secret(&get, "JWT_SECRET", environment)?;
        let refresh_secret = required_secret(&get, "JWT_REFRESH_SECRET", environment)?;

        let tracking_secret = match get("ORDER_TRACKING_SECRET") {
            Some(secret) => TrackingSecretSource::Dedicated(SecretString::from(secret)),
            None => {
                warn!(
                    "ORDER_TRACKING_SECRET is not set; order tracking tokens will be signed with JWT_SECRET"
                );
                TrackingSecretSource::FallbackToAccess
            }
        };

        let access_ttl = duration_or(&get, "JWT_EXPIRES_IN", Duration::minutes(15))?;
        let refresh_ttl = duration_or(&get, "JWT_REFRESH_EXPIRES_IN", Duration::days(7))?;
        let tracking_ttl = duration_or(&get, "ORDER_TRACKING_EXPIRES_IN", Duration::days(30))?;

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "BIND_ADDR",
                value: bind_addr.clone(),
            })?;

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(value) => value
                .parse::<u32>()
                .ok()
                .filter(|cost| (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(cost))
                .ok_or(ConfigError::InvalidValue {
                    name: "BCRYPT_COST",
                    value,
                })?,
            None => DEFAULT_BCRYPT_COST,
        };

        let rate_limits = RateLimitConfig {
            auth: rate_limit_or(
                &get,
                ("AUTH_RATE_LIMIT_MAX", "AUTH_RATE_LIMIT_WINDOW"),
                AUTH_RATE_LIMIT,
            )?,
            refresh: rate_limit_or(
                &get,
                ("REFRESH_RATE_LIMIT_MAX", "REFRESH_RATE_LIMIT_WINDOW"),
                REFRESH_RATE_LIMIT,
            )?,
        };

        let cors_origins = get("CORS_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:5173".to_string()]);

        Ok(Self {
            environment,
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:storefront.db?mode=rwc".to_string()),
            bind_addr,
            jwt: JwtConfig {
                access_secret,
                refresh_secret,
                tracking_secret,
                access_ttl,
                refresh_ttl,
                tracking_ttl,
            },
            bcrypt_cost,
            cors_origins,
            rate_limits,
        })
    }
}

fn required_secret<F>(
    get: &F,
    name: &'static str,
    environment: Environment,
) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = SecretString::from(get(name).ok_or(ConfigError::MissingSecret(name))?);

    if secret.expose_secret().len() < SECRET_MIN_LENGTH {
        if environment == Environment::Production {
            return Err(ConfigError::SecretTooShort {
                name,
                min: SECRET_MIN_LENGTH,
            });
        }
        warn!(secret = name, min = SECRET_MIN_LENGTH, "signing secret is shorter than recommended");
    }

    Ok(secret)
}

fn duration_or<F>(get: &F, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(value) => parse_duration(&value).ok_or(ConfigError::InvalidDuration { name, value }),
        None => Ok(default),
    }
}

fn rate_limit_or<F>(
    get: &F,
    (max_key, window_key): (&'static str, &'static str),
    default: RateLimit,
) -> Result<RateLimit, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let max = match get(max_key) {
        Some(value) => value
            .parse::<NonZeroU32>()
            .map_err(|_| ConfigError::InvalidValue { name: max_key, value })?,
        None => default.max,
    };

    let window = match get(window_key) {
        Some(value) => parse_duration(&value)
            .and_then(|d| d.to_std().ok())
            .ok_or(ConfigError::InvalidDuration { name: window_key, value })?,
        None => default.window,
    };

    Ok(RateLimit { max, window })
}

/// Parses `ms`-style durations: `30s`, `15m`, `12h`, `7d`, or bare seconds.
/// Anything longer than [`MAX_TTL_DAYS`] is rejected.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);
    let amount: i64 = amount.parse().ok()?;
    if amount <= 0 {
        return None;
    }

    let duration = match unit.trim() {
        "" | "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        _ => None,
    }?;

    // Keeps `now + ttl` representable as a timestamp.
    (duration <= Duration::days(MAX_TTL_DAYS)).then_some(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn long_secret(c: char) -> String {
        std::iter::repeat(c).take(SECRET_MIN_LENGTH).collect()
    }

    #[test]
    fn parses_ms_style_durations() {
        assert_eq!(parse_duration("15m"), Some(Duration::minutes(15)));
        assert_eq!(parse_duration("7d"), Some(Duration::days(7)));
        assert_eq!(parse_duration("12h"), Some(Duration::hours(12)));
        assert_eq!(parse_duration("3600"), Some(Duration::seconds(3600)));
        assert_eq!(parse_duration("0m"), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("5y"), None);
    }

    #[test]
    fn oversized_durations_are_rejected_not_panicking() {
        assert_eq!(parse_duration("99999999999999d"), None);
        assert_eq!(parse_duration("9223372036854775807w"), None);
        assert_eq!(parse_duration("99999999999999999999"), None);
        // Fits in a `Duration` but would overflow a timestamp.
        assert_eq!(parse_duration("1000000000d"), None);
        assert_eq!(parse_duration("3650d"), Some(Duration::days(MAX_TTL_DAYS)));
        assert_eq!(parse_duration("3651d"), None);
    }

    #[test]
    fn oversized_ttl_is_a_config_error() {
        let err = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", long_secret('a').as_str()),
            ("JWT_REFRESH_SECRET", long_secret('r').as_str()),
            ("JWT_REFRESH_EXPIRES_IN", "1000000000d"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration { name: "JWT_REFRESH_EXPIRES_IN", .. }
        ));
    }

    #[test]
    fn rate_limits_are_configurable() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", long_secret('a').as_str()),
            ("JWT_REFRESH_SECRET", long_secret('r').as_str()),
            ("AUTH_RATE_LIMIT_MAX", "10"),
            ("AUTH_RATE_LIMIT_WINDOW", "1h"),
        ]))
        .unwrap();
        assert_eq!(config.rate_limits.auth.max.get(), 10);
        assert_eq!(config.rate_limits.auth.window.as_secs(), 3600);

        let err = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", long_secret('a').as_str()),
            ("JWT_REFRESH_SECRET", long_secret('r').as_str()),
            ("AUTH_RATE_LIMIT_MAX", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: "AUTH_RATE_LIMIT_MAX", .. }
        ));
    }

    #[test]
    fn bcrypt_cost_must_be_in_range() {
        for (cost, ok) in [("3", false), ("4", true), ("31", true), ("32", false), ("x", false)] {
            let config = AppConfig::from_lookup(lookup(&[
                ("JWT_SECRET", long_secret('a').as_str()),
                ("JWT_REFRESH_SECRET", long_secret('r').as_str()),
                ("BCRYPT_COST", cost),
            ]));
            assert_eq!(config.is_ok(), ok, "cost {cost}");
        }
    }

    #[test]
    fn missing_access_secret_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_REFRESH_SECRET", "r")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("JWT_SECRET")));
    }

    #[test]
    fn missing_refresh_secret_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "a")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("JWT_REFRESH_SECRET")));
    }

    #[test]
    fn short_secrets_are_rejected_in_production_only() {
        let dev = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "short"),
            ("JWT_REFRESH_SECRET", "short"),
        ]));
        assert!(dev.is_ok());

        let prod = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "short"),
            ("JWT_REFRESH_SECRET", "short"),
        ]));
        assert!(matches!(
            prod.unwrap_err(),
            ConfigError::SecretTooShort { name: "JWT_SECRET", .. }
        ));
    }

    #[test]
    fn tracking_secret_falls_back_to_access_secret() {
        let access = long_secret('a');
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", access.as_str()),
            ("JWT_REFRESH_SECRET", long_secret('r').as_str()),
        ]))
        .unwrap();

        assert!(matches!(
            config.jwt.tracking_secret,
            TrackingSecretSource::FallbackToAccess
        ));
        assert_eq!(config.jwt.effective_tracking_secret().expose_secret(), access);
    }

    #[test]
    fn dedicated_tracking_secret_wins() {
        let tracking = long_secret('t');
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", long_secret('a').as_str()),
            ("JWT_REFRESH_SECRET", long_secret('r').as_str()),
            ("ORDER_TRACKING_SECRET", tracking.as_str()),
        ]))
        .unwrap();

        assert_eq!(config.jwt.effective_tracking_secret().expose_secret(), tracking);
    }

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", long_secret('a').as_str()),
            ("JWT_REFRESH_SECRET", long_secret('r').as_str()),
        ]))
        .unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.jwt.access_ttl, Duration::minutes(15));
        assert_eq!(config.jwt.refresh_ttl, Duration::days(7));
        assert_eq!(config.jwt.tracking_ttl, Duration::days(30));
        assert_eq!(config.bcrypt_cost, DEFAULT_BCRYPT_COST);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.rate_limits.auth.max.get(), 5);
        assert_eq!(config.rate_limits.auth.window.as_secs(), 15 * 60);
        assert_eq!(config.rate_limits.refresh.max.get(), 120);
        assert_eq!(config.rate_limits.refresh.window.as_secs(), 60);
    }
}
