use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub throttle: ThrottleConfig,
    pub sentiment: SentimentConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let max_attempts = env::var("THROTTLE_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidThrottleValue {
                name: "THROTTLE_MAX_ATTEMPTS",
            })?;
        let lockout_secs = env::var("THROTTLE_LOCKOUT_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidThrottleValue {
                name: "THROTTLE_LOCKOUT_SECS",
            })?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidThrottleValue {
                name: "THROTTLE_MAX_ATTEMPTS",
            });
        }

        let max_chars = env::var("SENTIMENT_MAX_CHARS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidSentimentLimit)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            throttle: ThrottleConfig {
                max_attempts,
                lockout: Duration::from_secs(lockout_secs),
            },
            sentiment: SentimentConfig { max_chars },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Login throttle tuning: attempts allowed before lockout, and how long a
/// lockout (and the counter record itself) lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub max_attempts: u32,
    pub lockout: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout: Duration::from_secs(300),
        }
    }
}

/// Sentiment analysis limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentimentConfig {
    pub max_chars: usize,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self { max_chars: 5000 }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidThrottleValue { name: &'static str },
    InvalidSentimentLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidThrottleValue { name } => {
                write!(f, "{name} must be a positive integer")
            }
            ConfigError::InvalidSentimentLimit => {
                write!(f, "SENTIMENT_MAX_CHARS must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("THROTTLE_MAX_ATTEMPTS");
        env::remove_var("THROTTLE_LOCKOUT_SECS");
        env::remove_var("SENTIMENT_MAX_CHARS");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.throttle.max_attempts, 5);
        assert_eq!(config.throttle.lockout, Duration::from_secs(300));
        assert_eq!(config.sentiment.max_chars, 5000);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn rejects_zero_attempt_budget() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("THROTTLE_MAX_ATTEMPTS", "0");
        let err = AppConfig::load().expect_err("zero attempts rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidThrottleValue {
                name: "THROTTLE_MAX_ATTEMPTS"
            }
        ));
    }
}
