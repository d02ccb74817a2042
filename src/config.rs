use std::env;
use std::fmt;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Payment provider credentials and endpoint
#[derive(Clone)]
pub struct PaymentConfig {
    pub key_id: String,
    pub key_secret: String,
    /// Secret used for webhook signatures. Falls back to `key_secret` when unset.
    pub webhook_secret: Option<String>,
    pub api_base: String,
    pub currency: String,
    pub timeout_secs: u64,
}

/// Booking rules that are tunable per deployment
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Non-privileged users may not cancel inside this window before check-in.
    pub cancellation_window_hours: i64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub payment: PaymentConfig,
    pub booking: BookingPolicy,
    pub log_level: String,
    pub http_port: u16,
    pub environment: String,
    pub audit_log_dir: String,
    pub internal_auth_secret: Option<String>,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 10u32);
        let acquire_timeout_secs = env_parse("DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64);
        let idle_timeout_secs = env_parse("DATABASE_IDLE_TIMEOUT_SECS", 600u64); // 10 minutes
        let max_lifetime_secs = env_parse("DATABASE_MAX_LIFETIME_SECS", 1800u64); // 30 minutes
        let test_before_acquire = env_parse("DATABASE_TEST_BEFORE_ACQUIRE", true);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/stayhub".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl PaymentConfig {
    /// Create payment provider config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let key_id = env_non_empty("RAZORPAY_KEY_ID")
            .ok_or("RAZORPAY_KEY_ID environment variable is required")?;
        let key_secret = env_non_empty("RAZORPAY_KEY_SECRET")
            .ok_or("RAZORPAY_KEY_SECRET environment variable is required")?;

        let currency = env_non_empty("PAYMENT_CURRENCY")
            .unwrap_or_else(|| "INR".to_string())
            .to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("Invalid PAYMENT_CURRENCY: {}", currency));
        }

        let timeout_secs = env_parse("PAYMENT_TIMEOUT_SECS", 15u64);
        if timeout_secs == 0 {
            return Err("PAYMENT_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            key_id,
            key_secret,
            webhook_secret: env_non_empty("RAZORPAY_WEBHOOK_SECRET"),
            api_base: env_non_empty("RAZORPAY_API_BASE")
                .unwrap_or_else(|| "https://api.razorpay.com/v1".to_string()),
            currency,
            timeout_secs,
        })
    }

    /// Secret that signs webhook deliveries
    pub fn webhook_secret(&self) -> &str {
        self.webhook_secret.as_deref().unwrap_or(&self.key_secret)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            key_id: "rzp_test_key".to_string(),
            key_secret: "rzp_test_secret".to_string(),
            webhook_secret: None,
            api_base: "https://api.razorpay.com/v1".to_string(),
            currency: "INR".to_string(),
            timeout_secs: 15,
        }
    }
}

impl BookingPolicy {
    pub fn from_env() -> Result<Self, String> {
        let cancellation_window_hours = env_parse("CANCELLATION_WINDOW_HOURS", 24i64);
        if cancellation_window_hours < 0 {
            return Err("CANCELLATION_WINDOW_HOURS must not be negative".to_string());
        }
        Ok(Self {
            cancellation_window_hours,
        })
    }

    pub fn cancellation_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cancellation_window_hours)
    }
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            cancellation_window_hours: 24,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let payment = PaymentConfig::from_env()?;
        let booking = BookingPolicy::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let http_port = env_parse("HTTP_PORT", 8080u16);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let audit_log_dir = env::var("AUDIT_LOG_DIR").unwrap_or_else(|_| "./logs".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            payment,
            booking,
            log_level: log_level.to_lowercase(),
            http_port,
            environment: environment.to_lowercase(),
            audit_log_dir,
            internal_auth_secret: env_non_empty("INTERNAL_AUTH_SECRET"),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            payment: PaymentConfig::default(),
            booking: BookingPolicy::default(),
            log_level: "info".to_string(),
            http_port: 8080,
            environment: "development".to_string(),
            audit_log_dir: "./logs".to_string(),
            internal_auth_secret: None,
        }
    }
}
