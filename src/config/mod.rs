use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

/// Placeholder secret. Receipts signed with it can be forged by anyone who
/// reads this file.
pub const DEFAULT_SIGNING_SECRET: &str = "change-me-in-production";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub payments: PaymentsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub session_duration_hours: i64,
    /// Self-registration only accepts addresses ending with this suffix.
    pub allowed_email_domain: String,
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    pub request_ttl_hours: i64,
    pub receipt_signing_secret: String,
    pub qr_size: u32,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // A missing .env is fine; real deployments use the environment directly
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("database.url", "sqlite://orgpay.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.session_duration_hours", 24)?
            .set_default("auth.allowed_email_domain", "@psu.palawan.edu.ph")?
            .set_default("payments.request_ttl_hours", 24)?
            .set_default("payments.receipt_signing_secret", DEFAULT_SIGNING_SECRET)?
            .set_default("payments.qr_size", 240)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with ORGPAY__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("ORGPAY").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://orgpay.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                session_duration_hours: 24,
                allowed_email_domain: "@psu.palawan.edu.ph".to_string(),
                secure_cookies: false,
            },
            payments: PaymentsConfig {
                request_ttl_hours: 24,
                receipt_signing_secret: DEFAULT_SIGNING_SECRET.to_string(),
                qr_size: 240,
            },
        }
    }
}
