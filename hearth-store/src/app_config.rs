use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Idle lifetime of a browser session, in seconds.
    pub ttl_seconds: u64,
    /// Mark the session cookie Secure (requires TLS in front).
    pub cookie_secure: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub transport: MailTransportKind,
    /// Sender address on outbound notifications.
    pub from: String,
    /// Recipient of owner notices.
    pub owner: String,
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailTransportKind {
    /// Write outbound mail to the log instead of sending it.
    Log,
    Smtp,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Base settings, always present
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `HEARTH__SERVER__PORT=9090` overrides `server.port`
            .add_source(config::Environment::with_prefix("HEARTH").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
