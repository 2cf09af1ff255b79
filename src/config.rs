//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::intake::i18n::Language;

/// Intake bot configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Telegram bot token. When absent the bot runs on the CLI channel.
    pub telegram_bot_token: Option<SecretString>,
    /// Telegram usernames or numeric ids allowed to talk to the bot (`*` = everyone).
    pub allowed_users: Vec<String>,
    /// Webhook receiving finished profiles and feedback. Log-only when absent.
    pub sink_url: Option<String>,
    /// Bearer secret sent to the webhook.
    pub sink_secret: Option<SecretString>,
    /// Port of the status / profile HTTP API.
    pub http_port: u16,
    /// Abandoned sessions are evicted after this much inactivity.
    pub session_ttl: Duration,
    /// How often the eviction sweep runs.
    pub sweep_interval: Duration,
    /// How long a per-user dispatch lane waits for events before retiring.
    pub lane_idle: Duration,
    /// Language used when the transport reports none or an unknown one.
    pub default_language: Language,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            allowed_users: vec!["*".to_string()],
            sink_url: None,
            sink_secret: None,
            http_port: 8080,
            session_ttl: Duration::from_secs(86_400), // 24 hours
            sweep_interval: Duration::from_secs(60),
            lane_idle: Duration::from_secs(300), // 5 minutes
            default_language: Language::default(),
        }
    }
}

impl IntakeConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let telegram_bot_token = non_empty_var("TELEGRAM_BOT_TOKEN").map(SecretString::from);

        let allowed_users: Vec<String> = std::env::var("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let http_port = parse_var("INTAKE_HTTP_PORT")?.unwrap_or(defaults.http_port);
        let session_ttl = parse_var("INTAKE_SESSION_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_ttl);
        let sweep_interval = parse_var("INTAKE_SWEEP_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);
        let lane_idle = parse_var("INTAKE_LANE_IDLE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.lane_idle);

        if sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_SWEEP_INTERVAL_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }

        let default_language = non_empty_var("INTAKE_DEFAULT_LANGUAGE")
            .and_then(|tag| Language::parse(&tag))
            .unwrap_or(defaults.default_language);

        Ok(Self {
            telegram_bot_token,
            allowed_users,
            sink_url: non_empty_var("INTAKE_SINK_URL"),
            sink_secret: non_empty_var("INTAKE_SINK_SECRET").map(SecretString::from),
            http_port,
            session_ttl,
            sweep_interval,
            lane_idle,
            default_language,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an optional variable; a present but malformed value is an error.
fn parse_var<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
    }
}
