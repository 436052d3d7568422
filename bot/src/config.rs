//! Runtime configuration, read from the environment (and `.env`).

use model::OpenAiConfig;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const REQUIRED_VARS: [&str; 5] = [
    "OPENAI_API_KEY",
    "TWITTER_CONSUMER_KEY",
    "TWITTER_CONSUMER_SECRET",
    "TWITTER_ACCESS_TOKEN",
    "TWITTER_ACCESS_TOKEN_SECRET",
];

pub const DEFAULT_CATEGORY: &str = "AI technology";
pub const DEFAULT_TWITTER_API_BASE: &str = "https://api.twitter.com";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

/// Timing of the posting loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Pause after a successful post
    pub post_interval: Duration,
    /// Pause while the monthly cap is exhausted
    pub rate_limit_backoff: Duration,
    /// Pause after a failed iteration
    pub error_backoff: Duration,
    pub topics_per_batch: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            post_interval: Duration::from_secs(3600),
            rate_limit_backoff: Duration::from_secs(3600),
            error_backoff: Duration::from_secs(60),
            topics_per_batch: 10,
        }
    }
}

#[derive(Clone)]
pub struct BotConfig {
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub twitter: TwitterCredentials,
    pub twitter_api_base: String,
    pub category: String,
    pub port: u16,
    pub schedule: ScheduleConfig,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("twitter", &self.twitter)
            .field("twitter_api_base", &self.twitter_api_base)
            .field("category", &self.category)
            .field("port", &self.port)
            .field("schedule", &self.schedule)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(
    name: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match non_empty(value) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl BotConfig {
    /// Build from an arbitrary variable source.
    ///
    /// All missing credentials are reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|name| non_empty(lookup(name)).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing));
        }

        let require = |name: &str| non_empty(lookup(name)).unwrap_or_default();

        let temperature: f32 = parse_var("OPENAI_TEMPERATURE", lookup("OPENAI_TEMPERATURE"), 0.9)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                name: "OPENAI_TEMPERATURE".to_string(),
                reason: "must be between 0.0 and 2.0".to_string(),
            });
        }

        let defaults = ScheduleConfig::default();
        let interval_secs = parse_var(
            "TWEET_INTERVAL_SECS",
            lookup("TWEET_INTERVAL_SECS"),
            defaults.post_interval.as_secs(),
        )?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "TWEET_INTERVAL_SECS".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            openai_api_key: require("OPENAI_API_KEY"),
            openai_base_url: non_empty(lookup("OPENAI_BASE_URL")),
            model: non_empty(lookup("OPENAI_MODEL"))
                .unwrap_or_else(|| model::config::DEFAULT_MODEL.to_string()),
            temperature,
            twitter: TwitterCredentials {
                consumer_key: require("TWITTER_CONSUMER_KEY"),
                consumer_secret: require("TWITTER_CONSUMER_SECRET"),
                access_token: require("TWITTER_ACCESS_TOKEN"),
                access_token_secret: require("TWITTER_ACCESS_TOKEN_SECRET"),
            },
            twitter_api_base: non_empty(lookup("TWITTER_API_BASE"))
                .unwrap_or_else(|| DEFAULT_TWITTER_API_BASE.to_string()),
            category: non_empty(lookup("BOT_CATEGORY"))
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            port: parse_var("PORT", lookup("PORT"), 8080u16)?,
            schedule: ScheduleConfig {
                post_interval: Duration::from_secs(interval_secs),
                ..defaults
            },
        })
    }

    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn openai_config(&self) -> OpenAiConfig {
        let config = OpenAiConfig::new(self.openai_api_key.clone())
            .with_model(self.model.clone())
            .with_temperature(self.temperature);
        match &self.openai_base_url {
            Some(base_url) => config.with_base_url(base_url.clone()),
            None => config,
        }
    }
}
