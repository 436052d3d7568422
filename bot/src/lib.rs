//! Topic-driven tweet bot.
//!
//! A chat model proposes topics for a category and writes one tweet per
//! topic; tweets are posted through the Twitter v2 API on a fixed interval
//! while staying under the monthly posting cap.

pub mod config;
pub mod console;
pub mod generator;
pub mod oauth;
pub mod rate_limit;
pub mod runner;
pub mod server;
pub mod twitter;

pub use config::{BotConfig, ConfigError, ScheduleConfig, TwitterCredentials};
pub use generator::{default_topics, fit_tweet, parse_topics, TweetGenerator, MAX_TWEET_CHARS};
pub use rate_limit::{RateLimiter, MONTHLY_TWEET_LIMIT};
pub use runner::{Bot, BotCommand, BotError, BotResult, TickOutcome};
pub use twitter::{PostedTweet, TweetPoster, TwitterClient, TwitterError, TwitterResult};
