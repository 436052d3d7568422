//! The posting loop: pick a topic, write a tweet, post it, wait.

use crate::config::ScheduleConfig;
use crate::generator::TweetGenerator;
use crate::rate_limit::RateLimiter;
use crate::twitter::{PostedTweet, TweetPoster, TwitterError};
use chrono::Utc;
use model::ModelError;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Language model error: {0}")]
    Model(#[from] ModelError),

    #[error("Twitter error: {0}")]
    Twitter(#[from] TwitterError),
}

pub type BotResult<T> = Result<T, BotError>;

/// Operator input accepted while the loop is waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    ChangeCategory(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    RateLimited,
    Posted { topic: String, tweet: PostedTweet },
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub struct Bot {
    generator: TweetGenerator,
    poster: Box<dyn TweetPoster>,
    limiter: RateLimiter,
    schedule: ScheduleConfig,
    category: String,
    topics: VecDeque<String>,
}

impl Bot {
    pub fn new(
        generator: TweetGenerator,
        poster: Box<dyn TweetPoster>,
        category: impl Into<String>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            generator,
            poster,
            limiter: RateLimiter::default(),
            schedule,
            category: category.into(),
            topics: VecDeque::new(),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn pending_topics(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Switch theme; the next tick fetches a fresh topic batch.
    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
        self.topics.clear();
        info!("Switched to category: {}", self.category);
    }

    /// Front of the topic queue, fetching a new batch when it is empty.
    async fn next_topic(&mut self) -> BotResult<String> {
        if let Some(topic) = self.topics.pop_front() {
            return Ok(topic);
        }

        let mut batch = self
            .generator
            .generate_topics(&self.category, self.schedule.topics_per_batch)
            .await?
            .into_iter();
        info!("Refreshed topics for category: {}", self.category);

        let topic = batch.next().unwrap_or_else(|| self.category.clone());
        self.topics.extend(batch);
        Ok(topic)
    }

    async fn publish(&self, topic: &str) -> BotResult<PostedTweet> {
        let tweet = self.generator.generate_tweet(topic, &self.category).await?;
        Ok(self.poster.post_tweet(&tweet).await?)
    }

    /// One iteration of the loop, without any waiting.
    pub async fn tick(&mut self) -> BotResult<TickOutcome> {
        let now = Utc::now();
        if !self.limiter.check(now) {
            return Ok(TickOutcome::RateLimited);
        }

        let topic = self.next_topic().await?;
        info!("Using topic: {}", topic);

        match self.publish(&topic).await {
            Ok(tweet) => {
                self.limiter.record(now);
                Ok(TickOutcome::Posted { topic, tweet })
            }
            Err(e) => {
                // Keep the topic for the retry.
                self.topics.push_front(topic);
                Err(e)
            }
        }
    }

    /// Loop until cancelled or told to quit.
    pub async fn run(
        &mut self,
        cancel: CancellationToken,
        mut commands: Option<mpsc::Receiver<BotCommand>>,
    ) {
        info!("Starting Twitter bot for category: {}", self.category);

        while !cancel.is_cancelled() {
            let outcome = tokio::select! {
                outcome = self.tick() => outcome,
                _ = cancel.cancelled() => {
                    info!("Cancelled while a tweet was in flight");
                    break;
                }
            };

            let pause = match outcome {
                Ok(TickOutcome::Posted { tweet, .. }) => {
                    info!(
                        posted_this_month = self.limiter.count(),
                        "Tweet {} posted, next in {:?}", tweet.id, self.schedule.post_interval
                    );
                    self.schedule.post_interval
                }
                Ok(TickOutcome::RateLimited) => self.schedule.rate_limit_backoff,
                Err(e) => {
                    error!("An error occurred: {}", e);
                    self.schedule.error_backoff
                }
            };

            if self.pause(pause, &cancel, &mut commands).await == Flow::Stop {
                break;
            }
        }

        info!("Bot shutting down");
    }

    async fn pause(
        &mut self,
        duration: Duration,
        cancel: &CancellationToken,
        commands: &mut Option<mpsc::Receiver<BotCommand>>,
    ) -> Flow {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Flow::Continue,
                _ = cancel.cancelled() => return Flow::Stop,
                command = next_command(commands) => match command {
                    Some(BotCommand::ChangeCategory(category)) => self.set_category(category),
                    Some(BotCommand::Quit) => {
                        info!("Bot stopped by user");
                        return Flow::Stop;
                    }
                    // Sender gone: keep running without operator input.
                    None => *commands = None,
                },
            }
        }
    }
}

async fn next_command(commands: &mut Option<mpsc::Receiver<BotCommand>>) -> Option<BotCommand> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
