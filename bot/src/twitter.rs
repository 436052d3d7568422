//! Twitter v2 client for posting tweets.

use crate::config::TwitterCredentials;
use crate::oauth::{self, OAuthNonce};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum TwitterError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Twitter rejected the credentials ({status}): {body}")]
    Authentication { status: u16, body: String },

    #[error("Twitter rate limit reached")]
    RateLimited,

    #[error("Twitter API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Refusing to post an empty tweet")]
    EmptyTweet,

    #[error("Failed to sign request: {0}")]
    Signing(#[from] hmac::digest::InvalidLength),
}

pub type TwitterResult<T> = Result<T, TwitterError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedTweet {
    pub id: String,
    pub text: String,
}

/// Anything that can publish a tweet.
#[async_trait]
pub trait TweetPoster: Send + Sync {
    async fn post_tweet(&self, text: &str) -> TwitterResult<PostedTweet>;
}

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: PostedTweet,
}

pub struct TwitterClient {
    client: reqwest::Client,
    credentials: TwitterCredentials,
    base_url: String,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials, base_url: impl Into<String>) -> TwitterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn tweets_url(&self) -> String {
        format!("{}/2/tweets", self.base_url)
    }
}

#[async_trait]
impl TweetPoster for TwitterClient {
    async fn post_tweet(&self, text: &str) -> TwitterResult<PostedTweet> {
        if text.trim().is_empty() {
            return Err(TwitterError::EmptyTweet);
        }

        let url = self.tweets_url();
        // JSON bodies are not part of the OAuth 1.0a signature.
        let authorization =
            oauth::authorization_header("POST", &url, &self.credentials, &[], &OAuthNonce::generate())?;

        debug!(chars = text.chars().count(), "Posting tweet");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&CreateTweetRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Failed to post tweet");
            return Err(match status.as_u16() {
                401 | 403 => TwitterError::Authentication {
                    status: status.as_u16(),
                    body,
                },
                429 => TwitterError::RateLimited,
                code => TwitterError::Api { status: code, body },
            });
        }

        let created: CreateTweetResponse = response.json().await?;
        info!(id = %created.data.id, "Successfully posted tweet: {}", created.data.text);
        Ok(created.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> TwitterCredentials {
        TwitterCredentials {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            access_token: "at".to_string(),
            access_token_secret: "ats".to_string(),
        }
    }

    #[test]
    fn test_tweets_url_trims_slash() {
        let client = TwitterClient::new(credentials(), "https://api.twitter.com/").unwrap();
        assert_eq!(client.tweets_url(), "https://api.twitter.com/2/tweets");
    }

    #[tokio::test]
    async fn test_empty_tweet_rejected_without_request() {
        // Unroutable base: a request would fail with a network error instead.
        let client = TwitterClient::new(credentials(), "http://127.0.0.1:9").unwrap();
        let result = client.post_tweet("   ").await;
        assert!(matches!(result, Err(TwitterError::EmptyTweet)));
    }
}
